pub mod media_types;
pub mod response;

pub use response::ErrorResult;
