//! # Springwheel
//!
//! Two request-pipeline hooks for axum applications:
//!
//! - **Exception translation**: every error escaping a handler or interceptor becomes a
//!   uniform JSON body `{"code": .., "message": ..}` with the right HTTP status, and
//!   one structured error record carrying the caller address and request path.
//!   Unclassified errors always answer 500 with the generic status phrase.
//! - **Validation interception**: handlers marked with `param_check` have their
//!   declared parameters resolved from the request and validated (object graph, then
//!   method-level constraints) before they run; any violation answers 400.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Extension, Json, Router, routing::post};
//! use serde::Deserialize;
//! use springwheel::prelude::*;
//! use validator::Validate;
//!
//! #[derive(Debug, Deserialize, Validate)]
//! struct NewWidget {
//!     #[validate(length(min = 1, message = "must not be blank"))]
//!     name: String,
//! }
//!
//! struct WidgetController;
//!
//! async fn create_widget(Extension(args): Extension<ResolvedArguments>) -> Result<String, WheelError> {
//!     let widget = args
//!         .get::<NewWidget>("widget")
//!         .ok_or_else(|| anyhow::anyhow!("widget argument missing"))?;
//!     Ok(format!("created {}", widget.name))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let interceptors = InterceptorRegistry::new()
//!         .add(LoggingInterceptor)
//!         .add(ValidationInterceptor::default());
//!
//!     let create = HandlerMethod::of::<WidgetController>("create")
//!         .param(MethodParameter::body::<NewWidget>("widget"))
//!         .param_check();
//!
//!     let app = Router::new()
//!         .route("/widgets", post(create_widget).layer(interceptors.layer(create)?))
//!         .layer(ExceptionLayer::default());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod binder;
pub mod common;
pub mod config;
pub mod error;
pub mod exception;
pub mod handler;
pub mod interceptor;
pub mod resolver;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-export core types
pub use common::ErrorResult;
pub use error::{Result, WheelError};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use springwheel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::binder::{DataBinder, InitBinderRegistry};
    pub use crate::common::ErrorResult;
    pub use crate::config::{ConfigService, WebConfig};
    pub use crate::error::{Result, WheelError};
    pub use crate::exception::{
        ApiException, ErrorCode, ExceptionFilter, ExceptionLayer, HttpExceptionFilter,
        ParamCheckException, RequestContext,
    };
    pub use crate::handler::{HandlerMethod, MethodParameter, ParameterKind, ResolvedArguments};
    pub use crate::interceptor::{HandlerInterceptor, InterceptorRegistry, LoggingInterceptor};
    pub use crate::resolver::{ArgumentResolver, ResolverRegistry, WebRequest};
    pub use crate::validation::{ParameterConstraint, ValidationInterceptor, ValidationResult};
    pub use async_trait::async_trait;
}
