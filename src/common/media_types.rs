//! Media type strings used on the wire.

pub const JSON: &str = "application/json";

pub const JSON_UTF_8: &str = "application/json; charset=utf-8";
