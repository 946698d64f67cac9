use axum::extract::{ConnectInfo, OriginalUri};
use axum::http::{Extensions, Request, Uri, request::Parts};
use std::net::SocketAddr;

/// The parts of a request an error log record reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller address, present when the server was started with connect info.
    pub remote_addr: Option<String>,
    /// Request path plus `?`-joined query string.
    pub path: String,
}

impl RequestContext {
    pub fn new(remote_addr: Option<String>, path: impl Into<String>) -> Self {
        Self {
            remote_addr,
            path: path.into(),
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::from_head(request.uri(), request.extensions())
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::from_head(&parts.uri, &parts.extensions)
    }

    fn from_head(uri: &Uri, extensions: &Extensions) -> Self {
        // Nested routers strip their prefix from the visible URI.
        let uri = extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(uri);
        let remote_addr = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            remote_addr,
            path: effective_path(uri),
        }
    }
}

fn effective_path(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), query),
        None => uri.path().to_string(),
    }
}
