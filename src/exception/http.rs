use crate::common::ErrorResult;
use crate::error::WheelError;
use crate::exception::{ErrorAttribute, ExceptionFilter, RequestContext};
use axum::{http::StatusCode, response::Response};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Write};

/// The default exception filter.
///
/// Domain and validation errors keep their own code, status and message. Everything
/// else becomes a 500 with the generic status phrase; the original error only reaches
/// the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpExceptionFilter;

impl HttpExceptionFilter {
    /// Map an error to its body and status without side effects.
    pub fn translate(error: &WheelError) -> (ErrorResult, StatusCode) {
        match error {
            WheelError::Api(e) => (
                ErrorResult::new(e.error_code().code, render_message(e, e.error_code().status())),
                e.error_code().status(),
            ),
            WheelError::ParamCheck(e) => (
                ErrorResult::new(e.error_code().code, render_message(e, e.error_code().status())),
                e.error_code().status(),
            ),
            WheelError::Resolve(e) => {
                let status = e.status();
                (
                    ErrorResult::new(i32::from(status.as_u16()), render_message(e, status)),
                    status,
                )
            }
            WheelError::Configuration(_) | WheelError::Internal(_) => (
                ErrorResult::internal_server_error(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        }
    }
}

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, error: &WheelError, context: &RequestContext) -> Response {
        log_error(error, Some(context));

        let (result, status) = Self::translate(error);
        let mut response = result.into_response_with(status);
        if status.is_server_error() {
            response.extensions_mut().insert(ErrorAttribute {
                exception: render_message(error, status),
            });
        }
        response
    }

    fn catch_internal(
        &self,
        error: &(dyn Error + 'static),
        mut response: Response,
        context: &RequestContext,
    ) -> Response {
        log_error(error, Some(context));

        if response.status().is_server_error() {
            let exception = render_message(error, response.status());
            response.extensions_mut().insert(ErrorAttribute { exception });
        }
        response
    }
}

/// Emit one error record for `error`.
///
/// The record message is a JSON object with `message` and, when the request is
/// known, `from` and `path`. The cause chain goes into the `cause` field.
pub fn log_error(error: &(dyn Error + 'static), context: Option<&RequestContext>) {
    let message = render_message(error, StatusCode::INTERNAL_SERVER_ERROR);

    let mut record = BTreeMap::new();
    record.insert("message", message.clone());
    if let Some(context) = context {
        if let Some(from) = &context.remote_addr {
            record.insert("from", from.clone());
        }
        record.insert("path", context.path.clone());
    }

    let record = serde_json::to_string(&record).unwrap_or(message);
    let cause = cause_chain(error);
    if cause.is_empty() {
        tracing::error!(target: "springwheel::exception", "{}", record);
    } else {
        tracing::error!(target: "springwheel::exception", cause = %cause, "{}", record);
    }
}

/// Format `error`, falling back to the status phrase if its `Display` fails.
fn render_message<E: fmt::Display + ?Sized>(error: &E, fallback: StatusCode) -> String {
    let mut message = String::new();
    match write!(message, "{}", error) {
        Ok(()) => message,
        Err(_) => fallback
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string(),
    }
}

fn cause_chain(error: &(dyn Error + 'static)) -> String {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(render_message(cause, StatusCode::INTERNAL_SERVER_ERROR));
        source = cause.source();
    }
    causes.join(": ")
}
