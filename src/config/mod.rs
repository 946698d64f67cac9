use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

/// Environment prefix for the keys this crate reads.
pub const ENV_PREFIX: &str = "SPRINGWHEEL_";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Load every `SPRINGWHEEL_*` environment variable.
    pub fn new() -> Self {
        Self::from_vars(env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let service = Self::default();
        for (key, value) in vars {
            if key.as_ref().starts_with(ENV_PREFIX) {
                service.set(key.as_ref(), value.as_ref());
            }
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    /// Typed lookup; a missing or unparsable value yields `default`.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring unparsable value for {}: {:?}", key, raw);
                default
            }),
            None => default,
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Settings for the exception layer and the validation interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    /// Largest request body buffered for argument resolution.
    pub max_body_bytes: usize,
    /// Whether error responses produced by the framework itself are logged.
    pub log_framework_errors: bool,
}

impl WebConfig {
    pub const MAX_BODY_BYTES: &'static str = "SPRINGWHEEL_MAX_BODY_BYTES";
    pub const LOG_FRAMEWORK_ERRORS: &'static str = "SPRINGWHEEL_LOG_FRAMEWORK_ERRORS";

    pub fn from_service(config: &ConfigService) -> Self {
        let defaults = Self::default();
        Self {
            max_body_bytes: config.get_or(Self::MAX_BODY_BYTES, defaults.max_body_bytes),
            log_framework_errors: config
                .get_or(Self::LOG_FRAMEWORK_ERRORS, defaults.log_framework_errors),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
            log_framework_errors: true,
        }
    }
}
