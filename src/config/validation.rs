use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cache_capacity must be at least 1")]
    ZeroCacheCapacity,

    #[error("Timeout must be positive: {field}")]
    ZeroTimeout { field: String },

    #[error("user_agent must not be blank when set")]
    BlankUserAgent,

    #[error("Handler '{family}.{key}' sets a blank user agent")]
    BlankHandlerUserAgent { family: String, key: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_http(config)?;
    validate_handlers(config)?;
    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    let http = &config.http;

    if http.cache_capacity == 0 {
        return Err(ValidationError::ZeroCacheCapacity);
    }

    if http.request_timeout.is_zero() {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout".to_string(),
        });
    }

    if http.connect_timeout.is_zero() {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout".to_string(),
        });
    }

    if http
        .user_agent
        .as_deref()
        .is_some_and(|ua| ua.trim().is_empty())
    {
        return Err(ValidationError::BlankUserAgent);
    }

    Ok(())
}

/// Handler option maps are opaque; only the keys the fetch layer itself
/// reads are checked
fn validate_handlers(config: &Config) -> Result<(), ValidationError> {
    let families = [("services", &config.services), ("info", &config.info)];

    for (family, handlers) in families {
        for (key, options) in handlers {
            if options.user_agent().is_some_and(|ua| ua.trim().is_empty()) {
                return Err(ValidationError::BlankHandlerUserAgent {
                    family: family.to_string(),
                    key: key.clone(),
                });
            }
        }
    }

    Ok(())
}
