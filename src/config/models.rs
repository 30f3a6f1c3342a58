use crate::fetch::{BasicAuth, ProxyArg};
use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: FetchSettings,
    /// Per-service handler options, keyed by handler key
    #[serde(default)]
    pub services: HashMap<String, HandlerConfig>,
    /// Per-info-site handler options, keyed by handler key
    #[serde(default)]
    pub info: HashMap<String, HandlerConfig>,
}

/// Settings shared by every handler's fetch pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchSettings {
    /// Fallback user agent when neither the call nor the handler config sets one
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Minimum interval between two fetches through the same handler
    #[serde(default = "default_rate_limit_wait")]
    pub rate_limit_wait: HumanDuration,
    /// Distinct requests remembered per handler
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            rate_limit_wait: default_rate_limit_wait(),
            cache_capacity: default_cache_capacity(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_rate_limit_wait() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_cache_capacity() -> u64 {
    100
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(60)
}

/// Opaque option map for one handler
///
/// Handlers read whatever keys they understand; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct HandlerConfig(Map<String, Value>);

impl HandlerConfig {
    pub fn new(options: Map<String, Value>) -> Self {
        Self(options)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer option, accepting numbers and numeric strings
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.get_str("user_agent")
            .or_else(|| self.get_str("useragent"))
    }

    /// Proxy parts from a `proxy = ["host", 8080]` style option
    pub fn proxy(&self) -> Option<ProxyArg> {
        self.0.get("proxy").map(ProxyArg::from_value)
    }

    /// Basic auth from `username` and `password` options
    pub fn auth(&self) -> Option<BasicAuth> {
        match (self.get_str("username"), self.get_str("password")) {
            (Some(username), Some(password)) => Some(BasicAuth::new(username, password)),
            _ => None,
        }
    }
}

impl From<Value> for HandlerConfig {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}
