use std::sync::{Arc, LazyLock, OnceLock};
use tracing::{debug, warn};

use super::traits::{HandlerError, RequestOptions};
use crate::config::{FetchSettings, HandlerConfig};
use crate::fetch::{
    FetchError, FetchRequest, Fetcher, HttpConfig, OutputMode, Payload, ReqwestTransport,
    Transport,
};

static EMPTY_CONFIG: LazyLock<HandlerConfig> = LazyLock::new(HandlerConfig::default);

/// What a registry needs to build handlers: one transport, one set of
/// fetch settings
#[derive(Clone)]
pub struct HandlerContext {
    transport: Arc<dyn Transport>,
    settings: FetchSettings,
}

impl HandlerContext {
    pub fn new(transport: Arc<dyn Transport>, settings: FetchSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Context over a fresh reqwest transport
    pub fn from_settings(settings: FetchSettings) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(HttpConfig::from(&settings))?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// A new fetcher: own cache and rate limiter, shared transport
    pub fn fetcher(&self) -> Fetcher {
        Fetcher::with_transport(self.transport.clone(), &self.settings)
    }

    pub fn base(&self, key: impl Into<String>, name: impl Into<String>) -> HandlerBase {
        HandlerBase::new(
            key,
            name,
            self.fetcher(),
            self.settings.user_agent.clone(),
        )
    }
}

/// Identity, config and fetcher every concrete handler embeds
#[derive(Debug)]
pub struct HandlerBase {
    key: String,
    name: String,
    config: OnceLock<HandlerConfig>,
    fetcher: Fetcher,
    default_user_agent: Option<String>,
}

impl HandlerBase {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        fetcher: Fetcher,
        default_user_agent: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            config: OnceLock::new(),
            fetcher,
            default_user_agent,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &HandlerConfig {
        self.config.get().unwrap_or_else(|| &*EMPTY_CONFIG)
    }

    pub fn set_config(&self, config: HandlerConfig) -> Result<(), HandlerError> {
        debug!(
            handler = %self.key,
            empty = config.is_empty(),
            "Setting handler config"
        );
        self.config.set(config).map_err(|_| {
            warn!(handler = %self.key, "Handler config already set, ignoring");
            HandlerError::ConfigAlreadySet(self.key.clone())
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Site root, overridable through the `base_url` option
    pub fn base_url<'a>(&'a self, default: &'a str) -> &'a str {
        self.config()
            .get_str("base_url")
            .unwrap_or(default)
            .trim_end_matches('/')
    }

    /// Build a request: call options win over handler config, which wins
    /// over the global user agent
    pub fn request(
        &self,
        url: impl Into<String>,
        mode: OutputMode,
        options: &RequestOptions,
    ) -> FetchRequest {
        let config = self.config();

        let user_agent = options
            .user_agent
            .clone()
            .or_else(|| config.user_agent().map(str::to_string))
            .or_else(|| self.default_user_agent.clone());

        FetchRequest::builder()
            .url(url)
            .mode(mode)
            .maybe_user_agent(user_agent)
            .maybe_proxy(options.proxy.clone().or_else(|| config.proxy()))
            .maybe_auth(options.auth.clone().or_else(|| config.auth()))
            .build()
    }

    pub async fn fetch(
        &self,
        url: impl Into<String>,
        mode: OutputMode,
        options: &RequestOptions,
    ) -> Option<Payload> {
        let request = self.request(url, mode, options);
        self.fetcher.fetch(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{BasicAuth, ProxyArg};
    use serde_json::json;

    fn base(default_agent: Option<&str>) -> HandlerBase {
        let context = HandlerContext::from_settings(FetchSettings::default()).unwrap();
        HandlerBase::new(
            "test",
            "Test",
            context.fetcher(),
            default_agent.map(str::to_string),
        )
    }

    #[test]
    fn test_config_is_write_once() {
        let base = base(None);
        assert!(base.config().is_empty());

        base.set_config(HandlerConfig::from(json!({ "client": "first" })))
            .unwrap();
        let second = base.set_config(HandlerConfig::from(json!({ "client": "second" })));

        assert!(matches!(second, Err(HandlerError::ConfigAlreadySet(_))));
        assert_eq!(base.config().get_str("client"), Some("first"));
    }

    #[test]
    fn test_request_layering() {
        let base = base(Some("global/1.0"));
        base.set_config(HandlerConfig::from(json!({
            "user_agent": "handler/1.0",
            "proxy": ["10.0.0.1", 8080],
            "username": "holo",
            "password": "apple"
        })))
        .unwrap();

        let from_config = base.request(
            "https://a.example",
            OutputMode::Json,
            &RequestOptions::default(),
        );
        assert_eq!(from_config.user_agent.as_deref(), Some("handler/1.0"));
        assert_eq!(from_config.proxy, Some(ProxyArg::new(["10.0.0.1", "8080"])));
        assert_eq!(from_config.auth, Some(BasicAuth::new("holo", "apple")));
        assert_eq!(from_config.mode, OutputMode::Json);

        let overridden = base.request(
            "https://a.example",
            OutputMode::Text,
            &RequestOptions::with_user_agent("call/1.0"),
        );
        assert_eq!(overridden.user_agent.as_deref(), Some("call/1.0"));
    }

    #[test]
    fn test_base_url_override() {
        let base = base(None);
        assert_eq!(
            base.base_url("https://site.example/"),
            "https://site.example"
        );

        base.set_config(HandlerConfig::from(json!({
            "base_url": "http://127.0.0.1:8080/"
        })))
        .unwrap();
        assert_eq!(
            base.base_url("https://site.example"),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_request_falls_back_to_global_agent() {
        let base = base(Some("global/1.0"));
        let request = base.request(
            "https://a.example",
            OutputMode::Text,
            &RequestOptions::default(),
        );

        assert_eq!(request.user_agent.as_deref(), Some("global/1.0"));
        assert!(request.proxy.is_none());
        assert!(request.auth.is_none());
    }
}
