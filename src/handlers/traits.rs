use async_trait::async_trait;
use thiserror::Error;

use super::base::HandlerBase;
use super::types::{Episode, Link, SeasonName, Show, Stream, UnprocessedShow, UnprocessedStream};
use crate::config::HandlerConfig;
use crate::fetch::{BasicAuth, ProxyArg};

/// Handler errors
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("config for handler '{0}' was already set")]
    ConfigAlreadySet(String),
}

/// Per-call request overrides
///
/// Anything left unset falls back to the handler's config, then to the
/// global fetch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub user_agent: Option<String>,
    pub proxy: Option<ProxyArg>,
    pub auth: Option<BasicAuth>,
}

impl RequestOptions {
    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ..Self::default()
        }
    }
}

/// State and identity shared by both handler families
pub trait Handler: Send + Sync {
    fn base(&self) -> &HandlerBase;

    fn key(&self) -> &str {
        self.base().key()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Injected options, or an empty map before injection
    fn config(&self) -> &HandlerConfig {
        self.base().config()
    }

    /// Inject options; only the first call takes effect
    fn set_config(&self, config: HandlerConfig) -> Result<(), HandlerError> {
        self.base().set_config(config)
    }
}

/// Capabilities of a stream-hosting service
#[async_trait]
pub trait ServiceHandler: Handler {
    /// Latest episode of a show on this service
    async fn get_latest_episode(&self, show_id: &str, options: &RequestOptions) -> Option<Episode>;

    /// URL of the stream's main page; no network access
    fn get_stream_link(&self, stream: &Stream) -> String;

    /// Streams airing in a season, the current one when both parts are unset
    ///
    /// Not every site can list arbitrary seasons. Empty on no results or any
    /// failure.
    async fn get_seasonal_streams(
        &self,
        year: Option<i32>,
        season: Option<SeasonName>,
        options: &RequestOptions,
    ) -> Vec<UnprocessedStream>;
}

/// Capabilities of a metadata/link site
#[async_trait]
pub trait InfoHandler: Handler {
    /// URL for a link record; no network access
    fn get_link(&self, link: &Link) -> String;

    /// Search by name; empty on no results or any failure
    async fn find_show(&self, name: &str, options: &RequestOptions) -> Vec<Show>;

    async fn get_episode_count(
        &self,
        show: &Show,
        link: &Link,
        options: &RequestOptions,
    ) -> Option<u32>;

    /// Shows airing in a season, the current one when both parts are unset
    async fn get_seasonal_shows(
        &self,
        year: Option<i32>,
        season: Option<SeasonName>,
        options: &RequestOptions,
    ) -> Vec<UnprocessedShow>;
}
