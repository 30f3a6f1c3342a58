use async_trait::async_trait;
use tracing::{debug, warn};

use crate::fetch::OutputMode;
use crate::handlers::base::{HandlerBase, HandlerContext};
use crate::handlers::traits::{Handler, InfoHandler, RequestOptions};
use crate::handlers::types::{Link, SeasonName, Show, UnprocessedShow};

const BASE_URL: &str = "https://anidb.net";
const API_URL: &str = "http://api.anidb.net:9001/httpapi";

/// AniDB, links and episode counts only
///
/// The HTTP API wants a registered client name and version, read from the
/// `client` and `clientver` options. `base_url` overrides the site used for
/// links and `api_url` overrides the API endpoint.
pub struct AniDb {
    base: HandlerBase,
}

impl AniDb {
    pub const KEY: &'static str = "anidb";

    pub fn new(ctx: &HandlerContext) -> Self {
        Self {
            base: ctx.base(Self::KEY, "AniDB"),
        }
    }

    fn api_url(&self) -> &str {
        self.config()
            .get_str("api_url")
            .unwrap_or(API_URL)
            .trim_end_matches('/')
    }

    fn anime_url(&self, aid: &str) -> Option<String> {
        let config = self.config();
        let Some(client) = config.get_str("client") else {
            warn!(handler = Self::KEY, "No API client configured");
            return None;
        };
        let version = config.get_u64("clientver").unwrap_or(1);

        Some(format!(
            "{}?request=anime&client={}&clientver={}&protover=1&aid={}",
            self.api_url(),
            urlencoding::encode(client),
            version,
            urlencoding::encode(aid)
        ))
    }
}

impl Handler for AniDb {
    fn base(&self) -> &HandlerBase {
        &self.base
    }
}

#[async_trait]
impl InfoHandler for AniDb {
    fn get_link(&self, link: &Link) -> String {
        format!("{}/anime/{}", self.base.base_url(BASE_URL), link.site_id)
    }

    async fn find_show(&self, name: &str, _options: &RequestOptions) -> Vec<Show> {
        debug!(query = name, "AniDB search is not supported");
        Vec::new()
    }

    async fn get_episode_count(
        &self,
        _show: &Show,
        link: &Link,
        options: &RequestOptions,
    ) -> Option<u32> {
        let url = self.anime_url(&link.site_id)?;
        let payload = self.base.fetch(url, OutputMode::Xml, options).await?;
        let root = payload.as_xml()?;

        // errors come back as 200 with an <error> document
        if root.name == "error" {
            warn!(aid = %link.site_id, message = %root.text, "AniDB API error");
            return None;
        }

        root.child_text("episodecount")?
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
    }

    async fn get_seasonal_shows(
        &self,
        year: Option<i32>,
        season: Option<SeasonName>,
        _options: &RequestOptions,
    ) -> Vec<UnprocessedShow> {
        debug!(?year, ?season, "AniDB has no seasonal listing");
        Vec::new()
    }
}
