use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::fetch::OutputMode;
use crate::handlers::base::{HandlerBase, HandlerContext};
use crate::handlers::traits::{Handler, RequestOptions, ServiceHandler};
use crate::handlers::types::{Episode, SeasonName, Stream, UnprocessedStream};

const BASE_URL: &str = "https://www.funimation.com";

pub struct Funimation {
    base: HandlerBase,
}

impl Funimation {
    pub const KEY: &'static str = "funimation";

    pub fn new(ctx: &HandlerContext) -> Self {
        Self {
            base: ctx.base(Self::KEY, "Funimation"),
        }
    }

    fn episodes_url(&self, show_id: &str) -> String {
        format!(
            "{}/api/episodes/?slug={}&sort=order&sort_direction=desc&limit=20",
            self.base.base_url(BASE_URL),
            urlencoding::encode(show_id)
        )
    }
}

impl Handler for Funimation {
    fn base(&self) -> &HandlerBase {
        &self.base
    }
}

#[async_trait]
impl ServiceHandler for Funimation {
    async fn get_latest_episode(&self, show_id: &str, options: &RequestOptions) -> Option<Episode> {
        let payload = self
            .base
            .fetch(self.episodes_url(show_id), OutputMode::Json, options)
            .await?;

        let site = self.base.base_url(BASE_URL);
        payload
            .as_json()?
            .get("items")?
            .as_array()?
            .iter()
            .filter_map(|item| parse_episode(item.get("item")?, site, show_id))
            .max_by_key(|e| e.number)
    }

    fn get_stream_link(&self, stream: &Stream) -> String {
        format!(
            "{}/shows/{}/",
            self.base.base_url(BASE_URL),
            stream.show_key
        )
    }

    async fn get_seasonal_streams(
        &self,
        year: Option<i32>,
        season: Option<SeasonName>,
        _options: &RequestOptions,
    ) -> Vec<UnprocessedStream> {
        debug!(?year, ?season, "Funimation has no seasonal listing");
        Vec::new()
    }
}

fn parse_episode(item: &Value, site: &str, show_id: &str) -> Option<Episode> {
    // the API sends numbers as either strings or integers
    let number = match item.get("episodeNum")? {
        Value::String(s) => s.trim().parse().ok()?,
        other => u32::try_from(other.as_u64()?).ok()?,
    };
    let slug = item.get("episodeSlug")?.as_str()?;

    Some(Episode {
        number,
        name: item
            .get("episodeTitle")
            .and_then(Value::as_str)
            .map(str::to_string),
        link: format!("{}/shows/{}/{}/", site, show_id, slug),
        date: item
            .get("releaseDate")
            .and_then(Value::as_str)
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc)),
    })
}
