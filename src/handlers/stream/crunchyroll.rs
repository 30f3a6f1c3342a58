use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Selector;
use tracing::{debug, warn};

use crate::fetch::{HtmlDocument, OutputMode, XmlElement};
use crate::handlers::base::{HandlerBase, HandlerContext};
use crate::handlers::traits::{Handler, RequestOptions, ServiceHandler};
use crate::handlers::types::{Episode, Season, SeasonName, Stream, UnprocessedStream};

const BASE_URL: &str = "https://www.crunchyroll.com";

pub struct Crunchyroll {
    base: HandlerBase,
}

impl Crunchyroll {
    pub const KEY: &'static str = "crunchyroll";

    pub fn new(ctx: &HandlerContext) -> Self {
        Self {
            base: ctx.base(Self::KEY, "Crunchyroll"),
        }
    }

    fn feed_url(&self, show_key: &str) -> String {
        format!("{}/{}.rss", self.base.base_url(BASE_URL), show_key)
    }

    fn lineup_url(&self, season: Season) -> String {
        format!(
            "{}/videos/anime/seasons/{}-{}",
            self.base.base_url(BASE_URL),
            season.name,
            season.year
        )
    }
}

impl Handler for Crunchyroll {
    fn base(&self) -> &HandlerBase {
        &self.base
    }
}

#[async_trait]
impl ServiceHandler for Crunchyroll {
    async fn get_latest_episode(&self, show_id: &str, options: &RequestOptions) -> Option<Episode> {
        let payload = self
            .base
            .fetch(self.feed_url(show_id), OutputMode::Xml, options)
            .await?;
        let feed = payload.as_xml()?;

        let latest = parse_feed(feed).into_iter().max_by_key(|e| e.number);
        if latest.is_none() {
            debug!(show = show_id, "No episodes in feed");
        }
        latest
    }

    fn get_stream_link(&self, stream: &Stream) -> String {
        format!("{}/{}", self.base.base_url(BASE_URL), stream.show_key)
    }

    async fn get_seasonal_streams(
        &self,
        year: Option<i32>,
        season: Option<SeasonName>,
        options: &RequestOptions,
    ) -> Vec<UnprocessedStream> {
        let season = Season::resolve(year, season);
        debug!(%season, "Fetching seasonal lineup");

        match self
            .base
            .fetch(self.lineup_url(season), OutputMode::Html, options)
            .await
        {
            Some(payload) => payload
                .as_html()
                .map(|doc| parse_lineup(doc, self.key()))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

/// Episodes from an RSS feed; items without a whole episode number are skipped
fn parse_feed(feed: &XmlElement) -> Vec<Episode> {
    feed.descendants_named("item")
        .into_iter()
        .filter_map(|item| {
            let number = item
                .child_text("crunchyroll:episodeNumber")?
                .parse::<u32>()
                .ok()?;
            let date = item
                .child_text("pubDate")
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|d| d.with_timezone(&Utc));

            Some(Episode {
                number,
                name: item
                    .child_text("crunchyroll:episodeTitle")
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                link: item.child_text("link").unwrap_or_default().to_string(),
                date,
            })
        })
        .collect()
}

fn parse_lineup(doc: &HtmlDocument, service_key: &str) -> Vec<UnprocessedStream> {
    let (Ok(entries), Ok(title)) = (
        Selector::parse("li.group-item a"),
        Selector::parse("span.series-title"),
    ) else {
        warn!("Lineup selectors failed to parse");
        return Vec::new();
    };

    let html = doc.parse();
    html.select(&entries)
        .filter_map(|link| {
            let show_key = link.value().attr("href")?.trim_matches('/').to_string();
            let name = link
                .select(&title)
                .next()
                .map(|t| t.text().collect::<String>())
                .or_else(|| link.value().attr("title").map(str::to_string))?
                .trim()
                .to_string();

            if show_key.is_empty() || name.is_empty() {
                return None;
            }

            Some(UnprocessedStream {
                service_key: service_key.to_string(),
                show_key,
                name,
                remote_offset: 0,
                display_offset: 0,
            })
        })
        .collect()
}
