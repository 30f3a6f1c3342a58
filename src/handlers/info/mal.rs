use async_trait::async_trait;
use scraper::Selector;
use tracing::{debug, warn};

use crate::fetch::{HtmlDocument, OutputMode, XmlElement};
use crate::handlers::base::{HandlerBase, HandlerContext};
use crate::handlers::traits::{Handler, InfoHandler, RequestOptions};
use crate::handlers::types::{Link, Season, SeasonName, Show, ShowType, UnprocessedShow};

const BASE_URL: &str = "https://myanimelist.net";

/// MyAnimeList
///
/// Search goes through the XML API, which needs basic auth (`username` and
/// `password` options) and answers an empty search with 204.
pub struct MyAnimeList {
    base: HandlerBase,
}

impl MyAnimeList {
    pub const KEY: &'static str = "mal";

    pub fn new(ctx: &HandlerContext) -> Self {
        Self {
            base: ctx.base(Self::KEY, "MyAnimeList"),
        }
    }

    fn search_url(&self, name: &str) -> String {
        format!(
            "{}/api/anime/search.xml?q={}",
            self.base.base_url(BASE_URL),
            urlencoding::encode(name)
        )
    }

    async fn search(&self, name: &str, options: &RequestOptions) -> Vec<SearchEntry> {
        if self.config().auth().is_none() && options.auth.is_none() {
            warn!(
                handler = Self::KEY,
                "No credentials configured, search will likely fail"
            );
        }

        match self
            .base
            .fetch(self.search_url(name), OutputMode::Xml, options)
            .await
        {
            Some(payload) => payload.as_xml().map(parse_search).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

impl Handler for MyAnimeList {
    fn base(&self) -> &HandlerBase {
        &self.base
    }
}

#[async_trait]
impl InfoHandler for MyAnimeList {
    fn get_link(&self, link: &Link) -> String {
        format!("{}/anime/{}/", self.base.base_url(BASE_URL), link.site_id)
    }

    async fn find_show(&self, name: &str, options: &RequestOptions) -> Vec<Show> {
        let shows: Vec<Show> = self
            .search(name, options)
            .await
            .into_iter()
            .map(|entry| entry.show)
            .collect();
        debug!(query = name, found = shows.len(), "Search finished");
        shows
    }

    async fn get_episode_count(
        &self,
        show: &Show,
        link: &Link,
        options: &RequestOptions,
    ) -> Option<u32> {
        let entry = self
            .search(&show.name, options)
            .await
            .into_iter()
            .find(|entry| entry.show.id == link.site_id);

        match entry {
            Some(entry) => entry.episodes,
            None => {
                debug!(
                    show = %show.name,
                    id = %link.site_id,
                    "Show not in search results"
                );
                None
            }
        }
    }

    async fn get_seasonal_shows(
        &self,
        year: Option<i32>,
        season: Option<SeasonName>,
        options: &RequestOptions,
    ) -> Vec<UnprocessedShow> {
        let season = Season::resolve(year, season);
        let url = format!(
            "{}/anime/season/{}/{}",
            self.base.base_url(BASE_URL),
            season.year,
            season.name
        );

        match self.base.fetch(url, OutputMode::Html, options).await {
            Some(payload) => payload
                .as_html()
                .map(|doc| parse_season(doc, self.key()))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

struct SearchEntry {
    show: Show,
    /// Zero on the site means unknown
    episodes: Option<u32>,
}

fn parse_search(root: &XmlElement) -> Vec<SearchEntry> {
    root.children_named("entry")
        .filter_map(|entry| {
            let id = entry.child_text("id")?.to_string();
            let name = entry.child_text("title")?.to_string();

            let mut more_names = Vec::new();
            if let Some(english) = entry.child_text("english").filter(|s| !s.is_empty()) {
                more_names.push(english.to_string());
            }
            if let Some(synonyms) = entry.child_text("synonyms") {
                more_names.extend(
                    synonyms
                        .split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }

            Some(SearchEntry {
                show: Show {
                    id,
                    name,
                    more_names,
                    show_type: entry.child_text("type").map(show_type).unwrap_or_default(),
                },
                episodes: entry
                    .child_text("episodes")
                    .and_then(|n| n.parse::<u32>().ok())
                    .filter(|&n| n > 0),
            })
        })
        .collect()
}

fn show_type(label: &str) -> ShowType {
    match label.trim().to_lowercase().as_str() {
        "tv" => ShowType::Tv,
        "movie" => ShowType::Movie,
        "ova" | "ona" | "special" => ShowType::Ova,
        _ => ShowType::Unknown,
    }
}

fn parse_season(doc: &HtmlDocument, site_key: &str) -> Vec<UnprocessedShow> {
    let (Ok(cards), Ok(title), Ok(eps)) = (
        Selector::parse("div.seasonal-anime"),
        Selector::parse("a.link-title"),
        Selector::parse("div.eps span"),
    ) else {
        warn!("Season selectors failed to parse");
        return Vec::new();
    };

    let html = doc.parse();
    html.select(&cards)
        .filter_map(|card| {
            let link = card.select(&title).next()?;
            let name = link.text().collect::<String>().trim().to_string();
            let show_key = link
                .value()
                .attr("href")
                .and_then(|href| href.split("/anime/").nth(1))
                .and_then(|rest| rest.split('/').next())
                .filter(|id| !id.is_empty())?
                .to_string();

            let episode_count = card
                .select(&eps)
                .next()
                .map(|span| span.text().collect::<String>())
                .and_then(|text| text.split_whitespace().next()?.parse().ok());

            Some(UnprocessedShow {
                site_key: site_key.to_string(),
                show_key,
                name,
                more_names: Vec::new(),
                show_type: ShowType::Tv,
                episode_count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::fetch::BasicAuth;
    use crate::handlers::testing::RouteTransport;
    use serde_json::json;

    const SEARCH: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<anime>
  <entry>
    <id>2966</id>
    <title>Ookami to Koushinryou</title>
    <english>Spice and Wolf</english>
    <synonyms>Spice &amp; Wolf; Okami to Koshinryo</synonyms>
    <episodes>13</episodes>
    <type>TV</type>
  </entry>
  <entry>
    <id>5341</id>
    <title>Ookami to Koushinryou II</title>
    <english></english>
    <episodes>0</episodes>
    <type>TV</type>
  </entry>
</anime>"#;

    const SEASON: &str = r#"<html><body>
  <div class="seasonal-anime">
    <a class="link-title" href="https://myanimelist.net/anime/52991/Sousou_no_Frieren">
      Sousou no Frieren
    </a>
    <div class="eps"><span>28 eps</span></div>
  </div>
  <div class="seasonal-anime">
    <a class="link-title" href="https://myanimelist.net/anime/54492/">Kusuriya no Hitorigoto</a>
    <div class="eps"><span>? eps</span></div>
  </div>
</body></html>"#;

    const SEARCH_URL: &str = "https://myanimelist.net/api/anime/search.xml?q=Spice%20and%20Wolf";

    fn handler(transport: &std::sync::Arc<RouteTransport>) -> MyAnimeList {
        let handler = MyAnimeList::new(&transport.context());
        handler
            .set_config(HandlerConfig::from(json!({
                "username": "holo",
                "password": "apple"
            })))
            .unwrap();
        handler
    }

    fn spice_and_wolf() -> Show {
        Show {
            id: "1".to_string(),
            name: "Spice and Wolf".to_string(),
            more_names: Vec::new(),
            show_type: ShowType::Tv,
        }
    }

    fn link(id: &str) -> Link {
        Link {
            site_key: MyAnimeList::KEY.to_string(),
            site_id: id.to_string(),
        }
    }

    #[test]
    fn test_link() {
        let transport = RouteTransport::new();
        assert_eq!(
            handler(&transport).get_link(&link("2966")),
            "https://myanimelist.net/anime/2966/"
        );
    }

    #[tokio::test]
    async fn test_find_show_sends_credentials() {
        let transport = RouteTransport::new();
        transport.route(SEARCH_URL, 200, SEARCH);

        let shows = handler(&transport)
            .find_show("Spice and Wolf", &RequestOptions::default())
            .await;

        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].id, "2966");
        assert_eq!(
            shows[0].more_names,
            vec!["Spice and Wolf", "Spice & Wolf", "Okami to Koshinryo"]
        );
        assert!(shows[1].more_names.is_empty());
        assert_eq!(
            transport.requests()[0].auth,
            Some(BasicAuth::new("holo", "apple"))
        );
    }

    #[tokio::test]
    async fn test_no_results_sentinel() {
        let transport = RouteTransport::new();
        transport.route(SEARCH_URL, 204, "");

        let shows = handler(&transport)
            .find_show("Spice and Wolf", &RequestOptions::default())
            .await;
        assert!(shows.is_empty());
    }

    #[tokio::test]
    async fn test_episode_count() {
        let transport = RouteTransport::new();
        transport.route(SEARCH_URL, 200, SEARCH);
        let handler = handler(&transport);
        let options = RequestOptions::default();

        let show = spice_and_wolf();
        assert_eq!(
            handler
                .get_episode_count(&show, &link("2966"), &options)
                .await,
            Some(13)
        );
        assert_eq!(
            handler
                .get_episode_count(&show, &link("5341"), &options)
                .await,
            None
        );
        assert_eq!(
            handler.get_episode_count(&show, &link("1"), &options).await,
            None
        );

        // one network call, the rest answered from cache
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_seasonal_shows() {
        let transport = RouteTransport::new();
        transport.route(
            "https://myanimelist.net/anime/season/2023/fall",
            200,
            SEASON,
        );

        let shows = handler(&transport)
            .get_seasonal_shows(
                Some(2023),
                Some(SeasonName::Fall),
                &RequestOptions::default(),
            )
            .await;

        assert_eq!(shows.len(), 2);
        assert_eq!(shows[0].show_key, "52991");
        assert_eq!(shows[0].episode_count, Some(28));
        assert_eq!(shows[1].show_key, "54492");
        assert_eq!(shows[1].episode_count, None);
    }

    #[tokio::test]
    async fn test_seasonal_defaults_accepted() {
        let transport = RouteTransport::new();
        let shows = handler(&transport)
            .get_seasonal_shows(None, None, &RequestOptions::default())
            .await;

        assert!(shows.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }
}
