//! Adapters for the anime listing site.
//!
//! Covers search, series details (with generated per-episode links back to
//! this API), and per-episode stream link extraction, including resolution
//! of the site's ajax endpoint into a direct stream URL.

use super::selectors;
use crate::error::{ApiError, ApiResult};
use crate::upstream::PageClient;
use scraper::{ElementRef, Html};
use shared::{AnimeDetails, AnimeSearchResult, EpisodeLink, StreamLink, StreamLinks};
use std::sync::Arc;
use tracing::debug;

selectors! {
    SEARCH_ITEM => "div.last_episodes li";
    SEARCH_ANCHOR => "a";
    SEARCH_THUMB => "img";
    INFO_BODY => "div.anime_info_body_bg";
    INFO_TITLE => "h1";
    INFO_THUMB => "img";
    INFO_FIELD => "p.type";
    EPISODE_PAGE => "ul#episode_page li a";
    SERVER_ITEM => "div.anime_muti_link li";
    SERVER_ANCHOR => "a[data-video]";
}

/// Anime listing site adapter
pub struct AnimeSite {
    client: Arc<PageClient>,
    base_url: String,
}

impl AnimeSite {
    /// Create a new adapter for the site at `base_url`
    pub fn new(client: Arc<PageClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Search the site for series matching `query`
    pub async fn search(&self, query: &str) -> ApiResult<Vec<AnimeSearchResult>> {
        let url = format!("{}/search.html?keyword={}", self.base_url, query);
        let html = self.client.get_html(&url).await?;
        parse_search(&html)
    }

    /// Fetch series details for `slug`.
    ///
    /// `public_url` is this API's own base URL; the generated episode
    /// links point back at the `/episode` endpoint.
    pub async fn details(&self, slug: &str, public_url: &str) -> ApiResult<AnimeDetails> {
        let url = format!("{}/category/{}", self.base_url, slug);
        let html = self.client.get_html(&url).await?;
        parse_details(&html, slug, public_url)
    }

    /// Fetch streaming links for one episode.
    ///
    /// The first listed server is resolved through the site's ajax
    /// endpoint into a direct stream URL; the rest are returned as
    /// scheme-normalized embed links.
    pub async fn episode(&self, slug: &str, episode: u32) -> ApiResult<StreamLinks> {
        let url = format!("{}/{}-episode-{}", self.base_url, slug, episode);
        let html = self.client.get_html(&url).await?;
        let servers = parse_episode_servers(&html)?;

        let Some((_, primary)) = servers.first() else {
            return Err(ApiError::NotFound(format!(
                "no stream links for {slug} episode {episode}"
            )));
        };

        let mut stream_links = Vec::with_capacity(servers.len());

        let payload = self.client.get_json(&ajax_url(primary)).await?;
        let file = payload["source"][0]["file"]
            .as_str()
            .ok_or_else(|| ApiError::shape("episode ajax", "source[0].file"))?;
        stream_links.push(StreamLink {
            link: file.to_string(),
            server: "GGA".to_string(),
            quality: "HD".to_string(),
        });

        for (server, video) in &servers[1..] {
            stream_links.push(StreamLink {
                link: ensure_https(video),
                server: server.clone(),
                quality: "HD".to_string(),
            });
        }

        debug!(slug = slug, episode = episode, servers = stream_links.len(), "Resolved episode links");
        Ok(StreamLinks { stream_links })
    }
}

/// Parse a search result page
pub fn parse_search(html: &str) -> ApiResult<Vec<AnimeSearchResult>> {
    const PAGE: &str = "anime search";

    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for item in document.select(&SEARCH_ITEM) {
        let anchor = item
            .select(&SEARCH_ANCHOR)
            .next()
            .ok_or_else(|| ApiError::shape(PAGE, "li a"))?;
        let title = anchor
            .value()
            .attr("title")
            .ok_or_else(|| ApiError::shape(PAGE, "a[title]"))?
            .to_string();
        let href = anchor
            .value()
            .attr("href")
            .ok_or_else(|| ApiError::shape(PAGE, "a[href]"))?;
        let slug = href.rsplit('/').next().unwrap_or(href).to_string();
        let thumbnail = item
            .select(&SEARCH_THUMB)
            .next()
            .and_then(|img| img.value().attr("src"))
            .ok_or_else(|| ApiError::shape(PAGE, "img[src]"))?
            .to_string();

        results.push(AnimeSearchResult {
            title,
            slug,
            thumbnail,
        });
    }

    debug!(count = results.len(), "Parsed search results");
    Ok(results)
}

/// Parse a series details page
pub fn parse_details(html: &str, slug: &str, public_url: &str) -> ApiResult<AnimeDetails> {
    const PAGE: &str = "anime details";

    let document = Html::parse_document(html);

    let body = document
        .select(&INFO_BODY)
        .next()
        .ok_or_else(|| ApiError::shape(PAGE, "div.anime_info_body_bg"))?;

    let title = body
        .select(&INFO_TITLE)
        .next()
        .map(element_text)
        .ok_or_else(|| ApiError::shape(PAGE, "h1"))?;
    let thumbnail = body
        .select(&INFO_THUMB)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or_else(|| ApiError::shape(PAGE, "img[src]"))?
        .to_string();

    // The labelled rows appear in a fixed order:
    // Type, Plot Summary, Genre, Released, Status, Other name
    let fields: Vec<String> = body.select(&INFO_FIELD).map(|p| field_value(p)).collect();
    if fields.len() < 6 {
        return Err(ApiError::shape(PAGE, "p.type (expected 6 labelled rows)"));
    }

    // The last pagination stop carries the total episode count
    let total_episodes = document
        .select(&EPISODE_PAGE)
        .last()
        .and_then(|a| a.value().attr("ep_end"))
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| ApiError::shape(PAGE, "ul#episode_page li a[ep_end]"))?;

    let public_url = public_url.trim_end_matches('/');
    let episodes = (1..=total_episodes)
        .map(|n| EpisodeLink {
            episode: n,
            url: format!("{public_url}/episode?slug={slug}&ep={n}"),
        })
        .collect();

    Ok(AnimeDetails {
        title,
        thumbnail,
        kind: fields[0].clone(),
        summary: fields[1].clone(),
        genre: fields[2].clone(),
        release_year: fields[3].clone(),
        status: fields[4].clone(),
        other_name: fields[5].clone(),
        total_episodes,
        episodes,
    })
}

/// Parse the server list of an episode page into (server, data-video) pairs
pub fn parse_episode_servers(html: &str) -> ApiResult<Vec<(String, String)>> {
    const PAGE: &str = "anime episode";

    let document = Html::parse_document(html);
    let mut servers = Vec::new();

    for item in document.select(&SERVER_ITEM) {
        let Some(anchor) = item.select(&SERVER_ANCHOR).next() else {
            // Non-server list entries (e.g. the download link) have no
            // data-video attribute
            continue;
        };
        let video = anchor
            .value()
            .attr("data-video")
            .ok_or_else(|| ApiError::shape(PAGE, "a[data-video]"))?
            .to_string();
        let server = item
            .value()
            .classes()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| element_text(anchor));

        servers.push((server, video));
    }

    debug!(count = servers.len(), "Parsed episode servers");
    Ok(servers)
}

/// Rewrite an embed player URL into the site's ajax endpoint, which
/// returns the direct stream location as JSON
fn ajax_url(data_video: &str) -> String {
    ensure_https(data_video)
        .replace("streaming.php", "ajax.php")
        .replace("load.php", "ajax.php")
}

fn ensure_https(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Strip the `Label:` prefix from a details row and collapse whitespace
fn field_value(element: ElementRef<'_>) -> String {
    let raw = element.text().collect::<String>();
    let raw = raw.replace('\n', " ");
    let value = match raw.split_once(':') {
        Some((_, rest)) => rest,
        None => raw.as_str(),
    };
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <div class="last_episodes">
            <ul class="items">
              <li>
                <a href="/category/naruto" title="Naruto"></a>
                <img src="https://img.example/naruto.png">
              </li>
              <li>
                <a href="/category/bleach" title="Bleach"></a>
                <img src="https://img.example/bleach.png">
              </li>
            </ul>
          </div>
        </body></html>"#;

    const DETAILS_PAGE: &str = r#"
        <html><body>
          <div class="anime_info_body_bg">
            <img src="https://img.example/naruto.png">
            <h1>Naruto</h1>
            <p class="type"><span>Type: </span>TV Series</p>
            <p class="type"><span>Plot Summary: </span>A ninja story.</p>
            <p class="type"><span>Genre: </span>Action, Adventure</p>
            <p class="type"><span>Released: </span>2002</p>
            <p class="type"><span>Status: </span>Completed</p>
            <p class="type"><span>Other name: </span>NARUTO</p>
          </div>
          <ul id="episode_page">
            <li><a ep_start="1" ep_end="100">1-100</a></li>
            <li><a ep_start="101" ep_end="220">101-220</a></li>
          </ul>
        </body></html>"#;

    const EPISODE_PAGE_HTML: &str = r##"
        <html><body>
          <div class="anime_muti_link">
            <ul>
              <li class="vidcdn">
                <a href="#" data-video="//gogo-play.example/streaming.php?id=abc">Vidstreaming</a>
              </li>
              <li class="doodstream">
                <a href="#" data-video="https://dood.example/e/xyz">Doodstream</a>
              </li>
            </ul>
          </div>
        </body></html>"##;

    #[test]
    fn test_parse_search() {
        let results = parse_search(SEARCH_PAGE).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Naruto");
        assert_eq!(results[0].slug, "naruto");
        assert_eq!(results[0].thumbnail, "https://img.example/naruto.png");
        assert_eq!(results[1].slug, "bleach");
    }

    #[test]
    fn test_parse_search_no_results() {
        let results = parse_search("<html><body></body></html>").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_parse_details() {
        let details = parse_details(DETAILS_PAGE, "naruto", "http://127.0.0.1:8080/").unwrap();
        assert_eq!(details.title, "Naruto");
        assert_eq!(details.kind, "TV Series");
        assert_eq!(details.summary, "A ninja story.");
        assert_eq!(details.genre, "Action, Adventure");
        assert_eq!(details.release_year, "2002");
        assert_eq!(details.status, "Completed");
        assert_eq!(details.other_name, "NARUTO");
        assert_eq!(details.total_episodes, 220);
        assert_eq!(details.episodes.len(), 220);
        assert_eq!(details.episodes[0].episode, 1);
        assert_eq!(
            details.episodes[0].url,
            "http://127.0.0.1:8080/episode?slug=naruto&ep=1"
        );
        // Final episode is included
        assert_eq!(details.episodes[219].episode, 220);
    }

    #[test]
    fn test_parse_details_missing_info_body_is_shape_error() {
        let err = parse_details("<html><body></body></html>", "x", "http://api").unwrap_err();
        assert!(matches!(err, ApiError::Shape { .. }));
    }

    #[test]
    fn test_parse_episode_servers() {
        let servers = parse_episode_servers(EPISODE_PAGE_HTML).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].0, "vidcdn");
        assert_eq!(servers[0].1, "//gogo-play.example/streaming.php?id=abc");
        assert_eq!(servers[1].0, "doodstream");
    }

    #[test]
    fn test_parse_episode_servers_empty_page() {
        let servers = parse_episode_servers("<html><body></body></html>").unwrap();
        assert!(servers.is_empty());
    }

    #[test]
    fn test_ajax_url_rewrites_embed_player() {
        assert_eq!(
            ajax_url("//gogo-play.example/streaming.php?id=abc"),
            "https://gogo-play.example/ajax.php?id=abc"
        );
        assert_eq!(
            ajax_url("https://goload.example/load.php?id=abc"),
            "https://goload.example/ajax.php?id=abc"
        );
    }

    #[test]
    fn test_ensure_https() {
        assert_eq!(ensure_https("//host/x"), "https://host/x");
        assert_eq!(ensure_https("https://host/x"), "https://host/x");
        assert_eq!(ensure_https("http://host/x"), "http://host/x");
        assert_eq!(ensure_https("host/x"), "https://host/x");
    }
}
