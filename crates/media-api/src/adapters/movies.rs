//! Adapters for the movies/TV listing site.
//!
//! The site renders every listing as a grid of `div.flw-item` cards; the
//! same card markup appears on the paginated listing pages and inside the
//! id-anchored sections of the home page.

use super::selectors;
use crate::error::{ApiError, ApiResult};
use crate::upstream::PageClient;
use scraper::{ElementRef, Html};
use serde_json::Value;
use shared::{MovieDetail, MovieListing, NamedLink, SeasonEpisode, TvDetail, TvListing, TvSeason};
use std::sync::Arc;
use tracing::debug;

selectors! {
    ITEM => "div.flw-item";
    ANCHOR => "a";
    TITLE => "h3.film-name";
    POSTER => "img";
    DURATION => "span.fdi-duration";
    KIND => "span.fdi-type";
    META_ITEM => "span.fdi-item";
    EMBED_FRAME => "#iframe-embed";
    TRAILER_FRAME => "#iframe-trailer";
    WATCH_FRAME => "#watch-iframe";
    DETAIL_INFO => "div.detail_page-infor";
    DETAIL_NAME => "h2.heading-name";
    IMDB_BUTTON => "button.btn-imdb";
    DETAIL_DESC => "div.description";
    ROW_LINE => "div.row-line";
    SEASON_ITEM => "div.sl-content ul.slcs-ul li";
    SEASON_ANCHOR => "a.season-item";
    SEASON_YEAR => "span.float-right";
    EPISODE_PANE => "div.slc-eps [id]";
    EPISODE_ENTRY => "a.episode-item";
}

/// Id-anchored content blocks on the site's home page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeSection {
    TrendingMovies,
    TrendingTv,
    PopularMovies,
    PopularTv,
}

impl HomeSection {
    /// Element id anchoring this section in the home page markup
    fn element_id(&self) -> &'static str {
        match self {
            Self::TrendingMovies => "trending-movies",
            Self::TrendingTv => "trending-tv",
            Self::PopularMovies => "popular-movies",
            Self::PopularTv => "popular-tv",
        }
    }

    /// Stable name used in cache keys
    pub fn cache_name(&self) -> &'static str {
        self.element_id()
    }

    /// TV sections carry season/episode metadata instead of duration/year
    fn is_tv(&self) -> bool {
        matches!(self, Self::TrendingTv | Self::PopularTv)
    }
}

/// Movies/TV listing site adapter
pub struct MovieSite {
    client: Arc<PageClient>,
    base_url: String,
}

impl MovieSite {
    /// Create a new adapter for the site at `base_url`
    pub fn new(client: Arc<PageClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Fetch one page of the movie listing
    pub async fn movies(&self, page: u32) -> ApiResult<Vec<MovieListing>> {
        let url = format!("{}/movies?page={}", self.base_url, page);
        let html = self.client.get_html(&url).await?;
        parse_movie_grid(&html, &self.base_url)
    }

    /// Fetch one page of the TV show listing
    pub async fn tv_shows(&self, page: u32) -> ApiResult<Vec<TvListing>> {
        let url = format!("{}/tv-shows?page={}", self.base_url, page);
        let html = self.client.get_html(&url).await?;
        parse_tv_grid(&html, &self.base_url)
    }

    /// Fetch one page of the top-IMDB movie ranking
    pub async fn top_imdb_movies(&self, page: u32) -> ApiResult<Vec<MovieListing>> {
        let url = format!("{}/top-imdb?type=movie&page={}", self.base_url, page);
        let html = self.client.get_html(&url).await?;
        parse_movie_grid(&html, &self.base_url)
    }

    /// Fetch one page of the top-IMDB TV ranking
    pub async fn top_imdb_tv(&self, page: u32) -> ApiResult<Vec<TvListing>> {
        let url = format!("{}/top-imdb?type=tv&page={}", self.base_url, page);
        let html = self.client.get_html(&url).await?;
        parse_tv_grid(&html, &self.base_url)
    }

    /// Fetch one id-anchored section of the home page
    pub async fn home_section(&self, section: HomeSection) -> ApiResult<Value> {
        let url = format!("{}/", self.base_url);
        let html = self.client.get_html(&url).await?;
        parse_home_section(&html, section, &self.base_url)
    }

    /// Fetch the watch page for one movie
    pub async fn movie_detail(&self, id: &str) -> ApiResult<MovieDetail> {
        let url = format!("{}/movie/{}", self.base_url, id);
        let html = self.client.get_html(&url).await?;
        parse_movie_detail(&html)
    }

    /// Fetch the watch page for one TV show, including its seasons
    pub async fn tv_detail(&self, id: &str) -> ApiResult<TvDetail> {
        let url = format!("{}/tv/{}", self.base_url, id);
        let html = self.client.get_html(&url).await?;
        parse_tv_detail(&html)
    }
}

/// Parse a movie listing grid into typed records
pub fn parse_movie_grid(html: &str, base_url: &str) -> ApiResult<Vec<MovieListing>> {
    let document = Html::parse_document(html);
    let items: Vec<MovieListing> = document
        .select(&ITEM)
        .map(|item| parse_movie_item(item, base_url))
        .collect::<ApiResult<_>>()?;

    debug!(count = items.len(), "Parsed movie grid");
    Ok(items)
}

/// Parse a TV show listing grid into typed records
pub fn parse_tv_grid(html: &str, base_url: &str) -> ApiResult<Vec<TvListing>> {
    let document = Html::parse_document(html);
    let items: Vec<TvListing> = document
        .select(&ITEM)
        .map(|item| parse_tv_item(item, base_url))
        .collect::<ApiResult<_>>()?;

    debug!(count = items.len(), "Parsed TV grid");
    Ok(items)
}

/// Parse one home-page section, scoped to its anchoring element id
pub fn parse_home_section(html: &str, section: HomeSection, base_url: &str) -> ApiResult<Value> {
    let document = Html::parse_document(html);

    let id_selector = scraper::Selector::parse(&format!("#{}", section.element_id()))
        .expect("static selector must parse");
    let root = document
        .select(&id_selector)
        .next()
        .ok_or_else(|| ApiError::shape("home page", format!("#{}", section.element_id())))?;

    let value = if section.is_tv() {
        let items: Vec<TvListing> = root
            .select(&ITEM)
            .map(|item| parse_tv_item(item, base_url))
            .collect::<ApiResult<_>>()?;
        serde_json::to_value(items).map_err(anyhow::Error::from)?
    } else {
        let items: Vec<MovieListing> = root
            .select(&ITEM)
            .map(|item| parse_movie_item(item, base_url))
            .collect::<ApiResult<_>>()?;
        serde_json::to_value(items).map_err(anyhow::Error::from)?
    };

    debug!(section = section.cache_name(), "Parsed home section");
    Ok(value)
}

/// Parse a movie watch page into typed details
pub fn parse_movie_detail(html: &str) -> ApiResult<MovieDetail> {
    let document = Html::parse_document(html);
    let detail = watch_fields(&document, "movie watch page")?;
    debug!(title = %detail.title, "Parsed movie watch page");
    Ok(detail)
}

/// Parse a TV watch page into typed details with its season list
pub fn parse_tv_detail(html: &str) -> ApiResult<TvDetail> {
    const PAGE: &str = "tv watch page";
    let document = Html::parse_document(html);

    let common = watch_fields(&document, PAGE)?;
    let tmdb_id = attr(
        first(document.root_element(), &WATCH_FRAME, PAGE, "#watch-iframe")?,
        "data-tmdb-id",
        PAGE,
    )?;
    let seasons = parse_seasons(&document)?;

    debug!(title = %common.title, seasons = seasons.len(), "Parsed TV watch page");
    Ok(TvDetail {
        title: common.title,
        imdb: common.imdb,
        trailer: common.trailer,
        image: common.image,
        description: common.description,
        released: common.released,
        duration: common.duration,
        iframe: common.iframe,
        tmdb_id,
        genres: common.genres,
        casts: common.casts,
        countries: common.countries,
        productions: common.productions,
        seasons,
    })
}

/// Fields shared by the movie and TV watch pages.
///
/// The info block lists its labelled rows in a fixed order: released,
/// genres, casts, duration, countries, productions.
fn watch_fields(document: &Html, page: &'static str) -> ApiResult<MovieDetail> {
    let root = document.root_element();

    let iframe = attr(first(root, &EMBED_FRAME, page, "#iframe-embed")?, "src", page)?;
    let trailer = attr(
        first(root, &TRAILER_FRAME, page, "#iframe-trailer")?,
        "data-src",
        page,
    )?;

    let info = first(root, &DETAIL_INFO, page, "div.detail_page-infor")?;
    let imdb = text(info, &IMDB_BUTTON, page, "button.btn-imdb")?;
    let imdb = imdb.split_whitespace().collect::<String>();
    let imdb = imdb.strip_prefix("IMDB:").unwrap_or(&imdb).to_string();

    let rows: Vec<ElementRef<'_>> = info.select(&ROW_LINE).collect();
    if rows.len() < 6 {
        return Err(ApiError::shape(page, "div.row-line (expected 6 rows)"));
    }

    Ok(MovieDetail {
        title: text(info, &DETAIL_NAME, page, "h2.heading-name")?,
        imdb,
        trailer,
        image: attr(first(info, &POSTER, page, "img")?, "src", page)?,
        description: text(info, &DETAIL_DESC, page, "div.description")?,
        released: row_value(rows[0]),
        duration: row_value(rows[3]),
        iframe,
        genres: row_links(rows[1], page)?,
        casts: row_links(rows[2], page)?,
        countries: row_links(rows[4], page)?,
        productions: row_links(rows[5], page)?,
    })
}

/// Each season entry anchors its episode list through the fragment of its
/// `a.season-item` href, which names an id inside `div.slc-eps`.
fn parse_seasons(document: &Html) -> ApiResult<Vec<TvSeason>> {
    const PAGE: &str = "tv watch page";
    let mut seasons = Vec::new();

    for item in document.select(&SEASON_ITEM) {
        let anchor = first(item, &SEASON_ANCHOR, PAGE, "a.season-item")?;
        let title = attr(anchor, "title", PAGE)?;
        let year = item
            .select(&SEASON_YEAR)
            .next()
            .map(element_text)
            .ok_or_else(|| ApiError::shape(PAGE, "li span.float-right"))?;
        let pane_id = attr(anchor, "href", PAGE)?;
        let pane_id = pane_id.trim_start_matches('#');

        let pane = document
            .select(&EPISODE_PANE)
            .find(|el| el.value().attr("id") == Some(pane_id))
            .ok_or_else(|| ApiError::shape(PAGE, format!("div.slc-eps #{pane_id}")))?;

        let mut episodes = Vec::new();
        for entry in pane.select(&EPISODE_ENTRY) {
            episodes.push(SeasonEpisode {
                title: attr(entry, "title", PAGE)?,
                episode: attr(entry, "data-number", PAGE)?,
                season: attr(entry, "data-s-number", PAGE)?,
                href: attr(entry, "href", PAGE)?,
            });
        }

        seasons.push(TvSeason { title, year, episodes });
    }

    Ok(seasons)
}

/// Value of a `Label: value` row, with the label stripped
fn row_value(row: ElementRef<'_>) -> String {
    let full = element_text(row);
    match full.split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => full,
    }
}

fn row_links(row: ElementRef<'_>, page: &'static str) -> ApiResult<Vec<NamedLink>> {
    let mut links = Vec::new();
    for anchor in row.select(&ANCHOR) {
        let url = attr(anchor, "href", page)?;
        let name = anchor
            .value()
            .attr("title")
            .map(str::to_string)
            .unwrap_or_else(|| element_text(anchor));
        links.push(NamedLink { name, url });
    }
    Ok(links)
}

fn parse_movie_item(item: ElementRef<'_>, base_url: &str) -> ApiResult<MovieListing> {
    const PAGE: &str = "movie listing";

    let anchor = first(item, &ANCHOR, PAGE, "a")?;
    Ok(MovieListing {
        title: text(item, &TITLE, PAGE, "h3.film-name")?,
        id: attr(anchor, "data-id", PAGE)?,
        url: absolute(base_url, &attr(anchor, "href", PAGE)?),
        image: attr(first(item, &POSTER, PAGE, "img")?, "data-src", PAGE)?,
        duration: text(item, &DURATION, PAGE, "span.fdi-duration")?,
        kind: text(item, &KIND, PAGE, "span.fdi-type")?,
        year: text(item, &META_ITEM, PAGE, "span.fdi-item")?,
    })
}

fn parse_tv_item(item: ElementRef<'_>, base_url: &str) -> ApiResult<TvListing> {
    const PAGE: &str = "tv listing";

    let anchor = first(item, &ANCHOR, PAGE, "a")?;

    // TV cards carry two fdi-item spans: seasons then episodes
    let mut meta = item.select(&META_ITEM);
    let season = meta
        .next()
        .map(element_text)
        .ok_or_else(|| ApiError::shape(PAGE, "span.fdi-item (season)"))?;
    let eps = meta
        .next()
        .map(element_text)
        .ok_or_else(|| ApiError::shape(PAGE, "span.fdi-item (episodes)"))?;

    Ok(TvListing {
        title: text(item, &TITLE, PAGE, "h3.film-name")?,
        id: attr(anchor, "data-id", PAGE)?,
        url: absolute(base_url, &attr(anchor, "href", PAGE)?),
        image: attr(first(item, &POSTER, PAGE, "img")?, "data-src", PAGE)?,
        season,
        eps,
        kind: text(item, &KIND, PAGE, "span.fdi-type")?,
    })
}

fn first<'a>(
    scope: ElementRef<'a>,
    selector: &scraper::Selector,
    page: &'static str,
    name: &str,
) -> ApiResult<ElementRef<'a>> {
    scope
        .select(selector)
        .next()
        .ok_or_else(|| ApiError::shape(page, name))
}

fn text(
    scope: ElementRef<'_>,
    selector: &scraper::Selector,
    page: &'static str,
    name: &str,
) -> ApiResult<String> {
    Ok(element_text(first(scope, selector, page, name)?))
}

fn attr(element: ElementRef<'_>, name: &str, page: &'static str) -> ApiResult<String> {
    element
        .value()
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| ApiError::shape(page, format!("[{name}]")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn absolute(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{base_url}{href}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://movies.example";

    fn movie_card(title: &str, id: &str) -> String {
        format!(
            r#"<div class="flw-item">
                 <a href="/movie/{id}" data-id="{id}"></a>
                 <img data-src="https://img.example/{id}.jpg">
                 <h3 class="film-name">{title}</h3>
                 <span class="fdi-item">2021</span>
                 <span class="fdi-duration">120 min</span>
                 <span class="fdi-type">Movie</span>
               </div>"#
        )
    }

    fn tv_card(title: &str, id: &str) -> String {
        format!(
            r#"<div class="flw-item">
                 <a href="/tv/{id}" data-id="{id}"></a>
                 <img data-src="https://img.example/{id}.jpg">
                 <h3 class="film-name">{title}</h3>
                 <span class="fdi-item">SS 3</span>
                 <span class="fdi-item">EPS 24</span>
                 <span class="fdi-type">TV</span>
               </div>"#
        )
    }

    #[test]
    fn test_parse_movie_grid() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            movie_card("Dune", "1234"),
            movie_card("Arrival", "5678")
        );

        let items = parse_movie_grid(&html, BASE).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Dune");
        assert_eq!(items[0].id, "1234");
        assert_eq!(items[0].url, "https://movies.example/movie/1234");
        assert_eq!(items[0].image, "https://img.example/1234.jpg");
        assert_eq!(items[0].duration, "120 min");
        assert_eq!(items[0].kind, "Movie");
        assert_eq!(items[0].year, "2021");
        assert_eq!(items[1].title, "Arrival");
    }

    #[test]
    fn test_parse_tv_grid() {
        let html = format!("<html><body>{}</body></html>", tv_card("Dark", "42"));

        let items = parse_tv_grid(&html, BASE).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Dark");
        assert_eq!(items[0].season, "SS 3");
        assert_eq!(items[0].eps, "EPS 24");
        assert_eq!(items[0].kind, "TV");
    }

    #[test]
    fn test_empty_grid_is_ok_not_an_error() {
        let items = parse_movie_grid("<html><body></body></html>", BASE).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_missing_title_is_a_shape_error() {
        let html = r#"<div class="flw-item">
                        <a href="/movie/1" data-id="1"></a>
                        <img data-src="x.jpg">
                      </div>"#;

        let err = parse_movie_grid(html, BASE).unwrap_err();
        assert!(matches!(err, ApiError::Shape { .. }));
    }

    #[test]
    fn test_missing_data_id_is_a_shape_error() {
        let html = r#"<div class="flw-item">
                        <a href="/movie/1"></a>
                        <img data-src="x.jpg">
                        <h3 class="film-name">X</h3>
                        <span class="fdi-item">2020</span>
                        <span class="fdi-duration">90 min</span>
                        <span class="fdi-type">Movie</span>
                      </div>"#;

        let err = parse_movie_grid(html, BASE).unwrap_err();
        assert!(matches!(err, ApiError::Shape { .. }));
    }

    #[test]
    fn test_parse_home_section_scopes_to_element_id() {
        let html = format!(
            r#"<html><body>
                 <div id="trending-movies">{}</div>
                 <div id="trending-tv">{}</div>
               </body></html>"#,
            movie_card("Dune", "1"),
            tv_card("Dark", "2")
        );

        let movies = parse_home_section(&html, HomeSection::TrendingMovies, BASE).unwrap();
        let movies = movies.as_array().unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0]["title"], "Dune");

        let tv = parse_home_section(&html, HomeSection::TrendingTv, BASE).unwrap();
        let tv = tv.as_array().unwrap();
        assert_eq!(tv.len(), 1);
        assert_eq!(tv[0]["title"], "Dark");
        assert_eq!(tv[0]["season"], "SS 3");
    }

    #[test]
    fn test_missing_home_section_is_a_shape_error() {
        let err =
            parse_home_section("<html><body></body></html>", HomeSection::PopularTv, BASE)
                .unwrap_err();
        assert!(matches!(err, ApiError::Shape { .. }));
    }

    fn watch_info_block() -> &'static str {
        r#"<iframe id="iframe-embed" src="https://embed.example/v/1234"></iframe>
           <iframe id="iframe-trailer" data-src="https://trailer.example/t/1234"></iframe>
           <div class="detail_page-infor">
             <img src="https://img.example/1234-poster.jpg">
             <h2 class="heading-name">Dune</h2>
             <button class="btn-imdb">IMDB: 8.1</button>
             <div class="description"> A desert planet holds the key. </div>
             <div class="row-line"><span>Released:</span> 2021-10-22</div>
             <div class="row-line">
               <a href="/genre/sci-fi" title="Sci-Fi"></a>
               <a href="/genre/adventure" title="Adventure"></a>
             </div>
             <div class="row-line"><a href="/cast/chalamet" title="Timothee Chalamet"></a></div>
             <div class="row-line"><span>Duration:</span> 155 min</div>
             <div class="row-line"><a href="/country/us" title="United States"></a></div>
             <div class="row-line"><a href="/production/legendary" title="Legendary"></a></div>
           </div>"#
    }

    #[test]
    fn test_parse_movie_detail() {
        let html = format!("<html><body>{}</body></html>", watch_info_block());

        let detail = parse_movie_detail(&html).unwrap();
        assert_eq!(detail.title, "Dune");
        assert_eq!(detail.imdb, "8.1");
        assert_eq!(detail.iframe, "https://embed.example/v/1234");
        assert_eq!(detail.trailer, "https://trailer.example/t/1234");
        assert_eq!(detail.image, "https://img.example/1234-poster.jpg");
        assert_eq!(detail.description, "A desert planet holds the key.");
        assert_eq!(detail.released, "2021-10-22");
        assert_eq!(detail.duration, "155 min");
        assert_eq!(detail.genres.len(), 2);
        assert_eq!(detail.genres[0].name, "Sci-Fi");
        assert_eq!(detail.genres[0].url, "/genre/sci-fi");
        assert_eq!(detail.casts.len(), 1);
        assert_eq!(detail.casts[0].name, "Timothee Chalamet");
        assert_eq!(detail.countries[0].name, "United States");
        assert_eq!(detail.productions[0].name, "Legendary");
    }

    #[test]
    fn test_parse_tv_detail_with_seasons() {
        let html = format!(
            r##"<html><body>
                 {}
                 <div id="watch-iframe" data-tmdb-id="1399"></div>
                 <div class="sl-content">
                   <ul class="slcs-ul">
                     <li>
                       <a class="season-item" title="Season 1" href="#ss-1"></a>
                       <span class="float-right">2011</span>
                     </li>
                     <li>
                       <a class="season-item" title="Season 2" href="#ss-2"></a>
                       <span class="float-right">2012</span>
                     </li>
                   </ul>
                   <div class="slc-eps">
                     <div id="ss-1"><ul>
                       <li><a class="episode-item" title="Winter Is Coming"
                              data-number="1" data-s-number="1" href="/tv/got/1-1"></a></li>
                       <li><a class="episode-item" title="The Kingsroad"
                              data-number="2" data-s-number="1" href="/tv/got/1-2"></a></li>
                     </ul></div>
                     <div id="ss-2"><ul>
                       <li><a class="episode-item" title="The North Remembers"
                              data-number="1" data-s-number="2" href="/tv/got/2-1"></a></li>
                     </ul></div>
                   </div>
                 </div>
               </body></html>"##,
            watch_info_block()
        );

        let detail = parse_tv_detail(&html).unwrap();
        assert_eq!(detail.title, "Dune");
        assert_eq!(detail.tmdb_id, "1399");
        assert_eq!(detail.seasons.len(), 2);

        let s1 = &detail.seasons[0];
        assert_eq!(s1.title, "Season 1");
        assert_eq!(s1.year, "2011");
        assert_eq!(s1.episodes.len(), 2);
        assert_eq!(s1.episodes[0].title, "Winter Is Coming");
        assert_eq!(s1.episodes[0].episode, "1");
        assert_eq!(s1.episodes[0].season, "1");
        assert_eq!(s1.episodes[0].href, "/tv/got/1-1");

        let s2 = &detail.seasons[1];
        assert_eq!(s2.title, "Season 2");
        assert_eq!(s2.episodes.len(), 1);
        assert_eq!(s2.episodes[0].title, "The North Remembers");
    }

    #[test]
    fn test_watch_page_with_missing_rows_is_a_shape_error() {
        // Info block present but only one labelled row
        let html = r#"<html><body>
                        <iframe id="iframe-embed" src="https://embed.example/v/1"></iframe>
                        <iframe id="iframe-trailer" data-src="https://trailer.example/t/1"></iframe>
                        <div class="detail_page-infor">
                          <img src="p.jpg">
                          <h2 class="heading-name">X</h2>
                          <button class="btn-imdb">IMDB: 5.0</button>
                          <div class="description">d</div>
                          <div class="row-line">Released: 2020</div>
                        </div>
                      </body></html>"#;

        let err = parse_movie_detail(html).unwrap_err();
        assert!(matches!(err, ApiError::Shape { .. }));
    }

    #[test]
    fn test_tv_detail_without_tmdb_frame_is_a_shape_error() {
        let html = format!("<html><body>{}</body></html>", watch_info_block());
        let err = parse_tv_detail(&html).unwrap_err();
        assert!(matches!(err, ApiError::Shape { .. }));
    }
}
