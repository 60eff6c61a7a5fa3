//! Data models for scraped pages and API responses.
//!
//! Each external site's expected output is modelled as a fixed schema so a
//! markup change surfaces as a typed shape error instead of a stray panic.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current unix timestamp with sub-second precision
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// One entry of a movie listing grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieListing {
    pub title: String,
    pub id: String,
    pub url: String,
    pub image: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub year: String,
}

/// One entry of a TV show listing grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TvListing {
    pub title: String,
    pub id: String,
    pub url: String,
    pub image: String,
    pub season: String,
    pub eps: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One anime search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeSearchResult {
    pub title: String,
    pub slug: String,
    pub thumbnail: String,
}

/// Link back to this API's own episode endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeLink {
    pub episode: u32,
    pub url: String,
}

/// Detailed anime information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeDetails {
    pub title: String,
    pub thumbnail: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub summary: String,
    pub genre: String,
    pub release_year: String,
    pub status: String,
    pub other_name: String,
    pub total_episodes: u32,
    pub episodes: Vec<EpisodeLink>,
}

/// A single streaming link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamLink {
    pub link: String,
    pub server: String,
    pub quality: String,
}

/// Streaming links for one episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamLinks {
    pub stream_links: Vec<StreamLink>,
}

/// A titled link extracted from a labelled row (genre, cast member,
/// country, production company)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedLink {
    pub name: String,
    pub url: String,
}

/// Movie watch-page details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    pub title: String,
    pub imdb: String,
    pub trailer: String,
    pub image: String,
    pub description: String,
    pub released: String,
    pub duration: String,
    pub iframe: String,
    pub genres: Vec<NamedLink>,
    pub casts: Vec<NamedLink>,
    pub countries: Vec<NamedLink>,
    pub productions: Vec<NamedLink>,
}

/// One episode within a TV season
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonEpisode {
    pub title: String,
    pub episode: String,
    pub season: String,
    pub href: String,
}

/// One season of a TV show, with its episode list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TvSeason {
    pub title: String,
    pub year: String,
    pub episodes: Vec<SeasonEpisode>,
}

/// TV watch-page details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TvDetail {
    pub title: String,
    pub imdb: String,
    pub trailer: String,
    pub image: String,
    pub description: String,
    pub released: String,
    pub duration: String,
    pub iframe: String,
    pub tmdb_id: String,
    pub genres: Vec<NamedLink>,
    pub casts: Vec<NamedLink>,
    pub countries: Vec<NamedLink>,
    pub productions: Vec<NamedLink>,
    pub seasons: Vec<TvSeason>,
}

/// Paginated listing response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub data: Value,
    pub cached: bool,
    pub page: u32,
}

/// Search response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: Value,
    pub cached: bool,
    pub query: String,
    pub count: usize,
}

/// Details response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsResponse {
    pub data: Value,
    pub cached: bool,
    pub slug: String,
}

/// Watch-page details response envelope, keyed by upstream id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDetailResponse {
    pub data: Value,
    pub cached: bool,
    pub id: String,
}

/// Episode response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeResponse {
    pub data: Value,
    pub cached: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: f64,
    pub cache_size: usize,
    pub version: String,
}

/// Cache clear response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClearResponse {
    pub message: String,
    pub cleared_entries: usize,
    pub timestamp: f64,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_type() {
        let listing = MovieListing {
            title: "Dune".to_string(),
            id: "1234".to_string(),
            url: "https://example.com/movie/dune".to_string(),
            image: "https://example.com/dune.jpg".to_string(),
            duration: "155 min".to_string(),
            kind: "Movie".to_string(),
            year: "2021".to_string(),
        };

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["type"], "Movie");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_stream_links_round_trip() {
        let links = StreamLinks {
            stream_links: vec![StreamLink {
                link: "https://cdn.example.com/ep1.m3u8".to_string(),
                server: "GGA".to_string(),
                quality: "HD".to_string(),
            }],
        };

        let json = serde_json::to_string(&links).unwrap();
        let back: StreamLinks = serde_json::from_str(&json).unwrap();
        assert_eq!(back, links);
    }

    #[test]
    fn test_unix_now_is_recent() {
        let now = unix_now();
        // Well past 2020, well before year 3000
        assert!(now > 1_577_836_800.0);
        assert!(now < 32_503_680_000.0);
    }
}
