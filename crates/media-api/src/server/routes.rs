//! Request routing and handlers.
//!
//! Every scraping route follows the same read-through pattern: validate
//! parameters, derive a cache key, try the cache, and on a miss invoke the
//! adapter, store the result, and respond with `cached: false`.

use super::AppState;
use crate::adapters::HomeSection;
use crate::cache::cache_key;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use shared::{
    unix_now, CacheClearResponse, DetailsResponse, EpisodeResponse, HealthResponse, ListResponse,
    MediaDetailResponse, SearchResponse,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Build the application router. CORS is open to all origins.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/movies/:page", get(movies))
        .route("/api/tv-shows/:page", get(tv_shows))
        .route("/api/top-imdb/movies/:page", get(top_imdb_movies))
        .route("/api/top-imdb/tv-shows/:page", get(top_imdb_tv))
        .route("/api/movie/:movie_id", get(movie_detail))
        .route("/api/tv/:tv_id", get(tv_detail))
        .route("/api/trending_movies", get(trending_movies))
        .route("/api/trending_tv", get(trending_tv))
        .route("/api/popular_movies", get(popular_movies))
        .route("/api/popular_tv", get(popular_tv))
        .route("/search", get(search))
        .route("/details", get(details))
        .route("/episode", get(episode))
        .route("/api/health", get(health))
        .route("/api/cache/clear", get(clear_cache))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> &'static str {
    "Movies & Anime API"
}

fn validate_page(page: u32) -> ApiResult<u32> {
    if page < 1 {
        return Err(ApiError::Validation("page must be >= 1".to_string()));
    }
    Ok(page)
}

fn validate_id(raw: &str) -> ApiResult<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ApiError::Validation("id must not be empty".to_string()));
    }
    Ok(id.to_string())
}

fn to_value<T: serde::Serialize>(items: T) -> ApiResult<Value> {
    Ok(serde_json::to_value(items).map_err(anyhow::Error::from)?)
}

async fn movies(
    State(state): State<Arc<AppState>>,
    Path(page): Path<u32>,
) -> ApiResult<Json<ListResponse>> {
    let page = validate_page(page)?;
    let key = cache_key("movies", &[&format!("page={page}")]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(ListResponse { data, cached: true, page }));
    }

    let items = state.movies.movies(page).await?;
    if items.is_empty() {
        return Err(ApiError::NotFound(format!("no movies on page {page}")));
    }

    let data = to_value(items)?;
    state.cache.set(&key, data.clone());
    Ok(Json(ListResponse { data, cached: false, page }))
}

async fn tv_shows(
    State(state): State<Arc<AppState>>,
    Path(page): Path<u32>,
) -> ApiResult<Json<ListResponse>> {
    let page = validate_page(page)?;
    let key = cache_key("tv-shows", &[&format!("page={page}")]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(ListResponse { data, cached: true, page }));
    }

    let items = state.movies.tv_shows(page).await?;
    if items.is_empty() {
        return Err(ApiError::NotFound(format!("no TV shows on page {page}")));
    }

    let data = to_value(items)?;
    state.cache.set(&key, data.clone());
    Ok(Json(ListResponse { data, cached: false, page }))
}

async fn top_imdb_movies(
    State(state): State<Arc<AppState>>,
    Path(page): Path<u32>,
) -> ApiResult<Json<ListResponse>> {
    let page = validate_page(page)?;
    let key = cache_key("top-imdb-movies", &[&format!("page={page}")]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(ListResponse { data, cached: true, page }));
    }

    let items = state.movies.top_imdb_movies(page).await?;
    if items.is_empty() {
        return Err(ApiError::NotFound(format!("no top-IMDB movies on page {page}")));
    }

    let data = to_value(items)?;
    state.cache.set(&key, data.clone());
    Ok(Json(ListResponse { data, cached: false, page }))
}

async fn top_imdb_tv(
    State(state): State<Arc<AppState>>,
    Path(page): Path<u32>,
) -> ApiResult<Json<ListResponse>> {
    let page = validate_page(page)?;
    let key = cache_key("top-imdb-tv", &[&format!("page={page}")]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(ListResponse { data, cached: true, page }));
    }

    let items = state.movies.top_imdb_tv(page).await?;
    if items.is_empty() {
        return Err(ApiError::NotFound(format!("no top-IMDB TV shows on page {page}")));
    }

    let data = to_value(items)?;
    state.cache.set(&key, data.clone());
    Ok(Json(ListResponse { data, cached: false, page }))
}

async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> ApiResult<Json<MediaDetailResponse>> {
    let id = validate_id(&movie_id)?;
    let key = cache_key("movie", &[&id]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(MediaDetailResponse { data, cached: true, id }));
    }

    let detail = state.movies.movie_detail(&id).await?;
    let data = to_value(detail)?;
    state.cache.set(&key, data.clone());
    Ok(Json(MediaDetailResponse { data, cached: false, id }))
}

async fn tv_detail(
    State(state): State<Arc<AppState>>,
    Path(tv_id): Path<String>,
) -> ApiResult<Json<MediaDetailResponse>> {
    let id = validate_id(&tv_id)?;
    let key = cache_key("tv", &[&id]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(MediaDetailResponse { data, cached: true, id }));
    }

    let detail = state.movies.tv_detail(&id).await?;
    let data = to_value(detail)?;
    state.cache.set(&key, data.clone());
    Ok(Json(MediaDetailResponse { data, cached: false, id }))
}

async fn trending_movies(state: State<Arc<AppState>>) -> ApiResult<Json<ListResponse>> {
    home_section(state, HomeSection::TrendingMovies).await
}

async fn trending_tv(state: State<Arc<AppState>>) -> ApiResult<Json<ListResponse>> {
    home_section(state, HomeSection::TrendingTv).await
}

async fn popular_movies(state: State<Arc<AppState>>) -> ApiResult<Json<ListResponse>> {
    home_section(state, HomeSection::PopularMovies).await
}

async fn popular_tv(state: State<Arc<AppState>>) -> ApiResult<Json<ListResponse>> {
    home_section(state, HomeSection::PopularTv).await
}

/// The home-page sections share one adapter; only the anchoring element
/// id differs. They are unpaginated, reported as page 1.
async fn home_section(
    State(state): State<Arc<AppState>>,
    section: HomeSection,
) -> ApiResult<Json<ListResponse>> {
    let key = cache_key("home", &[section.cache_name()]);

    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(ListResponse { data, cached: true, page: 1 }));
    }

    let data = state.movies.home_section(section).await?;
    if data.as_array().is_some_and(|a| a.is_empty()) {
        return Err(ApiError::NotFound(format!(
            "no entries in section {}",
            section.cache_name()
        )));
    }

    state.cache.set(&key, data.clone());
    Ok(Json(ListResponse { data, cached: false, page: 1 }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    name: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params.name.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }

    let key = cache_key("search", &[&query]);
    if let Some(data) = state.cache.get(&key) {
        let count = data.as_array().map_or(0, Vec::len);
        return Ok(Json(SearchResponse { data, cached: true, query, count }));
    }

    let results = state.anime.search(&query).await?;
    if results.is_empty() {
        return Err(ApiError::NotFound(format!("no results for '{query}'")));
    }

    let count = results.len();
    let data = to_value(results)?;
    state.cache.set(&key, data.clone());
    Ok(Json(SearchResponse { data, cached: false, query, count }))
}

#[derive(Debug, Deserialize)]
struct DetailsParams {
    slug: String,
}

async fn details(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DetailsParams>,
) -> ApiResult<Json<DetailsResponse>> {
    let slug = params.slug.trim().to_string();
    if slug.is_empty() {
        return Err(ApiError::Validation("slug must not be empty".to_string()));
    }

    let key = cache_key("details", &[&slug]);
    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(DetailsResponse { data, cached: true, slug }));
    }

    let details = state
        .anime
        .details(&slug, &state.config.server.public_url)
        .await?;

    let data = to_value(details)?;
    state.cache.set(&key, data.clone());
    Ok(Json(DetailsResponse { data, cached: false, slug }))
}

#[derive(Debug, Deserialize)]
struct EpisodeParams {
    slug: String,
    ep: u32,
}

async fn episode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EpisodeParams>,
) -> ApiResult<Json<EpisodeResponse>> {
    let slug = params.slug.trim().to_string();
    if slug.is_empty() {
        return Err(ApiError::Validation("slug must not be empty".to_string()));
    }
    if params.ep < 1 {
        return Err(ApiError::Validation("ep must be >= 1".to_string()));
    }

    let key = cache_key("episode", &[&slug, &params.ep.to_string()]);
    if let Some(data) = state.cache.get(&key) {
        return Ok(Json(EpisodeResponse { data, cached: true }));
    }

    let links = state.anime.episode(&slug, params.ep).await?;

    let data = to_value(links)?;
    state.cache.set(&key, data.clone());
    Ok(Json(EpisodeResponse { data, cached: false }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: unix_now(),
        cache_size: state.cache.size(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<CacheClearResponse> {
    let cleared = state.cache.clear();
    info!(cleared = cleared, "Cache cleared via API");

    Json(CacheClearResponse {
        message: "cache cleared".to_string(),
        cleared_entries: cleared,
        timestamp: unix_now(),
    })
}
