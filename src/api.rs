use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::cache::{cache_key, ResponseCache};
use crate::deezer::{DeezerClient, PreviewSource};
use crate::error::{Error, Result};
use crate::lastfm::{LastfmClient, RankSource};
use crate::rate_limit::RateLimiter;

const DEFAULT_PERIOD: &str = "1month";
const DEFAULT_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct AppState {
    /// Absent when no Last.fm API key is configured (demo mode).
    pub lastfm: Option<Arc<LastfmClient>>,
    pub deezer: Arc<DeezerClient>,
    pub rate_limiter: Arc<RateLimiter>,
    pub cache: Arc<ResponseCache>,
}

#[derive(Deserialize)]
pub struct TopTracksQuery {
    pub username: String,
    pub period: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct TopTracksRangeQuery {
    pub username: String,
    pub from: i64,
    pub to: i64,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct PreviewSearchQuery {
    pub artist: String,
    pub title: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/lastfm/top-tracks", get(top_tracks))
        .route("/api/lastfm/top-tracks-range", get(top_tracks_range))
        .route("/api/deezer/search", get(search_preview))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Rate-limit key for the requesting client: proxy headers first, then the
/// socket peer address.
fn client_key(headers: &HeaderMap, peer: Option<&SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return first.to_string();
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

// GET /api/health - Liveness and upstream credential check
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "lastfm_key": state.lastfm.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// GET /api/lastfm/top-tracks - Ranked tracks for a named period
async fn top_tracks(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<TopTracksQuery>,
) -> Result<Json<Value>> {
    state
        .rate_limiter
        .check(&client_key(&headers, Some(&peer)))?;
    let lastfm = state.lastfm.as_ref().ok_or(Error::ConfigurationMissing)?;

    let period = params.period.unwrap_or_else(|| DEFAULT_PERIOD.to_string());
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let limit_param = limit.to_string();
    let key = cache_key(
        "lastfm-top-tracks",
        &[
            ("username", &params.username),
            ("period", &period),
            ("limit", &limit_param),
        ],
    );
    if let Some(hit) = state.cache.get(&key) {
        debug!("Cache hit for {}", key);
        return Ok(Json(hit));
    }

    let tracks = lastfm.top_tracks(&params.username, &period, limit).await?;
    let payload = json!({ "tracks": tracks });
    state.cache.set(&key, payload.clone());
    Ok(Json(payload))
}

// GET /api/lastfm/top-tracks-range - Ranked tracks between two unix timestamps
async fn top_tracks_range(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<TopTracksRangeQuery>,
) -> Result<Json<Value>> {
    state
        .rate_limiter
        .check(&client_key(&headers, Some(&peer)))?;
    let lastfm = state.lastfm.as_ref().ok_or(Error::ConfigurationMissing)?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let from_param = params.from.to_string();
    let to_param = params.to.to_string();
    let limit_param = limit.to_string();
    let key = cache_key(
        "lastfm-top-tracks-range",
        &[
            ("username", &params.username),
            ("from", &from_param),
            ("to", &to_param),
            ("limit", &limit_param),
        ],
    );
    if let Some(hit) = state.cache.get(&key) {
        debug!("Cache hit for {}", key);
        return Ok(Json(hit));
    }

    let tracks = lastfm
        .top_tracks_range(&params.username, params.from, params.to, limit)
        .await?;
    let payload = json!({ "tracks": tracks });
    state.cache.set(&key, payload.clone());
    Ok(Json(payload))
}

// GET /api/deezer/search - Resolve a preview for an artist and title
async fn search_preview(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<PreviewSearchQuery>,
) -> Result<Json<Value>> {
    state
        .rate_limiter
        .check(&client_key(&headers, Some(&peer)))?;

    let key = cache_key(
        "deezer-search",
        &[("artist", &params.artist), ("title", &params.title)],
    );
    if let Some(hit) = state.cache.get(&key) {
        debug!("Cache hit for {}", key);
        return Ok(Json(hit));
    }

    // Not-found outcomes are not cached so later retries hit upstream again.
    let track = state.deezer.resolve(&params.artist, &params.title).await?;
    let payload = json!({ "track": track });
    state.cache.set(&key, payload.clone());
    Ok(Json(payload))
}
