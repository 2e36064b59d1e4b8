use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("countdown-fm/", env!("CARGO_PKG_VERSION"));

// Last.fm API error codes as per documentation
const LASTFM_ERROR_INVALID_PARAMS: i32 = 6;
const LASTFM_ERROR_OPERATION_FAILED: i32 = 8;
const LASTFM_ERROR_SERVICE_OFFLINE: i32 = 11;
const LASTFM_ERROR_TEMP_ERROR: i32 = 16;
const LASTFM_ERROR_RATE_LIMIT: i32 = 29;

/// Max result pages fetched per date-range request, to bound upstream calls.
const MAX_RANGE_PAGES: u32 = 10;
/// Listen events requested per page (upstream maximum).
const RANGE_PAGE_SIZE: u32 = 1000;
/// Pause between result pages to respect upstream pacing.
const RANGE_PAGE_DELAY: Duration = Duration::from_millis(200);

/// One entry of a user's ranked track list, descending by play count.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTrack {
    pub name: String,
    pub artist: String,
    pub playcount: u64,
    pub cover_url: Option<String>,
    pub url: Option<String>,
}

/// Upstream source of ranked listening data.
#[async_trait]
pub trait RankSource: Send + Sync {
    /// Top tracks for a named period, ordered by upstream.
    async fn top_tracks(
        &self,
        username: &str,
        period: &str,
        limit: u32,
    ) -> Result<Vec<RankedTrack>>;

    /// Top tracks computed from the raw listen-event log between two unix
    /// timestamps.
    async fn top_tracks_range(
        &self,
        username: &str,
        from: i64,
        to: i64,
        limit: u32,
    ) -> Result<Vec<RankedTrack>>;
}

#[derive(Deserialize)]
struct TopTracksResponse {
    toptracks: Option<TopTracks>,
    error: Option<i32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct TopTracks {
    #[serde(default)]
    track: Vec<TopTrack>,
}

#[derive(Deserialize)]
struct TopTrack {
    name: String,
    artist: TopTrackArtist,
    playcount: String,
    #[serde(default)]
    image: Vec<ApiImage>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct TopTrackArtist {
    name: String,
}

#[derive(Deserialize)]
struct RecentTracksResponse {
    recenttracks: Option<RecentTracks>,
    error: Option<i32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: OneOrMany<RecentTrack>,
    #[serde(rename = "@attr")]
    attr: Option<RecentTracksAttr>,
}

#[derive(Deserialize)]
struct RecentTracksAttr {
    #[serde(rename = "totalPages")]
    total_pages: Option<String>,
}

#[derive(Deserialize)]
struct RecentTrack {
    name: String,
    artist: RecentTrackArtist,
    // Absent on the live "now playing" entry.
    date: Option<EventDate>,
    #[serde(default)]
    image: Vec<ApiImage>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct RecentTrackArtist {
    #[serde(rename = "#text")]
    name: String,
}

#[derive(Deserialize)]
struct EventDate {
    #[allow(dead_code)]
    uts: Option<String>,
}

#[derive(Deserialize)]
struct ApiImage {
    size: Option<String>,
    #[serde(rename = "#text")]
    url: String,
}

// Last.fm returns a bare object instead of an array when a page holds a
// single track.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// A single dated listen event, extracted from the upstream event log.
pub(crate) struct ListenEvent {
    pub artist: String,
    pub name: String,
    pub cover_url: Option<String>,
    pub url: Option<String>,
}

pub struct LastfmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LastfmClient {
    /// Fails with `ConfigurationMissing` when no usable API key is configured,
    /// before any network call is attempted.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .lastfm_api_key
            .clone()
            .ok_or(Error::ConfigurationMissing)?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.lastfm_base_url.clone(),
        })
    }

    async fn fetch_event_page(
        &self,
        username: &str,
        from: i64,
        to: i64,
        page: u32,
    ) -> Result<(Vec<ListenEvent>, u32)> {
        let from = from.to_string();
        let to = to.to_string();
        let limit = RANGE_PAGE_SIZE.to_string();
        let page_str = page.to_string();
        let params = [
            ("method", "user.getrecenttracks"),
            ("user", username),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("from", from.as_str()),
            ("to", to.as_str()),
            ("limit", limit.as_str()),
            ("page", page_str.as_str()),
        ];

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::UserNotFound(username.to_string()));
        }

        let body: RecentTracksResponse = response.json().await?;
        if let Some(code) = body.error {
            return Err(api_error(code, body.message, username));
        }

        let recent = match body.recenttracks {
            Some(recent) => recent,
            None => return Ok((Vec::new(), 1)),
        };

        let total_pages = recent
            .attr
            .as_ref()
            .and_then(|attr| attr.total_pages.as_deref())
            .and_then(|pages| pages.parse().ok())
            .unwrap_or(1);

        // The live "now playing" entry carries no date and is not a listen
        // event within the window.
        let events = recent
            .track
            .into_vec()
            .into_iter()
            .filter(|track| track.date.is_some())
            .map(|track| ListenEvent {
                artist: track.artist.name,
                name: track.name,
                cover_url: pick_cover(&track.image),
                url: track.url,
            })
            .collect();

        Ok((events, total_pages))
    }
}

#[async_trait]
impl RankSource for LastfmClient {
    async fn top_tracks(
        &self,
        username: &str,
        period: &str,
        limit: u32,
    ) -> Result<Vec<RankedTrack>> {
        let limit = limit.to_string();
        let params = [
            ("method", "user.gettoptracks"),
            ("user", username),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("period", period),
            ("limit", limit.as_str()),
        ];

        debug!("Fetching top tracks for {} (period {})", username, period);

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::UserNotFound(username.to_string()));
        }

        let body: TopTracksResponse = response.json().await?;
        if let Some(code) = body.error {
            return Err(api_error(code, body.message, username));
        }

        let tracks = body
            .toptracks
            .map(|t| t.track)
            .unwrap_or_default()
            .into_iter()
            .map(|track| RankedTrack {
                name: track.name,
                artist: track.artist.name,
                playcount: track.playcount.parse().unwrap_or(0),
                cover_url: pick_cover(&track.image),
                url: track.url,
            })
            .collect();

        Ok(tracks)
    }

    async fn top_tracks_range(
        &self,
        username: &str,
        from: i64,
        to: i64,
        limit: u32,
    ) -> Result<Vec<RankedTrack>> {
        debug!(
            "Fetching listen events for {} between {} and {}",
            username, from, to
        );

        let mut events = Vec::new();
        let mut page = 1;
        loop {
            debug!("Fetching event page {} for {}", page, username);
            let (page_events, total_pages) =
                self.fetch_event_page(username, from, to, page).await?;

            if page_events.is_empty() {
                break;
            }
            events.extend(page_events);

            if page >= total_pages || page >= MAX_RANGE_PAGES {
                if page >= MAX_RANGE_PAGES && total_pages > MAX_RANGE_PAGES {
                    warn!(
                        "Stopping at page {} of {} for {}",
                        page, total_pages, username
                    );
                }
                break;
            }
            page += 1;

            tokio::time::sleep(RANGE_PAGE_DELAY).await;
        }

        debug!("Aggregating {} listen events for {}", events.len(), username);
        Ok(aggregate_events(events, limit as usize))
    }
}

fn api_error(code: i32, message: Option<String>, username: &str) -> Error {
    if code == LASTFM_ERROR_INVALID_PARAMS
        && message
            .as_deref()
            .is_some_and(|m| m.to_lowercase().contains("user not found"))
    {
        return Error::UserNotFound(username.to_string());
    }

    let description = match code {
        LASTFM_ERROR_INVALID_PARAMS => "Invalid parameters",
        LASTFM_ERROR_OPERATION_FAILED => "Operation failed",
        LASTFM_ERROR_SERVICE_OFFLINE => "Service offline",
        LASTFM_ERROR_TEMP_ERROR => "Temporary error",
        LASTFM_ERROR_RATE_LIMIT => "Upstream rate limit exceeded",
        _ => "Unknown error",
    };
    Error::Upstream(format!(
        "Last.fm API error {}: {} - {}",
        code,
        description,
        message.unwrap_or_default()
    ))
}

/// Counts occurrences per (artist, name) pair, keeping first-seen metadata,
/// then sorts by count descending and truncates to `limit`.
pub(crate) fn aggregate_events(events: Vec<ListenEvent>, limit: usize) -> Vec<RankedTrack> {
    use std::collections::HashMap;

    let mut tracks: Vec<RankedTrack> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for event in events {
        let key = (event.artist.clone(), event.name.clone());
        match index.get(&key) {
            Some(&i) => tracks[i].playcount += 1,
            None => {
                index.insert(key, tracks.len());
                tracks.push(RankedTrack {
                    name: event.name,
                    artist: event.artist,
                    playcount: 1,
                    cover_url: event.cover_url,
                    url: event.url,
                });
            }
        }
    }

    tracks.sort_by(|a, b| b.playcount.cmp(&a.playcount));
    tracks.truncate(limit);
    tracks
}

fn pick_cover(images: &[ApiImage]) -> Option<String> {
    for wanted in ["large", "medium"] {
        if let Some(image) = images
            .iter()
            .find(|i| i.size.as_deref() == Some(wanted) && !i.url.is_empty())
        {
            return Some(image.url.clone());
        }
    }
    images
        .iter()
        .rev()
        .find(|i| !i.url.is_empty())
        .map(|i| i.url.clone())
}
