use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use serde::Serialize;

use crate::deezer::{CatalogTrack, PreviewSource};
use crate::error::{Error, Result};
use crate::lastfm::{RankSource, RankedTrack};

pub const PLACEHOLDER_COVER: &str = "https://via.placeholder.com/250x250?text=No+Cover";

/// Where a playlist entry's metadata came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackSource {
    /// Catalog match with a playable preview.
    Resolved,
    /// Catalog match without a preview clip.
    NoPreview,
    /// No catalog match; rank-source metadata only.
    MetadataOnly,
}

/// One entry of the built countdown playlist. Read-only during playback.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistTrack {
    /// Countdown rank, 1 = highest. The playlist is played back in reverse
    /// rank order, so position 1 comes last.
    pub position: usize,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover_url: String,
    pub preview_url: Option<String>,
    pub external_link: Option<String>,
    pub playcount: u64,
    pub source: TrackSource,
}

/// How the ranked track list should be fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackRequest {
    Period { period: String },
    Range { from: i64, to: i64 },
}

type SharedBuild = Shared<BoxFuture<'static, Result<Arc<Vec<PlaylistTrack>>>>>;

/// Builds countdown playlists from a rank source and a preview source.
///
/// Duplicate concurrent requests for the same parameters share one in-flight
/// build instead of racing two upstream fetches.
pub struct PlaylistBuilder {
    rank_source: Arc<dyn RankSource>,
    preview_source: Arc<dyn PreviewSource>,
    in_flight: Mutex<HashMap<String, SharedBuild>>,
}

impl PlaylistBuilder {
    pub fn new(rank_source: Arc<dyn RankSource>, preview_source: Arc<dyn PreviewSource>) -> Self {
        Self {
            rank_source,
            preview_source,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches the ranked list and resolves previews for a full countdown.
    pub async fn countdown(
        &self,
        username: &str,
        request: &TrackRequest,
        limit: u32,
    ) -> Result<Arc<Vec<PlaylistTrack>>> {
        let key = request_key(username, request, limit);

        let build = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(pending) = in_flight.get(&key) {
                debug!("Joining in-flight countdown build for {}", key);
                pending.clone()
            } else {
                let rank_source = self.rank_source.clone();
                let preview_source = self.preview_source.clone();
                let username = username.to_string();
                let request = request.clone();

                let build = async move {
                    let ranked = match &request {
                        TrackRequest::Period { period } => {
                            rank_source.top_tracks(&username, period, limit).await?
                        }
                        TrackRequest::Range { from, to } => {
                            rank_source
                                .top_tracks_range(&username, *from, *to, limit)
                                .await?
                        }
                    };
                    let playlist = build_playlist(preview_source.as_ref(), ranked).await?;
                    Ok(Arc::new(playlist))
                }
                .boxed()
                .shared();

                in_flight.insert(key.clone(), build.clone());
                build
            }
        };

        let result = build.await;
        self.in_flight.lock().unwrap().remove(&key);
        result
    }
}

fn request_key(username: &str, request: &TrackRequest, limit: u32) -> String {
    match request {
        TrackRequest::Period { period } => format!("{}:{}:{}", username, period, limit),
        TrackRequest::Range { from, to } => format!("{}:{}-{}:{}", username, from, to, limit),
    }
}

/// Resolves a preview per ranked track and assembles the countdown order:
/// positions are assigned contiguously in rank order, then the list is
/// reversed so that position 1 plays last.
pub async fn build_playlist(
    preview_source: &dyn PreviewSource,
    ranked: Vec<RankedTrack>,
) -> Result<Vec<PlaylistTrack>> {
    if ranked.is_empty() {
        return Err(Error::EmptyPlaylist);
    }

    let mut playlist = Vec::with_capacity(ranked.len());
    for track in &ranked {
        let position = playlist.len() + 1;
        debug!("Resolving track {}: {} - {}", position, track.artist, track.name);

        let entry = match preview_source.resolve(&track.artist, &track.name).await {
            Ok(found) => from_catalog(position, track, found),
            Err(Error::NoMatchFound) => metadata_only(position, track),
            Err(e) => {
                warn!(
                    "Preview resolution failed for {} - {}: {}",
                    track.artist, track.name, e
                );
                metadata_only(position, track)
            }
        };
        playlist.push(entry);
    }

    if playlist.is_empty() {
        return Err(Error::EmptyPlaylist);
    }

    playlist.reverse();
    Ok(playlist)
}

fn from_catalog(position: usize, ranked: &RankedTrack, found: CatalogTrack) -> PlaylistTrack {
    let preview_url = found.preview_url().map(str::to_string);
    let source = if preview_url.is_some() {
        TrackSource::Resolved
    } else {
        TrackSource::NoPreview
    };

    let cover_url = found
        .cover_url()
        .map(str::to_string)
        .or_else(|| ranked.cover_url.clone())
        .unwrap_or_else(|| PLACEHOLDER_COVER.to_string());

    PlaylistTrack {
        position,
        title: found.title.clone(),
        artist: found.artist.name.clone(),
        album: found.album.as_ref().and_then(|a| a.title.clone()),
        cover_url,
        preview_url,
        external_link: found.link,
        playcount: ranked.playcount,
        source,
    }
}

fn metadata_only(position: usize, ranked: &RankedTrack) -> PlaylistTrack {
    PlaylistTrack {
        position,
        title: ranked.name.clone(),
        artist: ranked.artist.clone(),
        album: None,
        cover_url: ranked
            .cover_url
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
        preview_url: None,
        external_link: None,
        playcount: ranked.playcount,
        source: TrackSource::MetadataOnly,
    }
}
