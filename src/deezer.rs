use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Candidates requested per search, so a better match than the first result
/// can be picked.
const SEARCH_CANDIDATES: u32 = 5;

/// One catalog search candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub title: String,
    pub artist: CatalogArtist,
    pub album: Option<CatalogAlbum>,
    pub preview: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub title: Option<String>,
    pub cover_medium: Option<String>,
    pub cover: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<CatalogTrack>,
}

impl CatalogTrack {
    /// Deezer serves an empty string when no preview clip exists.
    pub fn preview_url(&self) -> Option<&str> {
        self.preview.as_deref().filter(|p| !p.is_empty())
    }

    pub fn cover_url(&self) -> Option<&str> {
        let album = self.album.as_ref()?;
        album
            .cover_medium
            .as_deref()
            .or(album.cover.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Upstream catalog able to resolve an (artist, title) pair to a preview.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    /// Best-effort match for the pair, or `NoMatchFound`.
    async fn resolve(&self, artist: &str, title: &str) -> Result<CatalogTrack>;
}

pub struct DeezerClient {
    client: Client,
    base_url: String,
}

impl DeezerClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.deezer_base_url.clone(),
        }
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;

        let body: SearchResponse = response.json().await?;
        Ok(body.data)
    }
}

#[async_trait]
impl PreviewSource for DeezerClient {
    async fn resolve(&self, artist: &str, title: &str) -> Result<CatalogTrack> {
        resolve_with(|query| self.search_owned(query), artist, title).await
    }
}

impl DeezerClient {
    async fn search_owned(&self, query: String) -> Result<Vec<CatalogTrack>> {
        self.search(&query, SEARCH_CANDIDATES).await
    }
}

/// Walks the strategy ladder with the given search function, returning the
/// best candidate of the first strategy that yields any.
async fn resolve_with<F, Fut>(search: F, artist: &str, title: &str) -> Result<CatalogTrack>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<CatalogTrack>>>,
{
    let artist = normalize(artist);
    let title = normalize(title);

    if artist.is_empty() && title.is_empty() {
        debug!("No searchable content after normalization");
        return Err(Error::NoMatchFound);
    }

    for (i, query) in search_strategies(&artist, &title).into_iter().enumerate() {
        debug!("Search strategy {}: {}", i + 1, query);

        match search(query).await {
            Ok(candidates) if !candidates.is_empty() => {
                let best = pick_best(&candidates, &artist, &title).clone();
                debug!("Found track: {} by {}", best.title, best.artist.name);
                return Ok(best);
            }
            Ok(_) => continue,
            // A transport failure on one strategy means "found nothing";
            // the ladder continues instead of aborting.
            Err(e) => {
                warn!("Search strategy {} failed: {}", i + 1, e);
                continue;
            }
        }
    }

    debug!("No track found for: {} - {}", artist, title);
    Err(Error::NoMatchFound)
}

/// Cleans a search term without corrupting non-Latin scripts.
///
/// Curly quotes become straight quotes, em/en dashes become hyphens, brackets
/// and the remaining ASCII punctuation are dropped, and whitespace collapses
/// to single spaces. All non-ASCII characters pass through untouched.
pub fn normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => cleaned.push('\''),
            '\u{201C}' | '\u{201D}' => cleaned.push('"'),
            '\u{2013}' | '\u{2014}' => cleaned.push('-'),
            '\'' | '"' | '-' => cleaned.push(c),
            c if c.is_ascii_punctuation() => {}
            c if c.is_whitespace() => cleaned.push(' '),
            c => cleaned.push(c),
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The strategy ladder, most specific first. Strategies whose inputs are
/// empty after normalization are skipped.
fn search_strategies(artist: &str, title: &str) -> Vec<String> {
    let mut strategies = Vec::new();
    if !artist.is_empty() && !title.is_empty() {
        strategies.push(format!("artist:\"{}\" track:\"{}\"", artist, title));
        strategies.push(format!("{} {}", artist, title));
    }
    if !title.is_empty() {
        strategies.push(title.to_string());
    }
    if !artist.is_empty() {
        strategies.push(artist.to_string());
    }
    strategies
}

/// Prefers a candidate whose artist or title is a case-insensitive substring
/// match (either direction) against the query; falls back to the first,
/// most-relevant-per-upstream candidate.
///
/// Known precision gap: short or generic titles can substring-match many
/// catalog entries, so the preferred candidate is not always the right one.
fn pick_best<'a>(candidates: &'a [CatalogTrack], artist: &str, title: &str) -> &'a CatalogTrack {
    if !artist.is_empty() && !title.is_empty() {
        let artist = artist.to_lowercase();
        let title = title.to_lowercase();

        let better = candidates.iter().find(|c| {
            let candidate_artist = c.artist.name.to_lowercase();
            let candidate_title = c.title.to_lowercase();

            let artist_match = candidate_artist.contains(&artist)
                || artist.contains(&candidate_artist);
            let title_match =
                candidate_title.contains(&title) || title.contains(&candidate_title);

            artist_match || title_match
        });

        if let Some(better) = better {
            return better;
        }
    }
    &candidates[0]
}
