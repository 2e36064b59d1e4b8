pub mod api;
pub mod cache;
pub mod config;
pub mod deezer;
pub mod error;
pub mod lastfm;
pub mod logger;
pub mod playback;
pub mod playlist;
pub mod rate_limit;
