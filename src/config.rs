use std::env;

const LASTFM_KEY_PLACEHOLDER: &str = "YOUR_LASTFM_API_KEY";

pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    /// `None` when the key is unset or still the placeholder value.
    pub lastfm_api_key: Option<String>,
    pub lastfm_base_url: String,
    pub deezer_base_url: String,
    pub cache_ttl_secs: u64,
    pub rate_limit_burst: u32,
    pub rate_limit_refill: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3002".to_string())
                .parse()
                .unwrap_or(3002),
            lastfm_api_key: env::var("LASTFM_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty() && key != LASTFM_KEY_PLACEHOLDER),
            lastfm_base_url: env::var("LASTFM_BASE_URL")
                .unwrap_or_else(|_| "https://ws.audioscrobbler.com/2.0".to_string()),
            deezer_base_url: env::var("DEEZER_BASE_URL")
                .unwrap_or_else(|_| "https://api.deezer.com".to_string()),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            rate_limit_burst: env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            rate_limit_refill: env::var("RATE_LIMIT_REFILL")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
