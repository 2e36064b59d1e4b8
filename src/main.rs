use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};

use countdown_fm::api::{create_router, AppState};
use countdown_fm::cache::ResponseCache;
use countdown_fm::config::Config;
use countdown_fm::deezer::DeezerClient;
use countdown_fm::error::Error;
use countdown_fm::lastfm::LastfmClient;
use countdown_fm::logger;
use countdown_fm::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    logger::init().unwrap();

    let config = Config::from_env();

    let lastfm = match LastfmClient::new(&config) {
        Ok(client) => Some(Arc::new(client)),
        Err(Error::ConfigurationMissing) => {
            warn!("LASTFM_API_KEY not set; rank endpoints run in demo mode");
            None
        }
        Err(e) => {
            error!("Failed to build Last.fm client: {}", e);
            None
        }
    };

    let state = AppState {
        lastfm,
        deezer: Arc::new(DeezerClient::new(&config)),
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_burst,
            config.rate_limit_refill,
            Duration::from_secs(1),
        )),
        cache: Arc::new(ResponseCache::new(Duration::from_secs(
            config.cache_ttl_secs,
        ))),
    };

    let app = create_router(state);
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("countdown-fm listening on {}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
