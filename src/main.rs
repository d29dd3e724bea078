use anyhow::{Context, Result};
use axum::extract::FromRef;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    auth::TokenService,
    config::{CacheBackend, Settings, StorageBackend},
    store::{
        InMemoryListingStore, InMemoryTokenCache, InMemoryUserStore, ListingStore, TokenCache,
        UserStore, seed,
    },
};

// Declare modules
mod auth;
mod auth_middleware;
mod config;
mod error;
mod models;
mod routes;
mod search;
mod store;

// Define the application state struct
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    listings: Arc<dyn ListingStore>,
    users: Arc<dyn UserStore>,
    token_cache: Arc<dyn TokenCache>,
    tokens: Arc<TokenService>,
}

impl AppState {
    /// Everything in process, with the demo inventory loaded
    #[cfg(test)]
    fn in_memory(settings: Settings) -> Self {
        Self::assemble(
            settings,
            Arc::new(InMemoryListingStore::new(seed::demo_listings())),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryTokenCache::new()),
        )
    }

    fn assemble(
        settings: Settings,
        listings: Arc<dyn ListingStore>,
        users: Arc<dyn UserStore>,
        token_cache: Arc<dyn TokenCache>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(&settings.jwt));
        AppState {
            settings: Arc::new(settings),
            listings,
            users,
            token_cache,
            tokens,
        }
    }

    /// Builds the backends selected in `settings`
    async fn from_settings(settings: Settings) -> Result<Self> {
        let (listings, users) = storage_backends(&settings).await?;
        let token_cache = cache_backend(&settings).await?;
        Ok(Self::assemble(settings, listings, users, token_cache))
    }
}

async fn storage_backends(
    settings: &Settings,
) -> Result<(Arc<dyn ListingStore>, Arc<dyn UserStore>)> {
    match settings.storage {
        StorageBackend::Memory => {
            let listings = seed::demo_listings();
            tracing::info!("Using in-memory storage with {} demo listings", listings.len());
            Ok((
                Arc::new(InMemoryListingStore::new(listings)),
                Arc::new(InMemoryUserStore::new()),
            ))
        }
        #[cfg(feature = "mongodb")]
        StorageBackend::Mongodb => {
            let uri = settings
                .mongodb_uri
                .as_deref()
                .context("mongodb_uri is not set")?;
            let db = store::mongo::connect(uri, &settings.mongodb_database).await?;
            tracing::info!("Using MongoDB database '{}'", settings.mongodb_database);
            Ok((
                Arc::new(store::mongo::MongoListingStore::new(&db)),
                Arc::new(store::mongo::MongoUserStore::new(&db).await?),
            ))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageBackend::Mongodb => {
            anyhow::bail!("storage = \"mongodb\" but the binary was built without the `mongodb` feature")
        }
    }
}

async fn cache_backend(settings: &Settings) -> Result<Arc<dyn TokenCache>> {
    match settings.cache {
        CacheBackend::Memory => {
            tracing::info!("Using in-memory token cache");
            Ok(Arc::new(InMemoryTokenCache::new()))
        }
        #[cfg(feature = "redis")]
        CacheBackend::Redis => {
            let url = settings.redis_url.as_deref().context("redis_url is not set")?;
            let cache = store::redis_cache::RedisTokenCache::connect(url).await?;
            tracing::info!("Using Redis token cache");
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => {
            anyhow::bail!("cache = \"redis\" but the binary was built without the `redis` feature")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autolot=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing autolot server...");

    // Load configuration
    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let addr: SocketAddr = settings.server_address.parse().with_context(|| {
        format!("Invalid server address format: {}", settings.server_address)
    })?;

    let app_state = AppState::from_settings(settings)
        .await
        .context("Failed to initialize storage backends")?;
    let app = routes::create_router(app_state);

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
