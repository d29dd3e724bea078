// Layered configuration: defaults -> config.toml -> APP_* environment variables (APP_JWT__ACCESS_SECRET)

use anyhow::{Result, bail};
use config::{Config, Environment, File};
use serde::Deserialize;

const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    pub jwt: JwtSettings,
    pub bcrypt_cost: u32,
    pub storage: StorageBackend,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub cache: CacheBackend,
    pub redis_url: Option<String>,
    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            // Add default values
            .set_default("server_address", "127.0.0.1:3000")?
            .set_default("jwt.access_ttl_secs", 15 * 60)?
            .set_default("jwt.refresh_ttl_secs", 7 * 24 * 60 * 60)?
            .set_default("bcrypt_cost", bcrypt::DEFAULT_COST)?
            .set_default("storage", "memory")?
            .set_default("mongodb_database", "autolot")?
            .set_default("cache", "memory")?
            .set_default("cors_origins", Vec::<String>::new())?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_JWT__ACCESS_SECRET)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors_origins")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    // Catch misconfiguration at startup rather than on the first request
    pub fn validate(&self) -> Result<()> {
        if self.jwt.access_secret.len() < MIN_SECRET_BYTES {
            bail!("jwt.access_secret must be at least {} bytes", MIN_SECRET_BYTES);
        }
        if self.jwt.refresh_secret.len() < MIN_SECRET_BYTES {
            bail!("jwt.refresh_secret must be at least {} bytes", MIN_SECRET_BYTES);
        }
        if self.jwt.access_secret == self.jwt.refresh_secret {
            bail!("jwt.access_secret and jwt.refresh_secret must differ");
        }
        if self.jwt.access_ttl_secs <= 0 || self.jwt.refresh_ttl_secs <= 0 {
            bail!("token lifetimes must be positive");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("bcrypt_cost must be between 4 and 31");
        }
        if self.storage == StorageBackend::Mongodb && self.mongodb_uri.is_none() {
            bail!("storage = \"mongodb\" requires mongodb_uri");
        }
        if self.cache == CacheBackend::Redis && self.redis_url.is_none() {
            bail!("cache = \"redis\" requires redis_url");
        }
        Ok(())
    }
}

#[cfg(test)]
impl Settings {
    // Cheap bcrypt cost keeps the HTTP tests fast
    pub fn for_tests() -> Self {
        Settings {
            server_address: "127.0.0.1:0".into(),
            jwt: JwtSettings {
                access_secret: "test-access-secret-0123456789abcdef".into(),
                refresh_secret: "test-refresh-secret-0123456789abcdef".into(),
                access_ttl_secs: 900,
                refresh_ttl_secs: 7 * 24 * 60 * 60,
            },
            bcrypt_cost: 4,
            storage: StorageBackend::Memory,
            mongodb_uri: None,
            mongodb_database: "autolot".into(),
            cache: CacheBackend::Memory,
            redis_url: None,
            cors_origins: Vec::new(),
        }
    }
}
