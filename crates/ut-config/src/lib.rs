//! # ut-config
//!
//! Layered runtime settings: built-in defaults, then an optional
//! `unitrade.toml` next to the binary, then `UNITRADE__*` environment
//! variables (`UNITRADE__SERVER__PORT=9000`, `UNITRADE__AUTH__JWT_SECRET=...`).
//! A `.env` file is read first so local development needs no exports.

mod telemetry;

pub use telemetry::init_tracing;

use std::path::PathBuf;

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Signing secret used when none is configured. Rejected in production.
pub const DEV_JWT_SECRET: &str = "unitrade-dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Switches session cookies to `Secure; SameSite=None`.
    pub production: bool,
    /// Origins allowed to make credentialed cross-site requests.
    pub cors_origins: Vec<String>,
    /// Upper bound on a single multipart file.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Filesystem root of the content-addressed store.
    pub upload_dir: PathBuf,
    /// Public URL prefix the store's files are served under.
    pub url_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    #[serde(deserialize_with = "secret")]
    pub jwt_secret: SecretString,
    pub token_ttl_days: i64,
}

/// The administrator account created by the `seed` binary.
#[derive(Debug, Deserialize)]
pub struct SeedSettings {
    pub admin_username: String,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_mobile: String,
    #[serde(deserialize_with = "secret")]
    pub admin_password: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub auth: AuthSettings,
    pub seed: SeedSettings,
    /// Emit logs as JSON lines instead of the human format.
    pub log_json: bool,
}

impl Settings {
    /// Loads `.env`, `unitrade.toml` (optional) and the environment.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env"),
        }
        let builder = with_defaults(Config::builder())?
            .add_source(File::with_name("unitrade").required(false))
            .add_source(
                Environment::with_prefix("UNITRADE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// Defaults overlaid with a TOML document. Used by tests and tooling.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let builder = with_defaults(Config::builder())?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::build(builder)
    }

    /// Built-in defaults only.
    pub fn defaults() -> Result<Self> {
        Self::from_toml("")
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid {
                key: "auth.jwt_secret",
                message: "must not be empty".into(),
            });
        }
        if self.server.production && self.auth.jwt_secret.expose_secret() == DEV_JWT_SECRET {
            return Err(ConfigError::Invalid {
                key: "auth.jwt_secret",
                message: "the development secret cannot be used in production".into(),
            });
        }
        if self.auth.token_ttl_days < 1 {
            return Err(ConfigError::Invalid {
                key: "auth.token_ttl_days",
                message: "must be at least 1".into(),
            });
        }
        if !self.media.url_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "media.url_prefix",
                message: "must start with `/`".into(),
            });
        }
        Ok(())
    }
}

fn with_defaults(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> Result<ConfigBuilder<config::builder::DefaultState>> {
    Ok(builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 4000)?
        .set_default("server.production", false)?
        .set_default("server.cors_origins", vec!["http://localhost:5173"])?
        .set_default("server.max_upload_bytes", 5 * 1024 * 1024)?
        .set_default("database.url", "sqlite://unitrade.db")?
        .set_default("database.max_connections", 5)?
        .set_default("media.upload_dir", "./data/uploads")?
        .set_default("media.url_prefix", "/static/uploads")?
        .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
        .set_default("auth.token_ttl_days", 7)?
        .set_default("seed.admin_username", "admin")?
        .set_default("seed.admin_name", "UniTrade Admin")?
        .set_default("seed.admin_email", "admin@unitrade.local")?
        .set_default("seed.admin_mobile", "0000000000")?
        .set_default("seed.admin_password", "admin123")?
        .set_default("log_json", false)?)
}
