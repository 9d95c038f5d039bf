use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use brocat_api::validation::{AllowedExtensions, UploadConfig};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const DEFAULT_IMAGES_EXTENSIONS: &str = "png,jpg,jpeg,gif";
const DEFAULT_AUDIOS_EXTENSIONS: &str = "mp3,wav,ogg";

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub addr: SocketAddr,
    pub uploads: UploadConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("BROCAT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("BROCAT_JWT_SECRET is unset or still a placeholder");
        }

        let host = var("BROCAT_HOST", "0.0.0.0");
        let port: u16 = var("BROCAT_PORT", "3000")
            .parse()
            .context("BROCAT_PORT is not a valid port")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        let uploads = UploadConfig {
            images: AllowedExtensions::parse_list(&var("ALLOWED_IMAGES_EXTENSIONS", DEFAULT_IMAGES_EXTENSIONS)),
            audios: AllowedExtensions::parse_list(&var("ALLOWED_AUDIOS_EXTENSIONS", DEFAULT_AUDIOS_EXTENSIONS)),
        };

        Ok(Self {
            jwt_secret,
            db_path: var("BROCAT_DB_PATH", "brocat.db").into(),
            upload_dir: var("BROCAT_UPLOAD_DIR", "./uploads").into(),
            addr,
            uploads,
        })
    }
}
