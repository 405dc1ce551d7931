//! Service configuration.
//!
//! Loaded from a YAML file (`-f/--config`, default `config.yaml`) and then
//! overridden by `PROFILED_` environment variables, with `__` separating
//! nested keys:
//!
//! ```bash
//! PROFILED_PORT=8080
//! PROFILED_IMAGE__INLINE_ENCODING=true
//! PROFILED_MEDIA__ROOT=/var/lib/profiled/media
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PROFILED_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Directory holding the record store
    pub database_path: PathBuf,
    pub media: MediaConfig,
    pub image: ImageConfig,
    pub pagination: PaginationConfig,
    pub auth: AuthConfig,
    pub throttle: ThrottleConfig,
}

/// Where image attachments are written and how their URLs look.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    pub root: PathBuf,
    /// Path the files are reachable under, e.g. `/media`
    pub url_path: String,
    /// Optional scheme and host prefixed to image URLs, e.g. `https://cdn.example.com`
    pub public_host: Option<String>,
    /// Serve `root` under `url_path` from this process
    pub serve: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Send image content inline as base64 instead of a URL
    pub inline_encoding: bool,
    /// Request body limit, applies to JSON payloads and multipart uploads
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Bearer tokens accepted by the service
    pub tokens: Vec<TokenGrant>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokenGrant {
    pub token: String,
    pub subject: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottleConfig {
    /// Requests allowed per caller per window; unset disables throttling
    pub max_requests: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_path: PathBuf::from("data"),
            media: MediaConfig::default(),
            image: ImageConfig::default(),
            pagination: PaginationConfig::default(),
            auth: AuthConfig::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            url_path: "/media".to_string(),
            public_host: None,
            serve: true,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            inline_encoding: false,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { default_limit: 20, max_limit: 1000 }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: None,
            window: Duration::from_secs(60),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("PROFILED_").split("__").ignore(&["config"]))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pagination.default_limit == 0 || self.pagination.default_limit > self.pagination.max_limit {
            return Err(format!(
                "pagination.default_limit ({}) must be between 1 and pagination.max_limit ({})",
                self.pagination.default_limit, self.pagination.max_limit
            ));
        }

        if self.image.max_upload_bytes == 0 {
            return Err("image.max_upload_bytes must be greater than zero".to_string());
        }

        let url_path = self.media.url_path.trim_end_matches('/');
        if !url_path.starts_with('/') || url_path.is_empty() {
            return Err(format!("media.url_path ({:?}) must be an absolute path other than /", self.media.url_path));
        }

        if self.throttle.max_requests == Some(0) || self.throttle.window.is_zero() {
            return Err("throttle.max_requests and throttle.window must be greater than zero".to_string());
        }

        if let Some(grant) = self.auth.tokens.iter().find(|grant| grant.token.trim().is_empty()) {
            return Err(format!("auth.tokens: empty token for subject {}", grant.subject));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path prefix the media files are mounted under, without trailing slash.
    pub fn media_url_path(&self) -> &str {
        self.media.url_path.trim_end_matches('/')
    }

    /// Prefix of every image URL handed to clients.
    pub fn media_base_url(&self) -> String {
        let host = self
            .media
            .public_host
            .as_deref()
            .map(|host| host.trim_end_matches('/'))
            .unwrap_or_default();

        format!("{}{}/", host, self.media_url_path())
    }
}
