use anyhow::{Result, anyhow};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub auth: Auth,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub account_service: AccountService,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: u64,
    #[serde(default = "default_refresh_token_long_ttl_secs")]
    pub refresh_token_long_ttl_secs: u64,
    #[serde(default = "default_refresh_token_bytes")]
    pub refresh_token_bytes: usize,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "lenient" or "strict"
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    #[serde(default = "default_same_site")]
    pub same_site: String, // "Strict" or "Lax"
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("refresh_token_long_ttl_secs", &self.refresh_token_long_ttl_secs)
            .field("refresh_token_bytes", &self.refresh_token_bytes)
            .field("rotation", &self.rotation)
            .field("cookie_path", &self.cookie_path)
            .field("same_site", &self.same_site)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    pub backend: String, // "ram" or "redis"
    pub dsn: Option<String>,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Cache {
            backend: "ram".to_string(),
            dsn: None,
            op_timeout_ms: default_op_timeout_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountService {
    pub backend: String, // "fake" or "grpc"
    pub address: Option<String>,
    #[serde(default = "default_account_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AccountService {
    fn default() -> Self {
        AccountService {
            backend: "fake".to_string(),
            address: None,
            timeout_ms: default_account_timeout_ms(),
        }
    }
}

fn default_access_token_ttl_secs() -> u64 {
    15 * 60
}
fn default_refresh_token_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_refresh_token_long_ttl_secs() -> u64 {
    30 * 24 * 60 * 60
}
fn default_refresh_token_bytes() -> usize {
    64
}
fn default_rotation() -> String {
    "lenient".to_string()
}
fn default_cookie_path() -> String {
    "/api/v1/auth/token".to_string()
}
fn default_same_site() -> String {
    "Strict".to_string()
}
fn default_op_timeout_ms() -> u64 {
    1000
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_account_timeout_ms() -> u64 {
    3000
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides look like `GATEWAY__AUTH__SECRET`.
const ENV_PREFIX: &str = "GATEWAY";

/// Upper bound for every token lifetime: ten years.
const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    build(Config::builder().add_source(File::with_name(path)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.auth.secret.is_empty() {
            return Err(anyhow!("auth.secret must not be empty"));
        }
        if self.auth.access_token_ttl_secs == 0
            || self.auth.refresh_token_ttl_secs == 0
            || self.auth.refresh_token_long_ttl_secs == 0
        {
            return Err(anyhow!("auth token lifetimes must be positive"));
        }
        for (name, secs) in [
            ("access_token_ttl_secs", self.auth.access_token_ttl_secs),
            ("refresh_token_ttl_secs", self.auth.refresh_token_ttl_secs),
            ("refresh_token_long_ttl_secs", self.auth.refresh_token_long_ttl_secs),
        ] {
            if secs > MAX_TOKEN_TTL_SECS {
                return Err(anyhow!(
                    "auth.{} must be at most {}, got {}",
                    name,
                    MAX_TOKEN_TTL_SECS,
                    secs
                ));
            }
        }
        if self.auth.refresh_token_bytes < 64 {
            return Err(anyhow!(
                "auth.refresh_token_bytes must be at least 64, got {}",
                self.auth.refresh_token_bytes
            ));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(anyhow!("cache.sweep_interval_secs must be positive"));
        }
        if self.cache.op_timeout_ms == 0 {
            return Err(anyhow!("cache.op_timeout_ms must be positive"));
        }
        if self.account_service.timeout_ms == 0 {
            return Err(anyhow!("account_service.timeout_ms must be positive"));
        }
        Ok(())
    }
}
