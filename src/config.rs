use anyhow::{Context, anyhow, bail};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

use crate::clock::LocalCalendar;
use crate::identity::AdminSeed;

/// The one authoritative store for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    Mysql,
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    /// Requests per minute per client IP.
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Minutes east of UTC used for day boundaries.
    pub utc_offset_minutes: i32,

    pub admin_email: String,
    pub admin_document: String,
    pub admin_name: String,

    pub log_dir: String,
    pub log_level: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(key, default);
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}"))
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let storage_backend: StorageBackend = parse_var("STORAGE_BACKEND", "mysql")?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=mysql");
        }

        let config = Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080"),
            storage_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_var("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: parse_var("REFRESH_TOKEN_TTL", "604800")?, // 7 days

            rate_login_per_min: parse_var("RATE_LOGIN_PER_MIN", "60")?,
            rate_protected_per_min: parse_var("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: var_or("API_PREFIX", "/api"),
            utc_offset_minutes: parse_var("UTC_OFFSET_MINUTES", "-180")?,

            admin_email: var_or("ADMIN_EMAIL", "administrador"),
            admin_document: required("ADMIN_DOCUMENT")?,
            admin_name: var_or("ADMIN_NAME", "ADMINISTRADOR"),

            log_dir: var_or("LOG_DIR", "logs"),
            log_level: var_or("LOG_LEVEL", "info"),
        };

        // Surface a bad offset at start-up rather than on the first punch.
        config.calendar()?;
        Ok(config)
    }

    pub fn calendar(&self) -> anyhow::Result<LocalCalendar> {
        LocalCalendar::from_offset_minutes(self.utc_offset_minutes).ok_or_else(|| {
            anyhow!(
                "UTC_OFFSET_MINUTES={} is outside ±24h",
                self.utc_offset_minutes
            )
        })
    }

    pub fn admin_seed(&self) -> AdminSeed {
        AdminSeed {
            name: self.admin_name.clone(),
            email: self.admin_email.clone(),
            document: self.admin_document.clone(),
        }
    }

    /// Settings for tests and local runs against the in-memory store.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            server_addr: "127.0.0.1:8080".into(),
            storage_backend: StorageBackend::Memory,
            database_url: None,
            jwt_secret: jwt_secret.into(),
            access_token_ttl: 900,
            refresh_token_ttl: 604_800,
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            utc_offset_minutes: -180,
            admin_email: "administrador".into(),
            admin_document: String::new(),
            admin_name: "ADMINISTRADOR".into(),
            log_dir: "logs".into(),
            log_level: "info".into(),
        }
    }
}
