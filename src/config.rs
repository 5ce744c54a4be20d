//! Runtime settings read from `SIMMATCH_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first when present;
//! variables already set in the process environment take precedence.

use crate::domain::error::DomainError;
use crate::infrastructure::index::ivf::IvfConfig;
use crate::infrastructure::index::IndexKind;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DIMENSION: usize = 1536;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" | "in-memory" => Ok(StoreKind::Memory),
            _ => Err(format!("Unknown store kind: {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: String,
    pub store: StoreKind,
    pub dimension: usize,
    /// Only consulted by the in-memory store; SQLite always scans exactly.
    pub index: IndexKind,
    pub ivf: IvfConfig,
    pub timeout: Duration,
    pub embedding_provider: String,
    pub embedding_api_key: String,
    pub embedding_model: Option<String>,
    pub embedding_base_url: Option<String>,
    pub agent_url: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: "./simmatch.db".into(),
            store: StoreKind::Sqlite,
            dimension: DEFAULT_DIMENSION,
            index: IndexKind::Flat,
            ivf: IvfConfig::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            embedding_provider: "noop".into(),
            embedding_api_key: String::new(),
            embedding_model: None,
            embedding_base_url: None,
            agent_url: "http://localhost:8000".into(),
            log_level: "info".into(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, DomainError> {
        // Missing .env is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let mut s = Settings::default();

        if let Some(v) = lookup("SIMMATCH_DB") {
            s.db_path = v;
        }
        if let Some(v) = lookup("SIMMATCH_STORE") {
            s.store = v.parse().map_err(DomainError::InvalidInput)?;
        }
        if let Some(v) = lookup("SIMMATCH_DIMENSION") {
            s.dimension = parse_number("SIMMATCH_DIMENSION", &v)?;
            if s.dimension == 0 {
                return Err(DomainError::InvalidInput(
                    "SIMMATCH_DIMENSION must be greater than zero".into(),
                ));
            }
        }
        if let Some(v) = lookup("SIMMATCH_INDEX") {
            s.index = v.parse().map_err(DomainError::InvalidInput)?;
        }
        if let Some(v) = lookup("SIMMATCH_IVF_LISTS") {
            s.ivf.lists = parse_number("SIMMATCH_IVF_LISTS", &v)?;
        }
        if let Some(v) = lookup("SIMMATCH_IVF_PROBES") {
            s.ivf.probes = parse_number("SIMMATCH_IVF_PROBES", &v)?;
        }
        if let Some(v) = lookup("SIMMATCH_IVF_MIN_TRAIN") {
            s.ivf.min_train_size = parse_number("SIMMATCH_IVF_MIN_TRAIN", &v)?;
        }
        if let Some(v) = lookup("SIMMATCH_TIMEOUT_MS") {
            let ms: u64 = parse_number("SIMMATCH_TIMEOUT_MS", &v)?;
            if ms == 0 {
                return Err(DomainError::InvalidInput(
                    "SIMMATCH_TIMEOUT_MS must be greater than zero".into(),
                ));
            }
            s.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("SIMMATCH_EMBEDDING_PROVIDER") {
            s.embedding_provider = v.to_lowercase();
        }
        if let Some(v) = lookup("SIMMATCH_EMBEDDING_API_KEY") {
            s.embedding_api_key = v;
        }
        s.embedding_model = lookup("SIMMATCH_EMBEDDING_MODEL").filter(|v| !v.is_empty());
        s.embedding_base_url = lookup("SIMMATCH_EMBEDDING_BASE_URL").filter(|v| !v.is_empty());
        if let Some(v) = lookup("SIMMATCH_AGENT_URL") {
            s.agent_url = v;
        }
        if let Some(v) = lookup("SIMMATCH_LOG") {
            s.log_level = v;
        }
        Ok(s)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DomainError::InvalidInput(format!("{key}={value}: {e}")))
}
