use anyhow::Context;
use serde::Deserialize;
use std::{fs, time::Duration};
use time::{macros::format_description, Time, UtcOffset};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub apply_schema: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolarConfig {
    pub api_url: String,
    pub site_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SolarConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveConfig {
    pub base_url: String,
    #[serde(default = "default_run_at")]
    pub run_at: String,
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ReserveConfig {
    /// Local wall-clock time of the daily run, `HH:MM`.
    pub fn run_at_time(&self) -> anyhow::Result<Time> {
        Time::parse(&self.run_at, format_description!("[hour]:[minute]"))
            .with_context(|| format!("invalid reserve.run_at {:?}, expected HH:MM", self.run_at))
    }

    /// Offset the run time and target day are computed in, `+HH:MM`.
    pub fn offset(&self) -> anyhow::Result<UtcOffset> {
        UtcOffset::parse(
            &self.utc_offset,
            format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
        )
        .with_context(|| format!("invalid reserve.utc_offset {:?}, expected +HH:MM", self.utc_offset))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub bind_addr: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub solar: SolarConfig,
    pub reserve: ReserveConfig,
    pub upload: Option<UploadConfig>,
    pub metrics: Option<MetricsConfig>,
}

fn default_max_connections() -> u32 {
    10
}
fn default_acquire_timeout_secs() -> u64 {
    10
}
fn default_statement_timeout_ms() -> u64 {
    30_000
}
fn default_true() -> bool {
    true
}
fn default_interval_secs() -> u64 {
    900
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_run_at() -> String {
    "02:00".to_string()
}
fn default_utc_offset() -> String {
    "+08:00".to_string()
}
fn default_channel_capacity() -> usize {
    1024
}
fn default_batch_size() -> usize {
    100
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    200
}
fn default_sites() -> Vec<String> {
    ["north", "central", "south"].map(String::from).to_vec()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("VPP_CONFIG").unwrap_or_else(|_| "vpp-config.toml".to_string());
        let contents = fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
        let mut cfg = Self::from_toml_str(&contents).with_context(|| format!("loading config {path}"))?;

        if let Ok(uri) = env::var("DATABASE_URL") {
            if !uri.is_empty() {
                cfg.database.uri = uri;
            }
        }
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.reserve.run_at_time()?;
        self.reserve.offset()?;
        anyhow::ensure!(!self.solar.site_id.is_empty(), "solar.site_id must not be empty");
        anyhow::ensure!(self.solar.interval_secs > 0, "solar.interval_secs must be positive");
        if let Some(upload) = &self.upload {
            anyhow::ensure!(!upload.sites.is_empty(), "upload.sites must not be empty");
        }
        Ok(())
    }
}
