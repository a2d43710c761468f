// src/config.rs
//! Runtime configuration read from the environment (and `.env`), with CLI
//! flags layered on top in `main`.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use log::{info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::matching::name::{NameScorer, DEFAULT_SIMILARITY_THRESHOLD};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "geo_locator";
pub const DEFAULT_GEOCODER_TIMEOUT_SECS: u64 = 1;
pub const DEFAULT_GEOCODE_CACHE_SIZE: usize = 1024;

/// Reads `key`, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid value for {}: '{}'", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One dict-style record per match.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: Url,
    pub user_agent: String,
    pub timeout: Duration,
    /// Minimum delay between two requests; zero disables throttling.
    pub min_interval: Duration,
    pub cache_size: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_GEOCODER_URL).expect("default geocoder URL is valid"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_GEOCODER_TIMEOUT_SECS),
            min_interval: Duration::ZERO,
            cache_size: DEFAULT_GEOCODE_CACHE_SIZE,
        }
    }
}

impl GeocoderConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let base_url = match env::var("GEOCODER_URL") {
            Ok(raw) => parse_base_url(&raw)?,
            Err(_) => defaults.base_url,
        };

        Ok(Self {
            base_url,
            user_agent: env::var("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(env_or(
                "GEOCODER_TIMEOUT_SECS",
                DEFAULT_GEOCODER_TIMEOUT_SECS,
            )),
            min_interval: Duration::from_millis(env_or("GEOCODER_MIN_INTERVAL_MS", 0)),
            cache_size: env_or("GEOCODER_CACHE_SIZE", DEFAULT_GEOCODE_CACHE_SIZE),
        })
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid geocoder URL '{}'", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Geocoder URL must be http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub database_url: Option<String>,
    pub threshold: u8,
    pub scorer: NameScorer,
    pub output_format: OutputFormat,
    pub geocoder: GeocoderConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            scorer: NameScorer::default(),
            output_format: OutputFormat::default(),
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl MatcherConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let threshold = match env::var("SIMILARITY_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<u8>()
                .with_context(|| format!("Invalid SIMILARITY_THRESHOLD '{}'", raw))?,
            Err(_) => DEFAULT_SIMILARITY_THRESHOLD,
        };

        let scorer = match env::var("SIMILARITY_SCORER") {
            Ok(raw) => match NameScorer::parse(&raw) {
                Some(scorer) => scorer,
                None => bail!("Unknown SIMILARITY_SCORER '{}'", raw),
            },
            Err(_) => NameScorer::default(),
        };

        let output_format = match env::var("OUTPUT_FORMAT") {
            Ok(raw) => match <OutputFormat as ValueEnum>::from_str(raw.trim(), true) {
                Ok(format) => format,
                Err(_) => bail!("Unknown OUTPUT_FORMAT '{}'", raw),
            },
            Err(_) => OutputFormat::default(),
        };

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            threshold,
            scorer,
            output_format,
            geocoder: GeocoderConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold > 100 {
            bail!("Similarity threshold must be within 0-100, got {}", self.threshold);
        }
        Ok(())
    }

    pub fn log_config(&self) {
        info!("⚙️  Similarity: scorer={:?}, threshold={}", self.scorer, self.threshold);
        info!(
            "⚙️  Geocoder: {} (user agent '{}', timeout {:?}, min interval {:?}, cache {})",
            self.geocoder.base_url,
            self.geocoder.user_agent,
            self.geocoder.timeout,
            self.geocoder.min_interval,
            self.geocoder.cache_size
        );
        info!("⚙️  Output format: {:?}", self.output_format);
    }
}
