use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::time::{Duration, Instant};

use city_match_lib::config::{parse_base_url, MatcherConfig, OutputFormat};
use city_match_lib::matching::name::NameScorer;
use city_match_lib::utils::env::load_env;
use city_match_lib::CityMatcher;

#[derive(Parser)]
#[command(author, version, about = "Find GeoNames cities whose names resemble a target city", long_about = None)]
struct Args {
    /// City name to compare every candidate against
    target_city: String,

    /// PostgreSQL connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Minimum name similarity (0-100) for a candidate to match
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    threshold: Option<u8>,

    /// Name similarity measure
    #[arg(long, value_enum)]
    scorer: Option<NameScorer>,

    /// How matches are printed
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Base URL of a Nominatim-compatible geocoding service
    #[arg(long)]
    geocoder_url: Option<String>,

    /// Geocoder request timeout in seconds
    #[arg(long)]
    geocoder_timeout_secs: Option<u64>,

    /// User-Agent sent to the geocoder
    #[arg(long)]
    user_agent: Option<String>,
}

impl Args {
    fn apply(self, config: &mut MatcherConfig) -> Result<String> {
        if let Some(url) = self.database_url {
            config.database_url = Some(url);
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(scorer) = self.scorer {
            config.scorer = scorer;
        }
        if let Some(format) = self.format {
            config.output_format = format;
        }
        if let Some(url) = self.geocoder_url {
            config.geocoder.base_url = parse_base_url(&url)?;
        }
        if let Some(secs) = self.geocoder_timeout_secs {
            config.geocoder.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = self.user_agent {
            config.geocoder.user_agent = user_agent;
        }
        config.validate()?;
        Ok(self.target_city)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::init();
    load_env();

    let args = Args::parse();
    let mut config = MatcherConfig::from_env().context("Failed to load configuration")?;
    let target_city = args.apply(&mut config)?;
    config.log_config();

    let database_url = config
        .database_url
        .clone()
        .context("No database configured: pass --database-url or set DATABASE_URL")?;

    let start = Instant::now();
    let matcher = CityMatcher::connect(&database_url, &config).await?;
    info!("Successfully connected to the database");

    let outcome = matcher.run_analysis(&target_city).await;
    matcher.close();
    outcome?;

    info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
