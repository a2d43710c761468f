// src/analysis.rs - Load, merge, project, match, print
use anyhow::{Context, Result};
use log::info;
use std::io::{self, Write};

use crate::config::{MatcherConfig, OutputFormat};
use crate::matching::finder::{SimilarityFinder, SimilaritySettings, CANDIDATE_COLUMNS};
use crate::matching::geocoder::{Geocoder, NominatimGeocoder};
use crate::models::matching::MatchResult;
use crate::models::table::Table;
use crate::tables::loader::{self, SourceTable};
use crate::tables::merge;
use crate::utils::db_connect::{self, PgPool};
use crate::utils::logging::AnalysisLogger;
use crate::utils::progress_config::ProgressConfig;

/// The four source tables as loaded, before any column trimming.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub countries: Table,
    pub cities: Table,
    pub admin_codes: Table,
    pub alternatenames: Table,
}

impl LoadedTables {
    /// Drops the columns that would otherwise collide during the merge and
    /// returns the tables in merge order.
    pub fn into_merge_inputs(self) -> Result<[Table; 4]> {
        let alternatenames = self
            .alternatenames
            .drop_columns(&["alternateNameId", "name"])
            .context("Failed to trim alternatenames")?;
        let admin_codes = self
            .admin_codes
            .drop_columns(&["geonameid"])
            .context("Failed to trim admin_codes")?;
        let countries = self
            .countries
            .drop_columns(&["geonameid"])
            .context("Failed to trim countries")?;

        Ok([self.cities, alternatenames, admin_codes, countries])
    }
}

/// Runs everything after loading: trim, merge, project and scan.
pub async fn analyze_tables<G: Geocoder + Sync>(
    finder: &SimilarityFinder<G>,
    target_city: &str,
    tables: LoadedTables,
    logger: &AnalysisLogger,
) -> Result<Vec<MatchResult>> {
    logger.log_phase("Merging tables", None);
    let merged = merge::merge_tables(tables.into_merge_inputs()?)?;
    logger.log_rows(merged.len(), "merged");

    let city_list = merged
        .select(&CANDIDATE_COLUMNS)
        .context("Merged table lacks candidate columns")?;

    logger.log_phase("Finding similar cities", Some(target_city));
    let (similar_cities, stats) = finder.find(target_city, &city_list).await?;
    logger.log_completion(stats.rows_scanned, similar_cities.len(), stats.geocode_lookups);

    Ok(similar_cities)
}

/// Writes one record per match in the requested format.
pub fn write_results(
    results: &[MatchResult],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    for city_info in results {
        match format {
            OutputFormat::Text => writeln!(out, "{}", city_info)?,
            OutputFormat::Json => {
                let line = serde_json::to_string(city_info).context("Failed to serialize match")?;
                writeln!(out, "{}", line)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Finds cities whose names resemble a target city.
///
/// Owns the database pool for its whole lifetime; dropping the matcher (or
/// calling [`CityMatcher::close`]) releases the connection.
pub struct CityMatcher<G = NominatimGeocoder> {
    pool: PgPool,
    finder: SimilarityFinder<G>,
    output_format: OutputFormat,
}

impl CityMatcher<NominatimGeocoder> {
    /// Opens the database and builds the HTTP geocoder described by `config`.
    pub async fn connect(database_url: &str, config: &MatcherConfig) -> Result<Self> {
        let pool = db_connect::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        let geocoder = NominatimGeocoder::new(&config.geocoder)?;
        Ok(Self::with_geocoder(pool, geocoder, config))
    }
}

impl<G: Geocoder + Sync> CityMatcher<G> {
    pub fn with_geocoder(pool: PgPool, geocoder: G, config: &MatcherConfig) -> Self {
        let settings = SimilaritySettings {
            threshold: config.threshold,
            scorer: config.scorer,
        };
        Self {
            pool,
            finder: SimilarityFinder::new(geocoder, settings, config.geocoder.cache_size)
                .with_progress(ProgressConfig::from_env()),
            output_format: config.output_format,
        }
    }

    pub async fn load_table(&self, table: SourceTable) -> Result<Table> {
        let conn = self
            .pool
            .get()
            .await
            .with_context(|| format!("Failed to get DB connection for '{}'", table))?;
        loader::load_table(&*conn, table).await
    }

    pub async fn find_similar_cities(
        &self,
        target_city: &str,
        city_list: &Table,
    ) -> Result<Vec<MatchResult>> {
        let (similar_cities, _) = self.finder.find(target_city, city_list).await?;
        Ok(similar_cities)
    }

    /// Every step of the analysis except printing.
    pub async fn analyze(&self, target_city: &str) -> Result<Vec<MatchResult>> {
        let logger = AnalysisLogger::new(target_city);
        logger.log_start(self.finder.settings().threshold);

        logger.log_phase("Loading tables", None);
        let tables = LoadedTables {
            countries: self.load_table(SourceTable::Countries).await?,
            cities: self.load_table(SourceTable::Cities).await?,
            admin_codes: self.load_table(SourceTable::AdminCodes).await?,
            alternatenames: self.load_table(SourceTable::AlternateNames).await?,
        };

        analyze_tables(&self.finder, target_city, tables, &logger).await
    }

    /// Runs the analysis and prints each match to stdout.
    pub async fn run_analysis(&self, target_city: &str) -> Result<()> {
        let similar_cities = self.analyze(target_city).await?;
        let stdout = io::stdout();
        write_results(&similar_cities, self.output_format, &mut stdout.lock())
    }

    /// Releases the database connection.
    pub fn close(self) {
        let (connections, idle) = db_connect::get_pool_status(&self.pool);
        info!(
            "Closing database pool ({} connections, {} idle)",
            connections, idle
        );
        drop(self.pool);
    }
}
