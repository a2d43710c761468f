// src/matching/finder.rs - Threshold scan over candidate cities
use anyhow::Result;
use indicatif::ProgressBar;
use log::{debug, info};

use crate::matching::geocoder::{CachedGeocoder, Geocoder};
use crate::matching::geospatial::Coordinates;
use crate::matching::name::{NameScorer, DEFAULT_SIMILARITY_THRESHOLD};
use crate::models::matching::MatchResult;
use crate::models::table::{Table, Value};
use crate::utils::progress_config::ProgressConfig;

/// Columns a candidate table must carry.
pub const CANDIDATE_COLUMNS: [&str; 4] = ["geonameid", "name", "region", "country"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilaritySettings {
    /// Minimum name score (0-100) a candidate needs to be geocoded.
    pub threshold: u8,
    pub scorer: NameScorer,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            scorer: NameScorer::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub rows_scanned: usize,
    pub rows_skipped: usize,
    pub geocode_lookups: usize,
}

/// Scans `candidates` in table order and returns every row whose name scores
/// at or above the threshold, enriched with the cosine similarity of the
/// geocoded target and candidate. Failed lookups count as (0, 0).
pub async fn find_similar_cities<G: Geocoder>(
    target_city: &str,
    candidates: &Table,
    settings: SimilaritySettings,
    geocoder: &G,
    progress: Option<&ProgressBar>,
) -> Result<(Vec<MatchResult>, ScanStats)> {
    let geonameid_idx = candidates.require_column("geonameid")?;
    let name_idx = candidates.require_column("name")?;
    let region_idx = candidates.require_column("region")?;
    let country_idx = candidates.require_column("country")?;

    let mut similar_cities = Vec::new();
    let mut stats = ScanStats::default();

    for row in &candidates.rows {
        stats.rows_scanned += 1;
        if let Some(pb) = progress {
            pb.inc(1);
        }

        let Value::Text(city_name) = &row[name_idx] else {
            stats.rows_skipped += 1;
            continue;
        };

        let similarity = settings.scorer.score(target_city, city_name);
        if similarity < settings.threshold {
            continue;
        }

        let target_coordinates = geocoder
            .geocode(target_city)
            .await
            .unwrap_or(Coordinates::ORIGIN);
        let city_coordinates = geocoder
            .geocode(city_name)
            .await
            .unwrap_or(Coordinates::ORIGIN);
        stats.geocode_lookups += 2;

        let cosine_similarity = target_coordinates.cosine_similarity(&city_coordinates);
        debug!(
            "Candidate '{}' scored {} (cosine {:.6})",
            city_name, similarity, cosine_similarity
        );

        similar_cities.push(MatchResult {
            geonameid: row[geonameid_idx].clone(),
            name: city_name.clone(),
            region: row[region_idx].clone(),
            country: row[country_idx].clone(),
            cosine_similarity,
        });
    }

    Ok((similar_cities, stats))
}

/// Geocoder-backed scanner. Every `find` call gets a fresh memoization cache,
/// so repeated place names (the target above all) are resolved once per scan.
pub struct SimilarityFinder<G> {
    geocoder: G,
    settings: SimilaritySettings,
    cache_size: usize,
    progress: ProgressConfig,
}

impl<G: Geocoder + Sync> SimilarityFinder<G> {
    pub fn new(geocoder: G, settings: SimilaritySettings, cache_size: usize) -> Self {
        Self {
            geocoder,
            settings,
            cache_size,
            progress: ProgressConfig::default(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> SimilaritySettings {
        self.settings
    }

    pub async fn find(
        &self,
        target_city: &str,
        candidates: &Table,
    ) -> Result<(Vec<MatchResult>, ScanStats)> {
        let geocoder = CachedGeocoder::new(&self.geocoder, self.cache_size);
        let pb = self
            .progress
            .create_progress_bar(candidates.len() as u64, "Scanning candidates");

        let result =
            find_similar_cities(target_city, candidates, self.settings, &geocoder, pb.as_ref())
                .await;
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let cache = geocoder.stats().await;
        info!(
            "Geocoder cache: {} hits, {} lookups sent to the service",
            cache.hits, cache.misses
        );
        result
    }
}
