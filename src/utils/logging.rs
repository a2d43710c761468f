// src/utils/logging.rs - Phase logging for one analysis run
use log::info;
use std::time::Instant;

#[derive(Clone)]
pub struct AnalysisLogger {
    target_city: String,
    start_time: Instant,
}

impl AnalysisLogger {
    pub fn new(target_city: &str) -> Self {
        Self {
            target_city: target_city.to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, threshold: u8) {
        info!(
            "[CITY] 🚀 Starting similar-city analysis for '{}' (threshold {})",
            self.target_city, threshold
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[CITY] 🔄 Phase: {} - {} [+{:.1}s]",
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!("[CITY] 🔄 Phase: {} [+{:.1}s]", phase, elapsed.as_secs_f32()),
        }
    }

    pub fn log_rows(&self, count: usize, what: &str) {
        info!("[CITY] 📊 {} {} rows", count, what);
    }

    pub fn log_completion(&self, candidates_scanned: usize, matches: usize, geocode_lookups: usize) {
        info!(
            "[CITY] ✅ Analysis for '{}' complete: {} candidates scanned, {} matches, {} geocoder lookups in {:.2?}",
            self.target_city,
            candidates_scanned,
            matches,
            geocode_lookups,
            self.start_time.elapsed()
        );
    }
}
