// src/matching/geocoder.rs - Free-text place lookup and per-analysis memoization
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use lru::LruCache;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

use crate::config::GeocoderConfig;
use crate::matching::geospatial::Coordinates;

/// Resolves a free-text place name to coordinates.
///
/// `None` covers every failure mode: no result, transport error, bad payload.
pub trait Geocoder {
    fn geocode(&self, place: &str) -> impl Future<Output = Option<Coordinates>> + Send;
}

impl<G: Geocoder + Sync> Geocoder for &G {
    fn geocode(&self, place: &str) -> impl Future<Output = Option<Coordinates>> + Send {
        (**self).geocode(place)
    }
}

/// One entry of a Nominatim `/search?format=json` response.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Takes the first place of a search response. Coordinates arrive as strings.
fn parse_search_response(body: &str) -> Result<Option<Coordinates>> {
    let places: Vec<NominatimPlace> =
        serde_json::from_str(body).context("Failed to parse geocoder response")?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let latitude: f64 = place
        .lat
        .trim()
        .parse()
        .with_context(|| format!("Invalid latitude '{}'", place.lat))?;
    let longitude: f64 = place
        .lon
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude '{}'", place.lon))?;

    if let Some(name) = &place.display_name {
        debug!("Geocoder resolved to '{}' ({}, {})", name, latitude, longitude);
    }
    Ok(Some(Coordinates::new(latitude, longitude)))
}

fn search_endpoint(base_url: &Url) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("search")
        .with_context(|| format!("Invalid geocoder base URL '{}'", base_url))
}

/// Geocoder backed by a Nominatim-compatible HTTP search API.
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .context("Failed to build geocoder HTTP client")?;

        Ok(Self {
            client,
            search_url: search_endpoint(&config.base_url)?,
            min_interval: config.min_interval,
            last_request: Mutex::new(None),
        })
    }

    pub fn search_url_for(&self, place: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", place)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }

    async fn throttle(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn lookup(&self, place: &str) -> Result<Option<Coordinates>> {
        self.throttle().await;

        let response = self
            .client
            .get(self.search_url_for(place))
            .send()
            .await
            .context("Failed to send geocoder request")?;

        if !response.status().is_success() {
            return Err(anyhow!("Geocoder returned status: {}", response.status()));
        }

        let body = response
            .text()
            .await
            .context("Failed to read geocoder response")?;
        parse_search_response(&body)
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, place: &str) -> Option<Coordinates> {
        match self.lookup(place).await {
            Ok(Some(coordinates)) => Some(coordinates),
            Ok(None) => {
                debug!("Geocoder found no match for '{}'", place);
                None
            }
            Err(e) => {
                warn!("Geocoding '{}' failed: {:#}", place, e);
                None
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

struct CacheState {
    entries: LruCache<String, Coordinates>,
    stats: CacheStats,
}

/// Memoizes resolved lookups by place name. Misses are not cached, so an
/// unresolved name is looked up again next time.
pub struct CachedGeocoder<G> {
    inner: G,
    state: Mutex<CacheState>,
}

impl<G: Geocoder + Sync> CachedGeocoder<G> {
    pub fn new(inner: G, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats
    }
}

impl<G: Geocoder + Sync> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, place: &str) -> Option<Coordinates> {
        {
            let mut state = self.state.lock().await;
            if let Some(coordinates) = state.entries.get(place).copied() {
                state.stats.hits += 1;
                return Some(coordinates);
            }
            state.stats.misses += 1;
        }

        let resolved = self.inner.geocode(place).await;
        if let Some(coordinates) = resolved {
            self.state
                .lock()
                .await
                .entries
                .put(place.to_string(), coordinates);
        }
        resolved
    }
}
