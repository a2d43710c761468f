// src/matching/geospatial.rs
use anyhow::{anyhow, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Stand-in used when a place cannot be geocoded.
    pub const ORIGIN: Coordinates = Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn as_vector(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    /// Cosine of the angle between the two (lat, lon) vectors.
    pub fn cosine_similarity(&self, other: &Coordinates) -> f64 {
        // Both are 2-vectors, so the length check cannot fail.
        cosine_similarity(&self.as_vector(), &other.as_vector()).unwrap_or(0.0)
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the result is not
/// finite.
pub fn cosine_similarity(v1_slice: &[f64], v2_slice: &[f64]) -> Result<f64> {
    if v1_slice.len() != v2_slice.len() {
        return Err(anyhow!(
            "Input vector lengths differ: {} vs {}",
            v1_slice.len(),
            v2_slice.len()
        ));
    }
    if v1_slice.is_empty() {
        return Err(anyhow!("Input vectors must not be empty"));
    }

    let v1 = ArrayView1::from(v1_slice);
    let v2 = ArrayView1::from(v2_slice);

    let dot_product = v1.dot(&v2);
    let mag1 = v1.dot(&v1).sqrt();
    let mag2 = v2.dot(&v2).sqrt();

    if mag1 == 0.0 || mag2 == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot_product / (mag1 * mag2);

    if similarity.is_nan() || similarity.is_infinite() {
        log::warn!(
            "Calculated similarity is NaN or Infinite. dot_product: {}, mag1: {}, mag2: {}. v1: {:?}, v2: {:?}",
            dot_product, mag1, mag2, v1_slice, v2_slice
        );
        return Ok(0.0);
    }

    Ok(similarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_identical_coordinates() {
        let paris = Coordinates::new(48.8534951, 2.3483915);
        assert!((paris.cosine_similarity(&paris) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_origin_is_zero_not_error() {
        let paris = Coordinates::new(48.8534951, 2.3483915);
        assert_eq!(paris.cosine_similarity(&Coordinates::ORIGIN), 0.0);
        assert_eq!(Coordinates::ORIGIN.cosine_similarity(&Coordinates::ORIGIN), 0.0);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        let north = Coordinates::new(10.0, 0.0);
        let east = Coordinates::new(0.0, 10.0);
        let south = Coordinates::new(-10.0, 0.0);
        assert!(north.cosine_similarity(&east).abs() < EPS);
        assert!((north.cosine_similarity(&south) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_nearby_cities_are_close_to_one() {
        let paris = Coordinates::new(48.8566, 2.3522);
        let versailles = Coordinates::new(48.8049, 2.1204);
        assert!(paris.cosine_similarity(&versailles) > 0.999);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        assert!(cosine_similarity(&[1.0, 2.0], &[1.0]).is_err());
        assert!(cosine_similarity(&[], &[]).is_err());
    }
}
