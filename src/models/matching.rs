// src/models/matching.rs

use serde::Serialize;
use std::fmt;

use crate::models::table::Value;

/// A candidate city that passed the name-similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub geonameid: Value,
    pub name: String,
    pub region: Value,
    pub country: Value,
    pub cosine_similarity: f64,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'geonameid': {}, 'name': {}, 'region': {}, 'country': {}, 'cosine_similarity': {:?}}}",
            self.geonameid,
            Value::Text(self.name.clone()),
            self.region,
            self.country,
            self.cosine_similarity
        )
    }
}
