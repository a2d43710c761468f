pub mod finder;
pub mod geocoder;
pub mod geospatial;
pub mod name;

pub use finder::{find_similar_cities, ScanStats, SimilaritySettings, CANDIDATE_COLUMNS};
pub use geocoder::{CachedGeocoder, Geocoder, NominatimGeocoder};
pub use geospatial::Coordinates;
pub use name::NameScorer;
