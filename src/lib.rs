pub mod analysis;
pub mod config;
pub mod matching;
pub mod models;
pub mod tables;
pub mod utils;

pub use analysis::CityMatcher;
