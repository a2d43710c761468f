// src/utils/env.rs

use log::{debug, info, warn};

/// Loads variables from a `.env` file in the working directory (or a parent),
/// without overriding variables already set in the environment.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(dotenv::Error::Io(e)) => {
            debug!("No .env file loaded ({}); using system environment variables", e)
        }
        Err(e) => warn!(
            "Could not parse .env file: {}. Proceeding with system environment variables.",
            e
        ),
    }
}
