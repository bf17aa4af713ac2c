//! Error types for storecheck
//!
//! Error messages name the failing resource and, where it helps, how to
//! resolve the problem (wrong base URL, missing scenario, bad config).

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for storecheck
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Invalid base URL '{0}'. Expected something like http://localhost:8080")]
    InvalidBaseUrl(String),

    // === Scenario Errors ===
    #[error("Unknown scenario '{name}'. Available: {available}")]
    ScenarioNotFound { name: String, available: String },

    #[error("Invalid scenario: {0}")]
    ScenarioInvalid(String),

    #[error("Failed to parse scenario file: {0}")]
    ScenarioParse(String),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Mock Store Errors ===
    #[error("Mock store error: {0}")]
    MockStore(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a scenario-not-found error listing the known names
    pub fn scenario_not_found<S: AsRef<str>>(name: &str, available: &[S]) -> Self {
        Self::ScenarioNotFound {
            name: name.to_string(),
            available: available
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Create a file-read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
