//! Configuration file handling

use serde::Deserialize;
use std::path::Path;

use super::{Error, Result};

/// Default config file name, looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "storecheck.toml";

/// Main configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the API under test
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Account whose cart and orders the cart scenarios manipulate
    #[serde(default = "default_user_id")]
    pub user_id: u64,

    /// Connect timeout in seconds. The only transport bound; there is no
    /// total request timeout and no retry.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Which extraction strategy pulls fields out of response bodies
    #[serde(default)]
    pub extractor: Extractor,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: default_user_id(),
            connect_timeout_secs: default_connect_timeout(),
            extractor: Extractor::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_user_id() -> u64 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}

/// Strategy for extracting a named field from a response body
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Extractor {
    /// Positional text scan, the documented default
    #[default]
    Scan,
    /// Parse the body as JSON and read the top-level field
    Structured,
}

impl Config {
    /// Load configuration from a file
    ///
    /// With an explicit path, the file must exist and parse. Without one,
    /// `storecheck.toml` in the current directory is used if present,
    /// otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default.to_path_buf()
            }
        };

        let content =
            std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, &e))?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_missing_keys() {
        let config: Config = toml::from_str("base_url = \"http://10.0.0.5:9000\"").unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.user_id, 2);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.extractor, Extractor::Scan);
    }

    #[test]
    fn structured_extractor_parses() {
        let config: Config = toml::from_str("extractor = \"structured\"").unwrap();
        assert_eq!(config.extractor, Extractor::Structured);
    }
}
