use core::fmt::{Debug, Display};
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "trail-bid.toml";
pub const ENV_PREFIX: &str = "TRAIL_BID_";

/// Settings for one run over one event directory.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Advisory ceiling on what a hasher bids within one time slot.
    pub bid_allowance: u64,
    /// Name of the persisted fairness draw, relative to the event directory.
    pub draw_order_file: String,
    /// What the persisted draw is bound to.
    pub dataset: String,
    /// Seed for a fresh draw.
    pub draw_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bid_allowance: 100,
            draw_order_file: "00-orderOfHashers.json".to_owned(),
            dataset: String::new(),
            draw_seed: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn draw_order_path(&self, event_directory: &Path) -> PathBuf {
        event_directory.join(&self.draw_order_file)
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Defaults, then `trail-bid.toml` in the event directory, then `TRAIL_BID_*`
/// environment variables.
pub fn get_config(event_directory: &Path) -> Result<Config, ConfigError> {
    let dataset = event_directory
        .canonicalize()
        .unwrap_or_else(|_| event_directory.to_path_buf())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Serialized::default("dataset", dataset))
        .merge(Toml::file(event_directory.join(CONFIG_FILE)))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(|err| ConfigError::Figment(Box::new(err)))
}
