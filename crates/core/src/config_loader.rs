//! Configuration loading with file and environment layering.

use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::config::BacktestConfig;

/// Environment variable prefix; `ODDSGAP_GRID__ENTRY_MIN` overrides
/// `grid.entry_min`.
pub const ENV_PREFIX: &str = "ODDSGAP_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, a TOML file, and
    /// environment variables (highest precedence).
    ///
    /// The file may be absent; defaults plus environment still apply.
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or a value fails to
    /// deserialize. Validation is the caller's responsibility.
    pub fn load(path: &Path) -> Result<BacktestConfig> {
        Figment::from(Serialized::defaults(BacktestConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.display()))
    }
}
