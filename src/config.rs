use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default portfolio definition file.
fn default_portfolio_path() -> PathBuf {
    PathBuf::from("portfolio.json")
}

/// Default snapshot output file.
fn default_output_path() -> PathBuf {
    PathBuf::from("current_prices.json")
}

/// Price source endpoint overrides, mainly for testing against mock servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Base URL for the market/FX quote provider.
    pub quote_base_url: Option<String>,

    /// Base URL for the Tesouro Direto bonds catalog.
    pub bonds_base_url: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the portfolio definition. If relative, resolved from the
    /// config file location.
    pub portfolio_path: Option<PathBuf>,

    /// Path the snapshot is written to. If relative, resolved from the
    /// config file location.
    pub output_path: Option<PathBuf>,

    /// Price source endpoint settings.
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portfolio_path: None,
            output_path: None,
            sources: SourcesConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn resolve_path(base_dir: &Path, configured: Option<&PathBuf>, default: PathBuf) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base_dir.join(path),
            None => base_dir.join(default),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub portfolio_path: PathBuf,
    pub output_path: PathBuf,
    pub sources: SourcesConfig,
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// Relative paths are resolved from the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::resolve(config, config_dir))
    }

    /// Load config, falling back to defaults relative to the config file's
    /// intended directory when the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Ok(Self::resolve(Config::default(), config_dir))
        }
    }

    fn resolve(config: Config, config_dir: &Path) -> Self {
        Self {
            portfolio_path: Config::resolve_path(
                config_dir,
                config.portfolio_path.as_ref(),
                default_portfolio_path(),
            ),
            output_path: Config::resolve_path(
                config_dir,
                config.output_path.as_ref(),
                default_output_path(),
            ),
            sources: config.sources,
        }
    }
}
