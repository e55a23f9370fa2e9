use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: Option<String>,
    pub catalog: PathBuf,
    pub storage: StorageSettings,
    pub budgets: BudgetSettings,
    /// Prefix for config/secret lookups in the environment
    pub config_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("weavr"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSettings {
    pub attempts: u32,
    pub compiler_repairs: u32,
    pub engine_repairs: u32,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            attempts: 5,
            compiler_repairs: 5,
            engine_repairs: 1,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            catalog: PathBuf::from("tools.toml"),
            storage: StorageSettings::default(),
            budgets: BudgetSettings::default(),
            config_prefix: String::new(),
        }
    }
}

impl Settings {
    /// Load settings with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.toml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary = config_dir
                .join(project_name)
                .join(format!("{}.toml", project_name));
            if primary.exists() {
                match Self::load_from_file(&primary) {
                    Ok(settings) => return Ok(settings),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.toml
        let fallback = PathBuf::from(format!("{}.toml", env!("CARGO_PKG_NAME")));
        if fallback.exists() {
            match Self::load_from_file(&fallback) {
                Ok(settings) => return Ok(settings),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let settings: Self = toml::from_str(&content).context("Failed to parse config file")?;
        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(settings)
    }
}
