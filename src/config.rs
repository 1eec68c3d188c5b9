use crate::matcher::{DEFAULT_ATTEMPT_TIMEOUT_MS, DEFAULT_ERROR_DISPLAY_MS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub level: String,
    pub strict: bool,
    pub attempt_timeout_ms: u64,
    pub error_display_ms: u64,
    pub show_hint: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "gate".to_string(),
            strict: false,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            error_display_ms: DEFAULT_ERROR_DISPLAY_MS,
            show_hint: true,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "plink") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("plink_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
