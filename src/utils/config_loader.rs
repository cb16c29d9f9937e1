use crate::core::models::{ImportStyleConfig, Mode, UserConfig};
use crate::utils::{IceError, Logger, Result};
use serde_json::Value;
use std::path::Path;

pub const CONFIG_FILE: &str = "ice.config.json";

/// Command line values that override the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub mode: Option<Mode>,
    pub public_path: Option<String>,
    pub output_dir: Option<String>,
    pub use_dev_server: Option<bool>,
    /// Extra `importStyle` libraries, added after the configured ones
    pub import_style_libraries: Vec<String>,
}

/// Config loader that supports config files with CLI override
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `ice.config.json` from the project root, if present
    pub fn load_from_file(root: &Path) -> Result<Option<UserConfig>> {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            Logger::debug(&format!("No {} found, using defaults", CONFIG_FILE));
            return Ok(None);
        }

        Logger::debug(&format!("Loading config from {}", config_path.display()));

        let content = std::fs::read_to_string(&config_path)?;
        let config: UserConfig = serde_json::from_str(&content)
            .map_err(|e| IceError::config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))?;

        Ok(Some(config))
    }

    /// Merge file config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(file_config: Option<UserConfig>, cli: CliOverrides) -> UserConfig {
        let mut config = file_config.unwrap_or_default();

        if let Some(mode) = cli.mode {
            config.mode = mode;
        }
        if cli.public_path.is_some() {
            config.public_path = cli.public_path;
        }
        if cli.output_dir.is_some() {
            config.output_dir = cli.output_dir;
        }
        if let Some(use_dev_server) = cli.use_dev_server {
            config.use_dev_server = use_dev_server;
        }

        for library_name in cli.import_style_libraries {
            if config.import_style.iter().any(|c| c.library_name == library_name) {
                continue;
            }
            config.import_style.push(ImportStyleConfig {
                library_name,
                style: Value::Bool(true),
                kebab_case: true,
            });
        }

        config
    }

    /// Generate example config file
    pub fn generate_example() -> String {
        let example = serde_json::json!({
            "mode": "development",
            "publicPath": "/",
            "outputDir": "build",
            "hash": false,
            "splitChunks": "chunks",
            "alias": { "@": "./src" },
            "define": { "__DEV__": true },
            "useDevServer": true,
            "useDataLoader": true,
            "server": { "format": "esm", "bundle": false },
            "importStyle": [
                { "libraryName": "antd", "style": true, "kebabCase": true }
            ]
        });
        serde_json::to_string_pretty(&example).unwrap_or_default()
    }
}
