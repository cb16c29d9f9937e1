use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A diagnostic reported by the bundler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
}

impl StatsMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = Some(module_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsAsset {
    pub name: String,
    pub size: usize,
    #[serde(default)]
    pub chunk_names: Vec<String>,
}

/// Result of one compilation, as reported by the bundler engine
#[derive(Debug, Clone, Default)]
pub struct CompilationStats {
    pub hash: Option<String>,
    pub public_path: String,
    pub output_path: PathBuf,
    pub errors: Vec<StatsMessage>,
    pub warnings: Vec<StatsMessage>,
    pub assets: Vec<StatsAsset>,
    /// Entry name to the files it loads, in load order
    pub entrypoints: BTreeMap<String, Vec<String>>,
    pub time: Duration,
}

/// Which parts of the stats to include in `to_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsOptions {
    pub warnings: bool,
    pub errors: bool,
    pub timings: bool,
    pub assets: bool,
}

impl StatsOptions {
    /// Selection used when relaying a finished compilation
    pub fn summary() -> Self {
        Self {
            warnings: true,
            errors: true,
            timings: true,
            assets: true,
        }
    }
}

/// Serialisable subset of `CompilationStats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<StatsMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<StatsMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<StatsAsset>>,
}

impl CompilationStats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn to_json(&self, options: StatsOptions) -> StatsJson {
        StatsJson {
            errors: options.errors.then(|| self.errors.clone()),
            warnings: options.warnings.then(|| self.warnings.clone()),
            time: options.timings.then(|| self.time.as_millis()),
            assets: options.assets.then(|| self.assets.clone()),
        }
    }
}
