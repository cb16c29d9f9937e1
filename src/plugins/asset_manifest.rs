// Asset manifest plugin: records emitted entry files and asset sizes

use crate::core::plugin::{CompilerHooks, CompilerPlugin};
use crate::core::stats::CompilationStats;
use crate::utils::{Logger, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub public_path: String,
    pub entries: BTreeMap<String, Vec<String>>,
    pub assets: BTreeMap<String, usize>,
}

impl AssetManifest {
    pub fn from_stats(stats: &CompilationStats) -> Self {
        Self {
            public_path: stats.public_path.clone(),
            entries: stats.entrypoints.clone(),
            assets: stats
                .assets
                .iter()
                .map(|asset| (asset.name.clone(), asset.size))
                .collect(),
        }
    }
}

/// Writes the manifest of every compilation for the runtime to read
pub struct AssetManifestPlugin {
    file_name: String,
    output_dir: PathBuf,
}

impl AssetManifestPlugin {
    pub fn new(file_name: impl Into<String>, output_dir: PathBuf) -> Self {
        Self {
            file_name: file_name.into(),
            output_dir,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    pub async fn write(&self, stats: &CompilationStats) -> Result<()> {
        let manifest = AssetManifest::from_stats(stats);
        let content = serde_json::to_string_pretty(&manifest)?;
        write_file(&self.manifest_path(), &content).await?;
        Logger::debug(&format!(
            "Asset manifest written to {}",
            self.manifest_path().display()
        ));
        Ok(())
    }
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

impl CompilerPlugin for AssetManifestPlugin {
    fn name(&self) -> &str {
        "AssetManifestPlugin"
    }

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks) {
        hooks.emit.tap_promise("AssetManifestPlugin", move |stats| {
            let plugin = self.clone();
            async move { plugin.write(&stats).await }
        });
    }
}
