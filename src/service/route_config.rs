// Route export config: the routes' static exports compiled for the server

use crate::core::interfaces::{
    OutputFormat, Platform, ServerBuildResult, ServerCompileOptions, ServerCompiler,
};
use crate::service::constants::{ROUTES_CONFIG_ENTRY, RUNTIME_TMP_DIR};
use crate::utils::{IceError, Logger, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static ROUTE_CONFIGS: Lazy<DashMap<PathBuf, Arc<RouteExportConfig>>> = Lazy::new(DashMap::new);

/// Shared route export config of the project at `root_dir`
pub fn get_route_export_config(root_dir: &Path) -> Arc<RouteExportConfig> {
    ROUTE_CONFIGS
        .entry(root_dir.to_path_buf())
        .or_insert_with(|| Arc::new(RouteExportConfig::new(root_dir)))
        .clone()
}

pub struct RouteExportConfig {
    entry: PathBuf,
    outdir: PathBuf,
    stale: AtomicBool,
    result: RwLock<Option<ServerBuildResult>>,
    compiling: tokio::sync::Mutex<()>,
}

impl RouteExportConfig {
    pub fn new(root_dir: &Path) -> Self {
        let tmp_dir = root_dir.join(RUNTIME_TMP_DIR);
        Self {
            entry: tmp_dir.join(ROUTES_CONFIG_ENTRY),
            outdir: tmp_dir,
            stale: AtomicBool::new(true),
            result: RwLock::new(None),
            compiling: tokio::sync::Mutex::new(()),
        }
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Mark the compiled config outdated; the next ensure compiles again
    pub fn re_compile(&self, key: &str) {
        Logger::debug(&format!("Invalidated {}", key));
        self.stale.store(true, Ordering::SeqCst);
    }

    pub fn result(&self) -> Option<ServerBuildResult> {
        self.result.read().clone()
    }

    /// Compile the config when it is stale. Projects without routes config
    /// have nothing to compile.
    pub async fn ensure_routes_config(&self, server_compiler: &Arc<dyn ServerCompiler>) -> Result<()> {
        let _guard = self.compiling.lock().await;
        if !self.is_stale() {
            return Ok(());
        }

        if tokio::fs::try_exists(&self.entry).await? {
            let result = server_compiler.compile(self.compile_options()).await?;
            if !result.is_successful() {
                return Err(IceError::compile(format!(
                    "failed to compile {}: {}",
                    self.entry.display(),
                    result.errors.join("\n")
                )));
            }
            *self.result.write() = Some(result);
        }

        self.stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn compile_options(&self) -> ServerCompileOptions {
        let mut entry_points = BTreeMap::new();
        entry_points.insert("routes-config".to_string(), self.entry.clone());
        ServerCompileOptions {
            entry_points,
            outdir: self.outdir.clone(),
            platform: Platform::Node,
            format: OutputFormat::Esm,
            define: BTreeMap::new(),
            externals: Vec::new(),
            bundle: true,
            minify: false,
            incremental: false,
        }
    }
}
