// Data loader plugin: compiles the route data loader for the browser

use crate::core::interfaces::{OutputFormat, Platform, ServerCompileOptions, ServerCompiler};
use crate::core::plugin::{CompilerHooks, CompilerPlugin};
use crate::service::constants::{
    DATA_LOADER_ENTRY, IMPORT_META_RENDERER, IMPORT_META_TARGET, RUNTIME_TMP_DIR,
};
use crate::utils::{IceError, Logger, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub struct DataLoaderPlugin {
    server_compiler: Arc<dyn ServerCompiler>,
    target: String,
    root_dir: PathBuf,
    output_dir: PathBuf,
}

impl DataLoaderPlugin {
    pub fn new(
        server_compiler: Arc<dyn ServerCompiler>,
        target: impl Into<String>,
        root_dir: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            server_compiler,
            target: target.into(),
            root_dir,
            output_dir,
        }
    }

    pub fn entry(&self) -> PathBuf {
        self.root_dir.join(RUNTIME_TMP_DIR).join(DATA_LOADER_ENTRY)
    }

    fn compile_options(&self) -> ServerCompileOptions {
        let mut entry_points = BTreeMap::new();
        entry_points.insert("data-loader".to_string(), self.entry());

        let mut define = BTreeMap::new();
        define.insert(IMPORT_META_TARGET.to_string(), json_string(&self.target));
        define.insert(IMPORT_META_RENDERER.to_string(), json_string("client"));

        ServerCompileOptions {
            entry_points,
            outdir: self.output_dir.join("js"),
            platform: Platform::Browser,
            format: OutputFormat::Iife,
            define,
            externals: Vec::new(),
            bundle: true,
            minify: false,
            incremental: false,
        }
    }

    /// Compile the data loader; a project without one is skipped.
    pub async fn compile(&self) -> Result<bool> {
        if !tokio::fs::try_exists(self.entry()).await? {
            Logger::debug("No data loader found, skipping");
            return Ok(false);
        }

        let result = self.server_compiler.compile(self.compile_options()).await?;
        if !result.is_successful() {
            return Err(IceError::plugin(
                "DataLoaderPlugin",
                result.errors.join("\n"),
            ));
        }
        Ok(true)
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

impl CompilerPlugin for DataLoaderPlugin {
    fn name(&self) -> &str {
        "DataLoaderPlugin"
    }

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks) {
        hooks.emit.tap_promise("DataLoaderPlugin", move |_stats| {
            let plugin = self.clone();
            async move { plugin.compile().await.map(|_| ()) }
        });
    }
}
