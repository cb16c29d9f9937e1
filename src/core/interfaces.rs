use crate::core::bundler_config::BundlerConfiguration;
use crate::core::stats::CompilationStats;
use crate::utils::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// What triggered a compilation
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    /// Files changed since the previous compilation; empty on the first run
    pub modified_files: Vec<PathBuf>,
    pub is_rebuild: bool,
}

/// Bundler engine interface (webpack/rspack class), opaque to this crate
#[async_trait]
pub trait BundlerEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Compile every configuration and report the combined stats.
    async fn compile(
        &self,
        configs: &[BundlerConfiguration],
        request: &CompileRequest,
    ) -> Result<CompilationStats>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Node,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Esm,
    Cjs,
    Iife,
}

/// Options for one server-side (esbuild class) compilation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCompileOptions {
    /// Output name to entry file
    pub entry_points: BTreeMap<String, PathBuf>,
    pub outdir: PathBuf,
    pub platform: Platform,
    pub format: OutputFormat,
    pub define: BTreeMap<String, String>,
    pub externals: Vec<String>,
    pub bundle: bool,
    pub minify: bool,
    /// Keep the build context around so `rebuild` is available
    pub incremental: bool,
}

/// Output of a server compilation
#[derive(Clone, Default)]
pub struct ServerBuildResult {
    pub output_files: Vec<PathBuf>,
    /// Bundle the document renderer loads
    pub server_entry: Option<PathBuf>,
    pub errors: Vec<String>,
    /// Present for incremental builds
    pub rebuilder: Option<Arc<dyn IncrementalBuild>>,
}

impl ServerBuildResult {
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Debug for ServerBuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuildResult")
            .field("output_files", &self.output_files)
            .field("server_entry", &self.server_entry)
            .field("errors", &self.errors)
            .field("incremental", &self.rebuilder.is_some())
            .finish()
    }
}

/// Handle on a kept build context
#[async_trait]
pub trait IncrementalBuild: Send + Sync {
    async fn rebuild(&self) -> Result<ServerBuildResult>;
}

/// Server-side compiler interface, opaque to this crate
#[async_trait]
pub trait ServerCompiler: Send + Sync {
    async fn compile(&self, options: ServerCompileOptions) -> Result<ServerBuildResult>;
}
