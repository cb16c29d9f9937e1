// Bundler-side configuration schema (rspack flavoured)
// This is what gets handed to the bundler engine; it serialises to the engine's camelCase JSON

use crate::core::models::Mode;
use crate::core::plugin::CompilerPlugin;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerConfiguration {
    pub entry: BTreeMap<String, Vec<PathBuf>>,
    pub name: String,
    pub mode: Mode,
    pub externals: BTreeMap<String, String>,
    pub output: OutputConfig,
    pub context: PathBuf,
    pub module: ModuleConfig,
    pub resolve: ResolveConfig,
    pub watch_options: WatchOptions,
    pub optimization: Optimization,
    #[serde(serialize_with = "serialize_plugin_names")]
    pub plugins: Vec<Arc<dyn CompilerPlugin>>,
    pub builtins: Builtins,
    pub stats: String,
    pub infrastructure_logging: InfrastructureLogging,
    pub dev_server: DevServerConfig,
}

impl BundlerConfiguration {
    pub fn add_plugin(&mut self, plugin: Arc<dyn CompilerPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

fn serialize_plugin_names<S>(
    plugins: &[Arc<dyn CompilerPlugin>],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(plugins.iter().map(|p| p.name()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub clean: bool,
    pub public_path: String,
    pub path: PathBuf,
    pub filename: String,
    pub css_filename: String,
    pub css_chunk_filename: String,
    pub asset_module_filename: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleConfig {
    pub rules: Vec<ModuleRule>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRule {
    /// Regex source matched against the resource path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_query: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<LoaderUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoaderUse {
    pub loader: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl LoaderUse {
    pub fn new(loader: &str, options: Value) -> Self {
        Self {
            loader: loader.to_string(),
            options,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveConfig {
    pub alias: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    /// Regex source of paths the watcher skips
    pub ignored: String,
    /// Milliseconds to wait after the first change before rebuilding
    pub aggregate_timeout: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub split_chunks: Value,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Builtins {
    pub define: BTreeMap<String, String>,
    pub provide: BTreeMap<String, Vec<String>>,
    pub dev_friendly_split_chunks: bool,
    pub css: CssBuiltins,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CssBuiltins {
    pub modules: CssModules,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CssModules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_ident_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfrastructureLogging {
    pub level: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServerConfig {
    pub allowed_hosts: String,
    pub headers: BTreeMap<String, String>,
    pub hot: bool,
    pub compress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Value>,
    pub dev_middleware: DevMiddleware,
    pub client: DevClient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub setup_middlewares: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevMiddleware {
    pub public_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevClient {
    pub logging: String,
}
