use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Framework command the bundler runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Start,
    Build,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Build => "build",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

/// Arguments given on the command line; `target` may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandArgs {
    pub target: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Urls {
    pub local: Option<String>,
    pub network: Option<String>,
}

/// `hash: true` or a custom template such as `contenthash:6`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashOption {
    Enabled(bool),
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceMapOption {
    Enabled(bool),
    Devtool(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitChunksStrategy {
    Chunks,
    Vendors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SplitChunksOption {
    Enabled(bool),
    Strategy(SplitChunksStrategy),
    Custom(Map<String, Value>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerFormat {
    #[default]
    Esm,
    Cjs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Custom server entry, relative to the project root
    pub entry: Option<PathBuf>,
    pub format: ServerFormat,
    pub bundle: bool,
    pub externals: Vec<String>,
}

/// Dev server keys a user may override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_hosts: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `importStyle` entry of the user config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStyleConfig {
    pub library_name: String,
    /// `true` for `<library>/es/<name>/style`, or a template where `{name}` is replaced
    #[serde(default = "default_style")]
    pub style: Value,
    #[serde(default = "default_true")]
    pub kebab_case: bool,
}

fn default_style() -> Value {
    Value::Bool(true)
}

fn default_true() -> bool {
    true
}

/// User-facing build configuration shared by every task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub mode: Mode,
    pub public_path: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub output_dir: Option<String>,
    pub source_map: Option<SourceMapOption>,
    pub externals: BTreeMap<String, String>,
    pub alias: BTreeMap<String, String>,
    pub compile_includes: Vec<String>,
    pub polyfill: Option<String>,
    pub swc_options: Option<Value>,
    pub hash: Option<HashOption>,
    pub define: BTreeMap<String, Value>,
    pub split_chunks: Option<SplitChunksOption>,
    pub enable_rpx2_vw: Option<bool>,
    pub postcss: Option<Value>,
    pub proxy: Option<Value>,
    pub dev_server: DevServerOverrides,
    pub middlewares: Vec<String>,
    pub use_dev_server: bool,
    pub use_data_loader: bool,
    pub server: ServerConfig,
    pub import_style: Vec<ImportStyleConfig>,
}

/// One build task: a name plus the config it runs with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    pub name: String,
    pub config: UserConfig,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, config: UserConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_from_json() {
        let config: UserConfig = serde_json::from_str(
            r#"{
                "mode": "production",
                "hash": "contenthash:6",
                "splitChunks": "vendors",
                "enableRpx2Vw": false,
                "useDevServer": true,
                "server": { "format": "cjs" },
                "importStyle": [{ "libraryName": "antd" }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.hash, Some(HashOption::Template("contenthash:6".to_string())));
        assert_eq!(
            config.split_chunks,
            Some(SplitChunksOption::Strategy(SplitChunksStrategy::Vendors))
        );
        assert_eq!(config.enable_rpx2_vw, Some(false));
        assert!(config.use_dev_server);
        assert_eq!(config.server.format, ServerFormat::Cjs);
        assert_eq!(config.import_style[0].style, Value::Bool(true));
        assert!(config.import_style[0].kebab_case);
    }

    #[test]
    fn test_split_chunks_variants() {
        let flag: SplitChunksOption = serde_json::from_str("false").unwrap();
        assert_eq!(flag, SplitChunksOption::Enabled(false));

        let custom: SplitChunksOption = serde_json::from_str(r#"{"chunks":"all"}"#).unwrap();
        assert!(matches!(custom, SplitChunksOption::Custom(_)));

        assert!(serde_json::from_str::<SplitChunksOption>(r#""unknown""#).is_err());
    }

    #[test]
    fn test_dev_server_overrides_keep_unknown_keys() {
        let overrides: DevServerOverrides =
            serde_json::from_str(r#"{"port": 4000, "historyApiFallback": true}"#).unwrap();
        assert_eq!(overrides.port, Some(4000));
        assert_eq!(overrides.extra.get("historyApiFallback"), Some(&Value::Bool(true)));
    }
}
