// Assemble the bundler configuration for the web task from the user config

use crate::config::define::get_define_vars;
use crate::config::rules::{assets_rules, compilation_rule, css_rules, CompilationOptions, CssRuleOptions};
use crate::config::split_chunks::get_split_chunks;
use crate::core::bundler_config::{
    Builtins, BundlerConfiguration, CssBuiltins, CssModules, DevClient, DevMiddleware,
    DevServerConfig, InfrastructureLogging, ModuleConfig, Optimization, OutputConfig,
    ResolveConfig, WatchOptions,
};
use crate::core::models::{HashOption, UserConfig};
use crate::core::plugin::CompilerPlugin;
use crate::plugins::AssetManifestPlugin;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ASSET_MANIFEST_FILE: &str = "assets-manifest.json";
pub const REACT_REFRESH_RUNTIME: &str = "@ice/bundles/client/reactRefresh.cjs";

pub struct GetConfigOptions<'a> {
    pub root_dir: &'a Path,
    pub task_config: &'a UserConfig,
    /// Directory of generated runtime files, relative to the root
    pub runtime_tmp_dir: &'a str,
    pub expanded_envs: BTreeMap<String, String>,
    pub runtime_define_vars: BTreeMap<String, String>,
    pub routes_files: Vec<String>,
    pub local_ident_name: Option<String>,
    /// Plugins appended after the built-in ones
    pub plugins: Vec<Arc<dyn CompilerPlugin>>,
}

impl<'a> GetConfigOptions<'a> {
    pub fn new(root_dir: &'a Path, task_config: &'a UserConfig, runtime_tmp_dir: &'a str) -> Self {
        Self {
            root_dir,
            task_config,
            runtime_tmp_dir,
            expanded_envs: BTreeMap::new(),
            runtime_define_vars: BTreeMap::new(),
            routes_files: Vec::new(),
            local_ident_name: None,
            plugins: Vec::new(),
        }
    }
}

/// `hash: true` means `hash:8`; a template is used as is
pub fn hash_key(hash: Option<&HashOption>) -> String {
    match hash {
        Some(HashOption::Enabled(true)) => "hash:8".to_string(),
        Some(HashOption::Template(template)) => template.clone(),
        Some(HashOption::Enabled(false)) | None => String::new(),
    }
}

fn filename_pattern(dir: &str, ext: &str, hash_key: &str) -> String {
    if hash_key.is_empty() {
        format!("{}/[name].{}", dir, ext)
    } else {
        format!("{}/[name]-[{}].{}", dir, hash_key, ext)
    }
}

fn absolute_output_dir(root_dir: &Path, output_dir: &str) -> PathBuf {
    let output_dir = Path::new(output_dir);
    if output_dir.is_absolute() {
        output_dir.to_path_buf()
    } else {
        root_dir.join(output_dir)
    }
}

pub fn get_config(options: GetConfigOptions<'_>) -> BundlerConfiguration {
    let GetConfigOptions {
        root_dir,
        task_config,
        runtime_tmp_dir,
        expanded_envs,
        runtime_define_vars,
        routes_files,
        local_ident_name,
        plugins,
    } = options;

    let public_path = task_config
        .public_path
        .clone()
        .unwrap_or_else(|| "/".to_string());
    let output_path = absolute_output_dir(root_dir, task_config.output_dir.as_deref().unwrap_or("build"));
    let hash_key = hash_key(task_config.hash.as_ref());
    let css_filename = filename_pattern("css", "css", &hash_key);

    let mut rules = vec![compilation_rule(&CompilationOptions {
        root_dir,
        cache_dir: task_config.cache_dir.as_ref(),
        source_map: task_config.source_map.as_ref(),
        mode: task_config.mode,
        compile_includes: &task_config.compile_includes,
        swc_options: task_config.swc_options.as_ref(),
        polyfill: task_config.polyfill.as_deref(),
        routes_files: &routes_files,
    })];
    rules.extend(assets_rules());
    rules.extend(css_rules(&CssRuleOptions {
        root_dir,
        enable_rpx2vw: task_config.enable_rpx2_vw.unwrap_or(true),
        postcss_options: task_config.postcss.as_ref(),
    }));

    let mut all_plugins: Vec<Arc<dyn CompilerPlugin>> = vec![Arc::new(AssetManifestPlugin::new(
        ASSET_MANIFEST_FILE,
        root_dir.join(runtime_tmp_dir),
    ))];
    all_plugins.extend(plugins);

    let mut entry = BTreeMap::new();
    entry.insert(
        "main".to_string(),
        vec![root_dir.join(runtime_tmp_dir).join("entry.client.tsx")],
    );

    let mut provide = BTreeMap::new();
    provide.insert("process".to_string(), vec!["process/browser".to_string()]);
    provide.insert(
        "$ReactRefreshRuntime$".to_string(),
        vec![REACT_REFRESH_RUNTIME.to_string()],
    );

    BundlerConfiguration {
        entry,
        name: "web".to_string(),
        mode: task_config.mode,
        externals: task_config.externals.clone(),
        output: OutputConfig {
            clean: true,
            public_path: public_path.clone(),
            path: output_path,
            filename: filename_pattern("js", "js", &hash_key),
            css_filename: css_filename.clone(),
            css_chunk_filename: css_filename,
            asset_module_filename: "assets/[name].[hash:8][ext]".to_string(),
        },
        context: root_dir.to_path_buf(),
        module: ModuleConfig { rules },
        resolve: ResolveConfig {
            alias: task_config.alias.clone(),
        },
        watch_options: WatchOptions {
            ignored: "node_modules".to_string(),
            aggregate_timeout: 100,
        },
        optimization: Optimization {
            split_chunks: get_split_chunks(root_dir, task_config.split_chunks.as_ref()),
        },
        plugins: all_plugins,
        builtins: Builtins {
            define: get_define_vars(&task_config.define, &runtime_define_vars, &expanded_envs),
            provide,
            dev_friendly_split_chunks: true,
            css: CssBuiltins {
                modules: CssModules { local_ident_name },
            },
        },
        stats: "none".to_string(),
        infrastructure_logging: InfrastructureLogging {
            level: "warn".to_string(),
        },
        dev_server: dev_server_config(task_config, &public_path),
    }
}

fn dev_server_config(task_config: &UserConfig, public_path: &str) -> DevServerConfig {
    let overrides = &task_config.dev_server;

    let mut headers = BTreeMap::new();
    for key in [
        "Access-Control-Allow-Origin",
        "Access-Control-Allow-Methods",
        "Access-Control-Allow-Headers",
    ] {
        headers.insert(key.to_string(), "*".to_string());
    }
    headers.extend(overrides.headers.clone());

    DevServerConfig {
        allowed_hosts: overrides
            .allowed_hosts
            .clone()
            .unwrap_or_else(|| "all".to_string()),
        headers,
        hot: overrides.hot.unwrap_or(true),
        compress: overrides.compress.unwrap_or(false),
        proxy: task_config.proxy.clone(),
        dev_middleware: DevMiddleware {
            public_path: public_path.to_string(),
        },
        client: DevClient {
            logging: "info".to_string(),
        },
        host: overrides.host.clone(),
        port: overrides.port,
        https: overrides.https,
        setup_middlewares: task_config.middlewares.clone(),
        extra: overrides.extra.clone(),
    }
}
