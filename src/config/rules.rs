// Module rules: compilation of js/ts sources, static assets and stylesheets

use crate::core::bundler_config::{LoaderUse, ModuleRule};
use crate::core::models::{Mode, SourceMapOption};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

pub const COMPILATION_LOADER: &str = "@ice/shared-config/compilation-loader";
pub const POSTCSS_LOADER: &str = "postcss-loader";
pub const LESS_LOADER: &str = "less-loader";
pub const SASS_LOADER: &str = "sass-loader";
pub const RPX2VW_PLUGIN: &str = "postcss-plugin-rpx2vw";

/// Inline assets below this size as data urls
const DATA_URL_MAX_SIZE: u64 = 8 * 1024;

pub struct CompilationOptions<'a> {
    pub root_dir: &'a Path,
    pub cache_dir: Option<&'a PathBuf>,
    pub source_map: Option<&'a SourceMapOption>,
    pub mode: Mode,
    pub compile_includes: &'a [String],
    pub swc_options: Option<&'a Value>,
    pub polyfill: Option<&'a str>,
    pub routes_files: &'a [String],
}

/// Packages under node_modules are left alone unless explicitly included
pub fn compile_excludes(compile_includes: &[String]) -> Vec<String> {
    if compile_includes.is_empty() {
        return vec![r"node_modules".to_string()];
    }

    let includes = compile_includes
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    vec![format!(r"node_modules[\\/](?!({})[\\/])", includes)]
}

pub fn compilation_rule(options: &CompilationOptions<'_>) -> ModuleRule {
    let cache_dir = options
        .cache_dir
        .cloned()
        .unwrap_or_else(|| options.root_dir.join("node_modules").join(".cache"));

    let loader_options = json!({
        "rootDir": options.root_dir,
        "cacheDir": cache_dir,
        "sourceMap": options.source_map,
        "mode": options.mode.as_str(),
        "fastRefresh": false,
        "enableEnv": true,
        "compileIncludes": options.compile_includes,
        "swcOptions": options.swc_options,
        "polyfill": options.polyfill,
        "routesFiles": options.routes_files,
    });

    ModuleRule {
        test: Some(r"\.(jsx?|tsx?|mjs|cjs)$".to_string()),
        exclude: compile_excludes(options.compile_includes),
        uses: vec![LoaderUse::new(COMPILATION_LOADER, loader_options)],
        ..Default::default()
    }
}

pub fn assets_rules() -> Vec<ModuleRule> {
    vec![
        ModuleRule {
            test: Some(r"\.(png|jpe?g|gif|webp|avif|ico|svg)$".to_string()),
            rule_type: Some("asset".to_string()),
            parser: Some(json!({ "dataUrlCondition": { "maxSize": DATA_URL_MAX_SIZE } })),
            ..Default::default()
        },
        ModuleRule {
            test: Some(r"\.(woff2?|ttf|eot|otf)$".to_string()),
            rule_type: Some("asset/resource".to_string()),
            ..Default::default()
        },
        ModuleRule {
            resource_query: Some("raw".to_string()),
            rule_type: Some("asset/source".to_string()),
            ..Default::default()
        },
        ModuleRule {
            resource_query: Some("url".to_string()),
            rule_type: Some("asset/resource".to_string()),
            ..Default::default()
        },
    ]
}

pub struct CssRuleOptions<'a> {
    pub root_dir: &'a Path,
    pub enable_rpx2vw: bool,
    pub postcss_options: Option<&'a Value>,
}

/// Rules for css, less and sass; `*.module.*` files become css modules via `css/auto`
pub fn css_rules(options: &CssRuleOptions<'_>) -> Vec<ModuleRule> {
    let postcss = LoaderUse::new(POSTCSS_LOADER, postcss_loader_options(options));

    let preprocessors: [(&str, Option<LoaderUse>); 3] = [
        (r"\.css$", None),
        (
            r"\.less$",
            Some(LoaderUse::new(
                LESS_LOADER,
                json!({ "lessOptions": { "javascriptEnabled": true } }),
            )),
        ),
        (
            r"\.(scss|sass)$",
            Some(LoaderUse::new(SASS_LOADER, Value::Null)),
        ),
    ];

    preprocessors
        .into_iter()
        .map(|(test, preprocessor)| {
            let mut uses = vec![postcss.clone()];
            uses.extend(preprocessor);
            ModuleRule {
                test: Some(test.to_string()),
                rule_type: Some("css/auto".to_string()),
                uses,
                ..Default::default()
            }
        })
        .collect()
}

fn postcss_loader_options(options: &CssRuleOptions<'_>) -> Value {
    let mut postcss_options = match options.postcss_options {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    let mut plugins = match postcss_options.remove("plugins") {
        Some(Value::Array(plugins)) => plugins,
        _ => Vec::new(),
    };
    if options.enable_rpx2vw {
        plugins.push(json!([RPX2VW_PLUGIN, {}]));
    }
    postcss_options.insert("plugins".to_string(), Value::Array(plugins));
    postcss_options.insert(
        "config".to_string(),
        Value::String(options.root_dir.to_string_lossy().into_owned()),
    );

    json!({ "postcssOptions": postcss_options })
}
