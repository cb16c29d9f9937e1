use crate::core::models::{SplitChunksOption, SplitChunksStrategy};
use serde_json::{json, Value};
use std::path::Path;

/// Packages bundled into the `framework` chunk
const FRAMEWORK_BUNDLES: &[&str] = &[
    "react",
    "react-dom",
    "@ice/runtime",
    "@ice/jsx-runtime",
    "react-router",
    "react-router-dom",
    "scheduler",
];

/// Resolve the `optimization.splitChunks` value for a user option.
///
/// A user object is passed through verbatim; `true`/absent means the
/// `chunks` strategy and `false` disables splitting.
pub fn get_split_chunks(root_dir: &Path, option: Option<&SplitChunksOption>) -> Value {
    match option {
        Some(SplitChunksOption::Custom(map)) => Value::Object(map.clone()),
        Some(SplitChunksOption::Enabled(false)) => disabled(),
        Some(SplitChunksOption::Strategy(SplitChunksStrategy::Vendors)) => vendors_strategy(),
        Some(SplitChunksOption::Enabled(true))
        | Some(SplitChunksOption::Strategy(SplitChunksStrategy::Chunks))
        | None => chunks_strategy(root_dir),
    }
}

fn disabled() -> Value {
    json!({
        "minChunks": u32::MAX,
        "cacheGroups": { "default": false, "defaultVendors": false },
    })
}

fn vendors_strategy() -> Value {
    json!({
        "chunks": "all",
        "cacheGroups": {
            "vendors": {
                "test": r"[\\/]node_modules[\\/]",
                "name": "vendors",
                "priority": 10,
                "enforce": true,
            },
        },
    })
}

fn chunks_strategy(root_dir: &Path) -> Value {
    let node_modules = root_dir.join("node_modules");
    let framework_test = format!(
        r"{}[\\/]({})[\\/]",
        regex::escape(&node_modules.to_string_lossy()),
        FRAMEWORK_BUNDLES
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|")
    );

    json!({
        "chunks": "all",
        "cacheGroups": {
            "framework": {
                "name": "framework",
                "chunks": "all",
                "test": framework_test,
                "priority": 40,
                "enforce": true,
            },
            "lib": {
                "test": r"[\\/]node_modules[\\/]",
                "minSize": 100_000,
                "minChunks": 1,
                "priority": 30,
                "reuseExistingChunk": true,
            },
        },
        "maxInitialRequests": 25,
        "minSize": 20_000,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_default_is_chunks_strategy() {
        let value = get_split_chunks(Path::new("/app"), None);
        assert_eq!(value["cacheGroups"]["framework"]["name"], "framework");
        assert!(value["cacheGroups"]["framework"]["test"]
            .as_str()
            .unwrap()
            .contains("react-dom"));
        assert_eq!(value, get_split_chunks(Path::new("/app"), Some(&SplitChunksOption::Enabled(true))));
    }

    #[test]
    fn test_disabled_and_vendors() {
        let disabled = get_split_chunks(Path::new("/app"), Some(&SplitChunksOption::Enabled(false)));
        assert_eq!(disabled["cacheGroups"]["default"], false);

        let vendors = get_split_chunks(
            Path::new("/app"),
            Some(&SplitChunksOption::Strategy(SplitChunksStrategy::Vendors)),
        );
        assert_eq!(vendors["cacheGroups"]["vendors"]["name"], "vendors");
    }

    #[test]
    fn test_custom_object_passes_through() {
        let mut map = Map::new();
        map.insert("chunks".to_string(), json!("async"));
        let value = get_split_chunks(Path::new("/app"), Some(&SplitChunksOption::Custom(map)));
        assert_eq!(value, json!({ "chunks": "async" }));
    }
}
