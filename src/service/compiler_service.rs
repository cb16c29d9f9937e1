// Compiler service: wires framework plugins into the bundler configurations
// and relays compiler results to the framework hooks

use crate::core::bundler_config::BundlerConfiguration;
use crate::core::compiler::Compiler;
use crate::core::context::{DataCache, HooksApi, ServiceContext};
use crate::core::hooks::{
    before_run_hook, AfterStartCompileContext, BeforeRunContext, DevUrlInfo, HookPayload,
    AFTER_START_COMPILE,
};
use crate::core::interfaces::BundlerEngine;
use crate::core::messages::format_messages;
use crate::core::models::{Command, TaskConfig, Urls};
use crate::core::stats::StatsOptions;
use crate::plugins::{
    get_server_compiler_plugin, DataLoaderPlugin, EnsureRoutesConfig, ReCompilePlugin,
    ServerCompilerPlugin, ServerCompilerPluginOptions, SpinnerPlugin,
};
use crate::service::constants::{IMPORT_META_RENDERER, IMPORT_META_TARGET, ROUTES_CACHE_KEY, WEB};
use crate::service::route_config::get_route_export_config;
use crate::utils::debounce::Debouncer;
use crate::utils::watch::WatchEventKind;
use crate::utils::{IceError, Logger, Result};
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DOCUMENT_REBUILD_DELAY: Duration = Duration::from_millis(200);

static DOCUMENT_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"src/document(/index)?(\.js|\.jsx|\.tsx)").expect("valid regex"));

pub struct CompilerServiceOptions {
    pub context: ServiceContext,
    /// One configuration per task, in task order
    pub bundler_configs: Vec<BundlerConfiguration>,
    pub task_configs: Vec<TaskConfig>,
    pub urls: Option<Urls>,
    pub dev_path: Option<String>,
    pub hooks_api: HooksApi,
    pub engine: Arc<dyn BundlerEngine>,
    pub spinner: Arc<SpinnerPlugin>,
}

/// Route files listed in the `routes` data cache entry, as `src/pages/<file>`
pub fn route_files(data_cache: &DataCache) -> Vec<String> {
    let Some(raw) = data_cache.get(ROUTES_CACHE_KEY) else {
        return Vec::new();
    };
    let manifest = match serde_json::from_str::<Value>(raw.value()) {
        Ok(value) => value,
        Err(e) => {
            Logger::warn(&format!("Invalid routes data: {}", e));
            return Vec::new();
        }
    };

    manifest
        .get("routeManifest")
        .and_then(Value::as_object)
        .map(|routes| {
            routes
                .values()
                .filter_map(|route| route.get("file").and_then(Value::as_str))
                .map(|file| format!("src/pages/{}", file))
                .collect()
        })
        .unwrap_or_default()
}

fn json_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn ensure_routes_config(
    root_dir: &Path,
    server_compiler: Arc<dyn crate::core::interfaces::ServerCompiler>,
) -> EnsureRoutesConfig {
    let route_config = get_route_export_config(root_dir);
    Arc::new(move || {
        let route_config = route_config.clone();
        let server_compiler = server_compiler.clone();
        async move { route_config.ensure_routes_config(&server_compiler).await }.boxed()
    })
}

fn route_change_predicate(data_cache: DataCache) -> Arc<dyn Fn(&[PathBuf]) -> bool + Send + Sync> {
    Arc::new(move |files: &[PathBuf]| {
        let routes = route_files(&data_cache);
        files.iter().any(|file| {
            let file = file.to_string_lossy().replace('\\', "/");
            routes.iter().any(|route| file.contains(route.as_str()))
        })
    })
}

fn watch_document(context: &ServiceContext, plugin: Arc<ServerCompilerPlugin>) -> Result<()> {
    let debouncer = Debouncer::new(DOCUMENT_REBUILD_DELAY, move || {
        let plugin = plugin.clone();
        async move {
            match plugin.rebuild().await {
                Ok(_) => Logger::info("Document updated, try to reload page for latest html content."),
                Err(e) => Logger::error(&format!("Failed to rebuild document: {}", e)),
            }
        }
    })?;

    context.extends_plugin_api.watch.add_event(
        DOCUMENT_FILE.clone(),
        Arc::new(move |kind: WatchEventKind, _path: &Path| {
            if kind == WatchEventKind::Change {
                debouncer.trigger();
            }
        }),
    );
    Ok(())
}

/// Create the compiler for the current command.
///
/// Runs `before.<command>.run`, injects the framework plugins into every
/// configuration and relays each finished compilation to the framework.
pub async fn create_compiler(options: CompilerServiceOptions) -> Result<Arc<Compiler>> {
    let CompilerServiceOptions {
        context,
        mut bundler_configs,
        task_configs,
        urls,
        dev_path,
        hooks_api,
        engine,
        spinner,
    } = options;

    let command = context.command;
    let target = context
        .command_args
        .target
        .clone()
        .unwrap_or_else(|| WEB.to_string());
    let server_compiler = hooks_api.server_compiler.clone();

    context
        .hooks
        .apply_hook(
            &before_run_hook(command.as_str()),
            &HookPayload::BeforeRun(BeforeRunContext {
                urls: urls.clone(),
                command_args: context.command_args.clone(),
                task_configs: task_configs.clone(),
                bundler_configs: bundler_configs.clone(),
                hooks_api: hooks_api.clone(),
            }),
        )
        .await?;

    if task_configs.len() != bundler_configs.len() {
        return Err(IceError::config(format!(
            "{} task configs but {} bundler configs",
            task_configs.len(),
            bundler_configs.len()
        )));
    }

    for (task, config) in task_configs.iter().zip(bundler_configs.iter_mut()) {
        let user_config = &task.config;
        let output_dir = config.output.path.clone();

        if user_config.use_dev_server {
            let mut runtime_define_vars = BTreeMap::new();
            runtime_define_vars.insert(IMPORT_META_TARGET.to_string(), json_string(&target));
            runtime_define_vars.insert(IMPORT_META_RENDERER.to_string(), json_string("server"));

            let server_plugin = Arc::new(get_server_compiler_plugin(
                server_compiler.clone(),
                ServerCompilerPluginOptions {
                    root_dir: context.root_dir.clone(),
                    server_entry: user_config.server.entry.clone(),
                    output_dir: output_dir.clone(),
                    server_compile_task: (command == Command::Start)
                        .then(|| context.extends_plugin_api.server_compile_task.clone()),
                    user_config: context.user_config.clone(),
                    ensure_routes_config: ensure_routes_config(&context.root_dir, server_compiler.clone()),
                    runtime_define_vars,
                    incremental: command == Command::Start,
                },
            ));
            config.add_plugin(server_plugin.clone());

            if command == Command::Start {
                let route_config = get_route_export_config(&context.root_dir);
                config.add_plugin(Arc::new(ReCompilePlugin::new(
                    Arc::new(move |key: &str| route_config.re_compile(key)),
                    route_change_predicate(context.extends_plugin_api.data_cache.clone()),
                )));
                watch_document(&context, server_plugin)?;
            }
        }

        if user_config.use_data_loader {
            config.add_plugin(Arc::new(DataLoaderPlugin::new(
                server_compiler.clone(),
                target.clone(),
                context.root_dir.clone(),
                output_dir,
            )));
        }
    }

    // Only the first task reports progress.
    if let Some(first) = bundler_configs.first_mut() {
        first.add_plugin(spinner);
    }

    let mut compiler = match Compiler::new(engine, bundler_configs) {
        Ok(compiler) => compiler,
        Err(e) => {
            Logger::error("Bundler compile with errors.");
            Logger::error(&e.to_string());
            return Err(e);
        }
    };

    let is_first_compile = Arc::new(AtomicBool::new(true));
    let hooks = context.hooks.clone();
    compiler.hooks_mut().done.tap_promise("done", move |stats| {
        let is_first_compile = is_first_compile.clone();
        let hooks = hooks.clone();
        let urls = urls.clone();
        let dev_path = dev_path.clone();
        let task_configs = task_configs.clone();
        let hooks_api = hooks_api.clone();

        async move {
            let mut messages = format_messages(&stats.to_json(StatsOptions::summary()));
            let is_successful = messages.errors.is_empty();

            if !is_successful {
                // Later errors are usually follow-ups of the first one.
                messages.errors.truncate(1);
                Logger::error("Client compiled with errors.");
                Logger::error(&messages.errors.join("\n"));
                return Ok(());
            } else if !messages.warnings.is_empty() {
                Logger::warn("Client compiled with warnings.");
                Logger::warn(&messages.warnings.join("\n"));
            }

            if command == Command::Start {
                let applied = hooks
                    .apply_hook(
                        AFTER_START_COMPILE,
                        &HookPayload::AfterStartCompile(AfterStartCompileContext {
                            stats,
                            is_successful,
                            is_first_compile: is_first_compile.load(Ordering::SeqCst),
                            urls,
                            dev_url_info: DevUrlInfo { dev_path },
                            messages,
                            task_configs,
                            hooks_api,
                        }),
                    )
                    .await;
                // A failing framework hook does not fail the compilation.
                if let Err(e) = applied {
                    Logger::error(&e.format_detailed());
                }
            }

            if is_successful {
                is_first_compile.store(false, Ordering::SeqCst);
            }
            Ok(())
        }
    });

    Ok(Arc::new(compiler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    #[test]
    fn test_route_files_from_manifest() {
        let cache: DataCache = Arc::new(DashMap::new());
        assert!(route_files(&cache).is_empty());

        cache.insert(
            "routes".to_string(),
            r#"{"routeManifest":{"index":{"file":"index.tsx"},"about":{"file":"about/index.tsx"}}}"#
                .to_string(),
        );
        let mut files = route_files(&cache);
        files.sort();
        assert_eq!(files, vec!["src/pages/about/index.tsx", "src/pages/index.tsx"]);

        let accepts = route_change_predicate(cache);
        assert!(accepts(&[PathBuf::from("/app/src/pages/index.tsx")]));
        assert!(!accepts(&[PathBuf::from("/app/src/components/index.tsx")]));
    }

    #[test]
    fn test_invalid_routes_data() {
        let cache: DataCache = Arc::new(DashMap::new());
        cache.insert("routes".to_string(), "not json".to_string());
        assert!(route_files(&cache).is_empty());
    }

    #[test]
    fn test_document_pattern() {
        assert!(DOCUMENT_FILE.is_match("/app/src/document.tsx"));
        assert!(DOCUMENT_FILE.is_match("/app/src/document/index.jsx"));
        assert!(!DOCUMENT_FILE.is_match("/app/src/documents.tsx"));
        assert!(!DOCUMENT_FILE.is_match("/app/src/pages/document.css"));
    }
}
