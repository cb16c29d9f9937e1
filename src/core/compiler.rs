// Compiler facade over an external bundler engine
// Owns the lifecycle hooks and relays every compilation through them

use crate::core::bundler_config::BundlerConfiguration;
use crate::core::interfaces::{BundlerEngine, CompileRequest};
use crate::core::plugin::CompilerHooks;
use crate::core::stats::CompilationStats;
use crate::utils::watch::{watch_directory, WatchRegistry};
use crate::utils::{IceError, Logger, Result, Timer};
use notify::RecommendedWatcher;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Compiler {
    engine: Arc<dyn BundlerEngine>,
    configs: Vec<BundlerConfiguration>,
    hooks: CompilerHooks,
    // One compilation at a time; rebuilds queue behind a running build.
    running: tokio::sync::Mutex<()>,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("engine", &self.engine.name())
            .field(
                "configs",
                &self.configs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Compiler {
    /// Create a compiler for one or more configurations.
    ///
    /// Every plugin of every configuration is applied to a single hook set.
    pub fn new(engine: Arc<dyn BundlerEngine>, configs: Vec<BundlerConfiguration>) -> Result<Self> {
        if configs.is_empty() {
            return Err(IceError::config("at least one bundler configuration is required"));
        }

        let mut hooks = CompilerHooks::default();
        for config in &configs {
            for plugin in &config.plugins {
                Logger::debug(&format!("Applying plugin {} to {}", plugin.name(), config.name));
                plugin.clone().apply(&mut hooks);
            }
        }

        Logger::debug(&format!("Compiler created with engine {}", engine.name()));
        Ok(Self {
            engine,
            configs,
            hooks,
            running: tokio::sync::Mutex::new(()),
        })
    }

    pub fn hooks(&self) -> &CompilerHooks {
        &self.hooks
    }

    /// Tap additional hooks before the compiler is shared
    pub fn hooks_mut(&mut self) -> &mut CompilerHooks {
        &mut self.hooks
    }

    pub fn configs(&self) -> &[BundlerConfiguration] {
        &self.configs
    }

    pub async fn run(&self) -> Result<Arc<CompilationStats>> {
        self.compile(CompileRequest::default()).await
    }

    /// Recompile after `modified_files` changed
    pub async fn rebuild(&self, modified_files: Vec<PathBuf>) -> Result<Arc<CompilationStats>> {
        self.hooks.watch_run.call(&modified_files);
        self.compile(CompileRequest {
            modified_files,
            is_rebuild: true,
        })
        .await
    }

    async fn compile(&self, request: CompileRequest) -> Result<Arc<CompilationStats>> {
        let _guard = self.running.lock().await;
        let timer = Timer::start("compilation");

        Logger::compile_start(&self.configs.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
        self.hooks.before_compile.call(&());

        let stats = Arc::new(self.engine.compile(&self.configs, &request).await?);

        self.hooks.emit.call(stats.clone()).await?;
        self.hooks.after_emit.call(&stats);
        self.hooks.done.call(stats.clone()).await?;

        Logger::compile_complete(stats.errors.len(), stats.warnings.len(), timer.elapsed());
        Ok(stats)
    }

    /// Run once, then rebuild whenever files under the first configuration's
    /// context change.
    ///
    /// Paths matching `watch_options.ignored` are skipped and changes are
    /// aggregated for `watch_options.aggregate_timeout` ms. Every accepted
    /// event is also dispatched to `registry`.
    pub fn watch(self: &Arc<Self>, registry: Option<Arc<WatchRegistry>>) -> Result<Watching> {
        let config = &self.configs[0];
        let ignored = Regex::new(&config.watch_options.ignored)?;
        let delay = Duration::from_millis(config.watch_options.aggregate_timeout);
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| IceError::Watch(format!("watch needs a tokio runtime: {}", e)))?;
        let (watcher, mut events) = watch_directory(&config.context, Some(ignored))?;

        let compiler = Arc::clone(self);
        let task = runtime.spawn(async move {
            if let Err(e) = compiler.run().await {
                Logger::error(&format!("Initial compilation failed: {}", e));
            }

            let mut pending = BTreeSet::new();
            while let Some((kind, path)) = events.recv().await {
                if let Some(registry) = &registry {
                    registry.dispatch(kind, &path);
                }
                pending.insert(path);

                let mut closed = false;
                loop {
                    match tokio::time::timeout(delay, events.recv()).await {
                        Ok(Some((kind, path))) => {
                            if let Some(registry) = &registry {
                                registry.dispatch(kind, &path);
                            }
                            pending.insert(path);
                        }
                        Ok(None) => {
                            closed = true;
                            break;
                        }
                        Err(_) => break,
                    }
                }

                let changed: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                Logger::info(&format!("{} file(s) changed, rebuilding", changed.len()));
                if let Err(e) = compiler.rebuild(changed).await {
                    Logger::error(&format!("Rebuild failed: {}", e));
                }

                if closed {
                    break;
                }
            }
        });

        Ok(Watching {
            _watcher: watcher,
            task,
        })
    }
}

/// Running watch session; dropping it stops watching
pub struct Watching {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Watching {
    pub fn close(self) {
        self.task.abort();
    }
}

impl Drop for Watching {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{get_config, GetConfigOptions};
    use crate::core::models::UserConfig;
    use crate::core::plugin::FnPlugin;
    use crate::core::stats::StatsMessage;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;

    struct FakeEngine {
        requests: Mutex<Vec<CompileRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl BundlerEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        async fn compile(
            &self,
            _configs: &[BundlerConfiguration],
            request: &CompileRequest,
        ) -> Result<CompilationStats> {
            self.requests.lock().push(request.clone());
            if self.fail {
                return Err(IceError::compile("engine failure"));
            }
            Ok(CompilationStats {
                warnings: vec![StatsMessage::new("careful")],
                ..Default::default()
            })
        }
    }

    fn config_with_recorder(log: Arc<Mutex<Vec<String>>>) -> BundlerConfiguration {
        let user = UserConfig::default();
        let mut config = get_config(GetConfigOptions::new(Path::new("/app"), &user, ".ice"));
        config.plugins.clear();
        config.add_plugin(Arc::new(FnPlugin::new("recorder", move |hooks| {
            let l = log.clone();
            hooks.before_compile.tap("recorder", move |_| l.lock().push("before_compile".into()));
            let l = log.clone();
            hooks
                .watch_run
                .tap("recorder", move |files| l.lock().push(format!("watch_run:{}", files.len())));
            let l = log.clone();
            hooks.emit.tap_promise("recorder", move |_| {
                let l = l.clone();
                async move {
                    l.lock().push("emit".into());
                    Ok(())
                }
            });
            let l = log.clone();
            hooks.after_emit.tap("recorder", move |_| l.lock().push("after_emit".into()));
            let l = log.clone();
            hooks.done.tap_promise("recorder", move |stats| {
                let l = l.clone();
                async move {
                    l.lock().push(format!("done:{}", stats.warnings.len()));
                    Ok(())
                }
            });
        })));
        config
    }

    #[test]
    fn test_new_requires_config() {
        let engine = Arc::new(FakeEngine {
            requests: Mutex::new(Vec::new()),
            fail: false,
        });
        assert!(matches!(Compiler::new(engine, Vec::new()), Err(IceError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_relays_lifecycle_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let engine = Arc::new(FakeEngine {
            requests: Mutex::new(Vec::new()),
            fail: false,
        });
        let compiler = Compiler::new(engine.clone(), vec![config_with_recorder(log.clone())]).unwrap();

        compiler.run().await.unwrap();
        compiler
            .rebuild(vec![PathBuf::from("/app/src/a.ts"), PathBuf::from("/app/src/b.ts")])
            .await
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "before_compile",
                "emit",
                "after_emit",
                "done:1",
                "watch_run:2",
                "before_compile",
                "emit",
                "after_emit",
                "done:1",
            ]
        );
        let requests = engine.requests.lock();
        assert!(!requests[0].is_rebuild);
        assert!(requests[1].is_rebuild);
        assert_eq!(requests[1].modified_files.len(), 2);
    }

    #[tokio::test]
    async fn test_engine_error_skips_emit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let engine = Arc::new(FakeEngine {
            requests: Mutex::new(Vec::new()),
            fail: true,
        });
        let compiler = Compiler::new(engine, vec![config_with_recorder(log.clone())]).unwrap();

        assert!(compiler.run().await.is_err());
        assert_eq!(*log.lock(), vec!["before_compile"]);
    }

    #[test]
    fn test_plugins_of_every_config_are_applied() {
        let engine = Arc::new(FakeEngine {
            requests: Mutex::new(Vec::new()),
            fail: false,
        });
        let log = Arc::new(Mutex::new(Vec::new()));
        let compiler = Compiler::new(
            engine,
            vec![config_with_recorder(log.clone()), config_with_recorder(log)],
        )
        .unwrap();

        assert_eq!(compiler.hooks().before_compile.len(), 2);
        assert_eq!(compiler.hooks().done.len(), 2);
        assert_eq!(
            format!("{:?}", compiler),
            r#"Compiler { engine: "fake", configs: ["web", "web"] }"#
        );
    }

    #[tokio::test]
    async fn test_watch_rebuilds_on_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserConfig::default();
        let mut config = get_config(GetConfigOptions::new(dir.path(), &user, ".ice"));
        config.plugins.clear();

        let engine = Arc::new(FakeEngine {
            requests: Mutex::new(Vec::new()),
            fail: false,
        });
        let compiler = Arc::new(Compiler::new(engine.clone(), vec![config]).unwrap());
        let registry = Arc::new(WatchRegistry::new());
        let watching = compiler.watch(Some(registry)).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(dir.path().join("index.ts"), "export {};").unwrap();

        let mut rebuilt = false;
        for _ in 0..50 {
            if engine.requests.lock().iter().any(|r| r.is_rebuild) {
                rebuilt = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        watching.close();

        assert!(rebuilt);
        assert!(!engine.requests.lock()[0].is_rebuild);
    }
}
