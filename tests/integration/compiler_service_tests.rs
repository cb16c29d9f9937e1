use async_trait::async_trait;
use ice_bundle::config::{get_config, GetConfigOptions};
use ice_bundle::core::bundler_config::BundlerConfiguration;
use ice_bundle::core::context::{HooksApi, ServiceContext};
use ice_bundle::core::hooks::{FrameworkHook, HookPayload};
use ice_bundle::core::interfaces::{
    BundlerEngine, CompileRequest, IncrementalBuild, ServerBuildResult, ServerCompileOptions,
    ServerCompiler,
};
use ice_bundle::core::models::{Command, CommandArgs, TaskConfig, UserConfig};
use ice_bundle::core::stats::{CompilationStats, StatsAsset, StatsMessage};
use ice_bundle::plugins::SpinnerPlugin;
use ice_bundle::service::{create_compiler, get_route_export_config, CompilerServiceOptions};
use ice_bundle::utils::{IceError, Result, WatchEventKind};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct FakeEngine {
    fail_with_errors: AtomicBool,
    requests: Mutex<Vec<CompileRequest>>,
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

        let mut entrypoints = BTreeMap::new();
        entrypoints.insert("main".to_string(), vec!["js/main.js".to_string()]);
        let mut stats = CompilationStats {
            public_path: "/".to_string(),
            entrypoints,
            assets: vec![StatsAsset {
                name: "js/main.js".to_string(),
                size: 42,
                chunk_names: vec!["main".to_string()],
            }],
            ..Default::default()
        };
        if self.fail_with_errors.load(Ordering::SeqCst) {
            stats.errors = vec![
                StatsMessage::new("Module not found: Error: Can't resolve './a' in '/app/src'"),
                StatsMessage::new("Module not found: Error: Can't resolve './b' in '/app/src'"),
            ];
        }
        Ok(stats)
    }
}

#[derive(Default)]
struct FakeServerCompiler {
    compiles: Mutex<Vec<String>>,
    rebuilds: Arc<AtomicUsize>,
}

struct FakeRebuilder {
    rebuilds: Arc<AtomicUsize>,
}

#[async_trait]
impl IncrementalBuild for FakeRebuilder {
    async fn rebuild(&self) -> Result<ServerBuildResult> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        Ok(ServerBuildResult::default())
    }
}

impl FakeServerCompiler {
    fn compiled(&self, entry: &str) -> usize {
        self.compiles.lock().iter().filter(|e| e.as_str() == entry).count()
    }
}

#[async_trait]
impl ServerCompiler for FakeServerCompiler {
    async fn compile(&self, options: ServerCompileOptions) -> Result<ServerBuildResult> {
        let entry = options.entry_points.keys().next().cloned().unwrap_or_default();
        self.compiles.lock().push(entry);

        let rebuilder: Option<Arc<dyn IncrementalBuild>> = if options.incremental {
            Some(Arc::new(FakeRebuilder {
                rebuilds: self.rebuilds.clone(),
            }))
        } else {
            None
        };
        Ok(ServerBuildResult {
            server_entry: Some(options.outdir.join("index.mjs")),
            rebuilder,
            ..Default::default()
        })
    }
}

#[derive(Default)]
struct HookRecorder {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl FrameworkHook for HookRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn call(&self, payload: &HookPayload) -> Result<()> {
        let entry = match payload {
            HookPayload::BeforeRun(ctx) => format!("before:{}", ctx.bundler_configs.len()),
            HookPayload::AfterStartCompile(ctx) => {
                format!("after:first={}:ok={}", ctx.is_first_compile, ctx.is_successful)
            }
        };
        self.calls.lock().push(entry);
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    engine: Arc<FakeEngine>,
    server_compiler: Arc<FakeServerCompiler>,
    hooks: Arc<HookRecorder>,
    context: ServiceContext,
}

impl Fixture {
    fn new(command: Command) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".ice")).unwrap();
        std::fs::write(dir.path().join(".ice/routes-config.ts"), "export default {};").unwrap();
        std::fs::write(dir.path().join(".ice/data-loader.ts"), "export {};").unwrap();

        let user_config = UserConfig {
            use_dev_server: true,
            use_data_loader: true,
            ..Default::default()
        };
        let context = ServiceContext::new(dir.path().to_path_buf(), command, user_config)
            .with_command_args(CommandArgs::default());

        let hooks = Arc::new(HookRecorder::default());
        let name = format!("before.{}.run", command.as_str());
        context.hooks.register(&name, hooks.clone());
        context.hooks.register("after.start.compile", hooks.clone());

        Self {
            dir,
            engine: Arc::new(FakeEngine::default()),
            server_compiler: Arc::new(FakeServerCompiler::default()),
            hooks,
            context,
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn options(&self) -> CompilerServiceOptions {
        let user_config = self.context.user_config.clone();
        let bundler_config = get_config(GetConfigOptions::new(self.root(), &user_config, ".ice"));

        CompilerServiceOptions {
            context: self.context.clone(),
            bundler_configs: vec![bundler_config],
            task_configs: vec![TaskConfig::new("web", user_config)],
            urls: None,
            dev_path: Some("/".to_string()),
            hooks_api: HooksApi::new(self.server_compiler.clone()),
            engine: self.engine.clone(),
            spinner: Arc::new(SpinnerPlugin::hidden()),
        }
    }
}

#[tokio::test]
async fn test_start_injects_framework_plugins() {
    let fixture = Fixture::new(Command::Start);
    let compiler = create_compiler(fixture.options()).await.unwrap();

    assert_eq!(
        compiler.configs()[0].plugin_names(),
        vec![
            "AssetManifestPlugin",
            "ServerCompilerPlugin",
            "ReCompilePlugin",
            "DataLoaderPlugin",
            "spinner"
        ]
    );
    assert_eq!(*fixture.hooks.calls.lock(), vec!["before:1"]);
    assert_eq!(fixture.context.extends_plugin_api.watch.event_count(), 1);
}

#[tokio::test]
async fn test_build_skips_dev_only_plugins() {
    let fixture = Fixture::new(Command::Build);
    let compiler = create_compiler(fixture.options()).await.unwrap();

    assert_eq!(
        compiler.configs()[0].plugin_names(),
        vec!["AssetManifestPlugin", "ServerCompilerPlugin", "DataLoaderPlugin", "spinner"]
    );
    assert_eq!(fixture.context.extends_plugin_api.watch.event_count(), 0);

    compiler.run().await.unwrap();
    // `after.start.compile` only runs for `start`.
    assert_eq!(*fixture.hooks.calls.lock(), vec!["before:1"]);
    assert!(fixture.context.extends_plugin_api.server_compile_task.get().is_none());
}

#[tokio::test]
async fn test_start_compile_lifecycle() {
    let fixture = Fixture::new(Command::Start);
    let compiler = create_compiler(fixture.options()).await.unwrap();

    compiler.run().await.unwrap();

    assert_eq!(fixture.server_compiler.compiled("routes-config"), 1);
    assert_eq!(fixture.server_compiler.compiled("index"), 1);
    assert_eq!(fixture.server_compiler.compiled("data-loader"), 1);
    assert!(fixture.context.extends_plugin_api.server_compile_task.get().is_some());

    let manifest = std::fs::read_to_string(fixture.root().join(".ice/assets-manifest.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(manifest["assets"]["js/main.js"], 42);

    compiler.rebuild(vec![fixture.root().join("src/components/a.tsx")]).await.unwrap();

    // The second server build reuses the incremental context.
    assert_eq!(fixture.server_compiler.compiled("index"), 1);
    assert_eq!(fixture.server_compiler.rebuilds.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.server_compiler.compiled("routes-config"), 1);

    assert_eq!(
        *fixture.hooks.calls.lock(),
        vec!["before:1", "after:first=true:ok=true", "after:first=false:ok=true"]
    );
}

#[tokio::test]
async fn test_route_change_recompiles_route_config() {
    let fixture = Fixture::new(Command::Start);
    fixture.context.extends_plugin_api.data_cache.insert(
        "routes".to_string(),
        r#"{"routeManifest":{"index":{"id":"index","file":"index.tsx"}}}"#.to_string(),
    );
    let compiler = create_compiler(fixture.options()).await.unwrap();

    compiler.run().await.unwrap();
    assert_eq!(fixture.server_compiler.compiled("routes-config"), 1);

    compiler.rebuild(vec![fixture.root().join("src/pages/index.tsx")]).await.unwrap();
    assert_eq!(fixture.server_compiler.compiled("routes-config"), 2);
    assert!(!get_route_export_config(fixture.root()).is_stale());
}

#[tokio::test]
async fn test_errors_keep_first_compile_flag() {
    let fixture = Fixture::new(Command::Start);
    let compiler = create_compiler(fixture.options()).await.unwrap();

    fixture.engine.fail_with_errors.store(true, Ordering::SeqCst);
    compiler.run().await.unwrap();
    assert_eq!(*fixture.hooks.calls.lock(), vec!["before:1"]);

    fixture.engine.fail_with_errors.store(false, Ordering::SeqCst);
    compiler.run().await.unwrap();
    assert_eq!(
        *fixture.hooks.calls.lock(),
        vec!["before:1", "after:first=true:ok=true"]
    );
}

#[tokio::test]
async fn test_document_change_triggers_debounced_rebuild() {
    let fixture = Fixture::new(Command::Start);
    let compiler = create_compiler(fixture.options()).await.unwrap();
    compiler.run().await.unwrap();

    let watch = fixture.context.extends_plugin_api.watch.clone();
    let document = fixture.root().join("src/document.tsx");
    for _ in 0..3 {
        watch.dispatch(WatchEventKind::Change, &document);
    }
    watch.dispatch(WatchEventKind::Add, &document);
    watch.dispatch(WatchEventKind::Change, &PathBuf::from("/elsewhere/src/app.tsx"));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(fixture.server_compiler.rebuilds.load(Ordering::SeqCst), 1);
}

struct FailingHook;

#[async_trait]
impl FrameworkHook for FailingHook {
    fn name(&self) -> &str {
        "failing"
    }

    async fn call(&self, _payload: &HookPayload) -> Result<()> {
        Err(IceError::config("bad plugin"))
    }
}

#[tokio::test]
async fn test_before_run_failure_aborts() {
    let fixture = Fixture::new(Command::Build);
    fixture.context.hooks.register("before.build.run", Arc::new(FailingHook));

    let err = create_compiler(fixture.options()).await.unwrap_err();
    assert!(matches!(err, IceError::Hook { .. }));
}

#[tokio::test]
async fn test_after_compile_hook_failure_keeps_compile_ok() {
    let fixture = Fixture::new(Command::Start);
    fixture.context.hooks.register("after.start.compile", Arc::new(FailingHook));
    let compiler = create_compiler(fixture.options()).await.unwrap();

    let stats = compiler.run().await.unwrap();
    assert!(stats.errors.is_empty());

    // The recorder registered before the failing hook still ran, and the
    // next compile is no longer the first one.
    compiler.run().await.unwrap();
    assert_eq!(
        *fixture.hooks.calls.lock(),
        vec!["before:1", "after:first=true:ok=true", "after:first=false:ok=true"]
    );
}
