// Server compiler plugin: builds the server bundle after each client emit

use crate::config::get_define_vars;
use crate::core::context::ServerCompileTask;
use crate::core::interfaces::{
    OutputFormat, Platform, ServerBuildResult, ServerCompileOptions, ServerCompiler,
};
use crate::core::models::{Mode, ServerFormat, UserConfig};
use crate::core::plugin::{CompilerHooks, CompilerPlugin};
use crate::service::constants::{RUNTIME_TMP_DIR, SERVER_ENTRY, SERVER_OUTPUT_DIR};
use crate::utils::{IceError, Logger, Result};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Makes sure the route export config is compiled before the server build
pub type EnsureRoutesConfig = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

pub struct ServerCompilerPlugin {
    server_compiler: Arc<dyn ServerCompiler>,
    options: ServerCompileOptions,
    server_compile_task: Option<ServerCompileTask>,
    ensure_routes_config: EnsureRoutesConfig,
    build_result: RwLock<Option<ServerBuildResult>>,
}

impl ServerCompilerPlugin {
    pub fn new(
        server_compiler: Arc<dyn ServerCompiler>,
        options: ServerCompileOptions,
        server_compile_task: Option<ServerCompileTask>,
        ensure_routes_config: EnsureRoutesConfig,
    ) -> Self {
        Self {
            server_compiler,
            options,
            server_compile_task,
            ensure_routes_config,
            build_result: RwLock::new(None),
        }
    }

    pub fn compile_options(&self) -> &ServerCompileOptions {
        &self.options
    }

    pub fn build_result(&self) -> Option<ServerBuildResult> {
        self.build_result.read().clone()
    }

    /// Build the server bundle, reusing the previous build context when
    /// there is one.
    pub async fn compile(&self) -> Result<ServerBuildResult> {
        (self.ensure_routes_config)().await?;

        let previous = self.build_result().and_then(|r| r.rebuilder);
        let result = match previous {
            Some(rebuilder) => rebuilder.rebuild().await?,
            None => self.server_compiler.compile(self.options.clone()).await?,
        };
        self.store(result.clone());
        Ok(result)
    }

    /// Rebuild the last incremental build; `None` when nothing was built yet
    /// or the build is not incremental.
    pub async fn rebuild(&self) -> Result<Option<ServerBuildResult>> {
        let Some(rebuilder) = self.build_result().and_then(|r| r.rebuilder) else {
            return Ok(None);
        };
        let result = rebuilder.rebuild().await?;
        self.store(result.clone());
        Ok(Some(result))
    }

    fn store(&self, result: ServerBuildResult) {
        for error in &result.errors {
            Logger::error(&format!("Server compiled with errors: {}", error));
        }
        if let Some(task) = &self.server_compile_task {
            task.set(result.clone());
        }
        *self.build_result.write() = Some(result);
    }
}

impl CompilerPlugin for ServerCompilerPlugin {
    fn name(&self) -> &str {
        "ServerCompilerPlugin"
    }

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks) {
        hooks.emit.tap_promise("ServerCompilerPlugin", move |_stats| {
            let plugin = self.clone();
            async move {
                plugin
                    .compile()
                    .await
                    .map(|_| ())
                    .map_err(|e| IceError::plugin("ServerCompilerPlugin", e.to_string()))
            }
        });
    }
}

pub struct ServerCompilerPluginOptions {
    pub root_dir: PathBuf,
    /// Custom entry, relative to the root
    pub server_entry: Option<PathBuf>,
    /// Client output directory; the bundle goes to its `server` subdirectory
    pub output_dir: PathBuf,
    /// Shared task the result is published to, if any
    pub server_compile_task: Option<ServerCompileTask>,
    pub user_config: UserConfig,
    pub ensure_routes_config: EnsureRoutesConfig,
    pub runtime_define_vars: BTreeMap<String, String>,
    pub incremental: bool,
}

pub fn get_server_compiler_plugin(
    server_compiler: Arc<dyn ServerCompiler>,
    options: ServerCompilerPluginOptions,
) -> ServerCompilerPlugin {
    let entry = match &options.server_entry {
        Some(entry) => options.root_dir.join(entry),
        None => options.root_dir.join(RUNTIME_TMP_DIR).join(SERVER_ENTRY),
    };
    let server = &options.user_config.server;

    let mut entry_points = BTreeMap::new();
    entry_points.insert("index".to_string(), entry);

    let compile_options = ServerCompileOptions {
        entry_points,
        outdir: options.output_dir.join(SERVER_OUTPUT_DIR),
        platform: Platform::Node,
        format: match server.format {
            ServerFormat::Esm => OutputFormat::Esm,
            ServerFormat::Cjs => OutputFormat::Cjs,
        },
        define: get_define_vars(
            &options.user_config.define,
            &options.runtime_define_vars,
            &BTreeMap::new(),
        ),
        externals: server.externals.clone(),
        bundle: server.bundle,
        minify: options.user_config.mode == Mode::Production,
        incremental: options.incremental,
    };

    ServerCompilerPlugin::new(
        server_compiler,
        compile_options,
        options.server_compile_task,
        options.ensure_routes_config,
    )
}
