// Shared state handed from the framework service to the compiler glue

use crate::core::hooks::HookRegistry;
use crate::core::interfaces::{ServerBuildResult, ServerCompileOptions, ServerCompiler};
use crate::core::models::{Command, CommandArgs, UserConfig};
use crate::utils::watch::WatchRegistry;
use crate::utils::{IceError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// String cache shared between framework plugins (e.g. the `routes` manifest)
pub type DataCache = Arc<DashMap<String, String>>;

/// Lazily evaluated runtime config exposed to hooks
pub type ConfigGetter = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Latest server build, shared with whoever renders documents
#[derive(Clone, Default)]
pub struct ServerCompileTask {
    inner: Arc<RwLock<Option<ServerBuildResult>>>,
}

impl ServerCompileTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, result: ServerBuildResult) {
        *self.inner.write() = Some(result);
    }

    pub fn get(&self) -> Option<ServerBuildResult> {
        self.inner.read().clone()
    }
}

/// APIs passed along with every compiler-related hook
#[derive(Clone)]
pub struct HooksApi {
    pub server_compiler: Arc<dyn ServerCompiler>,
    pub get_app_config: ConfigGetter,
    pub get_routes_config: ConfigGetter,
    pub get_dataloader_config: ConfigGetter,
}

impl HooksApi {
    pub fn new(server_compiler: Arc<dyn ServerCompiler>) -> Self {
        Self {
            server_compiler,
            get_app_config: null_getter(),
            get_routes_config: null_getter(),
            get_dataloader_config: null_getter(),
        }
    }

    /// Hooks API without a server compiler; compiling through it fails
    pub fn detached() -> Self {
        Self::new(Arc::new(MissingServerCompiler))
    }

    pub fn with_app_config(mut self, getter: ConfigGetter) -> Self {
        self.get_app_config = getter;
        self
    }

    pub fn with_routes_config(mut self, getter: ConfigGetter) -> Self {
        self.get_routes_config = getter;
        self
    }

    pub fn with_dataloader_config(mut self, getter: ConfigGetter) -> Self {
        self.get_dataloader_config = getter;
        self
    }
}

impl fmt::Debug for HooksApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HooksApi").finish_non_exhaustive()
    }
}

fn null_getter() -> ConfigGetter {
    Arc::new(|| async { Ok::<Value, IceError>(Value::Null) }.boxed())
}

struct MissingServerCompiler;

#[async_trait]
impl ServerCompiler for MissingServerCompiler {
    async fn compile(&self, _options: ServerCompileOptions) -> Result<ServerBuildResult> {
        Err(IceError::compile("no server compiler configured"))
    }
}

/// Extra APIs the service exposes to its plugins
#[derive(Clone, Default)]
pub struct ExtendsPluginApi {
    pub server_compile_task: ServerCompileTask,
    pub data_cache: DataCache,
    pub watch: Arc<WatchRegistry>,
}

/// Everything the compiler service needs to know about the running command
#[derive(Clone)]
pub struct ServiceContext {
    pub root_dir: PathBuf,
    pub command: Command,
    pub command_args: CommandArgs,
    pub user_config: UserConfig,
    pub hooks: Arc<HookRegistry>,
    pub extends_plugin_api: ExtendsPluginApi,
}

impl ServiceContext {
    pub fn new(root_dir: PathBuf, command: Command, user_config: UserConfig) -> Self {
        Self {
            root_dir,
            command,
            command_args: CommandArgs::default(),
            user_config,
            hooks: Arc::new(HookRegistry::new()),
            extends_plugin_api: ExtendsPluginApi::default(),
        }
    }

    pub fn with_command_args(mut self, command_args: CommandArgs) -> Self {
        self.command_args = command_args;
        self
    }
}
