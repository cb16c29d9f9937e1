// Framework hooks - named lifecycle points plugins of the framework subscribe to
// Compiler events are relayed here by the compiler service

use crate::core::bundler_config::BundlerConfiguration;
use crate::core::context::HooksApi;
use crate::core::messages::FormattedMessages;
use crate::core::models::{CommandArgs, TaskConfig, Urls};
use crate::core::stats::CompilationStats;
use crate::utils::{IceError, Logger, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub const AFTER_START_COMPILE: &str = "after.start.compile";

/// Name of the hook run before a command starts compiling
pub fn before_run_hook(command: &str) -> String {
    format!("before.{}.run", command)
}

/// Context of `before.<command>.run`
#[derive(Clone)]
pub struct BeforeRunContext {
    pub urls: Option<Urls>,
    pub command_args: CommandArgs,
    pub task_configs: Vec<TaskConfig>,
    pub bundler_configs: Vec<BundlerConfiguration>,
    pub hooks_api: HooksApi,
}

#[derive(Debug, Clone, Default)]
pub struct DevUrlInfo {
    pub dev_path: Option<String>,
}

/// Context of `after.start.compile`
#[derive(Clone)]
pub struct AfterStartCompileContext {
    pub stats: Arc<CompilationStats>,
    pub is_successful: bool,
    pub is_first_compile: bool,
    pub urls: Option<Urls>,
    pub dev_url_info: DevUrlInfo,
    pub messages: FormattedMessages,
    pub task_configs: Vec<TaskConfig>,
    pub hooks_api: HooksApi,
}

#[derive(Clone)]
pub enum HookPayload {
    BeforeRun(BeforeRunContext),
    AfterStartCompile(AfterStartCompileContext),
}

/// A subscriber of framework hooks
#[async_trait]
pub trait FrameworkHook: Send + Sync {
    /// Hook name for logging
    fn name(&self) -> &str;

    async fn call(&self, payload: &HookPayload) -> Result<()>;
}

/// Manages and executes framework hooks
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<Arc<dyn FrameworkHook>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under the lifecycle point `name`
    pub fn register(&self, name: &str, hook: Arc<dyn FrameworkHook>) {
        self.hooks
            .write()
            .entry(name.to_string())
            .or_default()
            .push(hook);
    }

    pub fn hook_count(&self, name: &str) -> usize {
        self.hooks.read().get(name).map_or(0, Vec::len)
    }

    /// Run every hook registered under `name` in registration order.
    ///
    /// The first failure stops the chain.
    pub async fn apply_hook(&self, name: &str, payload: &HookPayload) -> Result<()> {
        let hooks = self.hooks.read().get(name).cloned().unwrap_or_default();
        if hooks.is_empty() {
            return Ok(());
        }

        Logger::debug(&format!("Applying hook {} ({} subscribers)", name, hooks.len()));
        for hook in hooks {
            hook.call(payload).await.map_err(|e| match e {
                IceError::Hook { .. } => e,
                other => IceError::hook(name, format!("{}: {}", hook.name(), other)),
            })?;
        }
        Ok(())
    }
}
