// Core domain layer
pub mod bundler_config;
pub mod compiler;
pub mod context;
pub mod hooks;
pub mod interfaces;
pub mod messages;
pub mod models;
pub mod plugin;
pub mod stats;

pub use bundler_config::BundlerConfiguration;
pub use compiler::{Compiler, Watching};
pub use context::{ExtendsPluginApi, HooksApi, ServerCompileTask, ServiceContext};
pub use hooks::{FrameworkHook, HookPayload, HookRegistry};
pub use interfaces::*;
pub use messages::{format_messages, FormattedMessages};
pub use models::*;
pub use plugin::{AsyncSeriesHook, CompilerHooks, CompilerPlugin, FnPlugin, SyncHook};
pub use stats::{CompilationStats, StatsJson, StatsMessage, StatsOptions};
