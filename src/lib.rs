// ice-bundle: bundler configuration, framework plugins and compiler glue
// for ice applications

pub mod cli;
pub mod config;
pub mod core;
pub mod plugins;
pub mod service;
pub mod transform;
pub mod utils;

pub use crate::core::{Compiler, CompilerPlugin, HookRegistry, ServiceContext};
pub use crate::service::{create_compiler, CompilerServiceOptions};
pub use crate::transform::{import_style, ImportStyleOptions, ImportStylePlugin, StyleOption};
pub use crate::utils::{IceError, Result};
