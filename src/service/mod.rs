// Framework service glue around the bundler compiler
pub mod compiler_service;
pub mod constants;
pub mod route_config;

pub use compiler_service::{create_compiler, CompilerServiceOptions};
pub use route_config::{get_route_export_config, RouteExportConfig};
