// Shared utilities module
pub mod config_loader;
pub mod debounce;
pub mod errors;
pub mod logging;
pub mod watch;

pub use config_loader::{CliOverrides, ConfigLoader};
pub use debounce::Debouncer;
pub use errors::*;
pub use logging::*;
pub use watch::{WatchEventKind, WatchRegistry};
