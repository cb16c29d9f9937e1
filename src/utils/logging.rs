use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub struct Logger;

impl Logger {
    /// Install the global subscriber. `RUST_LOG` overrides the default filter.
    pub fn init() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("ice_bundle=info"));

        // A subscriber may already be installed by an embedding host.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn info(msg: &str) {
        info!("{}", msg);
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }

    pub fn warn(msg: &str) {
        warn!("{}", msg);
    }

    pub fn error(msg: &str) {
        error!("{}", msg);
    }

    pub fn compile_start(names: &[String]) {
        info!("Compiling {} task(s): {}", names.len(), names.join(", "));
    }

    pub fn compile_complete(errors: usize, warnings: usize, elapsed: std::time::Duration) {
        if errors > 0 {
            error!("Compiled with {} error(s) in {:.2?}", errors, elapsed);
        } else if warnings > 0 {
            warn!("Compiled with {} warning(s) in {:.2?}", warnings, elapsed);
        } else {
            info!("Compiled successfully in {:.2?}", elapsed);
        }
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
