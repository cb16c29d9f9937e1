// Progress spinner shown while the bundler compiles

use crate::core::plugin::{CompilerHooks, CompilerPlugin};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub struct SpinnerPlugin {
    spinner: ProgressBar,
}

impl SpinnerPlugin {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        Self { spinner }
    }

    /// Spinner that draws nothing, for tests and non-interactive runs
    pub fn hidden() -> Self {
        Self {
            spinner: ProgressBar::hidden(),
        }
    }

    pub fn message(&self) -> String {
        self.spinner.message()
    }

    pub fn is_finished(&self) -> bool {
        self.spinner.is_finished()
    }
}

impl Default for SpinnerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerPlugin for SpinnerPlugin {
    fn name(&self) -> &str {
        "spinner"
    }

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks) {
        let plugin = self.clone();
        hooks.before_compile.tap("spinner", move |_| {
            plugin.spinner.reset();
            plugin.spinner.set_message("Compiling...");
            plugin.spinner.enable_steady_tick(Duration::from_millis(80));
        });
        hooks.after_emit.tap("spinner", move |_| {
            self.spinner.finish_and_clear();
        });
    }
}
