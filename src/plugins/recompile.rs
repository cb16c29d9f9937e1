// Re-compile plugin: invalidates derived configs when route files change

use crate::core::plugin::{CompilerHooks, CompilerPlugin};
use crate::utils::Logger;
use std::path::PathBuf;
use std::sync::Arc;

pub const ROUTE_CONFIG_KEY: &str = "route-config";

pub type ReCompileFn = Arc<dyn Fn(&str) + Send + Sync>;
pub type ShouldReCompileFn = Arc<dyn Fn(&[PathBuf]) -> bool + Send + Sync>;

pub struct ReCompilePlugin {
    re_compile: ReCompileFn,
    should_recompile: ShouldReCompileFn,
}

impl ReCompilePlugin {
    pub fn new(re_compile: ReCompileFn, should_recompile: ShouldReCompileFn) -> Self {
        Self {
            re_compile,
            should_recompile,
        }
    }
}

impl CompilerPlugin for ReCompilePlugin {
    fn name(&self) -> &str {
        "ReCompilePlugin"
    }

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks) {
        hooks.watch_run.tap("ReCompilePlugin", move |modified_files| {
            if !modified_files.is_empty() && (self.should_recompile)(modified_files) {
                Logger::debug("Route files changed, re-compiling route config");
                (self.re_compile)(ROUTE_CONFIG_KEY);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_recompiles_only_when_accepted() {
        let keys = Arc::new(Mutex::new(Vec::new()));
        let recorded = keys.clone();
        let plugin = Arc::new(ReCompilePlugin::new(
            Arc::new(move |key: &str| recorded.lock().push(key.to_string())),
            Arc::new(|files: &[PathBuf]| files.iter().any(|f| f.to_string_lossy().contains("src/pages"))),
        ));
        let mut hooks = CompilerHooks::default();
        plugin.apply(&mut hooks);

        hooks.watch_run.call(&vec![PathBuf::from("/app/src/components/a.tsx")]);
        hooks.watch_run.call(&Vec::new());
        assert!(keys.lock().is_empty());

        hooks.watch_run.call(&vec![PathBuf::from("/app/src/pages/index.tsx")]);
        assert_eq!(*keys.lock(), vec!["route-config"]);
    }
}
