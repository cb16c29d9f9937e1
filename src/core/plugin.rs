// Compiler plugin system
// Plugins tap named callbacks into the compiler's lifecycle hooks

use crate::core::stats::CompilationStats;
use crate::utils::Result;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

type SyncTap<A> = Arc<dyn Fn(&A) + Send + Sync>;
type AsyncTap<A> = Arc<dyn Fn(Arc<A>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Hook whose taps run synchronously, in registration order
pub struct SyncHook<A> {
    taps: Vec<(String, SyncTap<A>)>,
}

impl<A> Default for SyncHook<A> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<A> SyncHook<A> {
    pub fn tap<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.taps.push((name.to_string(), Arc::new(f)));
    }

    pub fn call(&self, arg: &A) {
        for (_, tap) in &self.taps {
            tap(arg);
        }
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn tap_names(&self) -> Vec<&str> {
        self.taps.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Hook whose taps are awaited one after another.
///
/// The first failing tap stops the series and its error is returned.
pub struct AsyncSeriesHook<A> {
    taps: Vec<(String, AsyncTap<A>)>,
}

impl<A> Default for AsyncSeriesHook<A> {
    fn default() -> Self {
        Self { taps: Vec::new() }
    }
}

impl<A: Send + Sync + 'static> AsyncSeriesHook<A> {
    pub fn tap_promise<F, Fut>(&mut self, name: &str, f: F)
    where
        F: Fn(Arc<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let tap: AsyncTap<A> = Arc::new(move |arg| Box::pin(f(arg)));
        self.taps.push((name.to_string(), tap));
    }

    pub async fn call(&self, arg: Arc<A>) -> Result<()> {
        for (name, tap) in &self.taps {
            tracing::trace!("calling tap {}", name);
            tap(arg.clone()).await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn tap_names(&self) -> Vec<&str> {
        self.taps.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Lifecycle hooks of a compiler
#[derive(Default)]
pub struct CompilerHooks {
    /// Before each compilation starts
    pub before_compile: SyncHook<()>,
    /// Before a watch-triggered compilation, with the modified files
    pub watch_run: SyncHook<Vec<PathBuf>>,
    /// After the bundler produced its output, before it is reported
    pub emit: AsyncSeriesHook<CompilationStats>,
    pub after_emit: SyncHook<CompilationStats>,
    /// Once the compilation is finished
    pub done: AsyncSeriesHook<CompilationStats>,
}

/// Extension point of the compiler
///
/// `apply` is called once when the compiler is created; the plugin taps
/// whatever hooks it needs, cloning `self` into the callbacks.
pub trait CompilerPlugin: Send + Sync {
    /// Unique name for this plugin
    fn name(&self) -> &str;

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks);
}

impl fmt::Debug for dyn CompilerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompilerPlugin({})", self.name())
    }
}

/// Plugin made from a closure over the hooks
pub struct FnPlugin<F> {
    name: String,
    apply_fn: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(&mut CompilerHooks) + Send + Sync + 'static,
{
    pub fn new(name: &str, apply_fn: F) -> Self {
        Self {
            name: name.to_string(),
            apply_fn,
        }
    }
}

impl<F> CompilerPlugin for FnPlugin<F>
where
    F: Fn(&mut CompilerHooks) + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(self: Arc<Self>, hooks: &mut CompilerHooks) {
        (self.apply_fn)(hooks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::IceError;
    use parking_lot::Mutex;

    #[test]
    fn test_sync_hook_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hook: SyncHook<u32> = SyncHook::default();

        let first = log.clone();
        hook.tap("first", move |n| first.lock().push(format!("first:{}", n)));
        let second = log.clone();
        hook.tap("second", move |n| second.lock().push(format!("second:{}", n)));

        hook.call(&7);

        assert_eq!(hook.tap_names(), vec!["first", "second"]);
        assert_eq!(*log.lock(), vec!["first:7", "second:7"]);
    }

    #[tokio::test]
    async fn test_async_series_stops_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hook: AsyncSeriesHook<String> = AsyncSeriesHook::default();

        let a = log.clone();
        hook.tap_promise("a", move |arg: Arc<String>| {
            let a = a.clone();
            async move {
                a.lock().push(format!("a:{}", arg));
                Err(IceError::plugin("a", "failed"))
            }
        });
        let b = log.clone();
        hook.tap_promise("b", move |_| {
            let b = b.clone();
            async move {
                b.lock().push("b".to_string());
                Ok(())
            }
        });

        let result = hook.call(Arc::new("x".to_string())).await;

        assert!(result.is_err());
        assert_eq!(*log.lock(), vec!["a:x"]);
    }

    #[test]
    fn test_fn_plugin_applies_closure() {
        let plugin: Arc<dyn CompilerPlugin> = Arc::new(FnPlugin::new("spinner", |hooks| {
            hooks.before_compile.tap("spinner", |_| {});
        }));
        let mut hooks = CompilerHooks::default();

        plugin.clone().apply(&mut hooks);

        assert_eq!(plugin.name(), "spinner");
        assert_eq!(hooks.before_compile.len(), 1);
        assert_eq!(format!("{:?}", plugin), "CompilerPlugin(spinner)");
    }
}
