// Source transforms run on application modules before bundling
pub mod patcher;
pub mod style_import;

pub use patcher::{compose_maps, TextPatcher};
pub use style_import::{
    import_style, import_style_with, ImportStyleOptions, ImportStylePlugin, StyleImportOutput,
    StyleOption,
};

use crate::utils::{Logger, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Ordering group of a transform plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforce {
    Pre,
    Post,
}

#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    /// Transform for the server bundle rather than the browser
    pub is_server: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<String>,
}

#[async_trait]
pub trait TransformPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn enforce(&self) -> Option<Enforce> {
        None
    }

    fn transform_include(&self, _id: &str) -> bool {
        true
    }

    /// Return `None` to leave the code untouched
    async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> Result<Option<TransformOutput>>;
}

/// Runs transform plugins in `pre`, normal, `post` order
#[derive(Default)]
pub struct TransformPipeline {
    plugins: Vec<Arc<dyn TransformPlugin>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plugin(&mut self, plugin: Arc<dyn TransformPlugin>) {
        let rank = group_rank(plugin.enforce());
        // Insert after every plugin of the same or an earlier group.
        let index = self
            .plugins
            .iter()
            .position(|p| group_rank(p.enforce()) > rank)
            .unwrap_or(self.plugins.len());
        self.plugins.insert(index, plugin);
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Thread `code` through every plugin accepting `id`.
    ///
    /// Maps of successive plugins are chained, so the returned map points
    /// back to `code`. A plugin that changes the code without a map leaves
    /// the map untouched.
    pub async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> Result<TransformOutput> {
        let mut current = TransformOutput {
            code: code.to_string(),
            map: None,
        };

        for plugin in &self.plugins {
            if !plugin.transform_include(id) {
                continue;
            }
            if let Some(output) = plugin.transform(&current.code, id, ctx).await? {
                Logger::debug(&format!("{} transformed {}", plugin.name(), id));
                current.code = output.code;
                current.map = match (current.map.take(), output.map) {
                    (Some(previous), Some(next)) => Some(compose_maps(&previous, &next)?),
                    (previous, next) => next.or(previous),
                };
            }
        }

        Ok(current)
    }
}

fn group_rank(enforce: Option<Enforce>) -> u8 {
    match enforce {
        Some(Enforce::Pre) => 0,
        None => 1,
        Some(Enforce::Post) => 2,
    }
}
