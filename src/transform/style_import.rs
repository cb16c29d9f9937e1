// Style import rewriting
// Adds a side-effect stylesheet import after every import of a component library

use crate::core::models::ImportStyleConfig;
use crate::transform::patcher::TextPatcher;
use crate::transform::{Enforce, TransformContext, TransformOutput, TransformPlugin};
use crate::utils::{ErrorContext, IceError, Logger, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

static IMPORT_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+as\s+\w+,?").expect("valid regex"));
static SOURCE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(js|jsx|ts|tsx)$").expect("valid regex"));

/// One static import (or re-export) statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub specifier: String,
    /// Byte offset of the statement start
    pub start: usize,
    /// Byte offset right after the statement, including a trailing `;`
    pub end: usize,
}

/// Parse `code` and list its static import statements.
pub fn scan_imports(code: &str, source_type: SourceType) -> Result<Vec<ImportRecord>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(IceError::parse(format!("failed to parse module: {}", message)));
    }

    let mut records = Vec::new();
    for stmt in &ret.program.body {
        let (source, span) = match stmt {
            Statement::ImportDeclaration(decl) if !decl.import_kind.is_type() => {
                (&decl.source, decl.span)
            }
            Statement::ExportNamedDeclaration(decl) if !decl.export_kind.is_type() => {
                match &decl.source {
                    Some(source) => (source, decl.span),
                    None => continue,
                }
            }
            Statement::ExportAllDeclaration(decl) if !decl.export_kind.is_type() => {
                (&decl.source, decl.span)
            }
            _ => continue,
        };
        records.push(ImportRecord {
            specifier: source.value.to_string(),
            start: span.start as usize,
            end: span.end as usize,
        });
    }
    Ok(records)
}

/// Names bound by an `import { .. } from` statement, in declaration order.
///
/// The statement is rewritten into the equivalent `export { .. } from` form
/// and parsed again; aliases are dropped so the exported names are the
/// imported ones.
pub fn extract_named_bindings(statement: &str) -> Result<Vec<String>> {
    let export_source = statement.replacen("import ", "export ", 1);
    let export_source = IMPORT_ALIAS.replace_all(&export_source, ",");

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &export_source, SourceType::mjs()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return Err(IceError::parse_with_context(
            "cannot analyze import bindings",
            ErrorContext::new().with_snippet(statement.to_string()),
        ));
    }

    let mut names = Vec::new();
    for stmt in &ret.program.body {
        if let Statement::ExportNamedDeclaration(decl) = stmt {
            names.extend(decl.specifiers.iter().map(|s| s.exported.name().to_string()));
        }
    }
    Ok(names)
}

/// `FooBar` -> `foo-bar`
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub type StyleNameFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where the stylesheet of a binding lives
#[derive(Clone, Default)]
pub enum StyleOption {
    Disabled,
    /// `<library>/es/<name>/style`
    #[default]
    Default,
    /// Path computed from the (possibly kebab-cased) binding name
    Custom(StyleNameFn),
}

impl StyleOption {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        StyleOption::Custom(Arc::new(f))
    }

    /// Substitute `{name}` in `template`
    pub fn template(template: impl Into<String>) -> Self {
        let template = template.into();
        Self::custom(move |name| Some(template.replace("{name}", name)))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, StyleOption::Disabled)
    }
}

impl fmt::Debug for StyleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleOption::Disabled => write!(f, "Disabled"),
            StyleOption::Default => write!(f, "Default"),
            StyleOption::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportStyleOptions {
    pub library_name: String,
    pub style: StyleOption,
    pub source_map: bool,
    pub kebab_case: bool,
}

impl ImportStyleOptions {
    pub fn new(library_name: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            style: StyleOption::Default,
            source_map: false,
            kebab_case: true,
        }
    }

    pub fn with_style(mut self, style: StyleOption) -> Self {
        self.style = style;
        self
    }

    pub fn with_source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    pub fn with_kebab_case(mut self, kebab_case: bool) -> Self {
        self.kebab_case = kebab_case;
        self
    }

    fn style_path(&self, binding: &str) -> Option<String> {
        let name = if self.kebab_case {
            to_kebab_case(binding)
        } else {
            binding.to_string()
        };
        let path = match &self.style {
            StyleOption::Disabled => None,
            StyleOption::Default => Some(format!("{}/es/{}/style", self.library_name, name)),
            StyleOption::Custom(f) => f(&name),
        };
        path.filter(|p| !p.is_empty())
    }
}

impl From<&ImportStyleConfig> for ImportStyleOptions {
    fn from(config: &ImportStyleConfig) -> Self {
        let style = match &config.style {
            Value::Bool(false) | Value::Null => StyleOption::Disabled,
            Value::String(template) if template.is_empty() => StyleOption::Disabled,
            Value::String(template) => StyleOption::template(template.clone()),
            _ => StyleOption::Default,
        };
        ImportStyleOptions::new(config.library_name.clone())
            .with_style(style)
            .with_kebab_case(config.kebab_case)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleImportOutput {
    pub code: String,
    /// Source map JSON
    pub map: Option<String>,
}

/// Rewrite `code`, assuming a module that may contain TypeScript and JSX.
///
/// Code that only parses as plain TypeScript (generic arrows such as
/// `<T>(x: T) => x`) is retried without JSX.
pub fn import_style(code: &str, options: &ImportStyleOptions) -> Option<StyleImportOutput> {
    if !options.style.is_enabled() {
        return None;
    }
    let source_type = if scan_imports(code, SourceType::tsx()).is_ok() {
        SourceType::tsx()
    } else {
        SourceType::ts()
    };
    import_style_with(code, options, source_type, "source.js")
}

/// Rewrite `code` parsed as `source_type`; `source_name` labels the map.
///
/// Returns `None` when styling is disabled, the code does not parse or it has
/// no imports at all.
pub fn import_style_with(
    code: &str,
    options: &ImportStyleOptions,
    source_type: SourceType,
    source_name: &str,
) -> Option<StyleImportOutput> {
    if !options.style.is_enabled() {
        return None;
    }

    let imports = match scan_imports(code, source_type) {
        Ok(imports) => imports,
        Err(e) => {
            Logger::warn(&format!("Skipping style import for {}: {}", source_name, e));
            return None;
        }
    };
    if imports.is_empty() {
        return None;
    }

    let mut patcher = TextPatcher::new(code);
    for record in imports.iter().filter(|r| r.specifier == options.library_name) {
        let statement = &code[record.start..record.end];
        let bindings = match extract_named_bindings(statement) {
            Ok(bindings) => bindings,
            Err(e) => {
                Logger::warn(&format!("Error occurred when analyzing code: {}", e.format_detailed()));
                continue;
            }
        };

        let lines: Vec<String> = bindings
            .iter()
            .filter_map(|binding| options.style_path(binding))
            .map(|path| format!("import '{}';", path))
            .collect();

        if !lines.is_empty() {
            // Offsets come from the parser, so they are always char boundaries.
            if let Err(e) = patcher.insert(record.end, format!("\n{}", lines.join("\n"))) {
                Logger::warn(&e.to_string());
            }
        }
    }

    let map = if options.source_map {
        match patcher.generate_map(source_name, true) {
            Ok(map) => Some(map),
            Err(e) => {
                Logger::warn(&e.to_string());
                None
            }
        }
    } else {
        None
    };

    Some(StyleImportOutput {
        code: patcher.render(),
        map,
    })
}

/// Transform plugin adding library stylesheet imports to application sources
#[derive(Debug, Clone)]
pub struct ImportStylePlugin {
    options: ImportStyleOptions,
}

impl ImportStylePlugin {
    pub fn new(options: ImportStyleOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ImportStyleOptions {
        &self.options
    }
}

#[async_trait]
impl TransformPlugin for ImportStylePlugin {
    fn name(&self) -> &str {
        "transform-import-style"
    }

    // Runs after the other transforms so TypeScript is already handled.
    fn enforce(&self) -> Option<Enforce> {
        Some(Enforce::Post)
    }

    fn transform_include(&self, id: &str) -> bool {
        SOURCE_FILE.is_match(id) && !id.contains("node_modules")
    }

    async fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &TransformContext,
    ) -> Result<Option<TransformOutput>> {
        if ctx.is_server || code.is_empty() {
            return Ok(None);
        }

        let source_type = SourceType::from_path(Path::new(id)).unwrap_or_else(|_| SourceType::tsx());
        Ok(import_style_with(code, &self.options, source_type, id).map(|out| TransformOutput {
            code: out.code,
            map: out.map,
        }))
    }
}
