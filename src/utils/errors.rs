use std::path::PathBuf;
use thiserror::Error;

/// Location of a failure inside a source file
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub code_snippet: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file_path = Some(path);
        self
    }

    pub fn with_snippet(mut self, snippet: String) -> Self {
        self.code_snippet = Some(snippet);
        self
    }
}

#[derive(Error, Debug)]
pub enum IceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Hook `{name}` failed: {message}")]
    Hook { name: String, message: String },

    #[error("Plugin `{name}` failed: {message}")]
    Plugin { name: String, message: String },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IceError {
    /// Create a simple parse error without context
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            context: None,
        }
    }

    /// Create a parse error with context
    pub fn parse_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Parse {
            message: message.into(),
            context: Some(context),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    pub fn hook(name: &str, message: impl Into<String>) -> Self {
        Self::Hook {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn plugin(name: &str, message: impl Into<String>) -> Self {
        Self::Plugin {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Format error with the file and snippet it points at, when known
    pub fn format_detailed(&self) -> String {
        match self {
            IceError::Parse {
                message,
                context: Some(ctx),
            } => {
                let mut output = format!("Parse Error: {}", message);
                if let Some(ref file_path) = ctx.file_path {
                    output.push_str(&format!("\n  File: {}", file_path.display()));
                }
                if let Some(ref snippet) = ctx.code_snippet {
                    for (i, line) in snippet.lines().enumerate() {
                        output.push_str(&format!("\n  {:3} │ {}", i + 1, line));
                    }
                }
                output
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IceError>;

impl From<regex::Error> for IceError {
    fn from(err: regex::Error) -> Self {
        IceError::parse(format!("Regex error: {}", err))
    }
}

impl From<anyhow::Error> for IceError {
    fn from(err: anyhow::Error) -> Self {
        IceError::compile(err.to_string())
    }
}

impl From<notify::Error> for IceError {
    fn from(err: notify::Error) -> Self {
        IceError::Watch(err.to_string())
    }
}
