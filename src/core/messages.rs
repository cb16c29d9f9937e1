// Turn raw bundler diagnostics into short, readable messages

use crate::core::stats::{StatsJson, StatsMessage};
use once_cell::sync::Lazy;
use regex::Regex;

const SYNTAX_ERROR_LABEL: &str = "Syntax error:";

static LOADER_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Module [A-Za-z ]+\(from").expect("valid regex"));
static PARSING_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Line (\d+):(?:(\d+):)?\s*Parsing error: (.+)$").expect("valid regex")
});
static CSS_SYNTAX_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"SyntaxError\s+\((\d+):(\d+)\)\s*(.+?)\n").expect("valid regex"));
static EXPORT_NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^.*export '(.+?)' was not found in '(.+?)'.*$").expect("valid regex")
});
static CANNOT_RESOLVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Module not found: Error: Can't resolve '(.+?)' in '.+?'").expect("valid regex")
});
static FILE_POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*) \d+:\d+-\d+$").expect("valid regex"));
static STACK_FRAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*at\s.*:\d+:\d+[\s)]*$").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedMessages {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn is_likely_a_syntax_error(message: &str) -> bool {
    message.contains(SYNTAX_ERROR_LABEL)
}

/// Format the errors and warnings of a stats object.
///
/// When any error looks like a syntax error only syntax errors are kept;
/// the rest are usually follow-ups of the same problem.
pub fn format_messages(stats: &StatsJson) -> FormattedMessages {
    let format_all = |messages: &Option<Vec<StatsMessage>>| -> Vec<String> {
        messages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(format_message)
            .collect()
    };

    let mut result = FormattedMessages {
        errors: format_all(&stats.errors),
        warnings: format_all(&stats.warnings),
    };

    if result.errors.iter().any(|e| is_likely_a_syntax_error(e)) {
        result.errors.retain(|e| is_likely_a_syntax_error(e));
    }
    result
}

pub fn format_message(message: &StatsMessage) -> String {
    let raw = match &message.module_name {
        Some(module_name) => format!("{}\n{}", module_name, message.message),
        None => message.message.clone(),
    };

    // Loader headers such as `Module Error (from ./node_modules/x-loader)` add nothing.
    let lines: Vec<String> = raw
        .lines()
        .filter(|line| !LOADER_HEADER.is_match(line))
        .map(|line| match PARSING_ERROR.captures(line) {
            Some(caps) => format!(
                "{} {} ({}:{})",
                SYNTAX_ERROR_LABEL,
                &caps[3],
                &caps[1],
                caps.get(2).map_or("", |m| m.as_str())
            ),
            None => line.to_string(),
        })
        .collect();

    let mut text = lines.join("\n");
    text = CSS_SYNTAX_ERROR
        .replace_all(&text, format!("{} $3 ($1:$2)\n", SYNTAX_ERROR_LABEL).as_str())
        .into_owned();
    text = EXPORT_NOT_FOUND
        .replace_all(&text, "Attempted import error: '$1' is not exported from '$2'.")
        .into_owned();
    text = CANNOT_RESOLVE
        .replace_all(&text, "Cannot find module: '$1'")
        .into_owned();

    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    if lines.len() > 2 && lines[1].trim().is_empty() {
        lines.remove(1);
    }
    if let Some(first) = lines.first_mut() {
        let cleaned = FILE_POSITION.replace(first.as_str(), "$1").into_owned();
        *first = cleaned;
    }

    // Internal stack frames only point into the bundler itself.
    let lines: Vec<&String> = lines
        .iter()
        .filter(|line| {
            let is_internal_frame = STACK_FRAME.is_match(line) && !line.contains("webpack:");
            let is_anonymous_frame = line.trim() == "at <anonymous>";
            !is_internal_frame && !is_anonymous_frame
        })
        .collect();

    let mut collapsed: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        let previous_blank = collapsed.last().is_some_and(|prev| prev.trim().is_empty());
        if blank && previous_blank {
            continue;
        }
        collapsed.push(line);
    }

    collapsed.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(errors: Vec<StatsMessage>, warnings: Vec<StatsMessage>) -> StatsJson {
        StatsJson {
            errors: Some(errors),
            warnings: Some(warnings),
            ..Default::default()
        }
    }

    #[test]
    fn test_strips_loader_header_and_stack() {
        let message = StatsMessage::new(
            "Module Error (from ./node_modules/postcss-loader/index.js):\nUnknown word\n    at Parser.unknownWord (/app/node_modules/postcss/lib/parser.js:10:5)\n    at <anonymous>",
        )
        .with_module("./src/index.css");

        let formatted = format_message(&message);
        assert_eq!(formatted, "./src/index.css\nUnknown word");
    }

    #[test]
    fn test_module_not_found_is_shortened() {
        let message = StatsMessage::new(
            "Module not found: Error: Can't resolve './missing' in '/app/src'",
        )
        .with_module("./src/app.tsx 3:0-28");

        assert_eq!(
            format_message(&message),
            "./src/app.tsx\nCannot find module: './missing'"
        );
    }

    #[test]
    fn test_export_not_found() {
        let message = StatsMessage::new("export 'Foo' was not found in './lib'");
        assert_eq!(
            format_message(&message),
            "Attempted import error: 'Foo' is not exported from './lib'."
        );
    }

    #[test]
    fn test_syntax_errors_take_precedence() {
        let formatted = format_messages(&stats(
            vec![
                StatsMessage::new("Something else broke"),
                StatsMessage::new("Line 3:7:  Parsing error: Unexpected token"),
            ],
            vec![StatsMessage::new("Unused variable")],
        ));

        assert_eq!(
            formatted.errors,
            vec!["Syntax error: Unexpected token (3:7)".to_string()]
        );
        assert_eq!(formatted.warnings, vec!["Unused variable".to_string()]);
    }

    #[test]
    fn test_blank_lines_collapsed() {
        let message = StatsMessage::new("first\n\n\n\nsecond");
        assert_eq!(format_message(&message), "first\n\nsecond");
    }

    #[test]
    fn test_missing_sections() {
        let formatted = format_messages(&StatsJson::default());
        assert!(formatted.errors.is_empty());
        assert!(formatted.warnings.is_empty());
    }
}
