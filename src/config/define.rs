use serde_json::Value;
use std::collections::BTreeMap;

/// Build the compile-time replacement table.
///
/// Sources are applied in order, later ones overriding earlier ones:
/// user defines, runtime defines, then expanded environment variables
/// exposed as `process.env.*` and `import.meta.env.*`.
pub fn get_define_vars(
    define: &BTreeMap<String, Value>,
    runtime_define_vars: &BTreeMap<String, String>,
    expanded_envs: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    for (key, value) in define {
        let expression = match value {
            // Strings are expressions already, e.g. `"'production'"`.
            Value::String(expression) => expression.clone(),
            other => other.to_string(),
        };
        vars.insert(key.clone(), expression);
    }

    for (key, value) in runtime_define_vars {
        vars.insert(key.clone(), value.clone());
    }

    for (key, value) in expanded_envs {
        let literal = Value::String(value.clone()).to_string();
        vars.insert(format!("process.env.{}", key), literal.clone());
        vars.insert(format!("import.meta.env.{}", key), literal);
    }

    vars
}
