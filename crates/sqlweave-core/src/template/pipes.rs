//! Placeholder pipes: small value transforms applied before binding.

use crate::error::RenderError;
use crate::value::Value;

type PipeFn = fn(&str) -> String;

/// The built-in pipe table. `contains`, `startswith` and `endswith` build
/// LIKE patterns; the rest are plain text transforms.
fn lookup(name: &str) -> Option<PipeFn> {
    match name {
        "upper" => Some(|t| t.to_uppercase()),
        "lower" => Some(|t| t.to_lowercase()),
        "trim" => Some(|t| t.trim().to_string()),
        "contains" => Some(|t| format!("%{t}%")),
        "startswith" => Some(|t| format!("{t}%")),
        "endswith" => Some(|t| format!("%{t}")),
        _ => None,
    }
}

/// Applies one pipe. Unknown names fail even when the value is null-like;
/// null-like values pass through so optional filters keep their semantics.
pub(crate) fn apply(name: &str, value: Value) -> Result<Value, RenderError> {
    let pipe = lookup(name).ok_or_else(|| RenderError::UnknownPipe(name.to_string()))?;
    if value.is_null_like() {
        return Ok(value);
    }
    let text = value.text_form().ok_or_else(|| RenderError::Pipe {
        name: name.to_string(),
        reason: "value has no text form".to_string(),
    })?;
    Ok(Value::Text(pipe(&text)))
}
