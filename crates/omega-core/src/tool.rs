//! Optional prompt pre-processing: the demo uppercase hint.
//!
//! An independently failing step with its own error type. The dispatcher
//! logs a failure and continues without the hint; nothing here may reach the
//! main request path as an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("empty input")]
    EmptyInput,
}

/// Uppercase hint for a qa prompt. The dispatcher prefixes the returned line
/// to the user message.
pub fn upper_hint(prompt: &str) -> Result<String, ToolError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(ToolError::EmptyInput);
    }
    Ok(format!("upper tool says: {}", trimmed.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_uppercases_the_prompt() {
        assert_eq!(upper_hint("hello").unwrap(), "upper tool says: HELLO");
    }

    #[test]
    fn empty_prompt_is_a_tool_error() {
        assert!(matches!(upper_hint("   "), Err(ToolError::EmptyInput)));
    }
}
