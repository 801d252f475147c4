//! Domain error types (TRD Section 2.3).
//!
//! Two-level taxonomy: `CanvasError` covers every invalid edit, and
//! `TypeMismatch` is the catchable subtype raised when no compatible type
//! conversion exists. The signature engine catches `TypeMismatch` to probe
//! fallback conversions; everything else propagates to the caller.

/// No compatible conversion exists between a value and a required type slot.
///
/// Kept as its own error type so the overload-resolution engine can catch it
/// and try the next candidate without swallowing unrelated failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("no compatible conversion from {found} to {expected}")]
pub struct TypeMismatch {
    pub found: String,
    pub expected: String,
}

impl TypeMismatch {
    pub fn new(found: impl ToString, expected: impl ToString) -> Self {
        Self {
            found: found.to_string(),
            expected: expected.to_string(),
        }
    }
}

/// A parse error with position information for expression parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for canvastrader.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error(transparent)]
    Type(#[from] TypeMismatch),

    #[error(transparent)]
    ExprParse(#[from] ParseError),

    #[error("no child named '{name}' on node '{node}'")]
    ChildNotFound { node: String, name: String },

    #[error("node '{node}' already has a child named '{name}'")]
    DuplicateChild { node: String, name: String },

    #[error("slot '{slot}' of node '{node}' requires a reference node")]
    ReferenceRequired { node: String, slot: String },

    #[error("record {record} has no field '{field}'")]
    UnknownField { record: String, field: String },

    #[error("reference '{path}' does not resolve: {reason}")]
    BadReference { path: String, reason: String },

    #[error("node '{node}' is read-only")]
    ReadOnly { node: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CanvasError> for std::process::ExitCode {
    fn from(err: &CanvasError) -> Self {
        let code: u8 = match err {
            CanvasError::Io(_) => 1,
            CanvasError::ConfigParse { .. }
            | CanvasError::ConfigMissing { .. }
            | CanvasError::ConfigInvalid { .. } => 2,
            CanvasError::ExprParse(_) => 4,
            CanvasError::Type(_) => 5,
            CanvasError::ChildNotFound { .. }
            | CanvasError::DuplicateChild { .. }
            | CanvasError::ReferenceRequired { .. }
            | CanvasError::UnknownField { .. }
            | CanvasError::BadReference { .. }
            | CanvasError::ReadOnly { .. } => 6,
            CanvasError::Store { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_is_catchable_through_canvas_error() {
        let err: CanvasError = TypeMismatch::new("Money", "Quantity").into();
        assert!(matches!(err, CanvasError::Type(_)));
        assert_eq!(
            err.to_string(),
            "no compatible conversion from Money to Quantity"
        );
    }

    #[test]
    fn parse_error_caret_lines_up() {
        let err = ParseError {
            message: "expected ')'".to_string(),
            position: 4,
        };
        let rendered = err.display_with_context("add(1, 2");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "add(1, 2");
        assert_eq!(lines[1], "    ^");
    }

    #[test]
    fn exit_codes_by_class() {
        use std::process::ExitCode;
        let type_err: CanvasError = TypeMismatch::new("Text", "Money").into();
        assert_eq!(
            format!("{:?}", ExitCode::from(&type_err)),
            format!("{:?}", ExitCode::from(5u8))
        );

        let cfg = CanvasError::ConfigMissing {
            section: "strategy".into(),
            key: "entry".into(),
        };
        assert_eq!(
            format!("{:?}", ExitCode::from(&cfg)),
            format!("{:?}", ExitCode::from(2u8))
        );
    }
}
