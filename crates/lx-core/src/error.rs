use crate::types::SourceReference;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct LexyError {
    pub code: String,
    pub message: String,
    pub reference: Option<SourceReference>,
}

impl LexyError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            reference: None,
        }
    }

    pub fn with_reference(
        code: impl Into<String>,
        message: impl Into<String>,
        reference: SourceReference,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            reference: Some(reference),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("COMPILER_INTERNAL", message)
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_combines_code_and_message() {
        let error = LexyError::new("ENGINE_FUNCTION_NOT_FOUND", "Function \"X\" not found.");
        assert_eq!(
            error.to_string(),
            "ENGINE_FUNCTION_NOT_FOUND: Function \"X\" not found."
        );
    }

    #[test]
    fn with_reference_keeps_source_position() {
        let reference = SourceReference::new("a.lexy", 3, 5);
        let error = LexyError::with_reference("TOKEN_INVALID", "Invalid character: '#'", reference.clone());
        assert_eq!(error.reference, Some(reference));
        assert_eq!(LexyError::internal("boom").code, "COMPILER_INTERNAL");
    }
}
