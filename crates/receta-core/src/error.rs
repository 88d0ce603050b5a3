// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Receta.

use thiserror::Error;

/// Top-level error type for all Receta operations.
#[derive(Debug, Error)]
pub enum RecetaError {
    // -- Request errors --
    #[error("invalid request: {0}")]
    Validation(String),

    // -- Document errors --
    #[error("symbol generation failed: {0}")]
    Symbol(String),

    #[error("PDF rendering failed: {0}")]
    Render(String),

    // -- Collaborators --
    #[error("database error: {0}")]
    Database(String),

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RecetaError {
    /// Whether the error was caused by the caller's input rather than by a
    /// failing step of the pipeline.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RecetaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = RecetaError::Database("insert rejected".into());
        assert_eq!(err.to_string(), "database error: insert rejected");
    }

    #[test]
    fn only_validation_counts_as_validation() {
        assert!(RecetaError::Validation("x".into()).is_validation());
        assert!(!RecetaError::Render("x".into()).is_validation());
        assert!(!RecetaError::Mail("x".into()).is_validation());
    }

    #[test]
    fn serde_errors_convert() {
        let bad: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: RecetaError = bad.unwrap_err().into();
        assert!(matches!(err, RecetaError::Serialization(_)));
    }
}
