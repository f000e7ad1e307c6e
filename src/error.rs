//! Error types for the Prosa compiler

use crate::span::Span;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProsaError {
    #[error("Lexical error at {span:?}: {message}")]
    Lexical { message: String, span: Span },

    #[error("Syntax error at {span:?}: {message}")]
    Syntax { message: String, span: Span },

    #[error("Name error: {message}")]
    Name { message: String },

    #[error("Type error: {message}")]
    Type { message: String },

    #[error("Arithmetic error: {message}")]
    Arithmetic { message: String },

    #[error("Generation error: {message}")]
    Generation { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProsaError {
    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        ProsaError::Lexical {
            message: message.into(),
            span,
        }
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        ProsaError::Syntax {
            message: message.into(),
            span,
        }
    }

    pub fn name(message: impl Into<String>) -> Self {
        ProsaError::Name {
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        ProsaError::Type {
            message: message.into(),
        }
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        ProsaError::Arithmetic {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        ProsaError::Generation {
            message: message.into(),
        }
    }
}

/// Result type for Prosa operations
pub type ProsaResult<T> = Result<T, ProsaError>;
