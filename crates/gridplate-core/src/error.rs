//! Error types for gridplate core.

use gridplate_engine::engine::{EvalError, FormulaError, MetadataError};
use thiserror::Error;

/// What went wrong while transforming one cell.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformErrorKind {
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),

    #[error("tag error: {0}")]
    TagAttribute(String),

    #[error("{0}")]
    UnknownVariable(String),

    #[error("{0}")]
    Evaluation(String),

    #[error("structural edit error: {0}")]
    StructuralEdit(String),

    #[error("blocks nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

impl From<EvalError> for TransformErrorKind {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::UnknownVariable { .. } => TransformErrorKind::UnknownVariable(err.to_string()),
            _ => TransformErrorKind::Evaluation(err.to_string()),
        }
    }
}

/// Errors that can occur while loading, rendering or saving a workbook
#[derive(Error, Debug)]
pub enum GridplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{sheet}!{cell}: {kind} (in `{text}`)")]
    Transform {
        sheet: String,
        cell: String,
        text: String,
        kind: TransformErrorKind,
    },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl GridplateError {
    /// The transform failure kind, when this is a transform error.
    pub fn transform_kind(&self) -> Option<&TransformErrorKind> {
        match self {
            GridplateError::Transform { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridplateError>;
