//! Template text engine.
//!
//! Everything here works on cell text and expression values; nothing touches
//! a grid:
//!
//! - [`Scanner`] - tokenizer shared by the metadata and formula parsers
//! - [`parse_metadata`] - `name=value;...` tag metadata
//! - [`CellRef`], [`scan_formula_refs`], [`FormulaMarker`] - formula references
//! - [`find_expressions`], [`identifier_paths`] - `${...}` markers and paths
//! - [`Evaluator`], [`RhaiEvaluator`] - expression evaluation
//! - [`format_dynamic`] - values as cell text

mod cell_ref;
mod eval;
mod expr;
mod format;
mod formula;
mod metadata;
mod scanner;

pub use cell_ref::{CellRef, quote_sheet_name};
pub use eval::{Bindings, EvalError, EvalMode, Evaluator, RhaiEvaluator};
pub use expr::{
    ExprSpan, IdentPath, find_expressions, identifier_paths, map_expressions, references_name,
    references_path, replace_path_prefix, rewrite_expressions, whole_expression,
};
pub use format::{format_dynamic, format_number};
pub use formula::{
    FormulaError, FormulaMarker, RefRole, RefSpan, parse_formula_refs, scan_formula_refs,
};
pub use metadata::{GroupDir, Metadata, MetadataError, PastEndAction, parse_metadata};
pub use scanner::{Scanner, Token, TokenKind};

pub use rhai::{Array, Dynamic, Map};
