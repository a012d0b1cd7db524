//! Formula markers and reference tracking across structural edits.

mod remap;
mod table;

pub use remap::{FormulaRecords, gather, remap_formula, replace};
pub use table::{Location, TrackedEntry, TranslationTable};
