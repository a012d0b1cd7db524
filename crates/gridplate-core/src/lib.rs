//! gridplate-core - grid model, block transformation engine + storage.

pub mod block;
pub mod config;
pub mod error;
pub mod formula;
pub mod grid;
pub mod storage;
pub mod transform;
pub mod workbook;

pub use config::{TemplateConfig, load_config};
pub use error::{GridplateError, Result, TransformErrorKind};
pub use grid::{Axis, Cell, CellPos, CellValue, Edit, GridStore, Group, Rect, Region, Sheet, StyleId};
pub use transform::Renderer;
pub use workbook::Workbook;

pub use gridplate_engine::engine::{Bindings, CellRef, EvalMode, Evaluator, RhaiEvaluator};
