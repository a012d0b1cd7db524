//! Sparse grid model.
//!
//! - [`Cell`], [`CellValue`], [`StyleId`] - cell contents
//! - [`Sheet`], [`CellPos`], [`Rect`], [`Group`] - one sheet of cells
//! - [`GridStore`], [`Region`], [`Edit`] - structural editing

mod cell;
mod sheet;
mod store;

pub use cell::{Cell, CellValue, StyleId};
pub use sheet::{Axis, CellPos, Grid, Group, Rect, Sheet};
pub use store::{Edit, GridStore, Region};
