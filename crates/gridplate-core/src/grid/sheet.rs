use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::cell::{Cell, CellValue};
use gridplate_engine::engine::CellRef;

/// Zero-based cell position. Orders row-major.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        CellPos { row, col }
    }

    /// Move by a signed offset; `None` when that leaves the sheet.
    pub fn offset(self, rows: isize, cols: isize) -> Option<CellPos> {
        Some(CellPos {
            row: self.row.checked_add_signed(rows)?,
            col: self.col.checked_add_signed(cols)?,
        })
    }

    pub fn to_a1(self) -> String {
        CellRef::new(self.col, self.row).to_string()
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// Row or column axis for structural operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Rows,
    Cols,
}

impl Axis {
    /// The coordinate of `pos` along this axis
    pub fn coord(self, pos: CellPos) -> usize {
        match self {
            Axis::Rows => pos.row,
            Axis::Cols => pos.col,
        }
    }

    /// `pos` with its coordinate along this axis replaced
    pub fn with_coord(self, pos: CellPos, coord: usize) -> CellPos {
        match self {
            Axis::Rows => CellPos::new(coord, pos.col),
            Axis::Cols => CellPos::new(pos.row, coord),
        }
    }

    /// (rows, cols) offset for a move of `delta` along this axis.
    pub fn offset(self, delta: isize) -> (isize, isize) {
        match self {
            Axis::Rows => (delta, 0),
            Axis::Cols => (0, delta),
        }
    }

    pub fn cross(self) -> Axis {
        match self {
            Axis::Rows => Axis::Cols,
            Axis::Cols => Axis::Rows,
        }
    }
}

/// Inclusive rectangle `top..=bottom x left..=right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Rect {
    pub fn cell(pos: CellPos) -> Self {
        Rect {
            top: pos.row,
            bottom: pos.row,
            left: pos.col,
            right: pos.col,
        }
    }

    /// Smallest rectangle covering both corners.
    pub fn spanning(a: CellPos, b: CellPos) -> Self {
        Rect {
            top: a.row.min(b.row),
            bottom: a.row.max(b.row),
            left: a.col.min(b.col),
            right: a.col.max(b.col),
        }
    }

    pub fn top_left(&self) -> CellPos {
        CellPos::new(self.top, self.left)
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        (self.top..=self.bottom).contains(&pos.row) && (self.left..=self.right).contains(&pos.col)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.top_left()) && self.contains(CellPos::new(other.bottom, other.right))
    }

    pub fn start(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.top,
            Axis::Cols => self.left,
        }
    }

    pub fn end(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.bottom,
            Axis::Cols => self.right,
        }
    }

    /// Number of rows (Rows) or columns (Cols) covered.
    pub fn size(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.height(),
            Axis::Cols => self.width(),
        }
    }

    /// Same rectangle with its extent along `axis` replaced.
    pub fn with_span(&self, axis: Axis, start: usize, end: usize) -> Rect {
        match axis {
            Axis::Rows => Rect {
                top: start,
                bottom: end,
                ..*self
            },
            Axis::Cols => Rect {
                left: start,
                right: end,
                ..*self
            },
        }
    }

    pub fn offset(&self, rows: isize, cols: isize) -> Option<Rect> {
        let top_left = self.top_left().offset(rows, cols)?;
        let bottom_right = CellPos::new(self.bottom, self.right).offset(rows, cols)?;
        Some(Rect::spanning(top_left, bottom_right))
    }

    /// Positions inside, row-major.
    pub fn positions(&self) -> impl Iterator<Item = CellPos> + '_ {
        (self.top..=self.bottom)
            .flat_map(move |row| (self.left..=self.right).map(move |col| CellPos::new(row, col)))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.top_left(),
            CellPos::new(self.bottom, self.right)
        )
    }
}

/// Outline group over a run of rows or columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub axis: Axis,
    pub start: usize,
    pub end: usize,
    pub collapsed: bool,
}

pub type Grid = DashMap<CellPos, Cell>;

/// A named sheet: sparse cells, merged regions and outline groups.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
    pub merged: Vec<Rect>,
    pub groups: Vec<Group>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Text of a text cell.
    pub fn cell_text(&self, pos: CellPos) -> Option<String> {
        self.grid
            .get(&pos)
            .and_then(|cell| cell.value.as_text().map(str::to_string))
    }

    /// Replace a cell's value, keeping its style.
    pub fn set_value(&self, pos: CellPos, value: CellValue) {
        self.grid.entry(pos).or_default().value = value;
    }

    /// Cells in row-major order.
    pub fn sorted_cells(&self) -> Vec<(CellPos, Cell)> {
        let mut cells: Vec<(CellPos, Cell)> = self
            .grid
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        cells.sort_by_key(|(pos, _)| *pos);
        cells
    }
}
