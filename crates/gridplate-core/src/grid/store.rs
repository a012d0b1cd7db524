//! Structural editing over a sheet.
//!
//! Shifts are limited to a cross span: `shift_rows(left, right, from, delta)`
//! moves only the cells in columns `left..=right`. That is what lets a loop
//! grow one block without disturbing content beside it.

use super::cell::Cell;
use super::sheet::{Axis, CellPos, Group, Rect, Sheet};

/// A structural edit, replayed on everything that tracks positions
/// (merged regions, formula locations, pending removals).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    /// Cells in columns `left..=right` at or below `from` move by `delta` rows.
    ShiftRows {
        left: usize,
        right: usize,
        from: usize,
        delta: isize,
    },
    /// Cells in rows `top..=bottom` at or right of `from` move by `delta` columns.
    ShiftCols {
        top: usize,
        bottom: usize,
        from: usize,
        delta: isize,
    },
    /// Everything inside the rectangle is gone.
    Clear(Rect),
}

impl Edit {
    /// Shift along `axis` covering `cross_start..=cross_end` on the other axis.
    pub fn shift(axis: Axis, cross_start: usize, cross_end: usize, from: usize, delta: isize) -> Edit {
        match axis {
            Axis::Rows => Edit::ShiftRows {
                left: cross_start,
                right: cross_end,
                from,
                delta,
            },
            Axis::Cols => Edit::ShiftCols {
                top: cross_start,
                bottom: cross_end,
                from,
                delta,
            },
        }
    }

    /// Where `pos` ends up after this edit; `None` if it was cleared.
    pub fn apply(&self, pos: CellPos) -> Option<CellPos> {
        match *self {
            Edit::ShiftRows {
                left,
                right,
                from,
                delta,
            } => {
                if (left..=right).contains(&pos.col) && pos.row >= from {
                    pos.offset(delta, 0)
                } else {
                    Some(pos)
                }
            }
            Edit::ShiftCols {
                top,
                bottom,
                from,
                delta,
            } => {
                if (top..=bottom).contains(&pos.row) && pos.col >= from {
                    pos.offset(0, delta)
                } else {
                    Some(pos)
                }
            }
            Edit::Clear(rect) => (!rect.contains(pos)).then_some(pos),
        }
    }
}

/// Cells and merged regions lifted out of a rectangle, stored relative to
/// its top-left corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    pub cells: Vec<(CellPos, Cell)>,
    pub merged: Vec<Rect>,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.merged.is_empty()
    }
}

/// Storage operations the transformer needs from a sheet.
pub trait GridStore {
    fn get_cell(&self, pos: CellPos) -> Option<Cell>;
    fn set_cell(&mut self, pos: CellPos, cell: Cell);
    fn remove_cell(&mut self, pos: CellPos) -> Option<Cell>;

    /// Bounding rectangle of every cell and merged region.
    fn used_bounds(&self) -> Option<Rect>;

    /// Copy the cells and fully contained merged regions of `rect`.
    fn snapshot(&self, rect: Rect) -> Region;
    /// Like [`GridStore::snapshot`], but removes what it copies.
    fn take(&mut self, rect: Rect) -> Region;
    /// Write a region with its top-left corner at `at`, overwriting.
    fn paste(&mut self, region: &Region, at: CellPos);

    fn shift_rows(&mut self, left: usize, right: usize, from: usize, delta: isize);
    fn shift_cols(&mut self, top: usize, bottom: usize, from: usize, delta: isize);

    fn copy_style(&mut self, from: CellPos, to: CellPos);
    fn adjust_merged_regions(&mut self, edit: &Edit);
    fn adjust_groups(&mut self, edit: &Edit);
    fn add_group(&mut self, group: Group);

    /// Delete `count` rows at `at` within columns `left..=right`, closing the gap.
    fn remove_rows(&mut self, left: usize, right: usize, at: usize, count: usize) {
        if count == 0 {
            return;
        }
        let gone = Rect {
            top: at,
            bottom: at + count - 1,
            left,
            right,
        };
        self.take(gone);
        self.adjust_merged_regions(&Edit::Clear(gone));
        let edit = Edit::ShiftRows {
            left,
            right,
            from: at + count,
            delta: -(count as isize),
        };
        self.shift_rows(left, right, at + count, -(count as isize));
        self.adjust_merged_regions(&edit);
    }

    fn remove_cols(&mut self, top: usize, bottom: usize, at: usize, count: usize) {
        if count == 0 {
            return;
        }
        let gone = Rect {
            top,
            bottom,
            left: at,
            right: at + count - 1,
        };
        self.take(gone);
        self.adjust_merged_regions(&Edit::Clear(gone));
        let edit = Edit::ShiftCols {
            top,
            bottom,
            from: at + count,
            delta: -(count as isize),
        };
        self.shift_cols(top, bottom, at + count, -(count as isize));
        self.adjust_merged_regions(&edit);
    }

    /// Blank every value in `rect`, keeping styles.
    fn clear_values(&mut self, rect: Rect) {
        for pos in rect.positions() {
            if let Some(cell) = self.get_cell(pos) {
                self.set_cell(pos, cell.blanked());
            }
        }
    }
}

impl Sheet {
    fn cells_in(&self, rect: Rect) -> Vec<(CellPos, Cell)> {
        self.grid
            .iter()
            .filter(|entry| rect.contains(*entry.key()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Move every matching cell by the offset in one pass, so moves never
    /// overwrite cells that have not moved yet.
    fn move_cells(&mut self, matches: impl Fn(CellPos) -> bool, rows: isize, cols: isize) {
        let moving: Vec<(CellPos, Cell)> = self
            .grid
            .iter()
            .filter(|entry| matches(*entry.key()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        for (pos, _) in &moving {
            self.grid.remove(pos);
        }
        for (pos, cell) in moving {
            if let Some(dest) = pos.offset(rows, cols) {
                self.grid.insert(dest, cell);
            }
        }
    }
}

impl GridStore for Sheet {
    fn get_cell(&self, pos: CellPos) -> Option<Cell> {
        self.grid.get(&pos).map(|cell| cell.clone())
    }

    fn set_cell(&mut self, pos: CellPos, cell: Cell) {
        self.grid.insert(pos, cell);
    }

    fn remove_cell(&mut self, pos: CellPos) -> Option<Cell> {
        self.grid.remove(&pos).map(|(_, cell)| cell)
    }

    fn used_bounds(&self) -> Option<Rect> {
        let cells = self.grid.iter().map(|entry| Rect::cell(*entry.key()));
        cells.chain(self.merged.iter().copied()).reduce(|a, b| Rect {
            top: a.top.min(b.top),
            bottom: a.bottom.max(b.bottom),
            left: a.left.min(b.left),
            right: a.right.max(b.right),
        })
    }

    fn snapshot(&self, rect: Rect) -> Region {
        let origin = rect.top_left();
        let cells = self
            .cells_in(rect)
            .into_iter()
            .map(|(pos, cell)| (CellPos::new(pos.row - origin.row, pos.col - origin.col), cell))
            .collect();
        let merged = self
            .merged
            .iter()
            .filter(|m| rect.contains_rect(m))
            .map(|m| Rect {
                top: m.top - origin.row,
                bottom: m.bottom - origin.row,
                left: m.left - origin.col,
                right: m.right - origin.col,
            })
            .collect();
        Region { cells, merged }
    }

    fn take(&mut self, rect: Rect) -> Region {
        let region = self.snapshot(rect);
        for (pos, _) in self.cells_in(rect) {
            self.grid.remove(&pos);
        }
        self.merged.retain(|m| !rect.contains_rect(m));
        region
    }

    fn paste(&mut self, region: &Region, at: CellPos) {
        for (rel, cell) in &region.cells {
            self.grid
                .insert(CellPos::new(at.row + rel.row, at.col + rel.col), cell.clone());
        }
        for m in &region.merged {
            let placed = Rect {
                top: m.top + at.row,
                bottom: m.bottom + at.row,
                left: m.left + at.col,
                right: m.right + at.col,
            };
            if !self.merged.contains(&placed) {
                self.merged.push(placed);
            }
        }
    }

    fn shift_rows(&mut self, left: usize, right: usize, from: usize, delta: isize) {
        if delta != 0 {
            self.move_cells(
                |pos| (left..=right).contains(&pos.col) && pos.row >= from,
                delta,
                0,
            );
        }
    }

    fn shift_cols(&mut self, top: usize, bottom: usize, from: usize, delta: isize) {
        if delta != 0 {
            self.move_cells(
                |pos| (top..=bottom).contains(&pos.row) && pos.col >= from,
                0,
                delta,
            );
        }
    }

    fn copy_style(&mut self, from: CellPos, to: CellPos) {
        let style = self.grid.get(&from).map(|cell| cell.style).unwrap_or_default();
        self.grid.entry(to).or_insert_with(Cell::new_empty).style = style;
    }

    fn adjust_merged_regions(&mut self, edit: &Edit) {
        let mut merged = Vec::with_capacity(self.merged.len());
        for m in self.merged.drain(..) {
            let moved = match *edit {
                Edit::Clear(rect) => (!rect.contains_rect(&m)).then_some(m),
                Edit::ShiftRows {
                    left,
                    right,
                    from,
                    delta,
                } if m.left >= left && m.right <= right => shift_span(m.top, m.bottom, from, delta)
                    .map(|(top, bottom)| Rect { top, bottom, ..m }),
                Edit::ShiftCols {
                    top,
                    bottom,
                    from,
                    delta,
                } if m.top >= top && m.bottom <= bottom => shift_span(m.left, m.right, from, delta)
                    .map(|(left, right)| Rect { left, right, ..m }),
                _ => Some(m),
            };
            if let Some(m) = moved.filter(|m| m.height() > 1 || m.width() > 1) {
                merged.push(m);
            }
        }
        self.merged = merged;
    }

    fn adjust_groups(&mut self, edit: &Edit) {
        let (axis, from, delta) = match *edit {
            Edit::ShiftRows { from, delta, .. } => (Axis::Rows, from, delta),
            Edit::ShiftCols { from, delta, .. } => (Axis::Cols, from, delta),
            Edit::Clear(_) => return,
        };
        self.groups.retain_mut(|group| {
            if group.axis != axis {
                return true;
            }
            match shift_span(group.start, group.end, from, delta) {
                Some((start, end)) => {
                    group.start = start;
                    group.end = end;
                    true
                }
                None => false,
            }
        });
    }

    fn add_group(&mut self, group: Group) {
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
    }
}

/// Move the span `start..=end` for a shift of `delta` lines at `from`.
/// A negative delta deletes the lines `from - |delta| .. from`; a span that
/// reaches into them is clipped, and one entirely inside them is gone.
fn shift_span(start: usize, end: usize, from: usize, delta: isize) -> Option<(usize, usize)> {
    if delta >= 0 {
        let moved = |line: usize| if line >= from { line + delta as usize } else { line };
        return Some((moved(start), moved(end)));
    }
    let count = delta.unsigned_abs();
    let gone = from.saturating_sub(count);
    let start = match start {
        s if s >= from => s - count,
        s if s >= gone => gone,
        s => s,
    };
    let end = match end {
        e if e >= from => e - count,
        e if e >= gone => gone.checked_sub(1)?,
        e => e,
    };
    (end >= start).then_some((start, end))
}
