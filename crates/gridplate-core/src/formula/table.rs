//! Where each referenced template cell ended up.
//!
//! Formula markers are recorded before any sheet is transformed. Every cell
//! they reference is registered here under its template position, and every
//! structural edit is replayed on the registered locations. A location also
//! carries the iteration path (one index per enclosing loop) that produced
//! it, so a formula copied into iteration `[1, 0]` only sees the cells of
//! that iteration.

use std::collections::HashMap;

use crate::grid::{CellPos, Edit, Rect};

/// A current location of a template cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub pos: CellPos,
    /// Loop iteration indices, outermost first.
    pub path: Vec<usize>,
}

/// A location lifted out of the table along with the template cell it
/// belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedEntry {
    pub origin: CellPos,
    pub location: Location,
}

#[derive(Clone, Debug, Default)]
pub struct TranslationTable {
    sheets: HashMap<String, HashMap<CellPos, Vec<Location>>>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a template cell. Registering twice is a no-op.
    pub fn register(&mut self, sheet: &str, origin: CellPos) {
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .entry(origin)
            .or_insert_with(|| {
                vec![Location {
                    pos: origin,
                    path: Vec::new(),
                }]
            });
    }

    /// Current locations of a tracked template cell; `None` if untracked.
    pub fn locations(&self, sheet: &str, origin: CellPos) -> Option<&[Location]> {
        self.sheets
            .get(sheet)?
            .get(&origin)
            .map(|locations| locations.as_slice())
    }

    /// Bounding rectangle of every tracked location on a sheet.
    pub fn extent(&self, sheet: &str) -> Option<Rect> {
        self.sheets
            .get(sheet)?
            .values()
            .flatten()
            .map(|l| Rect::cell(l.pos))
            .reduce(|a, b| Rect {
                top: a.top.min(b.top),
                bottom: a.bottom.max(b.bottom),
                left: a.left.min(b.left),
                right: a.right.max(b.right),
            })
    }

    /// Replay a structural edit. Cleared locations are forgotten.
    pub fn apply(&mut self, sheet: &str, edit: &Edit) {
        let Some(cells) = self.sheets.get_mut(sheet) else {
            return;
        };
        for locations in cells.values_mut() {
            locations.retain_mut(|l| match edit.apply(l.pos) {
                Some(pos) => {
                    l.pos = pos;
                    true
                }
                None => false,
            });
        }
    }

    /// Copies of the locations inside `rect`.
    pub fn snapshot(&self, sheet: &str, rect: Rect) -> Vec<TrackedEntry> {
        let Some(cells) = self.sheets.get(sheet) else {
            return Vec::new();
        };
        cells
            .iter()
            .flat_map(|(origin, locations)| {
                locations
                    .iter()
                    .filter(|l| rect.contains(l.pos))
                    .map(|l| TrackedEntry {
                        origin: *origin,
                        location: l.clone(),
                    })
            })
            .collect()
    }

    /// Like [`TranslationTable::snapshot`], but removes what it copies.
    pub fn take(&mut self, sheet: &str, rect: Rect) -> Vec<TrackedEntry> {
        let taken = self.snapshot(sheet, rect);
        if let Some(cells) = self.sheets.get_mut(sheet) {
            for locations in cells.values_mut() {
                locations.retain(|l| !rect.contains(l.pos));
            }
        }
        taken
    }

    /// Put entries back, moved by the offset.
    pub fn restore(&mut self, sheet: &str, entries: Vec<TrackedEntry>, rows: isize, cols: isize) {
        for entry in entries {
            if let Some(pos) = entry.location.pos.offset(rows, cols) {
                self.push(
                    sheet,
                    entry.origin,
                    Location {
                        pos,
                        path: entry.location.path,
                    },
                );
            }
        }
    }

    /// Add copies of `entries` for loop iteration `index`, moved by the offset.
    pub fn copy_iteration(
        &mut self,
        sheet: &str,
        entries: &[TrackedEntry],
        rows: isize,
        cols: isize,
        index: usize,
    ) {
        for entry in entries {
            if let Some(pos) = entry.location.pos.offset(rows, cols) {
                let mut path = entry.location.path.clone();
                path.push(index);
                self.push(sheet, entry.origin, Location { pos, path });
            }
        }
    }

    /// Mark the locations inside `rect` as produced by iteration `index`.
    pub fn push_index(&mut self, sheet: &str, rect: Rect, index: usize) {
        let Some(cells) = self.sheets.get_mut(sheet) else {
            return;
        };
        for location in cells.values_mut().flatten() {
            if rect.contains(location.pos) {
                location.path.push(index);
            }
        }
    }

    fn push(&mut self, sheet: &str, origin: CellPos, location: Location) {
        let locations = self
            .sheets
            .entry(sheet.to_string())
            .or_default()
            .entry(origin)
            .or_default();
        if !locations.contains(&location) {
            locations.push(location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(top: usize, bottom: usize, left: usize, right: usize) -> Rect {
        Rect {
            top,
            bottom,
            left,
            right,
        }
    }

    #[test]
    fn test_register_and_shift() {
        let mut table = TranslationTable::new();
        table.register("S", CellPos::new(2, 1));
        table.register("S", CellPos::new(2, 1));
        table.register("S", CellPos::new(0, 0));
        table.apply("S", &Edit::shift(crate::grid::Axis::Rows, 0, 3, 1, 2));

        let moved = table.locations("S", CellPos::new(2, 1)).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].pos, CellPos::new(4, 1));
        let fixed = table.locations("S", CellPos::new(0, 0)).unwrap();
        assert_eq!(fixed[0].pos, CellPos::new(0, 0));
        assert!(table.locations("Other", CellPos::new(0, 0)).is_none());
    }

    #[test]
    fn test_clear_forgets_locations_but_keeps_origin() {
        let mut table = TranslationTable::new();
        table.register("S", CellPos::new(1, 1));
        table.apply("S", &Edit::Clear(rect(0, 3, 0, 3)));
        assert_eq!(table.locations("S", CellPos::new(1, 1)), Some(&[][..]));
    }

    #[test]
    fn test_iteration_copies_carry_paths() {
        let mut table = TranslationTable::new();
        table.register("S", CellPos::new(2, 0));
        let template = table.snapshot("S", rect(2, 2, 0, 1));
        table.push_index("S", rect(2, 2, 0, 1), 0);
        table.copy_iteration("S", &template, 1, 0, 1);
        table.copy_iteration("S", &template, 2, 0, 2);

        let locations = table.locations("S", CellPos::new(2, 0)).unwrap();
        let found: Vec<(usize, Vec<usize>)> =
            locations.iter().map(|l| (l.pos.row, l.path.clone())).collect();
        assert_eq!(found, vec![(2, vec![0]), (3, vec![1]), (4, vec![2])]);
        assert_eq!(table.extent("S"), Some(rect(2, 4, 0, 0)));
    }

    #[test]
    fn test_take_and_restore() {
        let mut table = TranslationTable::new();
        table.register("S", CellPos::new(5, 0));
        let taken = table.take("S", rect(3, 9, 0, 0));
        assert_eq!(taken.len(), 1);
        assert!(table.locations("S", CellPos::new(5, 0)).unwrap().is_empty());
        table.restore("S", taken, 4, 0);
        assert_eq!(
            table.locations("S", CellPos::new(5, 0)).unwrap()[0].pos,
            CellPos::new(9, 0)
        );
    }
}
