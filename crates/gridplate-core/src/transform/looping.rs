//! Loop expansion.
//!
//! A loop block is repeated once per item along its direction. Content past
//! the block within its columns (or rows, for loops copying right) is lifted
//! out first and put back after the last iteration, so the loop never pastes
//! over it. Fixed-size loops reuse the space already reserved for them.
//!
//! Past-end cells under `remove` are collected while iterating and deleted
//! once the loop is done: each takes its space with it, pulling the rest of
//! its column (or row, for loops copying right) inward.

use std::collections::BTreeMap;

use gridplate_engine::engine::{Array, Dynamic, FormulaMarker, PastEndAction};
use log::debug;

use crate::block::{BlockId, Direction};
use crate::error::{Result, TransformErrorKind};
use crate::formula::TrackedEntry;
use crate::grid::{Axis, CellPos, CellValue, Edit, GridStore, Rect, Region};

use super::transformer::{Context, Growth, Outcome, RemovalFrame, Transformer, Unbound};

/// Variables bound by one loop.
#[derive(Clone, Debug)]
pub(super) struct LoopBinding {
    pub vars: Vec<String>,
    /// One expression per variable.
    pub collections: Vec<String>,
    pub index_var: Option<String>,
    pub past_end: PastEndAction,
    pub fixed: bool,
}

/// Content lifted out from behind a loop.
struct Detached {
    rect: Rect,
    region: Region,
    entries: Vec<TrackedEntry>,
    /// Pending removals of enclosing loops that were inside `rect`, with the
    /// index of their removal frame.
    removals: Vec<(usize, CellPos)>,
}

impl Context {
    /// Bindings for iteration `index`. Variables whose collection is too
    /// short are unbound and remembered with the loop's past-end action.
    pub(super) fn for_iteration(
        &self,
        binding: &LoopBinding,
        collections: &[Array],
        index: usize,
        frame: usize,
    ) -> Context {
        let mut ctx = self.clone();
        for (var, items) in binding.vars.iter().zip(collections) {
            ctx.unbound.retain(|u| &u.name != var);
            match items.get(index) {
                Some(item) => ctx.bindings.insert(var.clone(), item.clone()),
                None => {
                    ctx.bindings.remove(var);
                    ctx.unbound.push(Unbound {
                        name: var.clone(),
                        action: binding.past_end,
                        frame,
                    });
                }
            }
        }
        if let Some(index_var) = &binding.index_var {
            ctx.unbound.retain(|u| &u.name != index_var);
            ctx.bindings
                .insert(index_var.clone(), Dynamic::from(index as rhai::INT));
        }
        ctx
    }
}

impl Transformer<'_> {
    /// Repeat a block once per item. `pos` and `text` identify the cell that
    /// opened the loop, for diagnostics.
    pub(super) fn expand_loop(
        &mut self,
        block: BlockId,
        binding: &LoopBinding,
        ctx: &Context,
        pos: CellPos,
        text: &str,
    ) -> Result<Outcome> {
        let mut collections = Vec::with_capacity(binding.collections.len());
        for expr in &binding.collections {
            collections.push(self.collection(expr, ctx, pos, text)?);
        }
        let count = collections.iter().map(Vec::len).max().unwrap_or(0);
        let rect = self.arena.get(block).rect();
        let axis = self.arena.get(block).direction.axis();
        debug!(
            "{}!{}: loop over {} with {} iteration(s){}",
            self.sheet_name,
            pos,
            binding.collections.join(", "),
            count,
            if binding.fixed { ", fixed" } else { "" }
        );

        if count == 0 {
            return Ok(if binding.fixed {
                self.sheet.clear_values(rect);
                Outcome::in_place(rect)
            } else {
                self.remove_span(rect, axis)
            });
        }

        let size = rect.size(axis);
        let start = rect.start(axis);
        let cross = axis.cross();
        let (cross_start, cross_end) = (rect.start(cross), rect.end(cross));
        let template = self.sheet.snapshot(rect);
        let tracked = self.table.snapshot(&self.sheet_name, rect);
        let trailing = if binding.fixed {
            None
        } else {
            self.detach_trailing(rect, axis)
        };

        self.removals.push(RemovalFrame {
            axis,
            cells: Vec::new(),
        });
        let frame_index = self.removals.len() - 1;
        let mut growth = Growth::default();
        let mut cursor = start;

        for index in 0..count {
            let span = rect.with_span(axis, cursor, cursor + size - 1);
            let (rows, cols) = axis.offset(cursor as isize - start as isize);
            if index == 0 {
                self.table.push_index(&self.sheet_name, rect, 0);
            } else {
                if binding.fixed {
                    self.sheet.take(span);
                    self.table.apply(&self.sheet_name, &Edit::Clear(span));
                }
                self.sheet.paste(&template, span.top_left());
                self.table
                    .copy_iteration(&self.sheet_name, &tracked, rows, cols, index);
            }
            self.mark_iteration(span, index);

            let current = self.arena.get(block).rect();
            self.arena.grow(
                block,
                (span.bottom as isize - current.bottom as isize).max(0),
                (span.right as isize - current.right as isize).max(0),
            );
            let iteration = self.arena.new_block(
                Some(block),
                span.left,
                span.right,
                span.top,
                span.bottom,
                Direction::None,
            );
            let iteration_ctx = ctx.for_iteration(binding, &collections, index, frame_index);
            let outcome = self.transform_block(iteration, &iteration_ctx)?;

            if binding.fixed && !outcome.growth.is_zero() {
                return Err(self.fail(
                    pos,
                    text,
                    TransformErrorKind::StructuralEdit(
                        "a fixed-size loop iteration cannot change size".to_string(),
                    ),
                ));
            }
            let along = outcome.growth.max_over(axis, cross_start, cross_end);
            growth.merge_cross(axis, &outcome.growth);
            cursor = (cursor as isize + size as isize + along).max(cursor as isize + 1) as usize;
        }

        let last = if binding.fixed {
            (start + count * size - 1).max(rect.end(axis))
        } else {
            cursor - 1
        };
        if !binding.fixed {
            let total = cursor as isize - (rect.end(axis) + 1) as isize;
            if let Some(detached) = trailing {
                self.reattach(detached, axis, total);
            }
            self.sheet.adjust_groups(&Edit::shift(
                axis,
                cross_start,
                cross_end,
                rect.end(axis) + 1,
                total,
            ));
            growth.add_span(axis, cross_start, cross_end, total);
        }

        let extent = rect.with_span(axis, start, last);
        let wider = growth.max_over(cross, start, last).max(0) as usize;
        let extent = extent.with_span(cross, cross_start, cross_end + wider);
        let pending = self.removals.pop().map(|frame| frame.cells).unwrap_or_default();
        let removed = if binding.fixed {
            for cell in pending.into_iter().rev() {
                self.remove_cell_within(cell, axis, extent.end(axis));
            }
            BTreeMap::new()
        } else {
            self.remove_cells(pending, axis)
        };
        if removed.is_empty() {
            return Ok(Outcome {
                extent: Some(extent),
                parts: Vec::new(),
                growth,
            });
        }
        for (line, count) in &removed {
            growth.add_span(axis, *line, *line, -(*count as isize));
        }
        let parts = shortened(extent, axis, &removed);
        let extent = parts.iter().copied().reduce(|a, b| Rect {
            top: a.top.min(b.top),
            bottom: a.bottom.max(b.bottom),
            left: a.left.min(b.left),
            right: a.right.max(b.right),
        });
        Ok(Outcome {
            extent,
            parts,
            growth,
        })
    }

    /// Evaluate a loop collection. Unit counts as empty.
    fn collection(&self, expr: &str, ctx: &Context, pos: CellPos, text: &str) -> Result<Array> {
        let value = self.evaluate(expr, ctx, pos, text)?;
        if value.is_unit() {
            return Ok(Array::new());
        }
        value.into_array().map_err(|type_name| {
            self.fail(
                pos,
                text,
                TransformErrorKind::TagAttribute(format!(
                    "`{}` is {}, not a collection",
                    expr, type_name
                )),
            )
        })
    }

    /// Append the iteration index to every formula marker inside `rect`.
    fn mark_iteration(&mut self, rect: Rect, index: usize) {
        let (begin, end) = (&self.config.formula_begin, &self.config.formula_end);
        let marked: Vec<(CellPos, String)> = self
            .sheet
            .grid
            .iter()
            .filter(|entry| rect.contains(*entry.key()))
            .filter_map(|entry| {
                let text = entry.value().value.as_text()?;
                let mut marker = FormulaMarker::parse(text, begin, end)?;
                marker.suffix.push(index);
                Some((*entry.key(), marker.render(begin, end)))
            })
            .collect();
        for (pos, text) in marked {
            self.sheet.set_value(pos, CellValue::Text(text));
        }
    }

    /// Lift out everything after the block in its cross span.
    fn detach_trailing(&mut self, rect: Rect, axis: Axis) -> Option<Detached> {
        let far = [self.sheet.used_bounds(), self.table.extent(&self.sheet_name)]
            .into_iter()
            .flatten()
            .map(|bounds| bounds.end(axis))
            .max()?;
        if far <= rect.end(axis) {
            return None;
        }
        let trailing = rect.with_span(axis, rect.end(axis) + 1, far);
        let region = self.sheet.take(trailing);
        let entries = self.table.take(&self.sheet_name, trailing);
        let mut removals = Vec::new();
        for (index, frame) in self.removals.iter_mut().enumerate() {
            frame.cells.retain(|cell| {
                let inside = trailing.contains(*cell);
                if inside {
                    removals.push((index, *cell));
                }
                !inside
            });
        }
        Some(Detached {
            rect: trailing,
            region,
            entries,
            removals,
        })
    }

    fn reattach(&mut self, detached: Detached, axis: Axis, delta: isize) {
        let (rows, cols) = axis.offset(delta);
        if let Some(at) = detached.rect.top_left().offset(rows, cols) {
            self.sheet.paste(&detached.region, at);
        }
        self.table
            .restore(&self.sheet_name, detached.entries, rows, cols);
        for (index, cell) in detached.removals {
            if let (Some(frame), Some(moved)) = (self.removals.get_mut(index), cell.offset(rows, cols)) {
                frame.cells.push(moved);
            }
        }
    }

    /// Delete each cell's space along `axis`, pulling the rest of its line
    /// inward up to the sheet's far edge. Returns the count removed per line.
    fn remove_cells(&mut self, cells: Vec<CellPos>, axis: Axis) -> BTreeMap<usize, usize> {
        let cross = axis.cross();
        let mut removed = BTreeMap::new();
        let mut pending = cells;
        pending.sort();
        pending.dedup();
        while let Some(pos) = pending.pop() {
            let line = cross.coord(pos);
            match axis {
                Axis::Rows => self.sheet.remove_rows(pos.col, pos.col, pos.row, 1),
                Axis::Cols => self.sheet.remove_cols(pos.row, pos.row, pos.col, 1),
            }
            let shift = Edit::shift(axis, line, line, axis.coord(pos) + 1, -1);
            for edit in [Edit::Clear(Rect::cell(pos)), shift] {
                self.table.apply(&self.sheet_name, &edit);
                self.apply_to_removals(&edit);
                pending = pending.into_iter().filter_map(|p| edit.apply(p)).collect();
            }
            *removed.entry(line).or_insert(0) += 1;
            debug!("{}: removed past-end cell {}", self.sheet_name, pos);
        }
        removed
    }

    /// Delete one cell of a fixed-size loop and pull the rest of its line,
    /// up to `limit`, inward.
    fn remove_cell_within(&mut self, pos: CellPos, axis: Axis, limit: usize) {
        let gone = Rect::cell(pos);
        self.sheet.remove_cell(pos);
        self.table.apply(&self.sheet_name, &Edit::Clear(gone));
        let from = axis.coord(pos) + 1;
        if from <= limit {
            let rest = gone.with_span(axis, from, limit);
            let region = self.sheet.take(rest);
            self.sheet.paste(&region, axis.with_coord(pos, from - 1));
            let (rows, cols) = axis.offset(-1);
            let entries = self.table.take(&self.sheet_name, rest);
            self.table.restore(&self.sheet_name, entries, rows, cols);
        }
        debug!("{}: removed past-end cell {} within {}", self.sheet_name, pos, limit);
    }
}

/// One rectangle per cross line of `extent`, each cut short by the cells its
/// line lost. Lines that lost everything are left out.
fn shortened(extent: Rect, axis: Axis, removed: &BTreeMap<usize, usize>) -> Vec<Rect> {
    let cross = axis.cross();
    let (start, end) = (extent.start(axis), extent.end(axis));
    (extent.start(cross)..=extent.end(cross))
        .filter_map(|line| {
            let count = removed.get(&line).copied().unwrap_or(0);
            let last = end.checked_sub(count).filter(|last| *last >= start)?;
            Some(extent.with_span(cross, line, line).with_span(axis, start, last))
        })
        .collect()
}
