//! The block transformer.
//!
//! A block is scanned row-major. Tag cells open child blocks, which are
//! transformed recursively and may grow or shrink; everything else is
//! rendered in place. A [`Frame`] tracks how far the block has grown in each
//! column and row so the scan keeps following content that moved.

use std::collections::BTreeMap;
use std::ops::Range;

use gridplate_engine::engine::{
    Bindings, Dynamic, EvalMode, Evaluator, FormulaMarker, GroupDir, Metadata, PastEndAction,
    find_expressions, parse_metadata, references_name, whole_expression,
};
use log::{debug, warn};

use crate::block::{BlockArena, BlockId, Direction};
use crate::config::TemplateConfig;
use crate::error::{GridplateError, Result, TransformErrorKind};
use crate::formula::TranslationTable;
use crate::grid::{Axis, CellPos, CellValue, Edit, GridStore, Group, Rect, Sheet};

use super::looping::LoopBinding;
use super::tag::{ElseAction, Tag, TagStart, TagSyntax};

/// A variable whose collection ran out in the current iteration.
#[derive(Clone, Debug)]
pub(super) struct Unbound {
    pub name: String,
    pub action: PastEndAction,
    /// Index into [`Transformer::removals`] of the loop that unbound it.
    pub frame: usize,
}

/// What expressions inside a block can see.
#[derive(Clone, Debug, Default)]
pub(super) struct Context {
    pub bindings: Bindings,
    pub unbound: Vec<Unbound>,
}

/// Signed size change of a block, per column (rows gained) and per row
/// (columns gained).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct Growth {
    pub rows: BTreeMap<usize, isize>,
    pub cols: BTreeMap<usize, isize>,
}

impl Growth {
    /// The same change along `axis` for every line of `start..=end`.
    pub fn span(axis: Axis, start: usize, end: usize, delta: isize) -> Growth {
        let mut growth = Growth::default();
        growth.add_span(axis, start, end, delta);
        growth
    }

    fn map(&self, axis: Axis) -> &BTreeMap<usize, isize> {
        match axis {
            Axis::Rows => &self.rows,
            Axis::Cols => &self.cols,
        }
    }

    fn map_mut(&mut self, axis: Axis) -> &mut BTreeMap<usize, isize> {
        match axis {
            Axis::Rows => &mut self.rows,
            Axis::Cols => &mut self.cols,
        }
    }

    pub fn add_span(&mut self, axis: Axis, start: usize, end: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        let map = self.map_mut(axis);
        for line in start..=end {
            *map.entry(line).or_default() += delta;
        }
    }

    /// Growth along `axis` of the line `cross` (a column for rows).
    pub fn at(&self, axis: Axis, cross: usize) -> isize {
        self.map(axis).get(&cross).copied().unwrap_or(0)
    }

    /// Largest growth along `axis` over the lines `start..=end`.
    pub fn max_over(&self, axis: Axis, start: usize, end: usize) -> isize {
        self.map(axis)
            .range(start..=end)
            .map(|(_, delta)| *delta)
            .max()
            .map_or(0, |delta| if self.covers(axis, start, end) { delta } else { delta.max(0) })
    }

    fn covers(&self, axis: Axis, start: usize, end: usize) -> bool {
        self.map(axis).range(start..=end).count() == end - start + 1
    }

    pub fn merge(&mut self, other: &Growth) {
        for (line, delta) in &other.rows {
            *self.rows.entry(*line).or_default() += delta;
        }
        for (line, delta) in &other.cols {
            *self.cols.entry(*line).or_default() += delta;
        }
    }

    /// Merge only the growth along the axis other than `axis`.
    pub fn merge_cross(&mut self, axis: Axis, other: &Growth) {
        let cross = axis.cross();
        for (line, delta) in other.map(cross) {
            *self.map_mut(cross).entry(*line).or_default() += delta;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.rows.values().chain(self.cols.values()).all(|d| *d == 0)
    }

    fn max_value(map: &BTreeMap<usize, isize>) -> isize {
        map.values().copied().max().unwrap_or(0).max(0)
    }
}

/// Result of transforming a child block.
#[derive(Clone, Debug, Default)]
pub(super) struct Outcome {
    /// Area now covered by the block's output; `None` once removed.
    pub extent: Option<Rect>,
    /// Pieces of `extent` actually covered when some lines ended up shorter
    /// than others. Empty means all of `extent`.
    pub parts: Vec<Rect>,
    pub growth: Growth,
}

impl Outcome {
    pub fn in_place(rect: Rect) -> Outcome {
        Outcome {
            extent: Some(rect),
            ..Outcome::default()
        }
    }
}

/// Scan state of one block.
pub(super) struct Frame {
    pub rect: Rect,
    pub growth: Growth,
    done: Vec<Rect>,
}

impl Frame {
    fn new(rect: Rect) -> Self {
        Frame {
            rect,
            growth: Growth::default(),
            done: Vec::new(),
        }
    }

    pub fn bottom_at(&self, col: usize) -> isize {
        self.rect.bottom as isize + self.growth.at(Axis::Rows, col)
    }

    pub fn right_at(&self, row: usize) -> isize {
        self.rect.right as isize + self.growth.at(Axis::Cols, row)
    }

    /// Last row any column may reach.
    pub fn scan_bottom(&self) -> isize {
        self.rect.bottom as isize + Growth::max_value(&self.growth.rows)
    }

    pub fn scan_right(&self) -> isize {
        self.rect.right as isize + Growth::max_value(&self.growth.cols)
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.row >= self.rect.top
            && pos.col >= self.rect.left
            && pos.row as isize <= self.bottom_at(pos.col)
            && pos.col as isize <= self.right_at(pos.row)
    }

    /// Child output covering `pos`.
    pub fn done_at(&self, pos: CellPos) -> Option<Rect> {
        self.done.iter().copied().find(|rect| rect.contains(pos))
    }

    /// Whether `pos` is in this block and not yet handled by a child.
    pub fn is_open(&self, pos: CellPos) -> bool {
        self.contains(pos) && self.done_at(pos).is_none()
    }

    fn record(&mut self, outcome: &Outcome) {
        self.growth.merge(&outcome.growth);
        if !outcome.parts.is_empty() {
            self.done.extend(outcome.parts.iter().copied());
        } else if let Some(extent) = outcome.extent {
            self.done.push(extent);
        }
    }

    fn extent(&self) -> Option<Rect> {
        let right = self.scan_right().max(self.rect.left as isize) as usize;
        let bottom = self.scan_bottom().max(self.rect.top as isize) as usize;
        let far_bottom = (self.rect.left..=right).map(|c| self.bottom_at(c)).max()?;
        let far_right = (self.rect.top..=bottom).map(|r| self.right_at(r)).max()?;
        if far_bottom < self.rect.top as isize || far_right < self.rect.left as isize {
            return None;
        }
        Some(Rect {
            top: self.rect.top,
            bottom: far_bottom as usize,
            left: self.rect.left,
            right: far_right as usize,
        })
    }
}

/// Cells waiting to be removed when their loop finishes.
pub(super) struct RemovalFrame {
    pub axis: Axis,
    pub cells: Vec<CellPos>,
}

/// Transforms one sheet.
pub(crate) struct Transformer<'a> {
    pub(super) config: &'a TemplateConfig,
    pub(super) evaluator: &'a dyn Evaluator,
    pub(super) sheet: &'a mut Sheet,
    pub(super) sheet_name: String,
    pub(super) table: &'a mut TranslationTable,
    pub(super) tags: TagSyntax,
    pub(super) arena: BlockArena,
    /// Item variables of fixed-size implicit loops in progress.
    pub(super) fixed_vars: Vec<String>,
    pub(super) removals: Vec<RemovalFrame>,
}

impl<'a> Transformer<'a> {
    pub fn new(
        config: &'a TemplateConfig,
        evaluator: &'a dyn Evaluator,
        sheet: &'a mut Sheet,
        table: &'a mut TranslationTable,
    ) -> Self {
        let sheet_name = sheet.name.clone();
        Transformer {
            config,
            evaluator,
            sheet,
            sheet_name,
            table,
            tags: TagSyntax::new(&config.tag_namespace),
            arena: BlockArena::new(),
            fixed_vars: Vec::new(),
            removals: Vec::new(),
        }
    }

    /// Transform the whole sheet.
    pub fn run(mut self, bindings: &Bindings) -> Result<()> {
        let Some(bounds) = self.sheet.used_bounds() else {
            return Ok(());
        };
        let root = self.arena.new_root(bounds);
        let ctx = Context {
            bindings: bindings.clone(),
            unbound: Vec::new(),
        };
        self.transform_block(root, &ctx)?;
        debug!("sheet {}: {} block(s) transformed", self.sheet_name, self.arena.len());
        Ok(())
    }

    pub(super) fn transform_block(&mut self, id: BlockId, ctx: &Context) -> Result<Outcome> {
        let rect = self.arena.get(id).rect();
        if self.arena.depth(id) > self.config.max_depth {
            let text = self.sheet.cell_text(rect.top_left()).unwrap_or_default();
            return Err(self.fail(
                rect.top_left(),
                &text,
                TransformErrorKind::NestingTooDeep(self.config.max_depth),
            ));
        }

        let mut frame = Frame::new(rect);
        let mut row = rect.top;
        while row as isize <= frame.scan_bottom() {
            let mut col = rect.left;
            while col as isize <= frame.scan_right() {
                let pos = CellPos::new(row, col);
                if let Some(done) = frame.done_at(pos) {
                    col = done.right + 1;
                    continue;
                }
                if !frame.contains(pos) || self.sheet.get_cell(pos).is_none() {
                    col += 1;
                    continue;
                }
                col = self.process_cell(id, &mut frame, pos, ctx)?;
            }
            row += 1;
        }

        Ok(Outcome {
            extent: frame.extent(),
            parts: Vec::new(),
            growth: frame.growth,
        })
    }

    /// Handle one cell; returns the column to continue scanning at.
    fn process_cell(
        &mut self,
        block: BlockId,
        frame: &mut Frame,
        pos: CellPos,
        ctx: &Context,
    ) -> Result<usize> {
        let Some(text) = self.sheet.cell_text(pos) else {
            return Ok(pos.col + 1);
        };
        if let Some(start) = self.tags.find_start(&text) {
            return self.process_tag(block, frame, pos, &text, start, ctx);
        }
        if self.tags.is_malformed(&text) {
            return Err(self.fail(pos, &text, tag_error("malformed tag")));
        }
        if self.tags.has_end(&text) {
            return Err(self.fail(pos, &text, tag_error("end tag without a matching start tag")));
        }
        if self.is_formula_marker(&text) {
            return Ok(pos.col + 1);
        }
        if let Some(tag_col) = self.tag_reaching_left(frame, pos) {
            // A tag further right claims this cell through its `left` metadata.
            self.process_cell(block, frame, CellPos::new(pos.row, tag_col), ctx)?;
            return Ok(pos.col);
        }

        let (body, metadata) = self.split_metadata(&text);
        if let Some(unbound) = self.unbound_in(body, ctx) {
            self.past_end_cell(pos, &unbound);
            return Ok(pos.col + 1);
        }
        if self.config.implicit_collections {
            if let Some(path) = self.discover(body, ctx) {
                let metadata = self.parse_metadata_at(pos, &text, metadata)?;
                return self.implicit_loop(block, frame, pos, &text, body, &path, &metadata, ctx);
            }
        }
        if metadata.is_some() {
            warn!(
                "{}!{}: metadata on a cell without a tag is ignored",
                self.sheet_name, pos
            );
        }
        self.render_cell(pos, body, &text, ctx)?;
        Ok(pos.col + 1)
    }

    fn process_tag(
        &mut self,
        block: BlockId,
        frame: &mut Frame,
        pos: CellPos,
        text: &str,
        start: TagStart,
        ctx: &Context,
    ) -> Result<usize> {
        let (begin, end) = (&self.config.expression_begin, &self.config.expression_end);
        let tag = Tag::parse(&start, begin, end).map_err(|m| self.fail(pos, text, tag_error(&m)))?;

        let end_tag = if start.bodiless {
            None
        } else {
            let found = self.find_end(frame, pos, start.span.end, &start.name);
            Some(found.ok_or_else(|| {
                self.fail(pos, text, tag_error(&format!("missing end tag for `{}`", start.name)))
            })?)
        };

        // Strip the markup, leaving whatever content shares the tag cells.
        let mut start_text = text.to_string();
        if let Some((end_pos, span)) = &end_tag {
            if *end_pos == pos {
                start_text.replace_range(span.clone(), "");
            } else if let Some(end_text) = self.sheet.cell_text(*end_pos) {
                let mut end_text = end_text;
                end_text.replace_range(span.clone(), "");
                self.set_stripped(*end_pos, end_text);
            }
        }
        let (after, metadata_text) = self.split_metadata(&start_text[start.span.end..]);
        let metadata = self.parse_metadata_at(pos, text, metadata_text)?;
        let stripped = format!("{}{}", &start_text[..start.span.start], after);
        self.set_stripped(pos, stripped);

        let last = end_tag.as_ref().map_or(pos, |(end_pos, _)| *end_pos);
        let rect = self.layout(frame, pos, Rect::spanning(pos, last), &metadata);

        let copy_right = match &tag {
            Tag::ForEach { copy_right, .. } | Tag::MultiForEach { copy_right, .. } => {
                self.flag(copy_right.as_deref(), ctx, pos, text)?
            }
            _ => false,
        };
        let direction = if copy_right || metadata.is_copying_right() {
            Direction::Cols
        } else {
            Direction::Rows
        };
        let child = self.arena.new_block(
            Some(block),
            rect.left,
            rect.right,
            rect.top,
            rect.bottom,
            direction,
        );
        let rect = self.arena.get(child).rect();
        debug!(
            "{}!{}: <{}:{}> over {}",
            self.sheet_name, pos, self.config.tag_namespace, start.name, rect
        );

        let unbound = tag
            .expressions()
            .into_iter()
            .find_map(|expr| self.unbound_in_expr(expr, ctx));
        let outcome = match (unbound, tag) {
            (Some(unbound), _) => match unbound.action {
                PastEndAction::Clear => {
                    self.sheet.clear_values(rect);
                    Outcome::in_place(rect)
                }
                PastEndAction::Remove => self.remove_span(rect, direction.axis()),
            },
            (
                None,
                Tag::ForEach {
                    items,
                    var,
                    index_var,
                    fixed,
                    ..
                },
            ) => {
                let binding = LoopBinding {
                    vars: vec![var],
                    collections: vec![items],
                    index_var,
                    past_end: metadata.past_end_action.unwrap_or_default(),
                    fixed: metadata.fixed || self.flag(fixed.as_deref(), ctx, pos, text)?,
                };
                self.expand_loop(child, &binding, ctx, pos, text)?
            }
            (
                None,
                Tag::MultiForEach {
                    collections,
                    vars,
                    index_var,
                    past_end,
                    fixed,
                    ..
                },
            ) => {
                let binding = LoopBinding {
                    vars,
                    collections,
                    index_var,
                    past_end: past_end.or(metadata.past_end_action).unwrap_or_default(),
                    fixed: metadata.fixed || self.flag(fixed.as_deref(), ctx, pos, text)?,
                };
                self.expand_loop(child, &binding, ctx, pos, text)?
            }
            (None, Tag::If { test, else_action }) => {
                let value = self.evaluate(&test, ctx, pos, text)?;
                // A missing property reads as false.
                let pass = if value.is_unit() {
                    false
                } else {
                    value.as_bool().map_err(|_| {
                        self.fail(
                            pos,
                            text,
                            tag_error(&format!("test `{}` is not a boolean", test)),
                        )
                    })?
                };
                if pass {
                    self.transform_block(child, ctx)?
                } else {
                    match else_action {
                        ElseAction::Remove => self.remove_span(rect, direction.axis()),
                        ElseAction::Clear => {
                            self.sheet.clear_values(rect);
                            Outcome::in_place(rect)
                        }
                    }
                }
            }
            (
                None,
                Tag::Group {
                    group_dir,
                    collapse,
                },
            ) => {
                let collapsed = self.flag(collapse.as_deref(), ctx, pos, text)?;
                let outcome = self.transform_block(child, ctx)?;
                self.add_group(outcome.extent, group_dir, collapsed);
                outcome
            }
        };

        self.add_group(outcome.extent, metadata.group_dir, metadata.is_collapsing_group());
        self.finish_child(block, frame, &outcome);
        Ok(rect.left)
    }

    /// Fold a child's outcome into its parent's scan state.
    pub(super) fn finish_child(&mut self, block: BlockId, frame: &mut Frame, outcome: &Outcome) {
        frame.record(outcome);
        let current = self.arena.get(block).rect();
        let rows = (frame.scan_bottom() - current.bottom as isize).max(0);
        let cols = (frame.scan_right() - current.right as isize).max(0);
        self.arena.grow(block, rows, cols);
    }

    /// Block rectangle after metadata adjustments, kept inside the frame.
    pub(super) fn layout(&self, frame: &Frame, pos: CellPos, rect: Rect, metadata: &Metadata) -> Rect {
        let mut rect = rect;
        rect.bottom += metadata.extra_rows;
        if metadata.is_defining_cols() {
            rect.left = pos.col.saturating_sub(metadata.cols_left).max(frame.rect.left);
            rect.right = pos.col + metadata.cols_right;
        }
        let limit = frame.scan_bottom().max(pos.row as isize) as usize;
        rect.bottom = rect.bottom.min(limit);
        rect
    }

    /// Find the end tag matching a start tag, nesting-aware, scanning
    /// row-major from just after the start tag.
    fn find_end(
        &self,
        frame: &Frame,
        pos: CellPos,
        from: usize,
        name: &str,
    ) -> Option<(CellPos, Range<usize>)> {
        let mut depth = 1usize;
        let mut row = pos.row;
        while row as isize <= frame.scan_bottom() {
            let mut col = if row == pos.row { pos.col } else { frame.rect.left };
            while col as isize <= frame.scan_right() {
                let here = CellPos::new(row, col);
                if let Some(done) = frame.done_at(here) {
                    col = done.right + 1;
                    continue;
                }
                if frame.contains(here) {
                    if let Some(text) = self.sheet.cell_text(here) {
                        let offset = if here == pos { from } else { 0 };
                        for marker in self.tags.markers(&text[offset..], name) {
                            if marker.is_start {
                                depth += 1;
                                continue;
                            }
                            depth -= 1;
                            if depth == 0 {
                                let span = marker.span.start + offset..marker.span.end + offset;
                                return Some((here, span));
                            }
                        }
                    }
                }
                col += 1;
            }
            row += 1;
        }
        None
    }

    /// Column of a tag later in the row whose `left` metadata reaches `pos`.
    fn tag_reaching_left(&self, frame: &Frame, pos: CellPos) -> Option<usize> {
        let right = frame.right_at(pos.row);
        (pos.col + 1..)
            .take_while(|col| *col as isize <= right)
            .find(|col| {
                let here = CellPos::new(pos.row, *col);
                if !frame.is_open(here) {
                    return false;
                }
                let Some(text) = self.sheet.cell_text(here) else {
                    return false;
                };
                let Some(start) = self.tags.find_start(&text) else {
                    return false;
                };
                let (_, metadata) = self.split_metadata(&text[start.span.end..]);
                metadata
                    .and_then(|m| parse_metadata(m).ok())
                    .is_some_and(|m| m.is_defining_cols() && col.saturating_sub(m.cols_left) <= pos.col)
            })
    }

    /// Split `text` at the metadata marker, ignoring markers inside
    /// expressions.
    pub(super) fn split_metadata<'t>(&self, text: &'t str) -> (&'t str, Option<&'t str>) {
        let marker = &self.config.metadata_marker;
        let exprs = find_expressions(text, &self.config.expression_begin, &self.config.expression_end);
        let mut from = 0;
        while let Some(found) = text[from..].find(marker.as_str()) {
            let at = from + found;
            if !exprs.iter().any(|e| e.span.contains(&at)) {
                return (&text[..at], Some(&text[at + marker.len()..]));
            }
            from = at + marker.len();
        }
        (text, None)
    }

    pub(super) fn parse_metadata_at(
        &self,
        pos: CellPos,
        text: &str,
        metadata: Option<&str>,
    ) -> Result<Metadata> {
        match metadata {
            Some(m) => parse_metadata(m).map_err(|e| self.fail(pos, text, e.into())),
            None => Ok(Metadata::default()),
        }
    }

    pub(super) fn is_formula_marker(&self, text: &str) -> bool {
        FormulaMarker::parse(text, &self.config.formula_begin, &self.config.formula_end).is_some()
    }

    /// Write text left after stripping markup; blank text empties the cell.
    fn set_stripped(&mut self, pos: CellPos, text: String) {
        let value = if text.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(text)
        };
        self.sheet.set_value(pos, value);
    }

    pub(super) fn evaluate(
        &self,
        expr: &str,
        ctx: &Context,
        pos: CellPos,
        text: &str,
    ) -> Result<Dynamic> {
        self.evaluator
            .evaluate(expr, &ctx.bindings, EvalMode::Strict)
            .map_err(|e| self.fail(pos, text, e.into()))
    }

    /// A boolean attribute: absent, `true`/`false`, or `${expr}`.
    fn flag(&self, raw: Option<&str>, ctx: &Context, pos: CellPos, text: &str) -> Result<bool> {
        let Some(raw) = raw else {
            return Ok(false);
        };
        match raw {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                let invalid = || tag_error(&format!("`{}` is not a boolean", raw));
                let expr = whole_expression(raw, &self.config.expression_begin, &self.config.expression_end)
                    .ok_or_else(|| self.fail(pos, text, invalid()))?;
                self.evaluate(expr, ctx, pos, text)?
                    .as_bool()
                    .map_err(|_| self.fail(pos, text, invalid()))
            }
        }
    }

    /// First past-end variable referenced by the expressions of `text`.
    fn unbound_in(&self, text: &str, ctx: &Context) -> Option<Unbound> {
        if ctx.unbound.is_empty() {
            return None;
        }
        find_expressions(text, &self.config.expression_begin, &self.config.expression_end)
            .iter()
            .find_map(|e| self.unbound_in_expr(&text[e.inner.clone()], ctx))
    }

    fn unbound_in_expr(&self, expr: &str, ctx: &Context) -> Option<Unbound> {
        ctx.unbound
            .iter()
            .find(|u| references_name(expr, &u.name))
            .cloned()
    }

    fn past_end_cell(&mut self, pos: CellPos, unbound: &Unbound) {
        self.sheet.set_value(pos, CellValue::Empty);
        if unbound.action == PastEndAction::Remove {
            if let Some(frame) = self.removals.get_mut(unbound.frame) {
                frame.cells.push(pos);
            }
        }
    }

    /// Delete a rectangle and close the gap along `axis`.
    pub(super) fn remove_span(&mut self, rect: Rect, axis: Axis) -> Outcome {
        let size = rect.size(axis);
        let cross = axis.cross();
        let (cross_start, cross_end) = (rect.start(cross), rect.end(cross));
        self.table.apply(&self.sheet_name, &Edit::Clear(rect));
        self.apply_to_removals(&Edit::Clear(rect));
        match axis {
            Axis::Rows => self.sheet.remove_rows(rect.left, rect.right, rect.top, size),
            Axis::Cols => self.sheet.remove_cols(rect.top, rect.bottom, rect.left, size),
        }
        let edit = Edit::shift(axis, cross_start, cross_end, rect.end(axis) + 1, -(size as isize));
        self.table.apply(&self.sheet_name, &edit);
        self.sheet.adjust_groups(&edit);
        self.apply_to_removals(&edit);
        debug!("{}: removed {}", self.sheet_name, rect);
        Outcome {
            extent: None,
            parts: Vec::new(),
            growth: Growth::span(axis, cross_start, cross_end, -(size as isize)),
        }
    }

    pub(super) fn apply_to_removals(&mut self, edit: &Edit) {
        for frame in self.removals.iter_mut() {
            frame.cells = frame.cells.iter().filter_map(|pos| edit.apply(*pos)).collect();
        }
    }

    pub(super) fn add_group(&mut self, extent: Option<Rect>, dir: GroupDir, collapsed: bool) {
        let Some(rect) = extent else {
            return;
        };
        let group = match dir {
            GroupDir::None => return,
            GroupDir::Rows => Group {
                axis: Axis::Rows,
                start: rect.top,
                end: rect.bottom,
                collapsed,
            },
            GroupDir::Cols => Group {
                axis: Axis::Cols,
                start: rect.left,
                end: rect.right,
                collapsed,
            },
        };
        debug!("{}: group {:?} {}..{}", self.sheet_name, group.axis, group.start, group.end);
        self.sheet.add_group(group);
    }

    pub(super) fn fail(&self, pos: CellPos, text: &str, kind: TransformErrorKind) -> GridplateError {
        GridplateError::Transform {
            sheet: self.sheet_name.clone(),
            cell: pos.to_a1(),
            text: text.to_string(),
            kind,
        }
    }
}

fn tag_error(message: &str) -> TransformErrorKind {
    TransformErrorKind::TagAttribute(message.to_string())
}
