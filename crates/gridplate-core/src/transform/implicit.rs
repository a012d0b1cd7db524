//! Implicit collections: a cell like `${order.items.price}` with no tag
//! loops over `order.items` when that path holds an array.

use gridplate_engine::engine::{
    EvalMode, Metadata, find_expressions, identifier_paths, references_path, replace_path_prefix,
    rewrite_expressions,
};
use log::debug;

use crate::block::{BlockId, Direction};
use crate::config::path_covers;
use crate::error::Result;
use crate::grid::{CellPos, CellValue, Rect};

use super::looping::LoopBinding;
use super::transformer::{Context, Frame, Transformer};

/// Name bound to each item of an implicit loop over `path`.
pub fn item_var(path: &str) -> String {
    format!("{}_item", path.replace('.', "_"))
}

impl Transformer<'_> {
    /// The shortest collection-valued path referenced by `text`, if any.
    pub(super) fn discover(&self, text: &str, ctx: &Context) -> Option<String> {
        let (begin, end) = (&self.config.expression_begin, &self.config.expression_end);
        for found in find_expressions(text, begin, end) {
            let expr = &text[found.inner.clone()];
            for path in identifier_paths(expr) {
                for len in 1..=path.segments.len() {
                    if !path.is_value_prefix(len) {
                        break;
                    }
                    let prefix = path.prefix(len);
                    if self.config.is_no_implicit(&prefix) {
                        break;
                    }
                    match self.evaluator.evaluate(&prefix, &ctx.bindings, EvalMode::Lenient) {
                        Ok(value) if value.is_array() => return Some(prefix),
                        Ok(value) if value.is_unit() => break,
                        Ok(_) => {}
                        Err(_) => break,
                    }
                }
            }
        }
        None
    }

    /// Loop over `path`, starting at the cell that referenced it.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn implicit_loop(
        &mut self,
        block: BlockId,
        frame: &mut Frame,
        pos: CellPos,
        text: &str,
        body: &str,
        path: &str,
        metadata: &Metadata,
        ctx: &Context,
    ) -> Result<usize> {
        if body.len() != text.len() {
            self.sheet.set_value(pos, CellValue::Text(body.to_string()));
        }

        let bounds = self.reference_bounds(frame, pos, path);
        let rect = self.layout(frame, pos, bounds, metadata);
        let var = item_var(path);
        let (begin, end) = (&self.config.expression_begin, &self.config.expression_end);
        let rewrites: Vec<(CellPos, String)> = rect
            .positions()
            .filter(|p| frame.is_open(*p))
            .filter_map(|p| {
                let text = self.sheet.cell_text(p)?;
                if find_expressions(&text, begin, end).is_empty() {
                    return None;
                }
                let rewritten = rewrite_expressions(&text, begin, end, |expr| {
                    replace_path_prefix(expr, path, &var)
                });
                (rewritten != text).then_some((p, rewritten))
            })
            .collect();
        for (p, rewritten) in rewrites {
            self.sheet.set_value(p, CellValue::Text(rewritten));
        }

        let registered = self.fixed_vars.iter().any(|v| path_covers(v, path));
        let register = registered || self.config.is_fixed_size(path);
        let direction = if metadata.is_copying_right() {
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
        debug!(
            "{}!{}: implicit collection {} as {} over {}",
            self.sheet_name,
            pos,
            path,
            var,
            self.arena.get(child).rect()
        );

        let binding = LoopBinding {
            vars: vec![var.clone()],
            collections: vec![path.to_string()],
            index_var: None,
            past_end: metadata.past_end_action.unwrap_or_default(),
            fixed: register || metadata.fixed,
        };
        if register {
            self.fixed_vars.push(var);
        }
        let outcome = self.expand_loop(child, &binding, ctx, pos, text);
        if register {
            self.fixed_vars.pop();
        }
        let outcome = outcome?;

        self.add_group(outcome.extent, metadata.group_dir, metadata.is_collapsing_group());
        self.finish_child(block, frame, &outcome);
        Ok(rect.left)
    }

    /// From `pos`, extend right to the last cell in the row referencing
    /// `path`, then down to the last row referencing it in those columns.
    fn reference_bounds(&self, frame: &Frame, pos: CellPos, path: &str) -> Rect {
        let refers = |p: CellPos| {
            frame.is_open(p)
                && self
                    .sheet
                    .cell_text(p)
                    .is_some_and(|text| self.text_references(&text, path))
        };

        let row_end = frame.right_at(pos.row);
        let right = (pos.col + 1..)
            .take_while(|col| *col as isize <= row_end)
            .filter(|col| refers(CellPos::new(pos.row, *col)))
            .last()
            .unwrap_or(pos.col);
        let bottom = (pos.row + 1..)
            .take_while(|row| *row as isize <= frame.scan_bottom())
            .filter(|row| (pos.col..=right).any(|col| refers(CellPos::new(*row, col))))
            .last()
            .unwrap_or(pos.row);

        Rect {
            top: pos.row,
            bottom,
            left: pos.col,
            right,
        }
    }

    fn text_references(&self, text: &str, path: &str) -> bool {
        if self.tags.find_start(text).is_some() || self.is_formula_marker(text) {
            return false;
        }
        let (begin, end) = (&self.config.expression_begin, &self.config.expression_end);
        find_expressions(text, begin, end)
            .iter()
            .any(|found| references_path(&text[found.inner.clone()], path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_var_names() {
        assert_eq!(item_var("items"), "items_item");
        assert_eq!(item_var("order.lines"), "order_lines_item");
    }
}
