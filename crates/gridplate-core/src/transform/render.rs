//! Rendering expressions in plain cells.

use gridplate_engine::engine::{Dynamic, find_expressions, format_dynamic, map_expressions, whole_expression};

use crate::error::Result;
use crate::grid::{CellPos, CellValue};

use super::transformer::{Context, Transformer};

/// Cell value for an expression that makes up a whole cell. Numbers and
/// booleans keep their type; everything else becomes text.
pub fn dynamic_to_value(value: &Dynamic) -> CellValue {
    if value.is_unit() {
        CellValue::Empty
    } else if let Ok(n) = value.as_float() {
        CellValue::Number(n)
    } else if let Ok(n) = value.as_int() {
        CellValue::Number(n as f64)
    } else if let Ok(b) = value.as_bool() {
        CellValue::Bool(b)
    } else {
        match format_dynamic(value) {
            text if text.is_empty() => CellValue::Empty,
            text => CellValue::Text(text),
        }
    }
}

impl Transformer<'_> {
    /// Evaluate the expressions of `body` and store the result. `original`
    /// is the full cell text, used for diagnostics.
    pub(super) fn render_cell(
        &mut self,
        pos: CellPos,
        body: &str,
        original: &str,
        ctx: &Context,
    ) -> Result<()> {
        let (begin, end) = (&self.config.expression_begin, &self.config.expression_end);
        let value = if let Some(expr) = whole_expression(body, begin, end) {
            dynamic_to_value(&self.evaluate(expr, ctx, pos, original)?)
        } else if find_expressions(body, begin, end).is_empty() {
            if body.len() == original.len() {
                return Ok(());
            }
            CellValue::Text(body.to_string())
        } else {
            let rendered = map_expressions(body, begin, end, |expr| {
                self.evaluate(expr, ctx, pos, original)
                    .map(|value| format_dynamic(&value))
            })?;
            CellValue::Text(rendered)
        };
        self.sheet.set_value(pos, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridplate_engine::engine::Array;

    #[test]
    fn test_whole_expression_values_keep_type() {
        assert_eq!(dynamic_to_value(&Dynamic::from(2.5_f64)), CellValue::Number(2.5));
        assert_eq!(dynamic_to_value(&Dynamic::from(3_i64)), CellValue::Number(3.0));
        assert_eq!(dynamic_to_value(&Dynamic::from(true)), CellValue::Bool(true));
        assert_eq!(dynamic_to_value(&Dynamic::UNIT), CellValue::Empty);
        assert_eq!(
            dynamic_to_value(&Dynamic::from("Widget")),
            CellValue::Text("Widget".to_string())
        );
        assert_eq!(dynamic_to_value(&Dynamic::from("")), CellValue::Empty);
        let list: Array = vec![Dynamic::from(1_i64), Dynamic::from("b")];
        assert_eq!(
            dynamic_to_value(&Dynamic::from(list)),
            CellValue::Text("1, b".to_string())
        );
    }
}
