//! Rewriting formula markers after transformation.
//!
//! [`gather`] runs before any sheet changes: it parses every `$[...]` marker
//! and registers the cells it references. [`replace`] runs after every sheet
//! is done and turns each marker into a plain formula whose references point
//! at wherever those cells went.

use std::collections::HashMap;

use gridplate_engine::engine::{FormulaMarker, RefRole, RefSpan, scan_formula_refs};
use log::{debug, warn};

use crate::config::TemplateConfig;
use crate::error::{GridplateError, Result, TransformErrorKind};
use crate::grid::{CellPos, CellValue};
use crate::workbook::Workbook;

use super::table::{Location, TranslationTable};

/// Parsed references of every marker, keyed by sheet and marker text
/// without its iteration suffix.
#[derive(Debug, Default)]
pub struct FormulaRecords {
    records: HashMap<(String, String), Vec<RefSpan>>,
}

impl FormulaRecords {
    pub fn get(&self, sheet: &str, key: &str) -> Option<&[RefSpan]> {
        self.records
            .get(&(sheet.to_string(), key.to_string()))
            .map(|spans| spans.as_slice())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Record every formula marker in the workbook and register its references.
pub fn gather(
    workbook: &Workbook,
    config: &TemplateConfig,
    table: &mut TranslationTable,
) -> Result<FormulaRecords> {
    let mut records = FormulaRecords::default();
    for sheet in &workbook.sheets {
        for (pos, cell) in sheet.sorted_cells() {
            let Some(text) = cell.value.as_text() else {
                continue;
            };
            let Some(marker) = FormulaMarker::parse(text, &config.formula_begin, &config.formula_end)
            else {
                continue;
            };
            let key = marker.key(&config.formula_begin, &config.formula_end);
            if records.get(&sheet.name, &key).is_some() {
                continue;
            }
            let spans = scan_formula_refs(&marker.body).map_err(|e| GridplateError::Transform {
                sheet: sheet.name.clone(),
                cell: pos.to_a1(),
                text: text.to_string(),
                kind: TransformErrorKind::Formula(e),
            })?;
            for span in &spans {
                let target = span.cell_ref.sheet.as_deref().unwrap_or(&sheet.name);
                table.register(target, CellPos::new(span.cell_ref.row, span.cell_ref.col));
            }
            debug!("formula {}!{}: {} reference(s) in {}", sheet.name, pos, spans.len(), key);
            records.records.insert((sheet.name.clone(), key), spans);
        }
    }
    Ok(records)
}

/// Turn every formula marker into a plain formula.
pub fn replace(
    workbook: &mut Workbook,
    records: &FormulaRecords,
    table: &TranslationTable,
    config: &TemplateConfig,
) -> Result<()> {
    for sheet in &workbook.sheets {
        for (pos, cell) in sheet.sorted_cells() {
            let Some(text) = cell.value.as_text() else {
                continue;
            };
            let Some(marker) = FormulaMarker::parse(text, &config.formula_begin, &config.formula_end)
            else {
                continue;
            };
            let key = marker.key(&config.formula_begin, &config.formula_end);
            let spans = match records.get(&sheet.name, &key) {
                Some(spans) => spans.to_vec(),
                None => {
                    warn!(
                        "formula {}!{} was not recorded before transformation, references left as written",
                        sheet.name, pos
                    );
                    scan_formula_refs(&marker.body).map_err(|e| GridplateError::Transform {
                        sheet: sheet.name.clone(),
                        cell: pos.to_a1(),
                        text: text.to_string(),
                        kind: TransformErrorKind::Formula(e),
                    })?
                }
            };
            let body = remap_formula(&marker.body, &marker.suffix, &sheet.name, &spans, table, config);
            sheet.set_value(pos, CellValue::Formula(body));
        }
    }
    Ok(())
}

/// Substitute every reference span of `body` with the current locations of
/// its template cell, restricted to those produced by iterations matching
/// `suffix`.
pub fn remap_formula(
    body: &str,
    suffix: &[usize],
    sheet: &str,
    spans: &[RefSpan],
    table: &TranslationTable,
    config: &TemplateConfig,
) -> String {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&body[last..span.span.start]);
        let original = &body[span.span.clone()];
        match translate(span, sheet, suffix, table, config) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(original),
        }
        last = span.span.end;
    }
    out.push_str(&body[last..]);
    out
}

/// `None` leaves the reference as written (the cell was never tracked).
fn translate(
    span: &RefSpan,
    sheet: &str,
    suffix: &[usize],
    table: &TranslationTable,
    config: &TemplateConfig,
) -> Option<String> {
    let cell_ref = &span.cell_ref;
    let target = cell_ref.sheet.as_deref().unwrap_or(sheet);
    let locations = table.locations(target, CellPos::new(cell_ref.row, cell_ref.col))?;

    let mut positions: Vec<CellPos> = locations
        .iter()
        .filter(|l| paths_agree(l, suffix))
        .map(|l| l.pos)
        .collect();
    positions.sort();
    positions.dedup();

    if positions.is_empty() {
        return Some(
            cell_ref
                .default_value
                .clone()
                .unwrap_or_else(|| config.ref_error.clone()),
        );
    }

    let prefix = cell_ref.sheet_prefix();
    let at = |pos: &CellPos| cell_ref.format_at(pos.col, pos.row);
    let text = match span.role {
        RefRole::RangeStart => {
            let row = positions.iter().map(|p| p.row).min()?;
            let col = positions.iter().map(|p| p.col).min()?;
            format!("{}{}", prefix, at(&CellPos::new(row, col)))
        }
        RefRole::RangeEnd => {
            let row = positions.iter().map(|p| p.row).max()?;
            let col = positions.iter().map(|p| p.col).max()?;
            at(&CellPos::new(row, col))
        }
        RefRole::Single => match positions.as_slice() {
            [only] => format!("{}{}", prefix, at(only)),
            [first, .., last] if is_contiguous(&positions) => {
                format!("{}{}:{}", prefix, at(first), at(last))
            }
            _ => positions
                .iter()
                .map(|p| format!("{}{}", prefix, at(p)))
                .collect::<Vec<_>>()
                .join(","),
        },
    };
    Some(text)
}

/// The shorter of the two paths is a prefix of the longer.
fn paths_agree(location: &Location, suffix: &[usize]) -> bool {
    location.path.iter().zip(suffix).all(|(a, b)| a == b)
}

/// Sorted positions forming one unbroken run of a row or a column.
fn is_contiguous(positions: &[CellPos]) -> bool {
    let same_col = positions.iter().all(|p| p.col == positions[0].col);
    let same_row = positions.iter().all(|p| p.row == positions[0].row);
    positions.windows(2).all(|pair| {
        (same_col && pair[1].row == pair[0].row + 1) || (same_row && pair[1].col == pair[0].col + 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Edit, Rect, Sheet};
    use pretty_assertions::assert_eq;

    fn workbook(cells: &[(&str, usize, usize, &str)]) -> Workbook {
        let mut workbook = Workbook::new();
        for (sheet, row, col, text) in cells {
            workbook
                .sheet_or_insert(sheet)
                .grid
                .insert(CellPos::new(*row, *col), Cell::new_text(text));
        }
        workbook
    }

    fn formula(sheet: &Sheet, row: usize, col: usize) -> CellValue {
        sheet.grid.get(&CellPos::new(row, col)).unwrap().value.clone()
    }

    #[test]
    fn test_untouched_formula_keeps_references() {
        let config = TemplateConfig::default();
        let mut book = workbook(&[("S", 0, 0, "1"), ("S", 1, 0, "$[A1*2]")]);
        let mut table = TranslationTable::new();
        let records = gather(&book, &config, &mut table).unwrap();
        assert_eq!(records.len(), 1);
        replace(&mut book, &records, &table, &config).unwrap();
        assert_eq!(formula(&book.sheets[0], 1, 0), CellValue::Formula("A1*2".to_string()));
    }

    #[test]
    fn test_expanded_reference_becomes_range() {
        let config = TemplateConfig::default();
        let mut book = workbook(&[("S", 2, 1, "x"), ("S", 4, 1, "$[SUM($B3)]")]);
        let mut table = TranslationTable::new();
        let records = gather(&book, &config, &mut table).unwrap();

        // B3 repeated into B3:B5; the formula row moved down by two.
        let template = table.snapshot("S", Rect::cell(CellPos::new(2, 1)));
        table.apply("S", &Edit::shift(crate::grid::Axis::Rows, 0, 5, 3, 2));
        table.push_index("S", Rect::cell(CellPos::new(2, 1)), 0);
        table.copy_iteration("S", &template, 1, 0, 1);
        table.copy_iteration("S", &template, 2, 0, 2);

        replace(&mut book, &records, &table, &config).unwrap();
        assert_eq!(
            formula(&book.sheets[0], 4, 1),
            CellValue::Formula("SUM($B3:$B5)".to_string())
        );
    }

    #[test]
    fn test_suffix_selects_iteration() {
        let config = TemplateConfig::default();
        let book = workbook(&[("S", 0, 0, "$[A1+1]")]);
        let mut table = TranslationTable::new();
        let records = gather(&book, &config, &mut table).unwrap();
        let template = table.snapshot("S", Rect::cell(CellPos::new(0, 0)));
        table.push_index("S", Rect::cell(CellPos::new(0, 0)), 0);
        table.copy_iteration("S", &template, 1, 0, 1);

        let spans = records.get("S", "$[A1+1]").unwrap();
        assert_eq!(remap_formula("A1+1", &[1], "S", spans, &table, &config), "A2+1");
        assert_eq!(remap_formula("A1+1", &[], "S", spans, &table, &config), "A1:A2+1");
    }

    #[test]
    fn test_scattered_and_removed_references() {
        let config = TemplateConfig::default();
        let book = workbook(&[("S", 9, 9, "$[SUM(A1, 'My Sheet'!B2, C3)]")]);
        let mut table = TranslationTable::new();
        let records = gather(&book, &config, &mut table).unwrap();
        let spans = records.get("S", "$[SUM(A1, 'My Sheet'!B2, C3)]").unwrap().to_vec();

        let template = table.snapshot("S", Rect::cell(CellPos::new(0, 0)));
        table.copy_iteration("S", &template, 0, 2, 1);
        table.apply("S", &Edit::Clear(Rect::cell(CellPos::new(2, 2))));

        assert_eq!(
            remap_formula("SUM(A1, 'My Sheet'!B2, C3)", &[], "S", &spans, &table, &config),
            "SUM(A1,C1, 'My Sheet'!B2, #REF!)"
        );
    }

    #[test]
    fn test_range_endpoints_follow_extremes() {
        let config = TemplateConfig::default();
        let book = workbook(&[("S", 9, 0, "$[SUM(A2:B2)]")]);
        let mut table = TranslationTable::new();
        let records = gather(&book, &config, &mut table).unwrap();
        let template = table.snapshot("S", Rect { top: 1, bottom: 1, left: 0, right: 1 });
        table.copy_iteration("S", &template, 1, 0, 1);
        table.copy_iteration("S", &template, 2, 0, 2);

        let spans = records.get("S", "$[SUM(A2:B2)]").unwrap();
        assert_eq!(
            remap_formula("SUM(A2:B2)", &[], "S", spans, &table, &config),
            "SUM(A2:B4)"
        );
    }

    #[test]
    fn test_unterminated_formula_is_transform_error() {
        let config = TemplateConfig::default();
        let book = workbook(&[("S", 0, 0, "$[CONCAT(\"a)]")]);
        let mut table = TranslationTable::new();
        let err = gather(&book, &config, &mut table).unwrap_err();
        assert!(matches!(
            err.transform_kind(),
            Some(TransformErrorKind::Formula(_))
        ));
    }
}
