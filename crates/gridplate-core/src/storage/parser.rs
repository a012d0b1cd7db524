//! Parser for the .grd workbook format
//!
//! ```text
//! # comment
//! [Report]
//! A1: "Name"
//! B1@2: 42
//! C1: =SUM(B1:B3)
//! D1: TRUE
//! E1@3:
//! merge: A1:B1
//! group: rows 2:5 collapsed
//! ```
//!
//! Cells before the first `[sheet]` header belong to `Sheet1`.

use crate::error::{GridplateError, Result};
use crate::grid::{Axis, Cell, CellPos, GridStore, Group, Rect, StyleId};
use crate::workbook::Workbook;
use gridplate_engine::engine::CellRef;
use std::fs;
use std::path::Path;

pub const DEFAULT_SHEET: &str = "Sheet1";

/// Parse a .grd file
pub fn parse_workbook(path: &Path) -> Result<Workbook> {
    let content = fs::read_to_string(path)?;
    parse_workbook_content(&content)
}

/// Parse .grd content from a string
pub fn parse_workbook_content(content: &str) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let mut current = DEFAULT_SHEET.to_string();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim();
            if name.is_empty() {
                return Err(parse_error(line_num, "Sheet name must not be empty"));
            }
            current = name.to_string();
            workbook.sheet_or_insert(&current);
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(parse_error(line_num, "Expected 'CELLREF: VALUE' format"));
        };
        let key = key.trim();
        let value = value.trim();
        let sheet = workbook.sheet_or_insert(&current);

        match key {
            "merge" => {
                let rect = parse_range(value)
                    .ok_or_else(|| parse_error(line_num, &format!("Invalid merge range: {}", value)))?;
                if !sheet.merged.contains(&rect) {
                    sheet.merged.push(rect);
                }
            }
            "group" => sheet.add_group(parse_group(value, line_num)?),
            _ => {
                let (pos, style) = parse_cell_key(key, line_num)?;
                let cell = parse_cell_value(value, line_num)?.with_style(style);
                sheet.set_cell(pos, cell);
            }
        }
    }

    Ok(workbook)
}

fn parse_error(line: usize, message: &str) -> GridplateError {
    GridplateError::Parse {
        line,
        message: message.to_string(),
    }
}

/// `A1` or `A1@3`
fn parse_cell_key(key: &str, line_num: usize) -> Result<(CellPos, StyleId)> {
    let (name, style) = match key.split_once('@') {
        Some((name, style)) => {
            let style = style
                .trim()
                .parse::<u32>()
                .map_err(|_| parse_error(line_num, &format!("Invalid style: {}", style)))?;
            (name.trim(), StyleId(style))
        }
        None => (key, StyleId::default()),
    };
    let cell_ref = CellRef::from_str(name)
        .filter(|r| {
            r.sheet.is_none() && r.default_value.is_none() && !r.row_absolute && !r.col_absolute
        })
        .ok_or_else(|| parse_error(line_num, &format!("Invalid cell reference: {}", name)))?;
    Ok((CellPos::new(cell_ref.row, cell_ref.col), style))
}

/// Parse a cell value string into a Cell
fn parse_cell_value(value: &str, line_num: usize) -> Result<Cell> {
    if value.is_empty() {
        return Ok(Cell::new_empty());
    }

    // Formula: starts with '='
    if let Some(formula) = value.strip_prefix('=') {
        return Ok(Cell::new_formula(formula.trim()));
    }

    // Quoted string: starts and ends with '"'
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let text = &value[1..value.len() - 1];
        return Ok(Cell::new_text(&unescape_grd_text(text)));
    }

    match value {
        "TRUE" => return Ok(Cell::new_bool(true)),
        "FALSE" => return Ok(Cell::new_bool(false)),
        _ => {}
    }

    if let Ok(n) = value.parse::<f64>() {
        return Ok(Cell::new_number(n));
    }

    Err(parse_error(
        line_num,
        &format!("Invalid value: {}. Use quotes for text.", value),
    ))
}

/// `A1:B2`
fn parse_range(value: &str) -> Option<Rect> {
    let (start, end) = value.split_once(':')?;
    let start = CellRef::from_str(start.trim())?;
    let end = CellRef::from_str(end.trim())?;
    Some(Rect::spanning(
        CellPos::new(start.row, start.col),
        CellPos::new(end.row, end.col),
    ))
}

/// `rows 2:5`, `cols B:D`, optionally followed by `collapsed`
fn parse_group(value: &str, line_num: usize) -> Result<Group> {
    let invalid = || parse_error(line_num, &format!("Invalid group: {}", value));
    let mut words = value.split_whitespace();
    let axis = match words.next() {
        Some("rows") => Axis::Rows,
        Some("cols") => Axis::Cols,
        _ => return Err(invalid()),
    };
    let (start, end) = words.next().and_then(|s| s.split_once(':')).ok_or_else(invalid)?;
    let collapsed = match words.next() {
        None => false,
        Some("collapsed") => true,
        Some(_) => return Err(invalid()),
    };
    if words.next().is_some() {
        return Err(invalid());
    }

    let index = |s: &str| -> Option<usize> {
        match axis {
            Axis::Rows => s.parse::<usize>().ok()?.checked_sub(1),
            Axis::Cols => CellRef::from_str(&format!("{}1", s)).map(|r| r.col),
        }
    };
    let start = index(start).ok_or_else(invalid)?;
    let end = index(end).ok_or_else(invalid)?;
    Ok(Group {
        axis,
        start: start.min(end),
        end: start.max(end),
        collapsed,
    })
}

fn unescape_grd_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
