//! Writer for the .grd workbook format

use crate::error::Result;
use crate::grid::{Axis, CellValue, Sheet};
use crate::workbook::Workbook;
use gridplate_engine::engine::CellRef;
use std::fs;
use std::path::Path;

/// Write a workbook to a .grd file
pub fn write_workbook(path: &Path, workbook: &Workbook) -> Result<()> {
    let content = write_workbook_content(workbook);
    fs::write(path, content)?;
    Ok(())
}

/// Write a workbook to a .grd format string
pub fn write_workbook_content(workbook: &Workbook) -> String {
    let mut lines = vec!["# Gridplate Workbook".to_string()];
    for sheet in &workbook.sheets {
        lines.push(format!("[{}]", sheet.name));
        write_sheet(&mut lines, sheet);
    }
    lines.join("\n") + "\n"
}

fn write_sheet(lines: &mut Vec<String>, sheet: &Sheet) {
    for (pos, cell) in sheet.sorted_cells() {
        let value_str = match &cell.value {
            // Unstyled empty cells carry nothing
            CellValue::Empty if cell.style.0 == 0 => continue,
            CellValue::Empty => String::new(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => format!("\"{}\"", escape_grd_text(s)),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Formula(f) => format!("={}", f),
        };
        let key = match cell.style.0 {
            0 => pos.to_a1(),
            style => format!("{}@{}", pos.to_a1(), style),
        };
        lines.push(format!("{}: {}", key, value_str).trim_end().to_string());
    }

    let mut merged = sheet.merged.clone();
    merged.sort_by_key(|m| (m.top, m.left));
    for m in merged {
        lines.push(format!("merge: {}", m));
    }

    for group in &sheet.groups {
        let (axis, start, end) = match group.axis {
            Axis::Rows => ("rows", (group.start + 1).to_string(), (group.end + 1).to_string()),
            Axis::Cols => (
                "cols",
                CellRef::col_to_letters(group.start),
                CellRef::col_to_letters(group.end),
            ),
        };
        let collapsed = if group.collapsed { " collapsed" } else { "" };
        lines.push(format!("group: {} {}:{}{}", axis, start, end, collapsed));
    }
}

fn escape_grd_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}
