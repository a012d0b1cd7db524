//! Markdown export functionality

use crate::grid::{CellPos, GridStore, Sheet};
use crate::workbook::Workbook;
use gridplate_engine::engine::CellRef;
use std::fmt::Write as _;
use std::path::Path;

/// Write the workbook to a markdown file, one table per sheet
pub fn write_markdown(path: &Path, workbook: &Workbook) -> std::io::Result<()> {
    std::fs::write(path, markdown_content(workbook))
}

pub fn markdown_content(workbook: &Workbook) -> String {
    let mut out = String::new();
    for (i, sheet) in workbook.sheets.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_sheet(&mut out, sheet);
    }
    out
}

fn write_sheet(out: &mut String, sheet: &Sheet) {
    let _ = writeln!(out, "# {}", sheet.name);
    let _ = writeln!(out);

    let Some(bounds) = sheet.used_bounds() else {
        let _ = writeln!(out, "*Empty sheet*");
        return;
    };

    // Header row with column letters
    out.push_str("|   |");
    for col in bounds.left..=bounds.right {
        let _ = write!(out, " {} |", CellRef::col_to_letters(col));
    }
    out.push('\n');

    out.push_str("|---|");
    for _ in bounds.left..=bounds.right {
        out.push_str("---|");
    }
    out.push('\n');

    for row in bounds.top..=bounds.bottom {
        let _ = write!(out, "| {} |", row + 1); // 1-based row numbers
        for col in bounds.left..=bounds.right {
            let display = sheet
                .get_cell(CellPos::new(row, col))
                .map(|cell| cell.value.display())
                .unwrap_or_default();
            let _ = write!(out, " {} |", escape_markdown(&display));
        }
        out.push('\n');
    }
}

/// Escape special markdown characters in cell content
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ").replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    #[test]
    fn test_markdown_tables() {
        let mut workbook = Workbook::new();
        let sheet = workbook.sheet_or_insert("Totals");
        sheet.grid.insert(CellPos::new(1, 1), Cell::new_text("a|b"));
        sheet.grid.insert(CellPos::new(2, 2), Cell::new_number(2.5));
        workbook.sheet_or_insert("Blank");

        let md = markdown_content(&workbook);
        let expected = "\
# Totals

|   | B | C |
|---|---|---|
| 2 | a\\|b |  |
| 3 |  | 2.5 |

# Blank

*Empty sheet*
";
        assert_eq!(md, expected);
    }
}
