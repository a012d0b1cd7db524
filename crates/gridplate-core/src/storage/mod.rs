//! Workbook storage: the .grd text format and Markdown export.

mod md;
mod parser;
mod writer;

pub use md::{markdown_content, write_markdown};
pub use parser::{DEFAULT_SHEET, parse_workbook, parse_workbook_content};
pub use writer::{write_workbook, write_workbook_content};
