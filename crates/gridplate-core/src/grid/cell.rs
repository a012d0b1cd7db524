use gridplate_engine::engine::format_number;
use serde::{Deserialize, Serialize};

/// Index into the host document's style table. Styles travel with cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StyleId(pub u32);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Formula text without the leading `=`.
    Formula(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text shown for this value in exports.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Formula(f) => format!("={}", f),
        }
    }
}

/// A cell: value plus style. A styled empty cell is still a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub style: StyleId,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell {
            value,
            style: StyleId::default(),
        }
    }

    pub fn new_empty() -> Self {
        Self::new(CellValue::Empty)
    }

    pub fn new_text(text: &str) -> Self {
        Self::new(CellValue::Text(text.to_string()))
    }

    pub fn new_number(n: f64) -> Self {
        Self::new(CellValue::Number(n))
    }

    pub fn new_bool(b: bool) -> Self {
        Self::new(CellValue::Bool(b))
    }

    pub fn new_formula(formula: &str) -> Self {
        Self::new(CellValue::Formula(formula.to_string()))
    }

    pub fn with_style(mut self, style: StyleId) -> Self {
        self.style = style;
        self
    }

    /// Same style, no value.
    pub fn blanked(&self) -> Self {
        Cell {
            value: CellValue::Empty,
            style: self.style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CellValue::Number(3.0).display(), "3");
        assert_eq!(CellValue::Bool(false).display(), "FALSE");
        assert_eq!(CellValue::Formula("SUM(A1:A3)".into()).display(), "=SUM(A1:A3)");
        assert_eq!(CellValue::Empty.display(), "");
    }

    #[test]
    fn test_blanked_keeps_style() {
        let cell = Cell::new_text("x").with_style(StyleId(4));
        let blank = cell.blanked();
        assert!(blank.value.is_empty());
        assert_eq!(blank.style, StyleId(4));
    }
}
