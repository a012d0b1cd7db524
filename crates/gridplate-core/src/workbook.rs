use crate::grid::Sheet;

/// An ordered set of sheets rendered together. Formula references may cross
/// sheets, so rendering always covers the whole workbook.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// Get the named sheet, appending an empty one if it does not exist.
    pub fn sheet_or_insert(&mut self, name: &str) -> &mut Sheet {
        match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => &mut self.sheets[index],
            None => {
                self.sheets.push(Sheet::new(name));
                let last = self.sheets.len() - 1;
                &mut self.sheets[last]
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_lookup_and_insert() {
        let mut workbook = Workbook::new();
        workbook.sheet_or_insert("Summary");
        workbook.sheet_or_insert("Detail");
        workbook.sheet_or_insert("Summary");
        assert_eq!(workbook.names(), vec!["Summary", "Detail"]);
        assert!(workbook.sheet("Detail").is_some());
        assert!(workbook.sheet_mut("Missing").is_none());
    }
}
