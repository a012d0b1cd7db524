//! Template transformation: tags, loops, implicit collections and cell
//! rendering, followed by formula remapping.

mod implicit;
mod looping;
mod render;
mod tag;
mod transformer;

pub use implicit::item_var;
pub use render::dynamic_to_value;
pub use tag::{ElseAction, Tag, TagStart, TagSyntax, split_top_level};

use gridplate_engine::engine::{Bindings, Evaluator};
use log::debug;

use crate::config::TemplateConfig;
use crate::error::Result;
use crate::formula::{TranslationTable, gather, replace};
use crate::workbook::Workbook;

use transformer::Transformer;

/// Renders workbooks against data.
pub struct Renderer<'a> {
    config: &'a TemplateConfig,
    evaluator: &'a dyn Evaluator,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a TemplateConfig, evaluator: &'a dyn Evaluator) -> Self {
        Renderer { config, evaluator }
    }

    /// Transform every sheet in place. Formula markers are recorded before
    /// the first sheet changes and rewritten after the last one is done, so
    /// references across sheets see every edit.
    pub fn render(&self, workbook: &mut Workbook, bindings: &Bindings) -> Result<()> {
        let mut table = TranslationTable::new();
        let records = gather(workbook, self.config, &mut table)?;
        debug!("recorded {} formula(s)", records.len());

        for sheet in workbook.sheets.iter_mut() {
            Transformer::new(self.config, self.evaluator, sheet, &mut table).run(bindings)?;
        }

        replace(workbook, &records, &table, self.config)
    }
}
