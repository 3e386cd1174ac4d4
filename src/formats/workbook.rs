use anyhow::Context;

use super::{split_blocks, table_to_matrix, triple_labels, units_from_grid, FormatReader, Parsed};
use crate::config::Mode;
use crate::data::loader::{LabelledTable, SheetRef, Workbook};
use crate::data::model::TableKind;

/// Every matrix on one data sheet, units on another.
///
/// The data sheet has three header rows and three index columns
/// (region, level, item). Blocks are told apart by level.
pub struct WorkbookReader<'a, W: Workbook> {
    pub workbook: &'a W,
    pub table: TableKind,
    pub mode: Mode,
    pub data_sheet: SheetRef,
    pub unit_sheet: SheetRef,
}

impl<W: Workbook> FormatReader for WorkbookReader<'_, W> {
    fn format(&self) -> &'static str {
        "workbook"
    }

    fn table(&self) -> TableKind {
        self.table
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let grid = self
            .workbook
            .sheet(&self.data_sheet)
            .context("reading data sheet")?;
        let table = LabelledTable::from_grid(&grid, 3, 3).context("data sheet layout")?;
        let rows = triple_labels(&table.index).context("data sheet rows")?;
        let cols = triple_labels(&table.columns).context("data sheet columns")?;
        let full = table_to_matrix(&table, rows, cols)?;

        let matrices = split_blocks(&full, self.table, self.mode)?;

        let unit_grid = self
            .workbook
            .sheet(&self.unit_sheet)
            .context("reading unit sheet")?;
        let units = units_from_grid(&unit_grid)?;
        Ok(Parsed::from_matrices(matrices, units))
    }
}
