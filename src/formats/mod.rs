//! Format readers: one external database layout each, all producing the
//! same canonical [`Parsed`] triple.

pub mod eora;
pub mod eurostat;
pub mod exiobase;
pub mod text;
pub mod workbook;

use std::path::Path;

use anyhow::{bail, Context};

use crate::config::Mode;
use crate::data::loader::{read_grid, Grid, LabelledTable};
use crate::data::model::{
    IndexSet, Label, Level, Matrix, MatrixName, MatrixSet, TableKind, UnitTable,
};
use crate::error::{Error, Result};

pub use eora::{EoraMultiReader, EoraSingleReader};
pub use eurostat::EurostatReader;
pub use exiobase::{Exiobase3Reader, ExiobaseSutReader};
pub use text::TextReader;
pub use workbook::WorkbookReader;

// ---------------------------------------------------------------------------
// Reader contract
// ---------------------------------------------------------------------------

/// What every reader produces for the baseline scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub matrices: MatrixSet,
    pub indices: IndexSet,
    pub units: UnitTable,
    /// Corrections applied while reading, for the database metadata.
    pub notes: Vec<String>,
}

impl Parsed {
    /// Index set taken from the labels the matrices actually use.
    pub fn from_matrices(matrices: MatrixSet, units: UnitTable) -> Self {
        let indices = IndexSet::from_matrices(&matrices);
        Parsed {
            matrices,
            indices,
            units,
            notes: Vec::new(),
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

pub trait FormatReader {
    /// Short format name used in errors and logs.
    fn format(&self) -> &'static str;

    fn table(&self) -> TableKind;

    /// Option and companion-input checks. Must not touch the filesystem.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// The actual parsing work.
    fn read_source(&self) -> anyhow::Result<Parsed>;

    /// Validate, parse, and check the result against the store invariants.
    fn read(&self) -> Result<Parsed> {
        self.validate()?;
        let parsed = self
            .read_source()
            .map_err(|e| Error::read(self.format(), e))?;
        parsed.matrices.validate()?;
        parsed.indices.check_alignment(&parsed.matrices)?;
        log::info!(
            "parsed {} source: {} matrices, {} regions",
            self.format(),
            parsed.matrices.len(),
            parsed.indices.regions().len()
        );
        Ok(parsed)
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn read_table(
    path: &Path,
    delimiter: u8,
    header_rows: usize,
    index_cols: usize,
) -> anyhow::Result<LabelledTable> {
    let grid = read_grid(path, delimiter)?;
    LabelledTable::from_grid(&grid, header_rows, index_cols)
        .with_context(|| format!("reading {}", path.display()))
}

/// `(region, level, item)` cells to a label. The region cell is ignored
/// for levels that carry no region.
pub(crate) fn label_from_cells(region: &str, level: &str, item: &str) -> anyhow::Result<Label> {
    let level: Level = level.parse()?;
    if level == Level::Region {
        bail!("'{}' is not a row or column level", level);
    }
    if item.is_empty() {
        bail!("empty item for level '{level}'");
    }
    if level.is_regional() {
        if region.is_empty() {
            bail!("label '{item}' of level '{level}' has no region");
        }
        Ok(Label::regional(region, level, item))
    } else {
        Ok(Label::global(level, item))
    }
}

pub(crate) fn triple_labels(cells: &[Vec<String>]) -> anyhow::Result<Vec<Label>> {
    cells
        .iter()
        .map(|c| match c.as_slice() {
            [region, level, item, ..] => label_from_cells(region, level, item),
            other => bail!("expected region, level and item, got {other:?}"),
        })
        .collect()
}

/// Unit rows `level, item, unit` after one header row.
pub(crate) fn units_from_grid(grid: &Grid) -> anyhow::Result<UnitTable> {
    let mut units = UnitTable::new();
    for (row_no, row) in grid.iter().enumerate().skip(1) {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        match row.as_slice() {
            [level, item, unit, ..] => {
                let level: Level = level
                    .parse()
                    .with_context(|| format!("units row {row_no}"))?;
                units.insert(level, item.clone(), unit.clone());
            }
            _ => bail!("units row {row_no} needs level, item and unit"),
        }
    }
    Ok(units)
}

pub(crate) fn table_to_matrix(
    table: &LabelledTable,
    rows: Vec<Label>,
    cols: Vec<Label>,
) -> anyhow::Result<Matrix> {
    Ok(Matrix::new(rows, cols, table.values.clone())?)
}

/// Sum rows and columns into new labels. `None` drops the row or column.
/// Output labels keep their order of first appearance.
pub(crate) fn fold(
    source: &Matrix,
    row_targets: &[Option<Label>],
    col_targets: &[Option<Label>],
) -> Matrix {
    fn distinct(targets: &[Option<Label>]) -> (Vec<Label>, Vec<Option<usize>>) {
        let mut labels: Vec<Label> = Vec::new();
        let positions = targets
            .iter()
            .map(|t| {
                t.as_ref().map(|label| match labels.iter().position(|l| l == label) {
                    Some(p) => p,
                    None => {
                        labels.push(label.clone());
                        labels.len() - 1
                    }
                })
            })
            .collect();
        (labels, positions)
    }

    let (rows, row_pos) = distinct(row_targets);
    let (cols, col_pos) = distinct(col_targets);
    let mut out = Matrix::zeros(rows, cols);
    for (i, ri) in row_pos.iter().enumerate() {
        let Some(ri) = ri else { continue };
        for (j, cj) in col_pos.iter().enumerate() {
            if let Some(cj) = cj {
                out.add(*ri, *cj, source.get(i, j));
            }
        }
    }
    out
}

/// Split one all-in-one matrix into the named blocks by level.
///
/// Rows: production levels, factors of production, satellite accounts.
/// Columns: production levels, consumption categories. A label that fits
/// no block is an error. The factor by consumption category quadrant has
/// no matrix and is dropped with a warning when it holds values.
pub(crate) fn split_blocks(
    full: &Matrix,
    table: TableKind,
    mode: Mode,
) -> anyhow::Result<MatrixSet> {
    let production = table.production_levels();
    let pick = |labels: &[Label], wanted: &dyn Fn(Level) -> bool| -> Vec<usize> {
        labels
            .iter()
            .enumerate()
            .filter(|(_, l)| wanted(l.level))
            .map(|(i, _)| i)
            .collect()
    };

    let row_fits = |l: Level| {
        production.contains(&l) || matches!(l, Level::FactorOfProduction | Level::SatelliteAccount)
    };
    let col_fits = |l: Level| production.contains(&l) || l == Level::ConsumptionCategory;
    if let Some(stray) = full.rows.iter().find(|l| !row_fits(l.level)) {
        bail!("row '{stray}' does not belong to a {table} table");
    }
    if let Some(stray) = full.cols.iter().find(|l| !col_fits(l.level)) {
        bail!("column '{stray}' does not belong to a {table} table");
    }

    let prod_rows = pick(&full.rows, &|l| production.contains(&l));
    let fac_rows = pick(&full.rows, &|l| l == Level::FactorOfProduction);
    let sat_rows = pick(&full.rows, &|l| l == Level::SatelliteAccount);
    let prod_cols = pick(&full.cols, &|l| production.contains(&l));
    let fd_cols = pick(&full.cols, &|l| l == Level::ConsumptionCategory);

    if prod_rows.is_empty() || prod_cols.is_empty() {
        bail!("no {table} production rows or columns found");
    }

    let dropped: f64 = full.select(&fac_rows, &fd_cols).data.iter().sum();
    if dropped != 0.0 {
        log::warn!(
            "dropping {dropped} of factor of production flows into final demand: \
             no matrix holds that block"
        );
    }

    let (z, v, e) = match mode {
        Mode::Flows => (MatrixName::Z, MatrixName::V, MatrixName::E),
        Mode::Coefficients => (MatrixName::LowerZ, MatrixName::LowerV, MatrixName::LowerE),
    };

    let mut set = MatrixSet::new();
    set.insert(z, full.select(&prod_rows, &prod_cols));
    set.insert(MatrixName::Y, full.select(&prod_rows, &fd_cols));
    set.insert(v, full.select(&fac_rows, &prod_cols));
    set.insert(e, full.select(&sat_rows, &prod_cols));
    set.insert(MatrixName::EY, full.select(&sat_rows, &fd_cols));
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(r: &str, s: &str) -> Label {
        Label::regional(r, Level::Sector, s)
    }

    #[test]
    fn labels_drop_region_for_global_levels() {
        let l = label_from_cells("-", "Factor of production", "Wages").unwrap();
        assert_eq!(l, Label::global(Level::FactorOfProduction, "Wages"));
        assert!(label_from_cells("", "Sector", "Agriculture").is_err());
        assert!(label_from_cells("IT", "Region", "IT").is_err());
        assert!(label_from_cells("IT", "Industry", "A").is_err());
    }

    #[test]
    fn fold_sums_and_drops() {
        let src = Matrix::new(
            vec![sector("IT", "A"), sector("FR", "A"), sector("ROW", "A")],
            vec![sector("IT", "A"), sector("FR", "A")],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let imports = Label::global(Level::FactorOfProduction, "Imports");
        let out = fold(
            &src,
            &[Some(imports.clone()), Some(imports.clone()), None],
            &[Some(sector("IT", "A")), Some(sector("FR", "A"))],
        );
        assert_eq!(out.rows, vec![imports]);
        assert_eq!(out.data, vec![4.0, 6.0]);
    }

    #[test]
    fn split_blocks_by_level() {
        let fd = Label::regional("IT", Level::ConsumptionCategory, "Households");
        let wages = Label::global(Level::FactorOfProduction, "Wages");
        let co2 = Label::global(Level::SatelliteAccount, "CO2");
        let full = Matrix::new(
            vec![sector("IT", "A"), wages.clone(), co2.clone()],
            vec![sector("IT", "A"), fd.clone()],
            vec![1.0, 2.0, 3.0, 0.0, 5.0, 6.0],
        )
        .unwrap();

        let set = split_blocks(&full, TableKind::Iot, Mode::Flows).unwrap();
        assert_eq!(set.get(MatrixName::Z).unwrap().data, vec![1.0]);
        assert_eq!(set.get(MatrixName::Y).unwrap().data, vec![2.0]);
        assert_eq!(set.get(MatrixName::V).unwrap().data, vec![3.0]);
        assert_eq!(set.get(MatrixName::E).unwrap().data, vec![5.0]);
        assert_eq!(set.get(MatrixName::EY).unwrap().data, vec![6.0]);

        let coeff = split_blocks(&full, TableKind::Iot, Mode::Coefficients).unwrap();
        assert!(coeff.contains(MatrixName::LowerZ));
        assert!(!coeff.contains(MatrixName::Z));

        assert!(split_blocks(&full, TableKind::Sut, Mode::Flows).is_err());
    }

    #[test]
    fn split_blocks_rejects_consumption_rows() {
        let fd = Label::regional("IT", Level::ConsumptionCategory, "Households");
        let stray = Label::regional("IT", Level::ConsumptionCategory, "Stray");
        let full = Matrix::new(
            vec![sector("IT", "A"), stray],
            vec![sector("IT", "A"), fd],
            vec![1.0, 2.0, 123.0, 123.0],
        )
        .unwrap();

        let err = split_blocks(&full, TableKind::Iot, Mode::Flows).unwrap_err();
        assert!(err.to_string().contains("Stray"), "{err}");
    }

    #[test]
    fn split_blocks_rejects_factor_and_satellite_columns() {
        for level in [Level::FactorOfProduction, Level::SatelliteAccount] {
            let stray = Label::global(level, "Stray");
            let full = Matrix::new(
                vec![sector("IT", "A")],
                vec![sector("IT", "A"), stray],
                vec![1.0, 2.0],
            )
            .unwrap();

            let err = split_blocks(&full, TableKind::Iot, Mode::Flows).unwrap_err();
            assert!(err.to_string().contains("column"), "{level}: {err}");
        }
    }

    #[test]
    fn split_blocks_drops_factor_final_demand_quadrant() {
        let fd = Label::regional("IT", Level::ConsumptionCategory, "Households");
        let imports = Label::global(Level::FactorOfProduction, "Imports");
        let full = Matrix::new(
            vec![sector("IT", "A"), imports],
            vec![sector("IT", "A"), fd],
            vec![1.0, 2.0, 3.0, 6.0],
        )
        .unwrap();

        let set = split_blocks(&full, TableKind::Iot, Mode::Flows).unwrap();
        assert_eq!(set.get(MatrixName::V).unwrap().data, vec![3.0]);
        assert_eq!(set.get(MatrixName::Y).unwrap().data, vec![2.0]);
        let total: usize = set.iter().map(|(_, m)| m.data.len()).sum();
        assert_eq!(total, 3);
    }
}
