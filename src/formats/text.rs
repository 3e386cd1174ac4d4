use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use super::{read_table, table_to_matrix, triple_labels, units_from_grid, FormatReader, Parsed};
use crate::config::Mode;
use crate::data::loader::read_grid;
use crate::data::model::{Label, Level, MatrixName, MatrixSet, TableKind};

const DELIMITER: u8 = b'\t';

/// One tab-separated file per matrix in a directory.
///
/// `Z`/`z` and `Y` carry three index columns (region, level, item); the
/// factor and satellite matrices carry one (the item). Every file has three
/// header rows.
#[derive(Debug, Clone)]
pub struct TextReader {
    pub path: PathBuf,
    pub table: TableKind,
    pub mode: Mode,
}

impl TextReader {
    pub fn new(path: &Path, table: TableKind, mode: Mode) -> Self {
        TextReader {
            path: path.to_path_buf(),
            table,
            mode,
        }
    }

    /// Matrices expected in this mode, with the level of single-column row labels.
    pub fn expected(mode: Mode) -> [(MatrixName, Option<Level>); 5] {
        match mode {
            Mode::Flows => [
                (MatrixName::Z, None),
                (MatrixName::Y, None),
                (MatrixName::EY, Some(Level::SatelliteAccount)),
                (MatrixName::V, Some(Level::FactorOfProduction)),
                (MatrixName::E, Some(Level::SatelliteAccount)),
            ],
            Mode::Coefficients => [
                (MatrixName::LowerZ, None),
                (MatrixName::Y, None),
                (MatrixName::EY, Some(Level::SatelliteAccount)),
                (MatrixName::LowerV, Some(Level::FactorOfProduction)),
                (MatrixName::LowerE, Some(Level::SatelliteAccount)),
            ],
        }
    }
}

impl FormatReader for TextReader {
    fn format(&self) -> &'static str {
        "text"
    }

    fn table(&self) -> TableKind {
        self.table
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let mut matrices = MatrixSet::new();

        for (name, row_level) in Self::expected(self.mode) {
            let file = self.path.join(format!("{name}.txt"));
            let index_cols = if row_level.is_some() { 1 } else { 3 };
            let table = read_table(&file, DELIMITER, 3, index_cols)?;

            let rows = match row_level {
                Some(level) => table
                    .index
                    .iter()
                    .map(|cells| Label::global(level, cells[0].clone()))
                    .collect(),
                None => triple_labels(&table.index)
                    .with_context(|| format!("rows of {name}.txt"))?,
            };
            let cols = triple_labels(&table.columns)
                .with_context(|| format!("columns of {name}.txt"))?;
            let matrix =
                table_to_matrix(&table, rows, cols).with_context(|| format!("{name}.txt"))?;
            matrices.insert(name, matrix);
        }

        check_production_levels(&matrices, self.table)?;

        let units = units_from_grid(&read_grid(&self.path.join("units.txt"), DELIMITER)?)
            .context("reading units.txt")?;
        Ok(Parsed::from_matrices(matrices, units))
    }
}

/// The intermediate block must only use the table's production levels.
pub(crate) fn check_production_levels(
    matrices: &MatrixSet,
    table: TableKind,
) -> anyhow::Result<()> {
    let allowed = table.production_levels();
    for name in [MatrixName::Z, MatrixName::LowerZ] {
        let Some(m) = matrices.get(name) else { continue };
        if let Some(l) = m.rows.iter().chain(m.cols.iter()).find(|l| !allowed.contains(&l.level)) {
            bail!("{name} uses label '{l}' which does not belong to a {table} table");
        }
    }
    Ok(())
}
