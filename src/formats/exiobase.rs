use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use super::{
    read_table, table_to_matrix, text::check_production_levels, units_from_grid, FormatReader,
    Parsed,
};
use crate::config::ExiobaseVersion;
use crate::data::loader::{read_grid, LabelledTable};
use crate::data::model::{Label, Level, Matrix, MatrixName, MatrixSet, TableKind, UnitTable};

/// Leading rows of `satellite/F.txt` that are factor inputs, not stressors.
pub const FACTOR_INPUT_ROWS: usize = 9;

/// Sectors and products in exiobase are in million euro.
const MONETARY_UNIT: &str = "M.EUR";

fn pair_labels(cells: &[Vec<String>], level: Level) -> anyhow::Result<Vec<Label>> {
    cells
        .iter()
        .map(|c| match c.as_slice() {
            [region, item, ..] if !region.is_empty() && !item.is_empty() => {
                Ok(Label::regional(region.clone(), level, item.clone()))
            }
            other => bail!("expected region and {level}, got {other:?}"),
        })
        .collect()
}

fn single_labels(cells: &[Vec<String>], level: Level) -> Vec<Label> {
    cells
        .iter()
        .map(|c| Label::global(level, c[0].clone()))
        .collect()
}

fn matrix(
    table: &LabelledTable,
    rows: Vec<Label>,
    cols: Vec<Label>,
    what: &str,
) -> anyhow::Result<Matrix> {
    Matrix::new(rows, cols, table.values.clone()).with_context(|| format!("building {what}"))
}

// ---------------------------------------------------------------------------
// exiobase3
// ---------------------------------------------------------------------------

/// Extracted exiobase3 pxp/ixi release.
///
/// ```text
///  Z.txt  Y.txt  unit.txt
///  satellite/F.txt  satellite/F_Y.txt | satellite/F_hh.txt  satellite/unit.txt
/// ```
#[derive(Debug, Clone)]
pub struct Exiobase3Reader {
    pub path: PathBuf,
    pub version: ExiobaseVersion,
}

impl Exiobase3Reader {
    pub fn new(path: &Path, version: ExiobaseVersion) -> Self {
        Exiobase3Reader {
            path: path.to_path_buf(),
            version,
        }
    }
}

impl FormatReader for Exiobase3Reader {
    fn format(&self) -> &'static str {
        "exiobase3"
    }

    fn table(&self) -> TableKind {
        TableKind::Iot
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let sat_dir = self.path.join("satellite");

        let z = read_table(&self.path.join("Z.txt"), b'\t', 2, 2)?;
        let sectors = pair_labels(&z.columns, Level::Sector).context("Z.txt columns")?;
        let z_rows = pair_labels(&z.index, Level::Sector).context("Z.txt rows")?;
        let z_matrix = matrix(&z, z_rows, sectors.clone(), "Z")?;

        let y = read_table(&self.path.join("Y.txt"), b'\t', 2, 2)?;
        let categories =
            pair_labels(&y.columns, Level::ConsumptionCategory).context("Y.txt columns")?;
        let y_rows = pair_labels(&y.index, Level::Sector).context("Y.txt rows")?;
        let y_matrix = matrix(&y, y_rows, categories.clone(), "Y")?;

        let f = read_table(&sat_dir.join("F.txt"), b'\t', 2, 1)?;
        if f.index.len() <= FACTOR_INPUT_ROWS {
            bail!(
                "satellite/F.txt has {} rows, expected more than {FACTOR_INPUT_ROWS} factor inputs",
                f.index.len()
            );
        }
        let f_cols = pair_labels(&f.columns, Level::Sector).context("F.txt columns")?;
        let f_rows: Vec<Label> = f
            .index
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let level = if i < FACTOR_INPUT_ROWS {
                    Level::FactorOfProduction
                } else {
                    Level::SatelliteAccount
                };
                Label::global(level, c[0].clone())
            })
            .collect();
        let f_matrix = matrix(&f, f_rows, f_cols, "F")?;
        let all_cols: Vec<usize> = (0..f_matrix.cols.len()).collect();
        let factor_rows: Vec<usize> = (0..FACTOR_INPUT_ROWS).collect();
        let stressor_rows: Vec<usize> = (FACTOR_INPUT_ROWS..f_matrix.rows.len()).collect();

        let fy_file = self.version.final_demand_file();
        let fy = read_table(&sat_dir.join(fy_file), b'\t', 2, 1)?;
        if fy.index != f.index {
            bail!("satellite/{fy_file} rows differ from satellite/F.txt rows");
        }
        let fy_cols = pair_labels(&fy.columns, Level::ConsumptionCategory)
            .with_context(|| format!("{fy_file} columns"))?;
        let fy_matrix = matrix(&fy, f_matrix.rows.clone(), fy_cols, fy_file)?;
        let fy_cols_idx: Vec<usize> = (0..fy_matrix.cols.len()).collect();

        let mut matrices = MatrixSet::new();
        matrices.insert(MatrixName::V, f_matrix.select(&factor_rows, &all_cols));
        matrices.insert(MatrixName::E, f_matrix.select(&stressor_rows, &all_cols));
        matrices.insert(MatrixName::EY, fy_matrix.select(&stressor_rows, &fy_cols_idx));
        matrices.insert(MatrixName::Z, z_matrix);
        matrices.insert(MatrixName::Y, y_matrix);
        check_production_levels(&matrices, TableKind::Iot)?;

        // unit.txt: region, sector, unit
        let mut units = UnitTable::new();
        for row in read_grid(&self.path.join("unit.txt"), b'\t')?.iter().skip(1) {
            if let [_, sector, unit, ..] = row.as_slice() {
                if units.get(Level::Sector, sector).is_none() {
                    units.insert(Level::Sector, sector.clone(), unit.clone());
                }
            }
        }
        // satellite/unit.txt: stressor, unit
        let stressor_units: HashMap<String, String> = read_grid(&sat_dir.join("unit.txt"), b'\t')?
            .into_iter()
            .skip(1)
            .filter_map(|row| match row.as_slice() {
                [name, unit, ..] => Some((name.clone(), unit.clone())),
                _ => None,
            })
            .collect();
        for label in &f_matrix.rows {
            let unit = stressor_units
                .get(&label.item)
                .with_context(|| format!("no unit for '{}' in satellite/unit.txt", label.item))?;
            units.insert(label.level, label.item.clone(), unit.clone());
        }

        Ok(Parsed::from_matrices(matrices, units))
    }
}

// ---------------------------------------------------------------------------
// exiobase monetary MRSUT
// ---------------------------------------------------------------------------

/// Extracted exiobase monetary MRSUT release, comma separated.
///
/// `supply.csv` and `use.csv` are product × industry; the supply block is
/// transposed into the activity × commodity convention.
#[derive(Debug, Clone)]
pub struct ExiobaseSutReader {
    pub path: PathBuf,
}

impl ExiobaseSutReader {
    pub fn new(path: &Path) -> Self {
        ExiobaseSutReader {
            path: path.to_path_buf(),
        }
    }
}

impl FormatReader for ExiobaseSutReader {
    fn format(&self) -> &'static str {
        "exiobase SUT"
    }

    fn table(&self) -> TableKind {
        TableKind::Sut
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let file = |name: &str| self.path.join(name);

        let supply = read_table(&file("supply.csv"), b',', 2, 2)?;
        let usage = read_table(&file("use.csv"), b',', 2, 2)?;
        if supply.index != usage.index || supply.columns != usage.columns {
            bail!("supply.csv and use.csv do not share products and industries");
        }
        let commodities = pair_labels(&supply.index, Level::Commodity).context("supply.csv rows")?;
        let activities =
            pair_labels(&supply.columns, Level::Activity).context("supply.csv columns")?;
        let (na, nc) = (activities.len(), commodities.len());

        let production: Vec<Label> = activities.iter().chain(commodities.iter()).cloned().collect();
        // Supply is published commodity by industry; Z holds it activity by commodity.
        let make = table_to_matrix(&supply, commodities.clone(), activities.clone())?.transpose();
        let mut z = Matrix::zeros(production.clone(), production.clone());
        for a in 0..na {
            for c in 0..nc {
                z.set(a, na + c, make.get(a, c));
                z.set(na + c, a, usage.get(c, a));
            }
        }

        let fd = read_table(&file("final_demand.csv"), b',', 2, 2)?;
        if fd.index != supply.index {
            bail!("final_demand.csv rows differ from supply.csv rows");
        }
        let categories = pair_labels(&fd.columns, Level::ConsumptionCategory)
            .context("final_demand.csv columns")?;
        let mut y = Matrix::zeros(production.clone(), categories.clone());
        for c in 0..nc {
            for k in 0..categories.len() {
                y.set(na + c, k, fd.get(c, k));
            }
        }

        let by_activity = |name: &str, level: Level| -> anyhow::Result<Matrix> {
            let t = read_table(&file(name), b',', 2, 1)?;
            if t.columns != supply.columns {
                bail!("{name} columns differ from supply.csv industries");
            }
            let rows = single_labels(&t.index, level);
            let mut m = Matrix::zeros(rows, production.clone());
            for i in 0..t.index.len() {
                for a in 0..na {
                    m.set(i, a, t.get(i, a));
                }
            }
            Ok(m)
        };
        let v = by_activity("value_added.csv", Level::FactorOfProduction)?;
        let e = by_activity("extensions.csv", Level::SatelliteAccount)?;
        let ey = Matrix::zeros(e.rows.clone(), categories);

        let mut matrices = MatrixSet::new();
        matrices.insert(MatrixName::Z, z);
        matrices.insert(MatrixName::Y, y);
        matrices.insert(MatrixName::V, v);
        matrices.insert(MatrixName::E, e);
        matrices.insert(MatrixName::EY, ey);

        let mut units =
            units_from_grid(&read_grid(&file("units.csv"), b',')?).context("reading units.csv")?;
        for label in &production {
            if units.get(label.level, &label.item).is_none() {
                units.insert(label.level, label.item.clone(), MONETARY_UNIT);
            }
        }

        Ok(Parsed::from_matrices(matrices, units))
    }
}
