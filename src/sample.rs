//! A small two-region database, in memory and in the text layout.
//!
//! Used by the `generate_sample` binary and by tests.

use std::path::Path;

use anyhow::{Context, Result};

use crate::data::loader::{write_grid, Grid, MemoryWorkbook};
use crate::data::model::{Label, Level, Matrix, MatrixName, MatrixSet, TableKind, UnitTable};

pub const REGIONS: [&str; 2] = ["IT", "FR"];
pub const SECTORS: [&str; 2] = ["Agriculture", "Services"];
pub const ACTIVITIES: [&str; 2] = ["Farming", "Retail"];
pub const COMMODITIES: [&str; 2] = ["Food", "Goods"];
pub const FACTORS: [&str; 2] = ["Wages", "Taxes"];
pub const SATELLITES: [&str; 1] = ["CO2"];
pub const CATEGORY: &str = "Households";

const MONETARY_UNIT: &str = "M EUR";

/// Placeholder region cell for labels that carry none.
const NO_REGION: &str = "-";

fn production(table: TableKind) -> Vec<Label> {
    let mut labels = Vec::new();
    for r in REGIONS {
        match table {
            TableKind::Iot => {
                labels.extend(SECTORS.iter().map(|s| Label::regional(r, Level::Sector, *s)));
            }
            TableKind::Sut => {
                labels.extend(ACTIVITIES.iter().map(|a| Label::regional(r, Level::Activity, *a)));
                labels.extend(COMMODITIES.iter().map(|c| Label::regional(r, Level::Commodity, *c)));
            }
        }
    }
    labels
}

/// Flow matrices `Z, Y, V, E, EY` and their units.
///
/// Values are small integers chosen so every sector produces more than it
/// sells to other sectors, which keeps `(I - z)` invertible.
pub fn matrices(table: TableKind) -> (MatrixSet, UnitTable) {
    let prod = production(table);
    let categories: Vec<Label> = REGIONS
        .iter()
        .map(|r| Label::regional(*r, Level::ConsumptionCategory, CATEGORY))
        .collect();
    let factors: Vec<Label> = FACTORS
        .iter()
        .map(|f| Label::global(Level::FactorOfProduction, *f))
        .collect();
    let satellites: Vec<Label> = SATELLITES
        .iter()
        .map(|s| Label::global(Level::SatelliteAccount, *s))
        .collect();

    // SUT: only commodity → activity (use) and activity → commodity
    // (supply) cells carry flows.
    let flows_between = |from: &Label, to: &Label| match table {
        TableKind::Iot => true,
        TableKind::Sut => matches!(
            (from.level, to.level),
            (Level::Commodity, Level::Activity) | (Level::Activity, Level::Commodity)
        ),
    };
    let sells_to_final = |l: &Label| table == TableKind::Iot || l.level == Level::Commodity;
    let has_value_added = |l: &Label| table == TableKind::Iot || l.level == Level::Activity;

    let mut z = Matrix::zeros(prod.clone(), prod.clone());
    for (i, from) in prod.iter().enumerate() {
        for (j, to) in prod.iter().enumerate() {
            if flows_between(from, to) {
                let domestic = if from.region == to.region { 10.0 } else { 2.0 };
                z.set(i, j, domestic + (i + j) as f64);
            }
        }
    }

    let mut y = Matrix::zeros(prod.clone(), categories.clone());
    for (i, label) in prod.iter().enumerate() {
        if !sells_to_final(label) {
            continue;
        }
        for (k, cat) in categories.iter().enumerate() {
            let domestic = if label.region == cat.region { 60.0 } else { 15.0 };
            y.set(i, k, domestic + i as f64);
        }
    }

    let mut v = Matrix::zeros(factors.clone(), prod.clone());
    let mut e = Matrix::zeros(satellites.clone(), prod.clone());
    for (j, label) in prod.iter().enumerate() {
        if !has_value_added(label) {
            continue;
        }
        for f in 0..factors.len() {
            v.set(f, j, 20.0 + (5 * f + j) as f64);
        }
        for s in 0..satellites.len() {
            e.set(s, j, 1.5 * (j + 1) as f64);
        }
    }

    let mut ey = Matrix::zeros(satellites.clone(), categories);
    for s in 0..satellites.len() {
        for k in 0..REGIONS.len() {
            ey.set(s, k, 4.0 + k as f64);
        }
    }

    let mut set = MatrixSet::new();
    set.insert(MatrixName::Z, z);
    set.insert(MatrixName::Y, y);
    set.insert(MatrixName::V, v);
    set.insert(MatrixName::E, e);
    set.insert(MatrixName::EY, ey);

    let mut units = UnitTable::new();
    for label in prod.iter().chain(factors.iter()) {
        units.insert(label.level, label.item.clone(), MONETARY_UNIT);
    }
    for label in &satellites {
        units.insert(label.level, label.item.clone(), "kt");
    }
    (set, units)
}

// ---------------------------------------------------------------------------
// Text layout
// ---------------------------------------------------------------------------

fn header_rows(cols: &[Label], index_cols: usize) -> Grid {
    let pad = || std::iter::repeat(String::new()).take(index_cols);
    vec![
        pad()
            .chain(cols.iter().map(|l| l.region.clone().unwrap_or_else(|| NO_REGION.into())))
            .collect(),
        pad().chain(cols.iter().map(|l| l.level.to_string())).collect(),
        pad().chain(cols.iter().map(|l| l.item.clone())).collect(),
    ]
}

/// Three header rows, then one row per label. `full_rows` writes the
/// region and level of each row label too.
pub fn matrix_grid(m: &Matrix, full_rows: bool) -> Grid {
    let index_cols = if full_rows { 3 } else { 1 };
    let mut grid = header_rows(&m.cols, index_cols);
    for (i, label) in m.rows.iter().enumerate() {
        let mut row = if full_rows {
            vec![
                label.region.clone().unwrap_or_else(|| NO_REGION.into()),
                label.level.to_string(),
                label.item.clone(),
            ]
        } else {
            vec![label.item.clone()]
        };
        row.extend((0..m.cols.len()).map(|j| m.get(i, j).to_string()));
        grid.push(row);
    }
    grid
}

pub fn units_grid(units: &UnitTable) -> Grid {
    let mut grid = vec![vec!["level".to_string(), "item".to_string(), "unit".to_string()]];
    for ((level, item), unit) in units.iter() {
        grid.push(vec![level.to_string(), item.clone(), unit.clone()]);
    }
    grid
}

/// Write every matrix of `set` as `{name}.txt` plus `units.txt`.
pub fn write_text(dir: &Path, set: &MatrixSet, units: &UnitTable) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (name, m) in set.iter() {
        let full_rows = matches!(
            name,
            MatrixName::Z | MatrixName::LowerZ | MatrixName::Y | MatrixName::X
        );
        write_grid(&dir.join(format!("{name}.txt")), &matrix_grid(m, full_rows), b'\t')?;
    }
    write_grid(&dir.join("units.txt"), &units_grid(units), b'\t')?;
    log::info!("wrote {} matrices to {}", set.len(), dir.display());
    Ok(())
}

/// [`matrices`] written in the text layout.
pub fn write_text_database(dir: &Path, table: TableKind) -> Result<()> {
    let (set, units) = matrices(table);
    write_text(dir, &set, &units)
}

// ---------------------------------------------------------------------------
// Workbook layout
// ---------------------------------------------------------------------------

/// All flow blocks in one grid: rows are production, factors and
/// satellites; columns are production and consumption categories.
pub fn combined(set: &MatrixSet) -> Result<Matrix> {
    let get = |name| set.get(name).with_context(|| format!("matrix {name} is missing"));
    let (z, y, v, e, ey) = (
        get(MatrixName::Z)?,
        get(MatrixName::Y)?,
        get(MatrixName::V)?,
        get(MatrixName::E)?,
        get(MatrixName::EY)?,
    );
    let rows: Vec<Label> = z.rows.iter().chain(&v.rows).chain(&e.rows).cloned().collect();
    let cols: Vec<Label> = z.cols.iter().chain(&y.cols).cloned().collect();
    let (np, nf, nc) = (z.rows.len(), v.rows.len(), z.cols.len());

    let mut out = Matrix::zeros(rows, cols);
    let blocks = [(z, 0, 0), (y, 0, nc), (v, np, 0), (e, np + nf, 0), (ey, np + nf, nc)];
    for (block, r0, c0) in blocks {
        for i in 0..block.rows.len() {
            for j in 0..block.cols.len() {
                out.set(r0 + i, c0 + j, block.get(i, j));
            }
        }
    }
    Ok(out)
}

/// [`matrices`] as a workbook with a `data` sheet and a `units` sheet.
pub fn workbook(table: TableKind) -> Result<MemoryWorkbook> {
    let (set, units) = matrices(table);
    Ok(MemoryWorkbook::new()
        .with_sheet("data", matrix_grid(&combined(&set)?, true))
        .with_sheet("units", units_grid(&units)))
}
