use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use super::{fold, split_blocks, FormatReader, Parsed};
use crate::config::{Mode, NameConvention};
use crate::data::loader::{parse_number, read_grid, Grid, LabelledTable};
use crate::data::model::{Label, Level, Matrix, MatrixName, MatrixSet, TableKind, UnitTable};
use crate::error::{Error, Result};

/// Eora reports monetary values in thousand US dollars.
const MONETARY_UNIT: &str = "USD'000";

/// Code of the aggregate region that makes Eora26 inconsistent.
pub const REST_OF_WORLD: &str = "ROW";

pub const IMPORTS_FROM_ROW: &str = "Imports from ROW";
pub const EXPORTS_TO_ROW: &str = "Exports to ROW";

/// Corrections applied by [`EoraMultiReader`], recorded on the database.
pub const MULTI_REGION_NOTES: [&str; 3] = [
    "ROW deleted from database due to inconsistency.",
    "Intermediate imports from ROW added to VA matrix",
    "Intermediate exports to ROW added to Y matrix",
];

/// `"CO2 (Gg)"` → `"Gg"`; no parenthesised suffix means no unit.
fn unit_of(item: &str) -> String {
    item.trim_end()
        .strip_suffix(')')
        .and_then(|s| s.rsplit_once('('))
        .map(|(_, unit)| unit.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "None".to_string())
}

fn region_name<'a>(name: &'a str, code: &'a str, convention: NameConvention) -> &'a str {
    match convention {
        NameConvention::FullName => name,
        NameConvention::Abbreviation => code,
    }
}

fn eora_units(matrices: &MatrixSet) -> UnitTable {
    let mut units = UnitTable::new();
    for (_, m) in matrices.iter() {
        for label in m.rows.iter().chain(m.cols.iter()) {
            let unit = match label.level {
                Level::Sector | Level::FactorOfProduction => MONETARY_UNIT.to_string(),
                Level::SatelliteAccount => unit_of(&label.item),
                _ => continue,
            };
            if units.get(label.level, &label.item).is_none() {
                units.insert(label.level, label.item.clone(), unit);
            }
        }
    }
    units
}

// ---------------------------------------------------------------------------
// Single region
// ---------------------------------------------------------------------------

/// One single-country Eora table: four header rows and four index columns
/// (region name, region code, entity, item).
#[derive(Debug, Clone)]
pub struct EoraSingleReader {
    pub path: PathBuf,
    pub name_convention: NameConvention,
    pub aggregate_trade: bool,
}

impl EoraSingleReader {
    pub fn new(path: &Path, name_convention: NameConvention, aggregate_trade: bool) -> Self {
        EoraSingleReader {
            path: path.to_path_buf(),
            name_convention,
            aggregate_trade,
        }
    }

    fn partner(&self, cells: &[String]) -> String {
        region_name(&cells[0], &cells[1], self.name_convention).to_string()
    }
}

impl FormatReader for EoraSingleReader {
    fn format(&self) -> &'static str {
        "eora single-region"
    }

    fn table(&self) -> TableKind {
        TableKind::Iot
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let grid = read_grid(&self.path, b'\t')?;
        let table = LabelledTable::from_grid(&grid, 4, 4)
            .with_context(|| format!("reading {}", self.path.display()))?;

        let home = {
            let mut regions = table
                .index
                .iter()
                .filter(|c| c[2] == "Industries")
                .map(|c| self.partner(c));
            let first = regions.next().context("no 'Industries' rows found")?;
            if let Some(other) = regions.find(|r| *r != first) {
                bail!("single-region table holds industries of '{first}' and '{other}'");
            }
            first
        };

        let row_targets = table
            .index
            .iter()
            .map(|c| {
                Ok(Some(match c[2].as_str() {
                    "Industries" => Label::regional(home.clone(), Level::Sector, c[3].clone()),
                    "Primary Inputs" => Label::global(Level::FactorOfProduction, c[3].clone()),
                    "Satellites" => Label::global(Level::SatelliteAccount, c[3].clone()),
                    "Imports From" if self.aggregate_trade => {
                        Label::global(Level::FactorOfProduction, "Imports")
                    }
                    "Imports From" => Label::global(
                        Level::FactorOfProduction,
                        format!("Imports from {}", self.partner(c)),
                    ),
                    other => bail!("unexpected row entity '{other}'"),
                }))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let col_targets = table
            .columns
            .iter()
            .map(|c| {
                Ok(Some(match c[2].as_str() {
                    "Industries" => Label::regional(home.clone(), Level::Sector, c[3].clone()),
                    "Final Demand" => {
                        Label::regional(home.clone(), Level::ConsumptionCategory, c[3].clone())
                    }
                    "Exports To" if self.aggregate_trade => {
                        Label::regional(home.clone(), Level::ConsumptionCategory, "Exports")
                    }
                    "Exports To" => Label::regional(
                        home.clone(),
                        Level::ConsumptionCategory,
                        format!("Exports to {}", self.partner(c)),
                    ),
                    other => bail!("unexpected column entity '{other}'"),
                }))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        // Raw labels only need to be distinct for the fold source.
        let raw = |cells: &[Vec<String>]| -> Vec<Label> {
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    Label::global(Level::SatelliteAccount, format!("{i}:{}", c.join("|")))
                })
                .collect()
        };
        let source = Matrix::new(raw(&table.index), raw(&table.columns), table.values.clone())?;
        let full = fold(&source, &row_targets, &col_targets);
        let matrices = split_blocks(&full, TableKind::Iot, Mode::Flows)?;

        let units = eora_units(&matrices);
        Ok(Parsed::from_matrices(matrices, units))
    }
}

// ---------------------------------------------------------------------------
// Multi region (Eora26)
// ---------------------------------------------------------------------------

/// Eora26 release: unlabelled `Eora26_{year}_bp_{T,FD,VA,Q,QY}.txt` blocks
/// plus `labels_{T,FD,VA,Q}.txt` in a separate index directory.
///
/// The aggregate `ROW` region is removed; its intermediate sales become a
/// value-added row and its purchases become a final-demand column.
#[derive(Debug, Clone)]
pub struct EoraMultiReader {
    pub path: PathBuf,
    pub index_path: Option<PathBuf>,
    pub year: Option<i64>,
    pub name_convention: NameConvention,
}

/// One row of `labels_T.txt` / `labels_FD.txt`.
struct RegionalLabel {
    name: String,
    code: String,
    item: String,
}

fn regional_labels(grid: &Grid, file: &str) -> anyhow::Result<Vec<RegionalLabel>> {
    grid.iter()
        .filter(|r| r.iter().any(|c| !c.is_empty()))
        .enumerate()
        .map(|(i, r)| match r.as_slice() {
            [name, code, _entity, item, ..] => Ok(RegionalLabel {
                name: name.clone(),
                code: code.clone(),
                item: item.clone(),
            }),
            _ => bail!("{file} row {i} needs country, code, entity and item"),
        })
        .collect()
}

fn flat_labels(grid: &Grid) -> Vec<String> {
    grid.iter()
        .map(|r| {
            r.iter()
                .filter(|c| !c.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" - ")
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn read_block(path: &Path, rows: usize, cols: usize) -> anyhow::Result<Vec<f64>> {
    let grid = read_grid(path, b'\t')?;
    let grid: Vec<&Vec<String>> = grid.iter().filter(|r| r.iter().any(|c| !c.is_empty())).collect();
    if grid.len() != rows {
        bail!("{} has {} rows, labels describe {rows}", path.display(), grid.len());
    }
    let mut values = Vec::with_capacity(rows * cols);
    for (i, row) in grid.iter().enumerate() {
        if row.len() != cols {
            bail!("{} row {i} has {} values, labels describe {cols}", path.display(), row.len());
        }
        for (j, cell) in row.iter().enumerate() {
            let value = parse_number(cell)
                .with_context(|| format!("{} row {i}, column {j}", path.display()))?;
            values.push(value);
        }
    }
    Ok(values)
}

impl EoraMultiReader {
    fn label(&self, l: &RegionalLabel, level: Level) -> Label {
        Label::regional(region_name(&l.name, &l.code, self.name_convention), level, l.item.clone())
    }
}

impl FormatReader for EoraMultiReader {
    fn format(&self) -> &'static str {
        "eora multi-region"
    }

    fn table(&self) -> TableKind {
        TableKind::Iot
    }

    fn validate(&self) -> Result<()> {
        if self.year.is_none() || self.index_path.is_none() {
            return Err(Error::MissingArgument(
                "for multi region Eora, the year and indices path should be defined".into(),
            ));
        }
        Ok(())
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let (Some(year), Some(index_path)) = (self.year, self.index_path.as_deref()) else {
            bail!("year and index path are required");
        };

        let labels = |file: &str| -> anyhow::Result<Vec<RegionalLabel>> {
            regional_labels(&read_grid(&index_path.join(file), b'\t')?, file)
        };
        let t_labels = labels("labels_T.txt")?;
        let fd_labels = labels("labels_FD.txt")?;
        let va_labels = flat_labels(&read_grid(&index_path.join("labels_VA.txt"), b'\t')?);
        let q_labels = flat_labels(&read_grid(&index_path.join("labels_Q.txt"), b'\t')?);

        let (nt, nfd, nva, nq) = (t_labels.len(), fd_labels.len(), va_labels.len(), q_labels.len());
        let block = |name: &str, rows, cols| {
            read_block(&self.path.join(format!("Eora26_{year}_bp_{name}.txt")), rows, cols)
        };
        let t = block("T", nt, nt)?;
        let fd = block("FD", nt, nfd)?;
        let va = block("VA", nva, nt)?;
        let q = block("Q", nq, nt)?;
        let qy = block("QY", nq, nfd)?;

        let split_rest = |labels: &[RegionalLabel]| -> (Vec<usize>, Vec<usize>) {
            (0..labels.len()).partition(|&i| labels[i].code != REST_OF_WORLD)
        };
        let (keep_t, row_t) = split_rest(&t_labels);
        let (keep_fd, row_fd) = split_rest(&fd_labels);
        if keep_t.is_empty() {
            bail!("no regions left after removing {REST_OF_WORLD}");
        }

        let sectors: Vec<Label> = keep_t
            .iter()
            .map(|&i| self.label(&t_labels[i], Level::Sector))
            .collect();
        let mut categories: Vec<Label> = keep_fd
            .iter()
            .map(|&k| self.label(&fd_labels[k], Level::ConsumptionCategory))
            .collect();
        let mut regions: Vec<String> = Vec::new();
        for label in &sectors {
            if let Some(r) = &label.region {
                if !regions.contains(r) {
                    regions.push(r.clone());
                }
            }
        }
        let export_col = categories.len();
        categories.extend(
            regions
                .iter()
                .map(|r| Label::regional(r.clone(), Level::ConsumptionCategory, EXPORTS_TO_ROW)),
        );

        let mut z = Matrix::zeros(sectors.clone(), sectors.clone());
        let mut y = Matrix::zeros(sectors.clone(), categories.clone());
        for (a, &i) in keep_t.iter().enumerate() {
            for (b, &j) in keep_t.iter().enumerate() {
                z.set(a, b, t[i * nt + j]);
            }
            for (b, &k) in keep_fd.iter().enumerate() {
                y.set(a, b, fd[i * nfd + k]);
            }
            let exports: f64 = row_t.iter().map(|&j| t[i * nt + j]).sum::<f64>()
                + row_fd.iter().map(|&k| fd[i * nfd + k]).sum::<f64>();
            let region = sectors[a].region.as_ref().context("sector without region")?;
            let r = regions.iter().position(|x| x == region).context("unknown region")?;
            y.set(a, export_col + r, exports);
        }

        let mut factors: Vec<Label> = va_labels
            .iter()
            .map(|v| Label::global(Level::FactorOfProduction, v.clone()))
            .collect();
        factors.push(Label::global(Level::FactorOfProduction, IMPORTS_FROM_ROW));
        let mut v = Matrix::zeros(factors, sectors.clone());
        for (b, &j) in keep_t.iter().enumerate() {
            for f in 0..nva {
                v.set(f, b, va[f * nt + j]);
            }
            let imports: f64 = row_t.iter().map(|&i| t[i * nt + j]).sum();
            v.set(nva, b, imports);
        }

        let stressors: Vec<Label> = q_labels
            .iter()
            .map(|s| Label::global(Level::SatelliteAccount, s.clone()))
            .collect();
        let mut e = Matrix::zeros(stressors.clone(), sectors);
        let mut ey = Matrix::zeros(stressors, categories);
        for s in 0..nq {
            for (b, &j) in keep_t.iter().enumerate() {
                e.set(s, b, q[s * nt + j]);
            }
            for (b, &k) in keep_fd.iter().enumerate() {
                ey.set(s, b, qy[s * nfd + k]);
            }
        }

        let mut matrices = MatrixSet::new();
        matrices.insert(MatrixName::Z, z);
        matrices.insert(MatrixName::Y, y);
        matrices.insert(MatrixName::V, v);
        matrices.insert(MatrixName::E, e);
        matrices.insert(MatrixName::EY, ey);

        let units = eora_units(&matrices);
        let notes = MULTI_REGION_NOTES.iter().map(|n| n.to_string()).collect();
        Ok(Parsed::from_matrices(matrices, units).with_notes(notes))
    }
}
