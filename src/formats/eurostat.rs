use anyhow::{bail, Context};

use super::{FormatReader, Parsed};
use crate::data::loader::{parse_number, Grid, Workbook};
use crate::data::model::{Label, Level, Matrix, MatrixName, MatrixSet, TableKind, UnitTable};
use crate::error::{Error, Result};

const MONETARY_UNIT: &str = "Million EUR";

/// Placeholder extension: Eurostat tables carry no satellite accounts.
pub const NO_EXTENSION: &str = "None";

/// One Eurostat sheet: a `key, value` preamble, a blank row, then a grid
/// whose first row holds the column labels.
#[derive(Debug, Clone, PartialEq)]
struct EurostatSheet {
    preamble: Vec<(String, String)>,
    columns: Vec<String>,
    rows: Vec<String>,
    values: Vec<f64>,
}

impl EurostatSheet {
    fn parse(grid: &Grid) -> anyhow::Result<Self> {
        let mut lines = grid.iter().enumerate();

        let mut preamble = Vec::new();
        for (_, row) in lines.by_ref() {
            if row.iter().all(|c| c.is_empty()) {
                break;
            }
            let key = row.first().cloned().unwrap_or_default();
            let value = row.get(1).cloned().unwrap_or_default();
            preamble.push((key, value));
        }

        let (_, header) = lines
            .by_ref()
            .find(|(_, r)| r.iter().any(|c| !c.is_empty()))
            .context("sheet has no data grid after the preamble")?;
        let columns: Vec<String> = header.iter().skip(1).cloned().collect();

        let mut rows = Vec::new();
        let mut values = Vec::new();
        for (row_no, row) in lines {
            let Some(label) = row.first().filter(|l| !l.is_empty()) else {
                continue;
            };
            rows.push(label.clone());
            for j in 0..columns.len() {
                let cell = row.get(j + 1).map(String::as_str).unwrap_or("");
                // ':' marks a value Eurostat does not publish.
                let cell = if cell == ":" { "" } else { cell };
                let value = parse_number(cell)
                    .with_context(|| format!("row {row_no}, column '{}'", columns[j]))?;
                values.push(value);
            }
        }

        Ok(EurostatSheet {
            preamble,
            columns,
            rows,
            values,
        })
    }

    fn meta(&self, key: &str) -> Option<&str> {
        self.preamble
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn row(&self, label: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == label)
    }

    fn col(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.columns.len() + col]
    }
}

/// Supply/use workbook pair for one region and year.
///
/// Supply is activity × commodity plus import rows; use is
/// commodity × activity plus factor rows and consumption columns.
pub struct EurostatReader<'a, W: Workbook> {
    pub supply: &'a W,
    pub usage: &'a W,
    pub region: String,
    pub year: Option<i64>,
    pub consumption_categories: Vec<String>,
    pub factors_of_production: Vec<String>,
    pub imports: Vec<String>,
}

impl<W: Workbook> EurostatReader<'_, W> {
    /// The sheet whose preamble matches region and year.
    fn find_sheet(&self, workbook: &W, which: &str, year: i64) -> anyhow::Result<EurostatSheet> {
        let mut seen = Vec::new();
        for name in workbook.sheet_names() {
            let grid = workbook.read_sheet(&name)?;
            let sheet = EurostatSheet::parse(&grid)
                .with_context(|| format!("{which} sheet '{name}'"))?;
            let geo = sheet.meta("GEO").unwrap_or("").to_string();
            let time = sheet.meta("TIME").unwrap_or("").to_string();
            if geo == self.region && time.parse::<i64>().ok() == Some(year) {
                log::debug!("using {which} sheet '{name}' for {geo} {time}");
                return Ok(sheet);
            }
            seen.push(format!("{geo}/{time}"));
        }
        bail!(
            "{which} workbook has no sheet for GEO={}, TIME={year}; found {seen:?}",
            self.region
        )
    }
}

impl<W: Workbook> FormatReader for EurostatReader<'_, W> {
    fn format(&self) -> &'static str {
        "eurostat"
    }

    fn table(&self) -> TableKind {
        TableKind::Sut
    }

    fn validate(&self) -> Result<()> {
        if self.year.is_none() {
            return Err(Error::MissingArgument("Eurostat tables need a year".into()));
        }
        if self.region.trim().is_empty() {
            return Err(Error::MissingArgument("Eurostat tables need a region".into()));
        }
        Ok(())
    }

    fn read_source(&self) -> anyhow::Result<Parsed> {
        let year = self.year.context("year is required")?;
        let supply = self.find_sheet(self.supply, "supply", year)?;
        let usage = self.find_sheet(self.usage, "use", year)?;

        for label in &self.imports {
            if supply.row(label).is_none() {
                bail!("import row '{label}' not found in the supply table");
            }
        }
        for label in &self.factors_of_production {
            if usage.row(label).is_none() {
                bail!("factor of production '{label}' not found in the use table");
            }
        }
        for label in &self.consumption_categories {
            if usage.col(label).is_none() {
                bail!("consumption category '{label}' not found in the use table");
            }
        }

        let activities: Vec<&String> = supply
            .rows
            .iter()
            .filter(|r| !self.imports.contains(r))
            .collect();
        let commodities: Vec<&String> = supply.columns.iter().collect();
        for a in &activities {
            if usage.col(a).is_none() {
                bail!("activity '{a}' of the supply table is missing from the use table columns");
            }
        }
        for c in &commodities {
            if usage.row(c).is_none() {
                bail!("commodity '{c}' of the supply table is missing from the use table rows");
            }
        }
        for r in &usage.rows {
            if !commodities.contains(&r) && !self.factors_of_production.contains(r) {
                log::warn!("skipping use table row '{r}'");
            }
        }
        for c in &usage.columns {
            if !activities.contains(&c) && !self.consumption_categories.contains(c) {
                log::warn!("skipping use table column '{c}'");
            }
        }

        let region = self.region.as_str();
        let production: Vec<Label> = activities
            .iter()
            .map(|a| Label::regional(region, Level::Activity, a.as_str()))
            .chain(
                commodities
                    .iter()
                    .map(|c| Label::regional(region, Level::Commodity, c.as_str())),
            )
            .collect();
        let na = activities.len();

        let mut z = Matrix::zeros(production.clone(), production.clone());
        for (i, a) in activities.iter().enumerate() {
            let sr = supply.row(a).context("activity row")?;
            for (j, c) in commodities.iter().enumerate() {
                let sc = supply.col(c).context("commodity column")?;
                z.set(i, na + j, supply.get(sr, sc));
                let ur = usage.row(c).context("commodity row")?;
                let uc = usage.col(a).context("activity column")?;
                z.set(na + j, i, usage.get(ur, uc));
            }
        }

        let categories: Vec<Label> = self
            .consumption_categories
            .iter()
            .map(|c| Label::regional(region, Level::ConsumptionCategory, c.as_str()))
            .collect();
        let mut y = Matrix::zeros(production.clone(), categories.clone());
        for (j, c) in commodities.iter().enumerate() {
            let ur = usage.row(c).context("commodity row")?;
            for (k, cat) in self.consumption_categories.iter().enumerate() {
                let uc = usage.col(cat).context("category column")?;
                y.set(na + j, k, usage.get(ur, uc));
            }
        }

        let factors: Vec<Label> = self
            .factors_of_production
            .iter()
            .chain(self.imports.iter())
            .map(|f| Label::global(Level::FactorOfProduction, f.as_str()))
            .collect();
        let mut v = Matrix::zeros(factors, production.clone());
        for (f, name) in self.factors_of_production.iter().enumerate() {
            let ur = usage.row(name).context("factor row")?;
            for (i, a) in activities.iter().enumerate() {
                v.set(f, i, usage.get(ur, usage.col(a).context("activity column")?));
            }
        }
        let nf = self.factors_of_production.len();
        for (m, name) in self.imports.iter().enumerate() {
            let sr = supply.row(name).context("import row")?;
            for (j, c) in commodities.iter().enumerate() {
                v.set(nf + m, na + j, supply.get(sr, supply.col(c).context("commodity column")?));
            }
        }

        let none = vec![Label::global(Level::SatelliteAccount, NO_EXTENSION)];
        let e = Matrix::zeros(none.clone(), production.clone());
        let ey = Matrix::zeros(none, categories);

        let mut matrices = MatrixSet::new();
        matrices.insert(MatrixName::Z, z);
        matrices.insert(MatrixName::Y, y);
        matrices.insert(MatrixName::V, v);
        matrices.insert(MatrixName::E, e);
        matrices.insert(MatrixName::EY, ey);

        let mut units = UnitTable::new();
        let factors = matrices
            .get(MatrixName::V)
            .into_iter()
            .flat_map(|m| m.rows.iter());
        for label in factors.chain(production.iter()) {
            units.insert(label.level, label.item.clone(), MONETARY_UNIT);
        }
        units.insert(Level::SatelliteAccount, NO_EXTENSION, NO_EXTENSION);

        Ok(Parsed::from_matrices(matrices, units))
    }
}
