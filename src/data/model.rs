use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Level – the fixed vocabulary of index levels
// ---------------------------------------------------------------------------

/// One level of the hierarchical row/column labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Region,
    Sector,
    Activity,
    Commodity,
    ConsumptionCategory,
    FactorOfProduction,
    SatelliteAccount,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Region,
        Level::Sector,
        Level::Activity,
        Level::Commodity,
        Level::ConsumptionCategory,
        Level::FactorOfProduction,
        Level::SatelliteAccount,
    ];

    /// Human-readable name, as written in source files.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Region => "Region",
            Level::Sector => "Sector",
            Level::Activity => "Activity",
            Level::Commodity => "Commodity",
            Level::ConsumptionCategory => "Consumption category",
            Level::FactorOfProduction => "Factor of production",
            Level::SatelliteAccount => "Satellite account",
        }
    }

    /// Whether labels of this level carry a region.
    pub fn is_regional(&self) -> bool {
        matches!(
            self,
            Level::Sector | Level::Activity | Level::Commodity | Level::ConsumptionCategory
        )
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Level::ALL
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid("level", s, Level::ALL.iter().map(|l| l.name())))
    }
}

// ---------------------------------------------------------------------------
// TableKind – IOT or SUT
// ---------------------------------------------------------------------------

/// Table type of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TableKind {
    Iot,
    Sut,
}

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::Iot, TableKind::Sut];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Iot => "IOT",
            TableKind::Sut => "SUT",
        }
    }

    /// Levels that make up the square intermediate block.
    pub fn production_levels(&self) -> &'static [Level] {
        match self {
            TableKind::Iot => &[Level::Sector],
            TableKind::Sut => &[Level::Activity, Level::Commodity],
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IOT" => Ok(TableKind::Iot),
            "SUT" => Ok(TableKind::Sut),
            other => Err(Error::invalid(
                "table",
                other,
                TableKind::ALL.iter().map(|t| t.as_str()),
            )),
        }
    }
}

crate::impl_string_conversions!(TableKind);

// ---------------------------------------------------------------------------
// Label – one hierarchical row/column label
// ---------------------------------------------------------------------------

/// A `(region, level, item)` label. Factor and satellite labels carry no region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub region: Option<String>,
    pub level: Level,
    pub item: String,
}

impl Label {
    pub fn regional(region: impl Into<String>, level: Level, item: impl Into<String>) -> Self {
        Label {
            region: Some(region.into()),
            level,
            item: item.into(),
        }
    }

    pub fn global(level: Level, item: impl Into<String>) -> Self {
        Label {
            region: None,
            level,
            item: item.into(),
        }
    }

    /// The single column label of the production vector `X`. Readers never
    /// produce it because region is not a row or column level.
    pub fn production() -> Self {
        Label::global(Level::Region, "production")
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(r) => write!(f, "{r} / {} / {}", self.level, self.item),
            None => write!(f, "{} / {}", self.level, self.item),
        }
    }
}

// ---------------------------------------------------------------------------
// MatrixName – the fixed matrix vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatrixName {
    /// Intermediate flows.
    Z,
    /// Technical coefficients.
    LowerZ,
    /// Final demand.
    Y,
    /// Value-added (factor of production) flows.
    V,
    LowerV,
    /// Satellite extension flows.
    E,
    LowerE,
    /// Final-demand satellite extensions.
    EY,
    /// Production, one column.
    X,
}

impl MatrixName {
    pub const ALL: [MatrixName; 9] = [
        MatrixName::Z,
        MatrixName::LowerZ,
        MatrixName::Y,
        MatrixName::V,
        MatrixName::LowerV,
        MatrixName::E,
        MatrixName::LowerE,
        MatrixName::EY,
        MatrixName::X,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixName::Z => "Z",
            MatrixName::LowerZ => "z",
            MatrixName::Y => "Y",
            MatrixName::V => "V",
            MatrixName::LowerV => "v",
            MatrixName::E => "E",
            MatrixName::LowerE => "e",
            MatrixName::EY => "EY",
            MatrixName::X => "X",
        }
    }

    /// Whether the column labels come from the index set. `X` has a single
    /// unlabelled column.
    pub fn has_indexed_columns(&self) -> bool {
        *self != MatrixName::X
    }
}

impl fmt::Display for MatrixName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatrixName {
    type Err = Error;

    /// Case-sensitive: `Z` and `z` are different matrices.
    fn from_str(s: &str) -> Result<Self> {
        MatrixName::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                Error::invalid("matrix", s, MatrixName::ALL.iter().map(|m| m.as_str()))
            })
    }
}

// ---------------------------------------------------------------------------
// Matrix – labelled dense table
// ---------------------------------------------------------------------------

/// Dense row-major matrix with hierarchical labels on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: Vec<Label>,
    pub cols: Vec<Label>,
    /// Row-major values, `rows.len() * cols.len()` long.
    pub data: Vec<f64>,
}

impl Matrix {
    /// Build a matrix, rejecting shapes that don't match the labels.
    pub fn new(rows: Vec<Label>, cols: Vec<Label>, data: Vec<f64>) -> Result<Self> {
        let m = Matrix { rows, cols, data };
        m.validate()?;
        Ok(m)
    }

    pub fn zeros(rows: Vec<Label>, cols: Vec<Label>) -> Self {
        let data = vec![0.0; rows.len() * cols.len()];
        Matrix { rows, cols, data }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    /// Check the data length and label uniqueness along both axes.
    pub fn validate(&self) -> Result<()> {
        let (r, c) = self.shape();
        if self.data.len() != r * c {
            return Err(Error::Validation(format!(
                "matrix has {} values but {r}x{c} labels",
                self.data.len()
            )));
        }
        for (axis, labels) in [("row", &self.rows), ("column", &self.cols)] {
            let mut seen = std::collections::HashSet::with_capacity(labels.len());
            for label in labels {
                if !seen.insert(label) {
                    return Err(Error::Validation(format!("duplicate {axis} label '{label}'")));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols.len() + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let n = self.cols.len();
        self.data[row * n + col] = value;
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        let n = self.cols.len();
        self.data[row * n + col] += value;
    }

    pub fn row_position(&self, label: &Label) -> Option<usize> {
        self.rows.iter().position(|l| l == label)
    }

    pub fn col_position(&self, label: &Label) -> Option<usize> {
        self.cols.iter().position(|l| l == label)
    }

    /// Value addressed by labels.
    pub fn value(&self, row: &Label, col: &Label) -> Option<f64> {
        Some(self.get(self.row_position(row)?, self.col_position(col)?))
    }

    pub fn row_sums(&self) -> Vec<f64> {
        let n = self.cols.len();
        if n == 0 {
            return vec![0.0; self.rows.len()];
        }
        self.data.chunks(n).map(|row| row.iter().sum()).collect()
    }

    /// Sub-matrix from row and column positions.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for &i in rows {
            for &j in cols {
                data.push(self.get(i, j));
            }
        }
        Matrix {
            rows: rows.iter().map(|&i| self.rows[i].clone()).collect(),
            cols: cols.iter().map(|&j| self.cols[j].clone()).collect(),
            data,
        }
    }

    pub fn transpose(&self) -> Matrix {
        let (r, c) = self.shape();
        let mut data = Vec::with_capacity(r * c);
        for j in 0..c {
            for i in 0..r {
                data.push(self.get(i, j));
            }
        }
        Matrix {
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// MatrixSet – all matrices of one scenario
// ---------------------------------------------------------------------------

/// Named matrices describing one scenario or year.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixSet {
    matrices: BTreeMap<MatrixName, Matrix>,
}

impl MatrixSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: MatrixName, matrix: Matrix) -> Option<Matrix> {
        self.matrices.insert(name, matrix)
    }

    pub fn get(&self, name: MatrixName) -> Option<&Matrix> {
        self.matrices.get(&name)
    }

    pub fn get_mut(&mut self, name: MatrixName) -> Option<&mut Matrix> {
        self.matrices.get_mut(&name)
    }

    pub fn remove(&mut self, name: MatrixName) -> Option<Matrix> {
        self.matrices.remove(&name)
    }

    pub fn contains(&self, name: MatrixName) -> bool {
        self.matrices.contains_key(&name)
    }

    pub fn names(&self) -> Vec<MatrixName> {
        self.matrices.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MatrixName, &Matrix)> {
        self.matrices.iter()
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Every entry must be a well-formed matrix.
    pub fn validate(&self) -> Result<()> {
        for (name, m) in &self.matrices {
            m.validate()
                .map_err(|e| Error::Validation(format!("matrix '{name}': {e}")))?;
        }
        Ok(())
    }
}

impl FromIterator<(MatrixName, Matrix)> for MatrixSet {
    fn from_iter<T: IntoIterator<Item = (MatrixName, Matrix)>>(iter: T) -> Self {
        MatrixSet {
            matrices: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// IndexSet – the labels shared by every matrix of a database
// ---------------------------------------------------------------------------

/// Ordered item lists per level. Regions live under [`Level::Region`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexSet {
    levels: BTreeMap<Level, Vec<String>>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item unless already present.
    pub fn push(&mut self, level: Level, item: &str) {
        let items = self.levels.entry(level).or_default();
        if !items.iter().any(|i| i == item) {
            items.push(item.to_string());
        }
    }

    pub fn push_label(&mut self, label: &Label) {
        if let Some(region) = &label.region {
            self.push(Level::Region, region);
        }
        self.push(label.level, &label.item);
    }

    /// Collect every label used by the matrices, in order of appearance.
    pub fn from_matrices(matrices: &MatrixSet) -> Self {
        let mut index = IndexSet::new();
        for (name, m) in matrices.iter() {
            for label in indexed_labels(*name, m) {
                index.push_label(label);
            }
        }
        index
    }

    pub fn items(&self, level: Level) -> &[String] {
        self.levels.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn regions(&self) -> &[String] {
        self.items(Level::Region)
    }

    /// Levels that hold at least one item.
    pub fn levels(&self) -> Vec<Level> {
        self.levels
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(l, _)| *l)
            .collect()
    }

    pub fn contains_label(&self, label: &Label) -> bool {
        let region_ok = match &label.region {
            Some(r) => self.items(Level::Region).contains(r),
            None => true,
        };
        region_ok && self.items(label.level).contains(&label.item)
    }

    /// Every label of every matrix must be known to this index set.
    pub fn check_alignment(&self, matrices: &MatrixSet) -> Result<()> {
        for (name, m) in matrices.iter() {
            if let Some(label) = indexed_labels(*name, m).find(|l| !self.contains_label(l)) {
                return Err(Error::Validation(format!(
                    "matrix '{name}' uses label '{label}' missing from the index set"
                )));
            }
        }
        Ok(())
    }
}

fn indexed_labels(name: MatrixName, m: &Matrix) -> impl Iterator<Item = &Label> {
    let cols: &[Label] = if name.has_indexed_columns() { &m.cols } else { &[] };
    m.rows.iter().chain(cols.iter())
}

// ---------------------------------------------------------------------------
// UnitTable
// ---------------------------------------------------------------------------

/// Unit string per `(level, item)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitTable {
    units: IndexMap<(Level, String), String>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, level: Level, item: impl Into<String>, unit: impl Into<String>) {
        self.units.insert((level, item.into()), unit.into());
    }

    pub fn get(&self, level: Level, item: &str) -> Option<&str> {
        self.units
            .get(&(level, item.to_string()))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Level, String), &String)> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Items of `index` that need a unit but have none. Regions and
    /// consumption categories are unitless.
    pub fn missing(&self, index: &IndexSet) -> Vec<(Level, String)> {
        index
            .levels()
            .into_iter()
            .filter(|l| !matches!(l, Level::Region | Level::ConsumptionCategory))
            .flat_map(|l| index.items(l).iter().map(move |i| (l, i.clone())))
            .filter(|(l, i)| self.get(*l, i).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(r: &str, s: &str) -> Label {
        Label::regional(r, Level::Sector, s)
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("consumption category".parse::<Level>().unwrap(), Level::ConsumptionCategory);
        assert_eq!("Satellite account".parse::<Level>().unwrap(), Level::SatelliteAccount);
        assert!(matches!("Industry".parse::<Level>(), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn matrix_name_is_case_sensitive() {
        assert_eq!("Z".parse::<MatrixName>().unwrap(), MatrixName::Z);
        assert_eq!("z".parse::<MatrixName>().unwrap(), MatrixName::LowerZ);
        assert!("ey".parse::<MatrixName>().is_err());
        assert_eq!("X".parse::<MatrixName>().unwrap(), MatrixName::X);
        assert!("x".parse::<MatrixName>().is_err());
    }

    #[test]
    fn matrix_rejects_bad_shape_and_duplicates() {
        let rows = vec![sector("IT", "Agriculture")];
        let cols = vec![sector("IT", "Agriculture"), sector("IT", "Services")];
        assert!(Matrix::new(rows.clone(), cols.clone(), vec![1.0]).is_err());
        assert!(Matrix::new(rows.clone(), cols, vec![1.0, 2.0]).is_ok());

        let dup = vec![sector("IT", "Agriculture"), sector("IT", "Agriculture")];
        assert!(Matrix::new(rows, dup, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn select_and_transpose() {
        let labels = vec![sector("IT", "A"), sector("IT", "B")];
        let m = Matrix::new(labels.clone(), labels.clone(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        let t = m.transpose();
        assert_eq!(t.get(0, 1), 3.0);
        assert_eq!(t.get(1, 0), 2.0);

        let sub = m.select(&[1], &[0, 1]);
        assert_eq!(sub.data, vec![3.0, 4.0]);
        assert_eq!(sub.rows, vec![sector("IT", "B")]);
        assert_eq!(m.row_sums(), vec![3.0, 7.0]);
        assert_eq!(m.value(&labels[0], &labels[1]), Some(2.0));
    }

    #[test]
    fn index_set_alignment() {
        let labels = vec![sector("IT", "A"), sector("FR", "A")];
        let mut set = MatrixSet::new();
        set.insert(MatrixName::Z, Matrix::zeros(labels.clone(), labels));

        let index = IndexSet::from_matrices(&set);
        assert_eq!(index.regions(), ["IT".to_string(), "FR".to_string()]);
        assert_eq!(index.items(Level::Sector), ["A".to_string()]);
        assert!(index.check_alignment(&set).is_ok());

        let mut other = MatrixSet::new();
        let stray = vec![sector("DE", "A")];
        other.insert(MatrixName::Y, Matrix::zeros(stray.clone(), stray));
        assert!(matches!(index.check_alignment(&other), Err(Error::Validation(_))));
    }

    #[test]
    fn production_column_is_not_indexed() {
        let labels = vec![sector("IT", "A"), sector("FR", "A")];
        let mut set = MatrixSet::new();
        set.insert(MatrixName::Z, Matrix::zeros(labels.clone(), labels.clone()));
        set.insert(MatrixName::X, Matrix::zeros(labels, vec![Label::production()]));

        let index = IndexSet::from_matrices(&set);
        assert!(index.items(Level::Region).iter().all(|r| r != "production"));
        assert!(index.check_alignment(&set).is_ok());
    }

    #[test]
    fn unit_table_reports_missing_items() {
        let mut index = IndexSet::new();
        index.push_label(&sector("IT", "A"));
        index.push(Level::FactorOfProduction, "Wages");

        let mut units = UnitTable::new();
        units.insert(Level::Sector, "A", "EUR");
        assert_eq!(units.get(Level::Sector, "A"), Some("EUR"));
        assert_eq!(
            units.missing(&index),
            vec![(Level::FactorOfProduction, "Wages".to_string())]
        );
    }
}
