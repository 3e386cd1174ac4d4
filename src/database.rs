use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::algebra;
use crate::data::model::{IndexSet, Matrix, MatrixName, MatrixSet, TableKind, UnitTable};
use crate::data::store::{ScenarioKey, ScenarioMatrixStore};
use crate::error::{Error, Result};
use crate::parsers::ModelKind;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Descriptive fields plus a running history of what happened to the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: Option<String>,
    pub source: Option<String>,
    pub table: TableKind,
    pub year: Option<i64>,
    #[serde(default)]
    pub price: Option<String>,
    /// Corrections applied while parsing.
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub history: Vec<String>,
}

impl Metadata {
    pub fn new(table: TableKind) -> Self {
        Metadata {
            name: None,
            source: None,
            table,
            year: None,
            price: None,
            notes: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// A parsed input-output database: one scenario store, its shared index
/// set and unit table, and metadata.
#[derive(Debug, Clone)]
pub struct Database {
    kind: ModelKind,
    matrices: ScenarioMatrixStore,
    indices: IndexSet,
    units: UnitTable,
    meta: Metadata,
}

impl Database {
    /// Assemble a database. Every scenario must align with `indices`.
    pub fn new(
        kind: ModelKind,
        matrices: ScenarioMatrixStore,
        indices: IndexSet,
        units: UnitTable,
        meta: Metadata,
    ) -> Result<Self> {
        if kind.is_dynamic() != matrices.is_dynamic() {
            return Err(Error::Configuration(format!(
                "a {kind} database needs a {} store",
                if kind.is_dynamic() { "dynamic" } else { "static" }
            )));
        }
        for (key, set) in matrices.iter() {
            indices
                .check_alignment(set)
                .map_err(|e| Error::Validation(format!("scenario '{key}': {e}")))?;
        }
        let missing = units.missing(&indices);
        if !missing.is_empty() {
            log::warn!("{} items have no unit, e.g. {:?}", missing.len(), missing[0]);
        }

        let mut db = Database {
            kind,
            matrices,
            indices,
            units,
            meta,
        };
        let entry = format!(
            "{} database created from {} ({} table)",
            db.kind,
            db.meta.source.as_deref().unwrap_or("unknown source"),
            db.meta.table
        );
        db.record(entry);
        Ok(db)
    }

    fn record(&mut self, entry: String) {
        log::info!("{}: {entry}", self.meta.name.as_deref().unwrap_or("database"));
        self.meta.history.push(entry);
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn table(&self) -> TableKind {
        self.meta.table
    }

    pub fn indices(&self) -> &IndexSet {
        &self.indices
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    pub fn store(&self) -> &ScenarioMatrixStore {
        &self.matrices
    }

    pub fn scenarios(&self) -> Vec<ScenarioKey> {
        self.matrices.keys().cloned().collect()
    }

    pub fn contains(&self, key: impl Into<ScenarioKey>) -> bool {
        self.matrices.contains(key)
    }

    pub fn matrices(&self, key: impl Into<ScenarioKey>) -> Result<&MatrixSet> {
        self.matrices.get(key)
    }

    pub fn matrix(&self, key: impl Into<ScenarioKey>, name: MatrixName) -> Result<&Matrix> {
        let key = key.into();
        self.matrices
            .get(&key)?
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("matrix '{name}' in scenario '{key}'")))
    }

    /// Add or replace a scenario after checking it against the index set.
    pub fn set_scenario(&mut self, key: impl Into<ScenarioKey>, set: MatrixSet) -> Result<()> {
        let key = key.into();
        self.indices.check_alignment(&set)?;
        self.matrices.insert(key.clone(), set)?;
        self.record(format!("scenario '{key}' set"));
        Ok(())
    }

    /// Copy one scenario to a new key.
    pub fn clone_scenario(
        &mut self,
        from: impl Into<ScenarioKey>,
        to: impl Into<ScenarioKey>,
    ) -> Result<()> {
        let from = from.into();
        let to = to.into();
        let set = self.matrices.get(&from)?.clone();
        self.matrices.insert(to.clone(), set)?;
        self.record(format!("scenario '{from}' cloned into '{to}'"));
        Ok(())
    }

    pub fn remove_scenario(&mut self, key: impl Into<ScenarioKey>) -> Result<()> {
        let key = key.into();
        self.matrices.remove(&key)?;
        self.record(format!("scenario '{key}' removed"));
        Ok(())
    }

    /// Derive the missing flow or coefficient matrices of one scenario.
    pub fn calc_all(&mut self, key: impl Into<ScenarioKey>) -> Result<()> {
        let key = key.into();
        let set = self.matrices.get_mut(&key)?;
        let before = set.names();
        algebra::calc_all(set)?;
        let added: Vec<String> = set
            .names()
            .into_iter()
            .filter(|n| !before.contains(n))
            .map(|n| n.to_string())
            .collect();
        self.record(format!("scenario '{key}': calculated {added:?}"));
        Ok(())
    }

    /// Whether `other` describes the same logical database: same table
    /// type, index set and units. Scenario contents may differ.
    pub fn is_same_database(&self, other: &Database) -> bool {
        self.meta.table == other.meta.table
            && self.indices == other.indices
            && self.units == other.units
    }

    /// Copy scenarios of `source` into this dynamic database.
    ///
    /// `mapper` goes from a key of `source` to a target year. Every check
    /// runs before anything is written. Later entries targeting the same
    /// year win.
    pub fn upload_data(
        &mut self,
        mapper: &IndexMap<ScenarioKey, ScenarioKey>,
        source: &Database,
    ) -> Result<()> {
        if !self.kind.is_dynamic() {
            return Err(Error::Validation(
                "upload_data needs a dynamic database as receiver".into(),
            ));
        }
        if !self.is_same_database(source) {
            return Err(Error::Validation(
                "not equal: the source database has a different table, index set or units".into(),
            ));
        }
        let slices = Self::collect_slices(mapper, &source.matrices)?;
        self.write_slices(slices)
    }

    /// [`upload_data`](Self::upload_data) with this database as its own source.
    pub fn remap_years(&mut self, mapper: &IndexMap<ScenarioKey, ScenarioKey>) -> Result<()> {
        if !self.kind.is_dynamic() {
            return Err(Error::Validation(
                "remap_years needs a dynamic database".into(),
            ));
        }
        let slices = Self::collect_slices(mapper, &self.matrices)?;
        self.write_slices(slices)
    }

    fn collect_slices(
        mapper: &IndexMap<ScenarioKey, ScenarioKey>,
        source: &ScenarioMatrixStore,
    ) -> Result<Vec<(ScenarioKey, i64, MatrixSet)>> {
        if let Some(bad) = mapper.keys().find(|k| !source.contains(*k)) {
            return Err(Error::Validation(format!("non valid key '{bad}'")));
        }
        if let Some(bad) = mapper.values().find(|v| v.as_year().is_none()) {
            return Err(Error::Validation(format!(
                "values of the mapper should be integer years, got '{bad}'"
            )));
        }
        mapper
            .iter()
            .map(|(from, to)| {
                let year = to
                    .as_year()
                    .ok_or_else(|| Error::Validation(format!("'{to}' is not a year")))?;
                Ok((from.clone(), year, source.get(from)?.clone()))
            })
            .collect()
    }

    fn write_slices(&mut self, slices: Vec<(ScenarioKey, i64, MatrixSet)>) -> Result<()> {
        for (from, year, set) in slices {
            self.matrices.insert(year, set)?;
            self.record(format!("scenario '{from}' uploaded into year {year}"));
        }
        Ok(())
    }
}
