use std::fmt;

use indexmap::IndexMap;

use super::model::MatrixSet;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ScenarioKey
// ---------------------------------------------------------------------------

/// Key of one scenario: a year for dynamic databases, any name otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioKey {
    Year(i64),
    Name(String),
}

/// Outcome of [`ScenarioKey::coerce_year`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCoercion {
    /// A numeral-like name was turned into a year.
    Converted(i64),
    /// Nothing to convert, or the name is not a numeral.
    Retained(ScenarioKey),
}

impl KeyCoercion {
    pub fn into_key(self) -> ScenarioKey {
        match self {
            KeyCoercion::Converted(y) => ScenarioKey::Year(y),
            KeyCoercion::Retained(k) => k,
        }
    }
}

impl ScenarioKey {
    /// The symbolic alias every store resolves to its configured baseline.
    pub const BASELINE: &'static str = "baseline";

    pub fn baseline() -> Self {
        ScenarioKey::Name(Self::BASELINE.to_string())
    }

    pub fn is_baseline_alias(&self) -> bool {
        matches!(self, ScenarioKey::Name(n) if n == Self::BASELINE)
    }

    pub fn as_year(&self) -> Option<i64> {
        match self {
            ScenarioKey::Year(y) => Some(*y),
            ScenarioKey::Name(_) => None,
        }
    }

    /// Parse-or-retain: `"2020"` becomes year 2020, anything else is kept.
    pub fn coerce_year(self) -> KeyCoercion {
        match self {
            ScenarioKey::Name(name) => match name.trim().parse::<i64>() {
                Ok(year) => KeyCoercion::Converted(year),
                Err(_) => KeyCoercion::Retained(ScenarioKey::Name(name)),
            },
            year => KeyCoercion::Retained(year),
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKey::Year(y) => write!(f, "{y}"),
            ScenarioKey::Name(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for ScenarioKey {
    fn from(y: i64) -> Self {
        ScenarioKey::Year(y)
    }
}

impl From<i32> for ScenarioKey {
    fn from(y: i32) -> Self {
        ScenarioKey::Year(y.into())
    }
}

impl From<&str> for ScenarioKey {
    fn from(s: &str) -> Self {
        ScenarioKey::Name(s.to_string())
    }
}

impl From<String> for ScenarioKey {
    fn from(s: String) -> Self {
        ScenarioKey::Name(s)
    }
}

impl From<&ScenarioKey> for ScenarioKey {
    fn from(k: &ScenarioKey) -> Self {
        k.clone()
    }
}

// ---------------------------------------------------------------------------
// ScenarioMatrixStore
// ---------------------------------------------------------------------------

/// Ordered scenario → [`MatrixSet`] mapping with baseline aliasing.
///
/// In dynamic mode every key is a year. Writes with any other key are
/// rejected; reads try to turn numeral names into years first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioMatrixStore {
    baseline: ScenarioKey,
    dynamic: bool,
    entries: IndexMap<ScenarioKey, MatrixSet>,
}

impl ScenarioMatrixStore {
    /// Empty store.
    pub fn new(baseline: Option<ScenarioKey>, dynamic: bool) -> Result<Self> {
        let baseline = match (baseline, dynamic) {
            (None, true) => {
                return Err(Error::Configuration(
                    "a dynamic store requires an explicit baseline year".into(),
                ))
            }
            (None, false) => {
                return Err(Error::Configuration(
                    "a static store requires a baseline name".into(),
                ))
            }
            (Some(key), true) if key.as_year().is_none() => {
                return Err(Error::Configuration(format!(
                    "the baseline of a dynamic store must be an integer year, got '{key}'"
                )))
            }
            (Some(key), _) => key,
        };

        Ok(ScenarioMatrixStore {
            baseline,
            dynamic,
            entries: IndexMap::new(),
        })
    }

    /// Store pre-filled with `entries`, each validated like [`insert`](Self::insert).
    pub fn with_entries<I>(baseline: Option<ScenarioKey>, dynamic: bool, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ScenarioKey, MatrixSet)>,
    {
        let mut store = Self::new(baseline, dynamic)?;
        for (key, set) in entries {
            store.insert(key, set)?;
        }
        Ok(store)
    }

    pub fn baseline_key(&self) -> &ScenarioKey {
        &self.baseline
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn resolve_alias(&self, key: ScenarioKey) -> ScenarioKey {
        if key.is_baseline_alias() {
            self.baseline.clone()
        } else {
            key
        }
    }

    /// Key a read would actually look up.
    pub fn resolve_read(&self, key: impl Into<ScenarioKey>) -> ScenarioKey {
        let key = self.resolve_alias(key.into());
        if self.dynamic {
            key.coerce_year().into_key()
        } else {
            key
        }
    }

    /// Insert or overwrite a scenario. Nothing changes on error.
    pub fn insert(&mut self, key: impl Into<ScenarioKey>, set: MatrixSet) -> Result<()> {
        let key = self.resolve_alias(key.into());
        if self.dynamic && key.as_year().is_none() {
            return Err(Error::Validation(format!(
                "a dynamic store only accepts integer keys, got '{key}'"
            )));
        }
        set.validate()?;
        log::debug!("storing scenario '{key}' with {} matrices", set.len());
        self.entries.insert(key, set);
        Ok(())
    }

    pub fn get(&self, key: impl Into<ScenarioKey>) -> Result<&MatrixSet> {
        let key = self.resolve_read(key);
        self.entries
            .get(&key)
            .ok_or_else(|| Error::NotFound(format!("scenario '{key}'")))
    }

    pub fn get_mut(&mut self, key: impl Into<ScenarioKey>) -> Result<&mut MatrixSet> {
        let key = self.resolve_read(key);
        self.entries
            .get_mut(&key)
            .ok_or_else(|| Error::NotFound(format!("scenario '{key}'")))
    }

    pub fn contains(&self, key: impl Into<ScenarioKey>) -> bool {
        self.entries.contains_key(&self.resolve_read(key))
    }

    /// Remove a non-baseline scenario, keeping the order of the rest.
    pub fn remove(&mut self, key: impl Into<ScenarioKey>) -> Result<MatrixSet> {
        let key = self.resolve_read(key);
        if key == self.baseline {
            return Err(Error::Validation("the baseline scenario cannot be removed".into()));
        }
        self.entries
            .shift_remove(&key)
            .ok_or_else(|| Error::NotFound(format!("scenario '{key}'")))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScenarioKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioKey, &MatrixSet)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
