//! Options for every parse entry point.
//!
//! Each struct can be built in code (all have sensible defaults) or loaded
//! from a JSON document with [`from_json`]. Enumerated options deserialize
//! through `FromStr`, so an unknown value fails with the same
//! [`Error::InvalidArgument`] message in both cases.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::loader::SheetRef;
use crate::data::model::TableKind;
use crate::error::{Error, Result};
use crate::parsers::ModelKind;

/// Load any options struct from JSON.
pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// Which base matrices a text or workbook source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// `Z, Y, EY, V, E`
    #[default]
    Flows,
    /// `z, Y, EY, v, e`
    Coefficients,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Flows, Mode::Coefficients];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Flows => "flows",
            Mode::Coefficients => "coefficients",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::invalid("mode", s, Mode::ALL.iter().map(|m| m.as_str())))
    }
}

crate::impl_string_conversions!(Mode);

/// Supported exiobase3 releases. They differ in where the final-demand
/// satellite account lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExiobaseVersion {
    #[default]
    V3_8_2,
    V3_8_1,
}

impl ExiobaseVersion {
    pub const ALL: [ExiobaseVersion; 2] = [ExiobaseVersion::V3_8_2, ExiobaseVersion::V3_8_1];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExiobaseVersion::V3_8_2 => "3.8.2",
            ExiobaseVersion::V3_8_1 => "3.8.1",
        }
    }

    /// File under `satellite/` holding final-demand extensions.
    pub fn final_demand_file(&self) -> &'static str {
        match self {
            ExiobaseVersion::V3_8_2 => "F_Y.txt",
            ExiobaseVersion::V3_8_1 => "F_hh.txt",
        }
    }
}

impl fmt::Display for ExiobaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExiobaseVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ExiobaseVersion::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| {
                Error::invalid("version", s, ExiobaseVersion::ALL.iter().map(|v| v.as_str()))
            })
    }
}

crate::impl_string_conversions!(ExiobaseVersion);

/// How eora regions are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NameConvention {
    #[default]
    FullName,
    Abbreviation,
}

impl NameConvention {
    pub const ALL: [NameConvention; 2] = [NameConvention::FullName, NameConvention::Abbreviation];

    pub fn as_str(&self) -> &'static str {
        match self {
            NameConvention::FullName => "full_name",
            NameConvention::Abbreviation => "abbreviation",
        }
    }
}

impl fmt::Display for NameConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameConvention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NameConvention::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| {
                Error::invalid(
                    "name convention",
                    s,
                    NameConvention::ALL.iter().map(|n| n.as_str()),
                )
            })
    }
}

crate::impl_string_conversions!(NameConvention);

// ---------------------------------------------------------------------------
// Shared model options
// ---------------------------------------------------------------------------

/// Options every entry point forwards to the constructed database.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Which database kind to build.
    #[serde(default)]
    pub model: ModelKind,

    #[serde(default)]
    pub name: Option<String>,

    /// Required for dynamic databases, metadata otherwise.
    #[serde(default)]
    pub year: Option<i64>,

    /// Derive the missing flow/coefficient matrices after parsing.
    #[serde(default)]
    pub calc_all: bool,
}

// ---------------------------------------------------------------------------
// Per-format options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    pub table: TableKind,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(flatten)]
    pub model: ModelOptions,
}

impl TextOptions {
    pub fn new(table: TableKind, mode: Mode) -> Self {
        TextOptions {
            table,
            mode,
            source: None,
            model: ModelOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookOptions {
    pub table: TableKind,

    #[serde(default)]
    pub mode: Mode,

    /// Sheet holding every matrix.
    #[serde(default = "default_data_sheet")]
    pub data_sheet: SheetRef,

    #[serde(default = "default_unit_sheet")]
    pub unit_sheet: SheetRef,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(flatten)]
    pub model: ModelOptions,
}

fn default_data_sheet() -> SheetRef {
    SheetRef::Index(0)
}

fn default_unit_sheet() -> SheetRef {
    SheetRef::Name("units".to_string())
}

impl WorkbookOptions {
    pub fn new(table: TableKind, mode: Mode) -> Self {
        WorkbookOptions {
            table,
            mode,
            data_sheet: default_data_sheet(),
            unit_sheet: default_unit_sheet(),
            source: None,
            model: ModelOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExiobaseSutOptions {
    #[serde(flatten)]
    pub model: ModelOptions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Exiobase3Options {
    #[serde(default)]
    pub version: ExiobaseVersion,

    #[serde(flatten)]
    pub model: ModelOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EoraOptions {
    /// Eora26 multi-region tables instead of a single-country table.
    #[serde(default)]
    pub multi_region: bool,

    /// Directory holding the Eora26 `labels_*.txt` files.
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    #[serde(default)]
    pub name_convention: NameConvention,

    /// Collapse trade partners into one import row and one export column.
    #[serde(default = "default_aggregate_trade")]
    pub aggregate_trade: bool,

    #[serde(flatten)]
    pub model: ModelOptions,
}

fn default_aggregate_trade() -> bool {
    true
}

impl Default for EoraOptions {
    fn default() -> Self {
        EoraOptions {
            multi_region: false,
            index_path: None,
            name_convention: NameConvention::default(),
            aggregate_trade: default_aggregate_trade(),
            model: ModelOptions::default(),
        }
    }
}

/// Eurostat supply/use pair. `model.year` selects the year and is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EurostatOptions {
    pub region: String,

    #[serde(default = "default_consumption_categories")]
    pub consumption_categories: Vec<String>,

    #[serde(default = "default_factors_of_production")]
    pub factors_of_production: Vec<String>,

    #[serde(default = "default_imports")]
    pub imports: Vec<String>,

    #[serde(flatten)]
    pub model: ModelOptions,
}

// Labels as they appear in Eurostat downloads, typo included.
fn default_consumption_categories() -> Vec<String> {
    [
        "Final consumption expediture",
        "Gross Capital formation",
        "Exports of goods and services",
    ]
    .map(String::from)
    .to_vec()
}

fn default_factors_of_production() -> Vec<String> {
    [
        "Compensation of employees",
        "Other taxes less other subsidies on production",
        "Consumption of fixed capital",
        "Operating surplus and mixed income, net",
        "Taxes less subsidies on products",
    ]
    .map(String::from)
    .to_vec()
}

fn default_imports() -> Vec<String> {
    vec!["Imports of goods and services".to_string()]
}

impl EurostatOptions {
    pub fn new(region: impl Into<String>, year: i64) -> Self {
        EurostatOptions {
            region: region.into(),
            consumption_categories: default_consumption_categories(),
            factors_of_production: default_factors_of_production(),
            imports: default_imports(),
            model: ModelOptions {
                year: Some(year),
                ..ModelOptions::default()
            },
        }
    }
}
