//! Parse entry points: pick a reader, run it, wrap the result in a store
//! and build the [`Database`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{
    EoraOptions, EurostatOptions, Exiobase3Options, ExiobaseSutOptions, ModelOptions, TextOptions,
    WorkbookOptions,
};
use crate::data::loader::{CsvWorkbook, Workbook};
use crate::data::store::{ScenarioKey, ScenarioMatrixStore};
use crate::database::{Database, Metadata};
use crate::error::{Error, Result};
use crate::formats::{
    EoraMultiReader, EoraSingleReader, EurostatReader, Exiobase3Reader, ExiobaseSutReader,
    FormatReader, TextReader, WorkbookReader,
};

pub const EXIOBASE_SUT_SOURCE: &str =
    "Exiobase Monetary Multi Regional Supply and Use Table (https://www.exiobase.eu/)";
pub const EXIOBASE3_SOURCE: &str = "Exiobase3";
pub const EORA_SOURCE: &str = "Eora website @ https://www.worldmrio.com/";
pub const EUROSTAT_SOURCE: &str = "eurostat";

// ---------------------------------------------------------------------------
// ModelKind – the registry of database kinds
// ---------------------------------------------------------------------------

/// Database kinds the parsers can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    /// Scenarios keyed by name, baseline stored under `"baseline"`.
    #[default]
    Database,
    /// Scenarios keyed by year, baseline stored under the parsed year.
    Dynamic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Database, ModelKind::Dynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Database => "Database",
            ModelKind::Dynamic => "Dynamic",
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ModelKind::Dynamic)
    }

    /// Arguments this kind needs on top of what every parser takes.
    pub fn required_arguments(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Database => &[],
            ModelKind::Dynamic => &["year"],
        }
    }

    /// Key the parsed baseline is stored under.
    pub fn baseline_key(&self, year: Option<i64>) -> Result<ScenarioKey> {
        match self {
            ModelKind::Database => Ok(ScenarioKey::baseline()),
            ModelKind::Dynamic => year.map(ScenarioKey::Year).ok_or_else(|| {
                Error::MissingArgument(format!(
                    "a {self} database needs {:?}",
                    self.required_arguments()
                ))
            }),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::invalid("model", s, ModelKind::ALL.iter().map(|k| k.as_str())))
    }
}

crate::impl_string_conversions!(ModelKind);

// ---------------------------------------------------------------------------
// Shared assembly
// ---------------------------------------------------------------------------

/// Check the model kind, read, store, construct. `source` is the fixed citation of the
/// format, if it has one.
fn build(
    reader: &dyn FormatReader,
    opts: &ModelOptions,
    source: Option<String>,
) -> Result<Database> {
    let kind = opts.model;
    let baseline = kind.baseline_key(opts.year)?;
    let parsed = reader.read()?;

    let store = ScenarioMatrixStore::with_entries(
        Some(baseline.clone()),
        kind.is_dynamic(),
        [(baseline, parsed.matrices)],
    )?;

    let meta = Metadata {
        name: opts.name.clone(),
        source,
        table: reader.table(),
        year: opts.year,
        price: None,
        notes: parsed.notes,
        history: Vec::new(),
    };
    for note in &meta.notes {
        log::info!("{}: {note}", reader.format());
    }

    let mut db = Database::new(kind, store, parsed.indices, parsed.units, meta)?;
    if opts.calc_all {
        db.calc_all(ScenarioKey::baseline())?;
    }
    Ok(db)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a directory of per-matrix text files.
///
/// * `flows`: needs `Z.txt, Y.txt, EY.txt, V.txt, E.txt, units.txt`
/// * `coefficients`: needs `z.txt, Y.txt, EY.txt, v.txt, e.txt, units.txt`
pub fn parse_from_text(path: &Path, opts: &TextOptions) -> Result<Database> {
    let reader = TextReader::new(path, opts.table, opts.mode);
    build(&reader, &opts.model, opts.source.clone())
}

/// Parse a workbook stored as a directory of CSV sheets.
pub fn parse_from_workbook(path: &Path, opts: &WorkbookOptions) -> Result<Database> {
    opts.model.model.baseline_key(opts.model.year)?;
    let workbook = CsvWorkbook::open(path).map_err(|e| Error::read("workbook", e))?;
    parse_from_workbook_source(&workbook, opts)
}

/// Parse any [`Workbook`] implementation.
pub fn parse_from_workbook_source<W: Workbook>(
    workbook: &W,
    opts: &WorkbookOptions,
) -> Result<Database> {
    let reader = WorkbookReader {
        workbook,
        table: opts.table,
        mode: opts.mode,
        data_sheet: opts.data_sheet.clone(),
        unit_sheet: opts.unit_sheet.clone(),
    };
    build(&reader, &opts.model, opts.source.clone())
}

/// Parse an extracted exiobase monetary MRSUT release. Always a SUT.
pub fn parse_exiobase_sut(path: &Path, opts: &ExiobaseSutOptions) -> Result<Database> {
    let reader = ExiobaseSutReader::new(path);
    build(&reader, &opts.model, Some(EXIOBASE_SUT_SOURCE.to_string()))
}

/// Parse an extracted exiobase3 release. Always an IOT.
///
/// The version is typed; text goes through `"3.8.2".parse()`, which
/// rejects unsupported releases before anything is read.
pub fn parse_exiobase3(path: &Path, opts: &Exiobase3Options) -> Result<Database> {
    let reader = Exiobase3Reader::new(path, opts.version);
    build(&reader, &opts.model, Some(EXIOBASE3_SOURCE.to_string()))
}

/// Parse Eora: a single-country table, or Eora26 with `multi_region`.
///
/// Multi-region parsing needs `model.year` and `index_path`, and records
/// the corrections it applies as metadata notes.
pub fn parse_eora(path: &Path, opts: &EoraOptions) -> Result<Database> {
    let source = Some(EORA_SOURCE.to_string());
    if opts.multi_region {
        let reader = EoraMultiReader {
            path: path.to_path_buf(),
            index_path: opts.index_path.clone(),
            year: opts.model.year,
            name_convention: opts.name_convention,
        };
        build(&reader, &opts.model, source)
    } else {
        let reader = EoraSingleReader::new(path, opts.name_convention, opts.aggregate_trade);
        build(&reader, &opts.model, source)
    }
}

/// Parse a Eurostat supply/use pair, each a directory of CSV sheets.
pub fn parse_eurostat(
    supply_path: &Path,
    use_path: &Path,
    opts: &EurostatOptions,
) -> Result<Database> {
    opts.model.model.baseline_key(opts.model.year)?;
    if opts.model.year.is_none() {
        return Err(Error::MissingArgument("Eurostat tables need a year".into()));
    }
    let supply = CsvWorkbook::open(supply_path).map_err(|e| Error::read("eurostat", e))?;
    let usage = CsvWorkbook::open(use_path).map_err(|e| Error::read("eurostat", e))?;
    parse_eurostat_source(&supply, &usage, opts)
}

/// [`parse_eurostat`] over any [`Workbook`] implementation.
pub fn parse_eurostat_source<W: Workbook>(
    supply: &W,
    usage: &W,
    opts: &EurostatOptions,
) -> Result<Database> {
    let reader = EurostatReader {
        supply,
        usage,
        region: opts.region.clone(),
        year: opts.model.year,
        consumption_categories: opts.consumption_categories.clone(),
        factors_of_production: opts.factors_of_production.clone(),
        imports: opts.imports.clone(),
    };
    build(&reader, &opts.model, Some(EUROSTAT_SOURCE.to_string()))
}
