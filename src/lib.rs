//! Scenario-aware multi-regional input-output tables.
//!
//! ```text
//!  text dir / workbook / exiobase / eora / eurostat
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ formats   │  source → (MatrixSet, IndexSet, UnitTable)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ parsers   │  ModelKind → ScenarioMatrixStore → Database
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ database  │  scenarios, upload_data, calc_all
//!   └──────────┘
//! ```

pub mod algebra;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod formats;
pub mod parsers;
pub mod sample;

pub use config::{
    EoraOptions, EurostatOptions, Exiobase3Options, ExiobaseSutOptions, ExiobaseVersion, Mode,
    ModelOptions, NameConvention, TextOptions, WorkbookOptions,
};
pub use data::loader::{CsvWorkbook, MemoryWorkbook, SheetRef, Workbook};
pub use data::model::{IndexSet, Label, Level, Matrix, MatrixName, MatrixSet, TableKind, UnitTable};
pub use data::store::{KeyCoercion, ScenarioKey, ScenarioMatrixStore};
pub use database::{Database, Metadata};
pub use error::{Error, Result};
pub use parsers::{
    parse_eora, parse_eurostat, parse_exiobase3, parse_exiobase_sut, parse_from_text,
    parse_eurostat_source, parse_from_workbook, parse_from_workbook_source, ModelKind,
};

/// `TryFrom<String>` and `Into<String>` for enums that already implement
/// `FromStr` and `Display`, so serde can go through them.
#[macro_export]
#[doc(hidden)]
macro_rules! impl_string_conversions {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = $crate::error::Error;

            fn try_from(s: String) -> $crate::error::Result<Self> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.to_string()
            }
        }
    };
}
