/// Data layer: core types, raw source reading, and the scenario store.
///
/// Architecture:
/// ```text
///  .txt / .csv / workbook sheets
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read cells → Grid / LabelledTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Matrix, MatrixSet, IndexSet, UnitTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  store    │  scenario key → MatrixSet, baseline alias
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod store;
