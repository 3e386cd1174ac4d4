use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Grids – raw cell text
// ---------------------------------------------------------------------------

/// Raw cell text, row by row. Rows may have different lengths.
pub type Grid = Vec<Vec<String>>;

/// Read a delimited text file into a [`Grid`]. Cells are trimmed.
pub fn read_grid(path: &Path, delimiter: u8) -> Result<Grid> {
    log::debug!("reading grid {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut grid = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{} row {row_no}", path.display()))?;
        grid.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(grid)
}

/// Write a [`Grid`] as delimited text.
pub fn write_grid(path: &Path, grid: &Grid, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in grid {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse one numeric cell. Empty cells count as zero.
pub fn parse_number(cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(0.0);
    }
    cell.parse::<f64>()
        .with_context(|| format!("'{cell}' is not a number"))
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

// ---------------------------------------------------------------------------
// LabelledTable – a grid split into header rows, index columns and values
// ---------------------------------------------------------------------------

/// A grid with `header_rows` column-label rows and `index_cols` row-label
/// columns. Header cells above the index columns are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledTable {
    /// One entry per column: the header cells top to bottom.
    pub columns: Vec<Vec<String>>,
    /// One entry per data row: the index cells left to right.
    pub index: Vec<Vec<String>>,
    /// Row-major values.
    pub values: Vec<f64>,
}

impl LabelledTable {
    pub fn from_grid(grid: &Grid, header_rows: usize, index_cols: usize) -> Result<Self> {
        if grid.len() < header_rows {
            bail!(
                "expected {header_rows} header rows, found only {} rows",
                grid.len()
            );
        }

        let width = grid[..header_rows]
            .iter()
            .map(|r| r.len().saturating_sub(index_cols))
            .max()
            .unwrap_or(0);
        let columns: Vec<Vec<String>> = (0..width)
            .map(|j| {
                grid[..header_rows]
                    .iter()
                    .map(|r| cell(r, index_cols + j).to_string())
                    .collect()
            })
            .collect();

        let mut index: Vec<Vec<String>> = Vec::new();
        let mut values = Vec::new();
        for (row_no, row) in grid.iter().enumerate().skip(header_rows) {
            let value_cells = row.get(index_cols..).unwrap_or(&[]);
            let index_cells = row.get(..index_cols.min(row.len())).unwrap_or(&[]);
            // Blank lines and index-name rows above the data carry no values.
            // A labelled row without values once data has started is all zeros.
            if value_cells.iter().all(|c| c.is_empty())
                && (index.is_empty() || index_cells.iter().all(|c| c.is_empty()))
            {
                continue;
            }
            if value_cells.len() > width {
                bail!(
                    "row {row_no} has {} values but the header has {width} columns",
                    value_cells.len()
                );
            }
            index.push((0..index_cols).map(|i| cell(row, i).to_string()).collect());
            for j in 0..width {
                let v = parse_number(cell(value_cells, j))
                    .with_context(|| format!("row {row_no}, column {}", index_cols + j))?;
                values.push(v);
            }
        }

        Ok(LabelledTable {
            columns,
            index,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.width() + col]
    }
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

/// Sheet address: by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl From<usize> for SheetRef {
    fn from(i: usize) -> Self {
        SheetRef::Index(i)
    }
}

impl From<&str> for SheetRef {
    fn from(s: &str) -> Self {
        SheetRef::Name(s.to_string())
    }
}

/// A spreadsheet: ordered, named sheets of cell text.
///
/// Decoding binary spreadsheet formats is left to implementors; the crate
/// ships [`CsvWorkbook`] and [`MemoryWorkbook`].
pub trait Workbook {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    fn read_sheet(&self, name: &str) -> Result<Grid>;

    fn sheet(&self, sheet: &SheetRef) -> Result<Grid> {
        let names = self.sheet_names();
        let name = match sheet {
            SheetRef::Index(i) => names
                .get(*i)
                .with_context(|| format!("sheet index {i} out of range ({} sheets)", names.len()))?,
            SheetRef::Name(n) => names
                .iter()
                .find(|s| *s == n)
                .with_context(|| format!("no sheet named '{n}', sheets are {names:?}"))?,
        };
        self.read_sheet(name)
    }
}

/// A directory of comma-separated sheets. Sheet order is file-name order,
/// sheet name is the file stem.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    sheets: Vec<(String, PathBuf)>,
}

impl CsvWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("opening workbook directory {}", path.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let p = entry?.path();
            let is_csv = p
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv {
                files.push(p);
            }
        }
        files.sort();

        let sheets: Vec<(String, PathBuf)> = files
            .into_iter()
            .filter_map(|p| {
                let stem = p.file_stem()?.to_str()?.to_string();
                Some((stem, p))
            })
            .collect();
        if sheets.is_empty() {
            bail!("workbook {} contains no .csv sheets", path.display());
        }
        Ok(CsvWorkbook { sheets })
    }
}

impl Workbook for CsvWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read_sheet(&self, name: &str) -> Result<Grid> {
        let (_, path) = self
            .sheets
            .iter()
            .find(|(n, _)| n == name)
            .with_context(|| format!("no sheet named '{name}'"))?;
        read_grid(path, b',')
    }
}

/// Workbook held in memory, e.g. filled from a spreadsheet decoder.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Grid)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, grid: Grid) -> Self {
        self.sheets.push((name.into(), grid));
        self
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read_sheet(&self, name: &str) -> Result<Grid> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, g)| g.clone())
            .with_context(|| format!("no sheet named '{name}'"))
    }
}
