use serde::{Deserialize, Serialize};

/// A single spreadsheet cell as read from or written to a table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Text rendering with surrounding whitespace removed.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.trim().to_string(),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                format!("{value:.0}")
            }
            Cell::Number(value) => value.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// All rows of a table, header first.
pub type TableRows = Vec<Vec<Cell>>;

/// Remote tabular-document store. Documents hold named tables; rows are
/// addressed by their 1-based position, the header being row 1.
pub trait TableGateway: Send + Sync {
    /// `Ok(None)` when the document has no table with that name.
    fn read_table(&self, document: &str, table: &str) -> Result<Option<TableRows>, StoreError>;
    /// Cells rendered the way the sheet displays them, so a `25%` weight
    /// reads as that text rather than the stored fraction.
    fn read_displayed_table(
        &self,
        document: &str,
        table: &str,
    ) -> Result<Option<TableRows>, StoreError> {
        self.read_table(document, table)
    }
    fn create_table(&self, document: &str, table: &str, header: &[String])
        -> Result<(), StoreError>;
    /// Add a row at `row_number`, the first row past the data last read. If
    /// the table has grown since, the row goes after its current end.
    fn append_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError>;
    /// Overwrite the cells of one row starting at the first column.
    fn update_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("table '{table}' not found")]
    TableNotFound { table: String },
    #[error("table '{table}' already exists")]
    TableExists { table: String },
    #[error("spreadsheet operation failed: {0}")]
    Backend(String),
    #[error("spreadsheet runtime unavailable: {0}")]
    Runtime(String),
}
