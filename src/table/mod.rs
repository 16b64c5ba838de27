pub mod parse;

pub use parse::parse_tables;

/// One HTML table before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names as they appear in the header, untrimmed.
    pub columns: Vec<String>,
    /// Body rows, each exactly `columns.len()` long. `None` is a missing cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
