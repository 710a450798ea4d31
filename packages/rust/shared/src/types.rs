//! Core domain types: the fetched table and the conversation document built from it.

use std::collections::HashSet;

use crate::error::{Result, Sheet2XmlError};

/// A single cell. `None` marks a missing value.
pub type Cell = Option<String>;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An ordered sequence of rows sharing one header-declared column set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, checking that every row matches the header width and
    /// that no non-empty header name repeats.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in columns.iter().filter(|c| !c.is_empty()) {
            if !seen.insert(name.as_str()) {
                return Err(Sheet2XmlError::validation(format!(
                    "duplicate column header '{name}'"
                )));
            }
        }

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(Sheet2XmlError::validation(format!(
                "row {idx} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Header names in sheet order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column by header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Raw row storage.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Rows as mutable cell slices. Cells can be rewritten but rows keep
    /// the header width.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [Cell]> {
        self.rows.iter_mut().map(Vec::as_mut_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// View of row `idx` as a [`Record`].
    pub fn record(&self, idx: usize) -> Option<Record<'_>> {
        self.rows.get(idx).map(|cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    /// Iterate rows as [`Record`]s in table order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record {
            columns: &self.columns,
            cells,
        })
    }
}

/// One row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> Record<'a> {
    /// Cell value for `column`; `None` if the column is unknown or the cell is missing.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let cells: &'a [Cell] = self.cells;
        let idx = self.columns.iter().position(|c| c == column)?;
        cells[idx].as_deref()
    }

    /// `(column, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        let (columns, cells): (&'a [String], &'a [Cell]) = (self.columns, self.cells);
        columns
            .iter()
            .zip(cells.iter())
            .map(|(c, v)| (c.as_str(), v.as_deref()))
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Root of the generated hierarchy: `<conversations>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub conversations: Vec<Conversation>,
}

impl Document {
    /// Total number of `<response>` elements across all conversations.
    pub fn response_count(&self) -> usize {
        self.conversations.iter().map(|c| c.responses.len()).sum()
    }
}

/// One `(Conversation ID, Prompt)` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub prompt: String,
    pub responses: Vec<Response>,
}

/// One `Classification` group within a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub classification: String,
    pub texts: Vec<String>,
    pub feedback: String,
    pub next_conversation_id: Option<String>,
}
