//! Rows and cells.
//!
//! Rows buffer cell values between [`Worksheet::add_row`] and the next
//! flush. A row is mutable while it sits in the pending buffer; flushing
//! consumes it, so committed rows cannot be touched again.
//!
//! [`Worksheet::add_row`]: crate::worksheet::Worksheet::add_row

use crate::address;
use crate::error::{Error, Result};
use crate::value::CellValue;
use crate::worksheet::Column;
use std::collections::HashMap;
use std::sync::Arc;

/// A cell in a worksheet row.
#[derive(Debug, Clone)]
pub struct Cell {
    index: u32,
    reference: String,
    key: Option<String>,
    value: CellValue,
}

impl Cell {
    pub(crate) fn new(index: u32, reference: String, key: Option<String>) -> Self {
        Self {
            index,
            reference,
            key,
            value: CellValue::Empty,
        }
    }

    /// Assign the cell's value. May be called any number of times while the
    /// owning row is pending.
    pub fn set(&mut self, value: impl Into<CellValue>) {
        self.value = value.into();
    }

    /// Zero-based column index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The `A1` style reference of this cell.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The column key, when the cell was added by key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The currently assigned value.
    pub fn value(&self) -> &CellValue {
        &self.value
    }
}

/// Cell storage: positional append order, or keyed by column when the
/// owning worksheet has a schema. The two modes are mutually exclusive for
/// a worksheet's whole lifetime.
#[derive(Debug)]
enum Cells {
    Positional(Vec<Cell>),
    Keyed {
        columns: Arc<[Column]>,
        cells: HashMap<String, Cell>,
    },
}

/// A row in a worksheet.
#[derive(Debug)]
pub struct Row {
    index: u32,
    cells: Cells,
}

impl Row {
    pub(crate) fn new(index: u32, columns: Option<Arc<[Column]>>) -> Self {
        let cells = match columns {
            Some(columns) => Cells::Keyed {
                columns,
                cells: HashMap::new(),
            },
            None => Cells::Positional(Vec::new()),
        };
        Self { index, cells }
    }

    /// Zero-based row index, assigned at creation and stable for the row's
    /// lifetime.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Append a cell at the next positional index.
    ///
    /// Fails with a schema violation when the owning worksheet has defined
    /// columns; keyed worksheets only accept [`Row::add_cell_with_key`].
    pub fn add_cell(&mut self) -> Result<&mut Cell> {
        match &mut self.cells {
            Cells::Positional(cells) => {
                let index = cells.len() as u32;
                let reference = address::cell_reference(index, self.index);
                cells.push(Cell::new(index, reference, None));
                Ok(cells.last_mut().expect("cell was just appended"))
            }
            Cells::Keyed { .. } => Err(Error::Schema(
                "can't add cells without keys to this worksheet as columns were defined"
                    .to_string(),
            )),
        }
    }

    /// Add a cell for a defined column. The cell's position is the
    /// column's position in the schema; adding the same key again returns
    /// the existing cell.
    pub fn add_cell_with_key(&mut self, key: &str) -> Result<&mut Cell> {
        match &mut self.cells {
            Cells::Keyed { columns, cells } => {
                let position = columns
                    .iter()
                    .position(|column| column.key == key)
                    .ok_or_else(|| Error::Schema(format!("undefined column '{}'", key)))?;
                let index = position as u32;
                let reference = address::cell_reference(index, self.index);
                Ok(cells
                    .entry(key.to_string())
                    .or_insert_with(|| Cell::new(index, reference, Some(key.to_string()))))
            }
            Cells::Positional(_) => Err(Error::Schema(
                "can't add cells with keys if no columns were defined".to_string(),
            )),
        }
    }

    /// Cells in append order (positional mode only).
    pub(crate) fn positional_cells(&self) -> &[Cell] {
        match &self.cells {
            Cells::Positional(cells) => cells,
            Cells::Keyed { .. } => &[],
        }
    }

    /// Look up the cell supplied for a column key, if any.
    pub(crate) fn cell_for(&self, key: &str) -> Option<&Cell> {
        match &self.cells {
            Cells::Keyed { cells, .. } => cells.get(key),
            Cells::Positional(_) => None,
        }
    }
}
