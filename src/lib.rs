//! # xlpress
//!
//! Streaming Excel (XLSX) workbook generation with bounded memory.
//!
//! This library builds spreadsheet packages incrementally: rows are
//! buffered per worksheet and appended to the worksheet's part stream on
//! each flush, so producers can write millions of rows without holding
//! the document in memory. Writing is single-writer, append-only and
//! forward-only; nothing can be changed once it has been flushed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use xlpress::Workbook;
//!
//! let mut workbook = Workbook::create("report.xlsx")?;
//! let sheet = workbook.add_worksheet("Data")?;
//!
//! for i in 0..1_000_000i64 {
//!     let row = sheet.add_row()?;
//!     row.add_cell()?.set(format!("item-{}", i));
//!     row.add_cell()?.set(i);
//!     if i % 1_000 == 0 {
//!         sheet.flush_rows()?;
//!     }
//! }
//! sheet.flush_rows()?;
//! sheet.finalize()?;
//! workbook.finalize()?;
//! # Ok::<(), xlpress::Error>(())
//! ```
//!
//! ## Keyed columns
//!
//! A worksheet can declare a column schema up front; the labels become a
//! header row and cells are then addressed by key. Missing keys are
//! written as empty cells so sparse rows stay aligned.
//!
//! ```no_run
//! use xlpress::{Column, Workbook};
//!
//! let mut workbook = Workbook::create("users.xlsx")?;
//! let sheet = workbook.add_worksheet("Users")?;
//! sheet.define_columns(vec![
//!     Column::new("name", "Name").with_width(24.0),
//!     Column::new("joined", "Joined"),
//!     Column::new("score", "Score"),
//! ])?;
//!
//! let row = sheet.add_row()?;
//! row.add_cell_with_key("name")?.set("ada");
//! row.add_cell_with_key("joined")?.set(chrono::Utc::now());
//! sheet.flush_rows()?;
//!
//! sheet.finalize()?;
//! workbook.finalize()?;
//! # Ok::<(), xlpress::Error>(())
//! ```
//!
//! Workbooks are not internally synchronized. Exactly one logical thread
//! of control may mutate a workbook graph; wrap it in an exclusive lock
//! if it must be shared.

pub mod address;
pub mod error;
mod package;
pub mod row;
pub mod value;
pub mod workbook;
pub mod worksheet;

// Re-exports
pub use error::{Error, Result};
pub use row::{Cell, Row};
pub use value::CellValue;
pub use workbook::Workbook;
pub use worksheet::{Column, Worksheet};
