//! Error types for the xlpress library.

use std::io;
use thiserror::Error;

/// Result type alias for xlpress operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a workbook package.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while creating or appending to a part stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An operation was attempted in a state that forbids it, such as
    /// mutating a finalized worksheet or finalizing a workbook that still
    /// has pending worksheets.
    #[error("Lifecycle violation: {0}")]
    Lifecycle(String),

    /// Keyed and positional cell access were mixed, a cell key did not
    /// match any defined column, or the column schema was (re)defined too
    /// late.
    #[error("Schema violation: {0}")]
    Schema(String),

    /// A value has no cell encoding.
    #[error("Unsupported cell value: {0}")]
    UnsupportedValue(String),

    /// Error serializing part markup.
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// The package archive could not be produced.
    #[error("Packaging error: {0}")]
    Packaging(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Packaging(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlWrite(err.to_string())
    }
}

impl Error {
    /// Attach the owning sheet and 1-based row number to an error raised
    /// while streaming a row.
    pub(crate) fn in_row(self, sheet: &str, row_index: u32) -> Self {
        let context = format!("sheet '{}', row {}", sheet, u64::from(row_index) + 1);
        match self {
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), format!("{}: {}", context, e))),
            Error::Lifecycle(msg) => Error::Lifecycle(format!("{}: {}", context, msg)),
            Error::Schema(msg) => Error::Schema(format!("{}: {}", context, msg)),
            Error::UnsupportedValue(msg) => {
                Error::UnsupportedValue(format!("{}: {}", context, msg))
            }
            Error::XmlWrite(msg) => Error::XmlWrite(format!("{}: {}", context, msg)),
            Error::Packaging(msg) => Error::Packaging(format!("{}: {}", context, msg)),
        }
    }
}
