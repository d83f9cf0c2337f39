//! Worksheets and the streaming row serializer.
//!
//! A worksheet buffers pending rows in memory and appends them to its part
//! stream on [`Worksheet::flush_rows`], so memory use is bounded by the
//! flush interval rather than the sheet size. The part stream is opened
//! once, on the first flush, and closed by [`Worksheet::finalize`].

use crate::address;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::{self, CellValue};
use crate::workbook::{NS_DOC_RELATIONSHIPS, NS_SPREADSHEET};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

type SheetWriter = Writer<BufWriter<File>>;

/// A column definition for keyed cell access.
///
/// Defining columns on a worksheet freezes its cell-addressing mode to
/// keyed: rows then accept cells through [`Row::add_cell_with_key`] only,
/// and every flushed row carries one cell per defined column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Key used by [`Row::add_cell_with_key`].
    pub key: String,
    /// Header label, written into row 1.
    pub label: String,
    /// Optional column width declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

impl Column {
    /// Create a column with the given key and header label.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            width: None,
        }
    }

    /// Declare a custom width for this column.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

/// A worksheet in a workbook.
///
/// Lifecycle: *unstarted* until the first flush opens the part stream and
/// writes the header markup, *active* while rows are streamed, *finalized*
/// once the closing markup has been written. Finalized worksheets are
/// immutable.
pub struct Worksheet {
    id: u32,
    name: String,
    file_name: String,
    path: PathBuf,
    writer: Option<SheetWriter>,
    columns: Option<Arc<[Column]>>,
    pending: VecDeque<Row>,
    rows_count: u32,
    rows_flushed_once: bool,
    started: bool,
    finalized: bool,
}

impl Worksheet {
    pub(crate) fn new(id: u32, name: String, worksheets_dir: &Path) -> Self {
        let file_name = format!("sheet{}.xml", id);
        let path = worksheets_dir.join(&file_name);
        Self {
            id,
            name,
            file_name,
            path,
            writer: None,
            columns: None,
            pending: VecDeque::new(),
            rows_count: 0,
            rows_flushed_once: false,
            started: false,
            finalized: false,
        }
    }

    /// Ordinal id, 1-based in assignment order.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Part file name inside the package's worksheets directory.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The defined column schema, if any.
    pub fn columns(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    /// Number of rows created so far, including the header row.
    pub fn row_count(&self) -> u32 {
        self.rows_count
    }

    /// Whether rows are buffered and waiting for the next flush.
    pub fn has_pending_rows(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether the closing markup has been written.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Define the worksheet columns and switch the sheet to keyed cell
    /// access. Optional; may be called once, before any rows exist.
    ///
    /// Immediately creates and flushes a header row carrying the column
    /// labels, so the header owns row index 0 and data rows start at 1.
    pub fn define_columns(&mut self, columns: Vec<Column>) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle(format!(
                "can't define columns on finalized worksheet '{}'",
                self.name
            )));
        }
        if self.columns.is_some() {
            return Err(Error::Schema(format!(
                "columns have already been defined on worksheet '{}'",
                self.name
            )));
        }
        if self.rows_flushed_once {
            return Err(Error::Schema(format!(
                "can't define columns on worksheet '{}' after rows have been flushed",
                self.name
            )));
        }
        if self.rows_count > 0 {
            return Err(Error::Schema(format!(
                "can't define columns on worksheet '{}' after rows have been added",
                self.name
            )));
        }
        if columns.is_empty() {
            return Err(Error::Schema(format!(
                "worksheet '{}' needs at least one column",
                self.name
            )));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|other| other.key == column.key) {
                return Err(Error::Schema(format!(
                    "duplicate column key '{}' on worksheet '{}'",
                    column.key, self.name
                )));
            }
        }

        let columns: Arc<[Column]> = columns.into();
        self.columns = Some(columns.clone());

        let row = self.add_row()?;
        for column in columns.iter() {
            row.add_cell_with_key(&column.key)?.set(column.label.as_str());
        }
        self.flush_rows()
    }

    /// Create the next pending row.
    pub fn add_row(&mut self) -> Result<&mut Row> {
        if self.finalized {
            return Err(Error::Lifecycle(format!(
                "can't add rows to finalized worksheet '{}'",
                self.name
            )));
        }
        let index = self.rows_count;
        self.rows_count += 1;
        self.pending.push_back(Row::new(index, self.columns.clone()));
        Ok(self.pending.back_mut().expect("row was just buffered"))
    }

    /// Drain the pending-row buffer into the part stream, in creation
    /// order. Opens the stream and writes the sheet header markup on the
    /// first call.
    ///
    /// There is no rollback: rows written before a failure stay written,
    /// and the failing row is dropped from the buffer. The worksheet
    /// remains usable for further flushes once the offending condition is
    /// fixed.
    pub fn flush_rows(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle(format!(
                "can't flush rows on finalized worksheet '{}'",
                self.name
            )));
        }
        if self.pending.is_empty() {
            return Err(Error::Lifecycle(format!(
                "worksheet '{}' has no rows to flush",
                self.name
            )));
        }
        if !self.started {
            self.start()?;
        }

        while let Some(row) = self.pending.pop_front() {
            let index = row.index();
            self.write_row(&row)
                .map_err(|e| e.in_row(&self.name, index))?;
        }
        self.rows_flushed_once = true;
        Ok(())
    }

    /// Write the closing markup and close the part stream. Fails while
    /// pending rows remain; a second call is an error.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle(format!(
                "worksheet '{}' has already been finalized",
                self.name
            )));
        }
        if !self.pending.is_empty() {
            return Err(Error::Lifecycle(format!(
                "can't finalize worksheet '{}' with {} pending rows",
                self.name,
                self.pending.len()
            )));
        }
        {
            let xml = self.writer.as_mut().ok_or_else(|| {
                Error::Lifecycle(format!(
                    "can't finalize worksheet '{}' before any rows were flushed",
                    self.name
                ))
            })?;
            xml.write_event(Event::End(BytesEnd::new("sheetData")))?;
            xml.write_event(Event::End(BytesEnd::new("worksheet")))?;
        }
        if let Some(xml) = self.writer.take() {
            let mut stream = xml.into_inner();
            stream.flush()?;
        }
        self.finalized = true;
        Ok(())
    }

    /// Open the part stream and write everything up to and including the
    /// `sheetData` opening tag.
    fn start(&mut self) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to create {}: {}", self.path.display(), e),
            )
        })?;
        let mut xml = Writer::new(BufWriter::new(file));

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        let mut worksheet = BytesStart::new("worksheet");
        worksheet.push_attribute(("xmlns", NS_SPREADSHEET));
        worksheet.push_attribute(("xmlns:r", NS_DOC_RELATIONSHIPS));
        xml.write_event(Event::Start(worksheet))?;

        xml.write_event(Event::Start(BytesStart::new("sheetViews")))?;
        let mut view = BytesStart::new("sheetView");
        view.push_attribute(("workbookViewId", "0"));
        xml.write_event(Event::Empty(view))?;
        xml.write_event(Event::End(BytesEnd::new("sheetViews")))?;

        let mut format = BytesStart::new("sheetFormatPr");
        format.push_attribute(("defaultRowHeight", "15"));
        xml.write_event(Event::Empty(format))?;

        if let Some(columns) = &self.columns {
            write_column_widths(columns, &mut xml)?;
        }

        xml.write_event(Event::Start(BytesStart::new("sheetData")))?;

        self.writer = Some(xml);
        self.started = true;
        Ok(())
    }

    fn write_row(&mut self, row: &Row) -> Result<()> {
        let columns = self.columns.clone();
        let xml = match self.writer.as_mut() {
            Some(xml) => xml,
            None => {
                return Err(Error::Lifecycle(
                    "worksheet stream is not open".to_string(),
                ))
            }
        };

        let mut row_start = BytesStart::new("row");
        let number = (u64::from(row.index()) + 1).to_string();
        row_start.push_attribute(("r", number.as_str()));
        xml.write_event(Event::Start(row_start))?;

        match columns {
            None => {
                for cell in row.positional_cells() {
                    write_cell(xml, cell.reference(), cell.value())?;
                }
            }
            Some(columns) => {
                // One fragment per defined column keeps sparse rows
                // aligned; missing keys become empty string cells at the
                // column's own address.
                for (position, column) in columns.iter().enumerate() {
                    match row.cell_for(&column.key) {
                        Some(cell) => write_cell(xml, cell.reference(), cell.value())?,
                        None => {
                            let reference =
                                address::cell_reference(position as u32, row.index());
                            write_cell(xml, &reference, &CellValue::Empty)?;
                        }
                    }
                }
            }
        }

        xml.write_event(Event::End(BytesEnd::new("row")))?;
        Ok(())
    }
}

/// Serialize one cell as a `<c>` fragment, dispatching on the value kind.
fn write_cell<W: Write>(xml: &mut Writer<W>, reference: &str, value: &CellValue) -> Result<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", reference));

    let body: Cow<'_, str> = match value {
        CellValue::Empty => {
            cell.push_attribute(("t", "str"));
            Cow::Borrowed("")
        }
        CellValue::Text(text) => {
            cell.push_attribute(("t", "str"));
            Cow::Borrowed(text.as_str())
        }
        CellValue::Bool(b) => {
            cell.push_attribute(("t", "str"));
            Cow::Owned(b.to_string())
        }
        CellValue::Int(i) => {
            cell.push_attribute(("s", "0"));
            cell.push_attribute(("t", "n"));
            Cow::Owned(i.to_string())
        }
        CellValue::Float(f) => {
            if !f.is_finite() {
                return Err(Error::UnsupportedValue(format!(
                    "non-finite number {} has no cell encoding (cell {})",
                    f, reference
                )));
            }
            cell.push_attribute(("s", "0"));
            cell.push_attribute(("t", "n"));
            Cow::Owned(f.to_string())
        }
        CellValue::DateTime(timestamp) => {
            cell.push_attribute(("s", "1"));
            cell.push_attribute(("t", "n"));
            Cow::Owned(value::excel_serial(timestamp).to_string())
        }
    };

    xml.write_event(Event::Start(cell))?;
    xml.write_event(Event::Start(BytesStart::new("v")))?;
    if !body.is_empty() {
        xml.write_event(Event::Text(BytesText::new(&body)))?;
    }
    xml.write_event(Event::End(BytesEnd::new("v")))?;
    xml.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_column_widths(columns: &[Column], xml: &mut SheetWriter) -> Result<()> {
    if columns.iter().all(|column| column.width.is_none()) {
        return Ok(());
    }
    xml.write_event(Event::Start(BytesStart::new("cols")))?;
    for (position, column) in columns.iter().enumerate() {
        if let Some(width) = column.width {
            let mut col = BytesStart::new("col");
            let bound = (position + 1).to_string();
            col.push_attribute(("min", bound.as_str()));
            col.push_attribute(("max", bound.as_str()));
            col.push_attribute(("width", width.to_string().as_str()));
            col.push_attribute(("customWidth", "1"));
            xml.write_event(Event::Empty(col))?;
        }
    }
    xml.write_event(Event::End(BytesEnd::new("cols")))?;
    Ok(())
}
