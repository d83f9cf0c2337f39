//! Workbooks and the package assembler.
//!
//! A [`Workbook`] owns its worksheets and the package-level relationship
//! list. Once every worksheet has been finalized, [`Workbook::finalize`]
//! assembles the manifest, relationship and workbook parts and archives
//! the whole workspace into the target `.xlsx` file.

use crate::error::{Error, Result};
use crate::package::{self, Workspace};
use crate::worksheet::Worksheet;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const NS_CONTENT_TYPES: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";
pub(crate) const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const NS_SPREADSHEET: &str =
    "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub(crate) const NS_DOC_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Content type for relationship parts.
const CONTENT_TYPE_RELATIONSHIPS: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

/// Content type for plain XML parts.
const CONTENT_TYPE_XML: &str = "application/xml";

/// Content type for the workbook part.
const CONTENT_TYPE_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

/// Content type for worksheet parts.
const CONTENT_TYPE_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

const REL_TYPE_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

const REL_TYPE_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

/// A package relationship from the workbook part to one of its children.
#[derive(Debug, Clone)]
struct Relationship {
    rel_type: &'static str,
    target: String,
}

/// A spreadsheet workbook being streamed to disk.
///
/// The workbook is single-writer and append-only: worksheets are written
/// forward-only and nothing can be rewritten after it has been flushed.
pub struct Workbook {
    path: PathBuf,
    workspace: Workspace,
    worksheets: Vec<Worksheet>,
    relationships: Vec<Relationship>,
    finalized: bool,
}

impl Workbook {
    /// Create a workbook that will be written to `path`.
    ///
    /// The temporary part workspace is allocated up front; failure to
    /// create it is fatal to the whole workbook. The workspace is removed
    /// when the workbook is dropped.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let workspace = Workspace::create()?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            workspace,
            worksheets: Vec::new(),
            relationships: Vec::new(),
            finalized: false,
        })
    }

    /// The target package path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a worksheet with the given display name and return it.
    pub fn add_worksheet(&mut self, name: impl Into<String>) -> Result<&mut Worksheet> {
        if self.finalized {
            return Err(Error::Lifecycle(
                "can't add worksheets to a finalized workbook".to_string(),
            ));
        }
        let id = self.worksheets.len() as u32 + 1;
        let worksheet = Worksheet::new(id, name.into(), self.workspace.worksheets_dir());
        self.relationships.push(Relationship {
            rel_type: REL_TYPE_WORKSHEET,
            target: format!("worksheets/{}", worksheet.file_name()),
        });
        self.worksheets.push(worksheet);
        Ok(self.worksheets.last_mut().expect("worksheet was just added"))
    }

    /// All worksheets, in presentation order.
    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    /// Mutable access to a worksheet by position.
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Whether any worksheet has yet to be finalized.
    pub fn has_pending_worksheets(&self) -> bool {
        self.worksheets.iter().any(|ws| !ws.is_finalized())
    }

    /// Assemble the package metadata parts and archive everything to the
    /// target path. Requires at least one worksheet and every worksheet
    /// finalized; afterwards the workbook is immutable.
    ///
    /// A failed finalize leaves the workbook non-finalized; the call can
    /// be retried once the blocking condition is resolved.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::Lifecycle(
                "workbook has already been finalized".to_string(),
            ));
        }
        if self.worksheets.is_empty() {
            return Err(Error::Lifecycle(
                "a workbook needs at least one worksheet".to_string(),
            ));
        }
        if let Some(pending) = self.worksheets.iter().find(|ws| !ws.is_finalized()) {
            return Err(Error::Lifecycle(format!(
                "worksheet '{}' has not been finalized",
                pending.name()
            )));
        }

        self.write_content_types()?;
        self.write_root_relationships()?;
        self.write_workbook_relationships()?;
        self.write_workbook_part()?;

        package::write_package(self.workspace.root(), &self.path)?;
        self.finalized = true;
        Ok(())
    }

    /// `[Content_Types].xml`: extension defaults plus one override per
    /// part, worksheets included.
    fn write_content_types(&self) -> Result<()> {
        let mut buffer = Vec::new();
        let mut xml = Writer::new(&mut buffer);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        let mut types = BytesStart::new("Types");
        types.push_attribute(("xmlns", NS_CONTENT_TYPES));
        xml.write_event(Event::Start(types))?;

        for (extension, content_type) in [
            ("rels", CONTENT_TYPE_RELATIONSHIPS),
            ("xml", CONTENT_TYPE_XML),
        ] {
            let mut default = BytesStart::new("Default");
            default.push_attribute(("Extension", extension));
            default.push_attribute(("ContentType", content_type));
            xml.write_event(Event::Empty(default))?;
        }

        let mut workbook = BytesStart::new("Override");
        workbook.push_attribute(("PartName", "/xl/workbook.xml"));
        workbook.push_attribute(("ContentType", CONTENT_TYPE_WORKBOOK));
        xml.write_event(Event::Empty(workbook))?;

        for worksheet in &self.worksheets {
            let mut over = BytesStart::new("Override");
            let part_name = format!("/xl/worksheets/{}", worksheet.file_name());
            over.push_attribute(("PartName", part_name.as_str()));
            over.push_attribute(("ContentType", CONTENT_TYPE_WORKSHEET));
            xml.write_event(Event::Empty(over))?;
        }

        xml.write_event(Event::End(BytesEnd::new("Types")))?;

        let path = self.workspace.root().join("[Content_Types].xml");
        fs::write(path, buffer)?;
        Ok(())
    }

    /// `_rels/.rels`: the one fixed relationship to the workbook part.
    fn write_root_relationships(&self) -> Result<()> {
        let mut buffer = Vec::new();
        let mut xml = Writer::new(&mut buffer);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        let mut relationships = BytesStart::new("Relationships");
        relationships.push_attribute(("xmlns", NS_RELATIONSHIPS));
        xml.write_event(Event::Start(relationships))?;

        let mut rel = BytesStart::new("Relationship");
        rel.push_attribute(("Id", "rId1"));
        rel.push_attribute(("Type", REL_TYPE_OFFICE_DOCUMENT));
        rel.push_attribute(("Target", "xl/workbook.xml"));
        xml.write_event(Event::Empty(rel))?;

        xml.write_event(Event::End(BytesEnd::new("Relationships")))?;

        let path = self.workspace.rels_dir().join(".rels");
        fs::write(path, buffer)?;
        Ok(())
    }

    /// `xl/_rels/workbook.xml.rels`: one relationship per worksheet, in
    /// ordinal order so `rId{n}` lines up with sheet id `n`.
    fn write_workbook_relationships(&self) -> Result<()> {
        let mut buffer = Vec::new();
        let mut xml = Writer::new(&mut buffer);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        let mut relationships = BytesStart::new("Relationships");
        relationships.push_attribute(("xmlns", NS_RELATIONSHIPS));
        xml.write_event(Event::Start(relationships))?;

        for (i, relationship) in self.relationships.iter().enumerate() {
            let mut rel = BytesStart::new("Relationship");
            let id = format!("rId{}", i + 1);
            rel.push_attribute(("Id", id.as_str()));
            rel.push_attribute(("Type", relationship.rel_type));
            rel.push_attribute(("Target", relationship.target.as_str()));
            xml.write_event(Event::Empty(rel))?;
        }

        xml.write_event(Event::End(BytesEnd::new("Relationships")))?;

        let path = self.workspace.xl_rels_dir().join("workbook.xml.rels");
        fs::write(path, buffer)?;
        Ok(())
    }

    /// `xl/workbook.xml`: the sheet list in ordinal order.
    fn write_workbook_part(&self) -> Result<()> {
        let mut buffer = Vec::new();
        let mut xml = Writer::new(&mut buffer);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        let mut workbook = BytesStart::new("workbook");
        workbook.push_attribute(("xmlns", NS_SPREADSHEET));
        workbook.push_attribute(("xmlns:r", NS_DOC_RELATIONSHIPS));
        xml.write_event(Event::Start(workbook))?;

        let mut file_version = BytesStart::new("fileVersion");
        file_version.push_attribute(("appName", "xl"));
        file_version.push_attribute(("lastEdited", "5"));
        file_version.push_attribute(("lowestEdited", "5"));
        file_version.push_attribute(("rupBuild", "9303"));
        xml.write_event(Event::Empty(file_version))?;

        let mut workbook_pr = BytesStart::new("workbookPr");
        workbook_pr.push_attribute(("defaultThemeVersion", "124226"));
        xml.write_event(Event::Empty(workbook_pr))?;

        xml.write_event(Event::Start(BytesStart::new("bookViews")))?;
        let mut view = BytesStart::new("workbookView");
        view.push_attribute(("xWindow", "480"));
        view.push_attribute(("yWindow", "60"));
        view.push_attribute(("windowWidth", "18195"));
        view.push_attribute(("windowHeight", "8505"));
        xml.write_event(Event::Empty(view))?;
        xml.write_event(Event::End(BytesEnd::new("bookViews")))?;

        xml.write_event(Event::Start(BytesStart::new("sheets")))?;
        for worksheet in &self.worksheets {
            let mut sheet = BytesStart::new("sheet");
            let sheet_id = worksheet.id().to_string();
            let rel_id = format!("rId{}", worksheet.id());
            sheet.push_attribute(("name", worksheet.name()));
            sheet.push_attribute(("sheetId", sheet_id.as_str()));
            sheet.push_attribute(("r:id", rel_id.as_str()));
            xml.write_event(Event::Empty(sheet))?;
        }
        xml.write_event(Event::End(BytesEnd::new("sheets")))?;

        let mut calc_pr = BytesStart::new("calcPr");
        calc_pr.push_attribute(("calcId", "145621"));
        xml.write_event(Event::Empty(calc_pr))?;

        xml.write_event(Event::End(BytesEnd::new("workbook")))?;

        let path = self.workspace.xl_dir().join("workbook.xml");
        fs::write(path, buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        (dir, path)
    }

    #[test]
    fn test_add_worksheet_assigns_ordinals() {
        let (_dir, path) = target();
        let mut wb = Workbook::create(&path).unwrap();

        let first = wb.add_worksheet("First").unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(first.file_name(), "sheet1.xml");

        let second = wb.add_worksheet("Second").unwrap();
        assert_eq!(second.id(), 2);
        assert_eq!(second.file_name(), "sheet2.xml");

        assert_eq!(wb.worksheets().len(), 2);
        assert!(wb.has_pending_worksheets());
    }

    #[test]
    fn test_finalize_without_worksheets_fails() {
        let (_dir, path) = target();
        let mut wb = Workbook::create(&path).unwrap();
        let err = wb.finalize().unwrap_err();
        assert!(matches!(err, Error::Lifecycle(_)));
    }

    #[test]
    fn test_finalize_with_pending_worksheet_fails() {
        let (_dir, path) = target();
        let mut wb = Workbook::create(&path).unwrap();
        wb.add_worksheet("Data").unwrap();
        let err = wb.finalize().unwrap_err();
        assert!(err.to_string().contains("Data"));
        // Retryable: the workbook itself is still open.
        assert!(wb.has_pending_worksheets());
    }

    #[test]
    fn test_worksheet_mut_resolves_by_position() {
        let (_dir, path) = target();
        let mut wb = Workbook::create(&path).unwrap();
        wb.add_worksheet("One").unwrap();
        wb.add_worksheet("Two").unwrap();
        assert_eq!(wb.worksheet_mut(1).unwrap().name(), "Two");
        assert!(wb.worksheet_mut(2).is_none());
    }
}
