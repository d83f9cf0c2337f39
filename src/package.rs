//! Package boundary: the temporary part workspace and the archiver.
//!
//! Worksheet parts are streamed into an isolated directory tree and the
//! finished tree is compressed into the target package in one pass.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Isolated directory tree holding the package parts before archiving.
///
/// Allocated before any worksheet may start; the four subdirectories
/// mirror the package's internal layout. The whole tree is removed when
/// the workspace is dropped.
#[derive(Debug)]
pub(crate) struct Workspace {
    root: TempDir,
    rels_dir: PathBuf,
    xl_dir: PathBuf,
    xl_rels_dir: PathBuf,
    worksheets_dir: PathBuf,
}

impl Workspace {
    pub(crate) fn create() -> Result<Self> {
        let root = tempfile::Builder::new().prefix("xlpress-").tempdir()?;

        let rels_dir = root.path().join("_rels");
        let xl_dir = root.path().join("xl");
        let xl_rels_dir = xl_dir.join("_rels");
        let worksheets_dir = xl_dir.join("worksheets");

        fs::create_dir(&rels_dir)?;
        fs::create_dir(&xl_dir)?;
        fs::create_dir(&xl_rels_dir)?;
        fs::create_dir(&worksheets_dir)?;

        Ok(Self {
            root,
            rels_dir,
            xl_dir,
            xl_rels_dir,
            worksheets_dir,
        })
    }

    pub(crate) fn root(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn rels_dir(&self) -> &Path {
        &self.rels_dir
    }

    pub(crate) fn xl_dir(&self) -> &Path {
        &self.xl_dir
    }

    pub(crate) fn xl_rels_dir(&self) -> &Path {
        &self.xl_rels_dir
    }

    pub(crate) fn worksheets_dir(&self) -> &Path {
        &self.worksheets_dir
    }
}

/// Compress the workspace tree into a package at `target`.
pub(crate) fn write_package(root: &Path, target: &Path) -> Result<()> {
    let file = File::create(target).map_err(|e| {
        Error::Packaging(format!("failed to create {}: {}", target.display(), e))
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_directory(&mut zip, root, root, options)?;

    let mut stream = zip.finish()?;
    stream.flush()?;
    Ok(())
}

fn add_directory<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            add_directory(zip, root, &path, options)?;
        } else {
            zip.start_file(part_name(root, &path)?, options)?;
            let mut source = File::open(&path)?;
            io::copy(&mut source, zip)?;
        }
    }
    Ok(())
}

/// Workspace-relative path with forward slashes, as required inside the
/// package.
fn part_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::Packaging(format!(
            "{} is outside the package workspace",
            path.display()
        ))
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
