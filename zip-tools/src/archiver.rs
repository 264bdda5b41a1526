//! Builds one deflate ZIP archive from a list of named buffers.

use bytes::Bytes;
use log::{debug, info};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::{ToolsetConfig, DEFAULT_ARCHIVE_NAME};
use crate::error::{ToolError, ToolResult};
use crate::host::FileRef;

/// One named buffer to store in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub data: Bytes,
}

impl InputFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { name: name.into(), data: data.into() }
    }
}

impl From<FileRef> for InputFile {
    fn from(file: FileRef) -> Self {
        Self { name: file.filename, data: file.blob }
    }
}

#[derive(Clone, Debug)]
pub struct ArchiveOptions {
    /// Deflate level. `None` uses the codec default.
    pub compression_level: Option<i64>,

    /// Name used when the caller gives none.
    pub default_name: String,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression_level: None,
            default_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl From<&ToolsetConfig> for ArchiveOptions {
    fn from(config: &ToolsetConfig) -> Self {
        Self {
            compression_level: config.compression_level,
            default_name: config.default_archive_name.clone(),
        }
    }
}

/// A finished archive plus the name it should be delivered under.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Clone, Debug, Default)]
pub struct ZipArchiver {
    opts: ArchiveOptions,
}

impl ZipArchiver {
    pub fn new(opts: ArchiveOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.opts
    }

    /// Final archive name: default when absent or empty, `.zip` appended
    /// when missing.
    pub fn resolve_name(&self, requested: Option<&str>) -> String {
        match requested {
            None | Some("") => self.opts.default_name.clone(),
            Some(name) if name.ends_with(".zip") => name.to_string(),
            Some(name) => format!("{}.zip", name),
        }
    }

    /// Validate a host-supplied file list and turn it into archive inputs.
    ///
    /// The list must be non-empty, and no slot may be null. The whole list is
    /// checked before anything is written.
    pub fn collect_inputs(files: Vec<Option<FileRef>>) -> ToolResult<Vec<InputFile>> {
        match files.first() {
            None | Some(None) => return Err(ToolError::invalid_input("No files provided")),
            Some(Some(_)) => {}
        }

        files
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                file.map(InputFile::from).ok_or_else(|| {
                    ToolError::invalid_input(format!("File at position {} is missing", index))
                })
            })
            .collect()
    }

    /// Write `files` in order as deflate entries into a fresh in-memory archive.
    pub fn build(
        &self,
        files: &[InputFile],
        requested_name: Option<&str>,
    ) -> ToolResult<BuiltArchive> {
        validate_entries(files)?;
        let filename = self.resolve_name(requested_name);

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.opts.compression_level);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for file in files {
            debug!("Adding {} ({} bytes) to {}", file.name, file.data.len(), filename);
            writer.start_file(file.name.as_str(), options)?;
            writer.write_all(&file.data)?;
        }
        let data = Bytes::from(writer.finish()?.into_inner());

        info!("Built {} with {} entries ({} bytes)", filename, files.len(), data.len());
        Ok(BuiltArchive { filename, data })
    }
}

fn validate_entries(files: &[InputFile]) -> ToolResult<()> {
    if files.is_empty() {
        return Err(ToolError::invalid_input("No files provided"));
    }

    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        if file.name.is_empty() {
            return Err(ToolError::invalid_input("File name must not be empty"));
        }
        if !seen.insert(file.name.as_str()) {
            return Err(ToolError::invalid_input(format!("Duplicate file name: {}", file.name)));
        }
    }
    Ok(())
}
