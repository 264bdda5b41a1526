//! Binds files on disk to tool parameters and writes yielded blobs back out.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use std::fs;
use std::path::{Component, Path, PathBuf};
use zip_tools::{BlobMessage, FileRef};

/// Load `inputs` as host file references.
///
/// A plain file is named by its file name. Files under a directory are named
/// by their path relative to the directory's parent, so `photos/` contributes
/// `photos/a.jpg`, `photos/2024/b.jpg`.
pub fn collect_files(inputs: &[PathBuf]) -> Result<Vec<FileRef>> {
    let mut files = Vec::new();
    for path in inputs {
        if path.is_file() {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Unsupported file name: {}", path.display()))?;
            files.push(load_file(path, name.to_string())?);
        } else if path.is_dir() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            for entry in walkdir::WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let name = entry_name(entry.path().strip_prefix(base).unwrap_or(entry.path()))?;
                files.push(load_file(entry.path(), name)?);
            }
        } else {
            bail!("Input not found: {}", path.display());
        }
    }
    Ok(files)
}

/// Load one archive file as the `unzip` tool's input.
pub fn load_archive(path: &Path) -> Result<FileRef> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Unsupported file name: {}", path.display()))?
        .to_string();
    let mut file = load_file(path, name)?;
    file.extension = path.extension().and_then(|e| e.to_str()).map(|e| format!(".{}", e));
    Ok(file)
}

fn load_file(path: &Path, name: String) -> Result<FileRef> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(FileRef::new(name, Bytes::from(data)))
}

/// Relative path joined with `/`, the separator zip entry names use.
fn entry_name(relative: &Path) -> Result<String> {
    let parts = relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::Normal(part) => part
                .to_str()
                .with_context(|| format!("Unsupported file name: {}", relative.display())),
            _ => bail!("Unexpected path component in {}", relative.display()),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("/"))
}

/// Resolve a blob's filename under `root`, refusing anything that would
/// escape it.
pub fn output_path(root: &Path, filename: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();
    let mut depth = 0usize;
    for part in filename.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => bail!("Refusing to write outside the output directory: {}", filename),
            part if part.contains(':') => {
                bail!("Refusing to write a drive-qualified path: {}", filename)
            }
            part => {
                path.push(part);
                depth += 1;
            }
        }
    }
    if filename.starts_with(['/', '\\']) {
        bail!("Refusing to write an absolute path: {}", filename);
    }
    if depth == 0 {
        bail!("Empty output file name");
    }
    Ok(path)
}

/// Write one blob under `root` and return where it went.
pub fn write_blob(root: &Path, message: &BlobMessage) -> Result<PathBuf> {
    let path = output_path(root, &message.meta.filename)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(&path, &message.blob)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
