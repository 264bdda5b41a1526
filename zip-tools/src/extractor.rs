//! Lazy extraction of a ZIP archive into named buffers.
//!
//! [`ZipExtractor::open`] parses the central directory up front, so a
//! malformed archive fails before anything is yielded. Entries are then
//! decompressed one at a time as the [`Extraction`] iterator is advanced.
//! Directory entries never produce output.

use bytes::Bytes;
use log::{debug, info, warn};
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::config::{ToolsetConfig, ARCHIVE_EXTENSION};
use crate::error::{ToolError, ToolResult};
use crate::mime;
use crate::names;

#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Open `.zip` entries and yield their contents instead.
    pub expand_nested: bool,

    /// Nesting limit for `expand_nested`. The outer archive is depth 0.
    pub max_depth: usize,

    /// Fail an entry whose decompressed size exceeds this many bytes.
    pub max_entry_bytes: Option<u64>,

    /// Allow magic-byte sniffing for content types.
    pub sniff_content: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            expand_nested: false,
            max_depth: 10,
            max_entry_bytes: None,
            sniff_content: false,
        }
    }
}

impl From<&ToolsetConfig> for ExtractOptions {
    fn from(config: &ToolsetConfig) -> Self {
        Self {
            expand_nested: config.expand_nested_archives,
            max_depth: config.max_nesting_depth,
            max_entry_bytes: config.max_entry_bytes,
            sniff_content: config.sniff_content,
        }
    }
}

/// One file entry read out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Entry name including its path inside the archive.
    pub name: String,
    pub data: Bytes,
    pub mime_type: String,
}

#[derive(Clone, Debug, Default)]
pub struct ZipExtractor {
    opts: ExtractOptions,
}

impl ZipExtractor {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    /// Parse `data` as an archive and return an iterator over its file entries.
    pub fn open(&self, data: Bytes) -> ToolResult<Extraction> {
        let archive = ZipArchive::new(Cursor::new(data)).map_err(ToolError::corrupt)?;
        info!("Opened archive with {} entries", archive.len());
        Ok(Extraction {
            frames: vec![Frame { archive, next: 0, prefix: String::new(), depth: 0 }],
            opts: self.opts.clone(),
        })
    }
}

/// The file extension a tool input must carry to be treated as an archive.
pub fn is_archive_extension(ext: &str) -> bool {
    ext.trim_start_matches('.').eq_ignore_ascii_case(ARCHIVE_EXTENSION)
}

struct Frame {
    archive: ZipArchive<Cursor<Bytes>>,
    next: usize,
    /// Directory the nested archive lived in, with a trailing `/`.
    prefix: String,
    depth: usize,
}

/// Single-pass iterator over the file entries of an archive.
///
/// Yields at most one `Err`; the iterator is exhausted afterwards.
/// Dropping it releases the archive buffers.
pub struct Extraction {
    frames: Vec<Frame>,
    opts: ExtractOptions,
}

enum Step {
    Yield(ExtractedFile),
    Descend(Frame),
    Skip,
}

impl Extraction {
    fn step(&mut self) -> Option<ToolResult<Step>> {
        let frame = self.frames.last_mut()?;
        if frame.next >= frame.archive.len() {
            self.frames.pop();
            return Some(Ok(Step::Skip));
        }
        let index = frame.next;
        frame.next += 1;
        let depth = frame.depth;
        let prefix = frame.prefix.clone();

        Some(read_entry(&mut frame.archive, index, &self.opts).map(|entry| {
            let Some((name, data)) = entry else {
                return Step::Skip;
            };
            let full_name = format!("{}{}", prefix, name);

            if self.opts.expand_nested && is_nested_archive(&name) {
                if depth >= self.opts.max_depth {
                    warn!(
                        "Maximum nesting depth ({}) reached at {}, keeping it as a file",
                        self.opts.max_depth, full_name
                    );
                } else {
                    match ZipArchive::new(Cursor::new(data.clone())) {
                        Ok(archive) => {
                            debug!("Descending into nested archive {}", full_name);
                            return Step::Descend(Frame {
                                archive,
                                next: 0,
                                prefix: parent_dir(&full_name),
                                depth: depth + 1,
                            });
                        }
                        Err(e) => warn!("Failed to open nested archive {}: {}", full_name, e),
                    }
                }
            }

            let mime_type = mime::resolve_mime_type(&full_name, &data, self.opts.sniff_content);
            Step::Yield(ExtractedFile { name: full_name, data, mime_type })
        }))
    }
}

impl Iterator for Extraction {
    type Item = ToolResult<ExtractedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.step()? {
                Ok(Step::Yield(file)) => {
                    let size = file.data.len();
                    debug!("Extracted {} ({}, {} bytes)", file.name, file.mime_type, size);
                    return Some(Ok(file));
                }
                Ok(Step::Descend(frame)) => self.frames.push(frame),
                Ok(Step::Skip) => {}
                Err(e) => {
                    self.frames.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read entry `index` in full. Directories give `Ok(None)`.
fn read_entry(
    archive: &mut ZipArchive<Cursor<Bytes>>,
    index: usize,
    opts: &ExtractOptions,
) -> ToolResult<Option<(String, Bytes)>> {
    let entry = archive.by_index(index).map_err(ToolError::corrupt)?;
    if entry.is_dir() {
        debug!("Skipping directory {}", entry.name());
        return Ok(None);
    }
    let name = names::decode_entry_name(entry.name_raw(), entry.name());

    let mut buf = Vec::with_capacity(entry.size().min(64 * 1024 * 1024) as usize);
    match opts.max_entry_bytes {
        Some(limit) => {
            // Read one byte past the limit: the declared size can lie.
            entry.take(limit.saturating_add(1)).read_to_end(&mut buf).map_err(ToolError::corrupt)?;
            if buf.len() as u64 > limit {
                return Err(ToolError::EntryTooLarge { name, limit });
            }
        }
        None => {
            let mut entry = entry;
            entry.read_to_end(&mut buf).map_err(ToolError::corrupt)?;
        }
    }

    Ok(Some((name, Bytes::from(buf))))
}

fn is_nested_archive(name: &str) -> bool {
    mime::extension_of(name).is_some_and(is_archive_extension)
}

/// `a/b/inner.zip` -> `a/b/`; `inner.zip` -> ``.
fn parent_dir(name: &str) -> String {
    match name.rfind('/') {
        Some(pos) => name[..=pos].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    enum Item<'a> {
        Dir(&'a str),
        File(&'a str, &'a [u8]),
    }

    fn build(items: &[Item]) -> Bytes {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for item in items {
            match item {
                Item::Dir(name) => writer.add_directory(*name, options).unwrap(),
                Item::File(name, data) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(data).unwrap();
                }
            }
        }
        Bytes::from(writer.finish().unwrap().into_inner())
    }

    fn names(extraction: Extraction) -> Vec<String> {
        extraction.map(|r| r.unwrap().name).collect()
    }

    #[test]
    fn test_skips_directories() {
        let data = build(&[Item::Dir("docs/"), Item::File("notes.md", b"# Notes")]);
        let extraction = ZipExtractor::default().open(data).unwrap();
        let files: Vec<_> = extraction.collect::<ToolResult<_>>().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "notes.md");
        assert_eq!(files[0].mime_type, "text/markdown");
        assert_eq!(&files[0].data[..], b"# Notes");
    }

    #[test]
    fn test_preserves_order_and_paths() {
        let data = build(&[
            Item::File("z.txt", b"z"),
            Item::File("sub/a.txt", b"a"),
            Item::File("m.txt", b"m"),
        ]);
        let extraction = ZipExtractor::default().open(data).unwrap();
        assert_eq!(names(extraction), vec!["z.txt", "sub/a.txt", "m.txt"]);
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        let data = build(&[Item::File("script.unknownext", b"echo")]);
        let file = ZipExtractor::default().open(data).unwrap().next().unwrap().unwrap();
        assert_eq!(file.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_corrupt_archive() {
        let result = ZipExtractor::default().open(Bytes::from_static(b"not a zip file"));
        assert!(matches!(result, Err(ToolError::CorruptArchive(_))));
    }

    #[test]
    fn test_empty_archive_yields_nothing() {
        let data = build(&[Item::Dir("empty/")]);
        assert_eq!(ZipExtractor::default().open(data).unwrap().count(), 0);
    }

    #[test]
    fn test_nested_archives_kept_by_default() {
        let inner = build(&[Item::File("inner.txt", b"nested")]);
        let outer = build(&[Item::File("pack/inner.zip", &inner)]);

        let file = ZipExtractor::default().open(outer).unwrap().next().unwrap().unwrap();
        assert_eq!(file.name, "pack/inner.zip");
        assert_eq!(file.mime_type, "application/zip");
    }

    #[test]
    fn test_nested_archives_expanded() {
        let inner = build(&[Item::File("inner.txt", b"nested"), Item::Dir("d/")]);
        let outer = build(&[
            Item::File("first.txt", b"1"),
            Item::File("pack/inner.zip", &inner),
            Item::File("last.txt", b"2"),
        ]);

        let opts = ExtractOptions { expand_nested: true, ..Default::default() };
        let extractor = ZipExtractor::new(opts);
        let files: Vec<_> = extractor.open(outer).unwrap().collect::<ToolResult<_>>().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "pack/inner.txt", "last.txt"]);
        assert_eq!(&files[1].data[..], b"nested");
    }

    #[test]
    fn test_nesting_depth_limit() {
        let level2 = build(&[Item::File("deep.txt", b"deep")]);
        let level1 = build(&[Item::File("l2.zip", &level2)]);
        let outer = build(&[Item::File("l1.zip", &level1)]);

        let opts = ExtractOptions { expand_nested: true, max_depth: 1, ..Default::default() };
        let extractor = ZipExtractor::new(opts);
        assert_eq!(names(extractor.open(outer).unwrap()), vec!["l2.zip"]);
    }

    #[test]
    fn test_broken_nested_archive_kept_as_file() {
        let outer = build(&[Item::File("fake.zip", b"not really")]);
        let opts = ExtractOptions { expand_nested: true, ..Default::default() };
        let extractor = ZipExtractor::new(opts);
        assert_eq!(names(extractor.open(outer).unwrap()), vec!["fake.zip"]);
    }

    #[test]
    fn test_entry_size_limit() {
        let data = build(&[Item::File("small.txt", b"ok"), Item::File("big.bin", &[0u8; 100])]);
        let opts = ExtractOptions { max_entry_bytes: Some(10), ..Default::default() };
        let extractor = ZipExtractor::new(opts);
        let mut extraction = extractor.open(data).unwrap();

        assert!(extraction.next().unwrap().is_ok());
        assert!(matches!(extraction.next(), Some(Err(ToolError::EntryTooLarge { limit: 10, .. }))));
        assert!(extraction.next().is_none());
    }

    #[test]
    fn test_archive_extension() {
        assert!(is_archive_extension("zip"));
        assert!(is_archive_extension(".ZIP"));
        assert!(!is_archive_extension("tar"));
        assert_eq!(parent_dir("a/b/c.zip"), "a/b/");
        assert_eq!(parent_dir("c.zip"), "");
    }

    /// A single empty stored entry whose name is raw bytes with no UTF-8 flag.
    fn legacy_named_archive(name: &[u8]) -> Bytes {
        let name_len = name.len() as u16;
        let mut out = Vec::new();

        // local file header
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        for field in [20u16, 0, 0, 0, 0x0021] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&[0u8; 12]); // crc, compressed and uncompressed size
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);

        // central directory
        let cd_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        for field in [20u16, 20, 0, 0, 0, 0x0021] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&[0u8; 12]);
        for field in [name_len, 0, 0, 0, 0] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name);
        let cd_size = out.len() as u32 - cd_offset;

        // end of central directory
        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        for field in [0u16, 0, 1, 1] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        Bytes::from(out)
    }

    #[test]
    fn test_legacy_encoded_entry_name() {
        // "中文.txt" in GBK, as written by a Chinese-locale Windows archiver
        let data = legacy_named_archive(&[0xD6, 0xD0, 0xCE, 0xC4, b'.', b't', b'x', b't']);
        let file = ZipExtractor::default().open(data).unwrap().next().unwrap().unwrap();

        assert_eq!(file.name, "中文.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert!(file.data.is_empty());
    }
}
