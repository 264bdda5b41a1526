//! Content-type resolution for extracted entries.
//!
//! Resolution order:
//! 1. extension inference through `mime_guess`
//! 2. magic-byte sniffing through `infer` (only when enabled)
//! 3. the static [`CONTENT_TYPES`] table
//! 4. [`DEFAULT_MIME_TYPE`]

use std::collections::HashMap;
use std::sync::LazyLock;

/// Content type used when nothing else matches.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Content type of the archives produced by the `zip` tool.
pub const ZIP_MIME_TYPE: &str = "application/zip";

const ADDITIONAL_MIME_TYPES: &[(&str, &str)] = &[
    // Documents
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("rst", "text/x-rst"),
    ("tex", "application/x-tex"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    // Code
    ("py", "text/x-python"),
    ("js", "application/javascript"),
    ("jsx", "text/jsx"),
    ("ts", "application/typescript"),
    ("tsx", "text/tsx"),
    ("json", "application/json"),
    ("yaml", "application/x-yaml"),
    ("yml", "application/x-yaml"),
    ("toml", "application/toml"),
    ("ini", "text/plain"),
    ("cfg", "text/plain"),
    ("conf", "text/plain"),
    ("sh", "application/x-sh"),
    ("bat", "application/x-bat"),
    ("ps1", "application/x-powershell"),
    // Images
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    // Other
    ("csv", "text/csv"),
    ("log", "text/plain"),
    ("env", "text/plain"),
    ("gitignore", "text/plain"),
    ("npmrc", "text/plain"),
    ("lock", "text/plain"),
];

/// Extension (lowercase, no dot) to content type. Built once, never mutated.
pub static CONTENT_TYPES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| ADDITIONAL_MIME_TYPES.iter().copied().collect());

/// Extension of the last path component: the text after its last `.`.
///
/// `.gitignore` yields `gitignore`; `Makefile` and `archive.` yield `None`.
pub fn extension_of(name: &str) -> Option<&str> {
    let base = name.rsplit('/').next().unwrap_or(name);
    let (_, ext) = base.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Look an extension up in the static table, ignoring case.
pub fn lookup_extension(ext: &str) -> Option<&'static str> {
    CONTENT_TYPES.get(ext.to_ascii_lowercase().as_str()).copied()
}

/// Resolve the content type of an entry from its name alone.
pub fn guess_mime_type(name: &str) -> String {
    resolve_mime_type(name, &[], false)
}

/// Resolve the content type of an entry from its name and, when
/// `sniff_content` is set, its leading bytes.
pub fn resolve_mime_type(name: &str, data: &[u8], sniff_content: bool) -> String {
    if let Some(mime) = mime_guess::from_path(name).first_raw() {
        return mime.to_string();
    }

    if sniff_content {
        if let Some(kind) = infer::get(data) {
            return kind.mime_type().to_string();
        }
    }

    extension_of(name)
        .and_then(lookup_extension)
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}
