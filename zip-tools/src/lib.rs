//! zip-tools - the `zip` and `unzip` plugin tools
//!
//! Both tools take their inputs from host-supplied [`ToolParameters`] and
//! hand their results back as [`BlobMessage`]s carrying `mime_type` and
//! `filename` metadata. All work happens in memory.
//!
//! - archiver: many named buffers into one deflate archive
//! - extractor: one archive into a lazy stream of file entries
//! - mime: content types for extracted entries
//! - names: entry names stored in legacy code pages
//! - host: parameters, blob messages and the [`Tool`] trait
//! - tools: the two tools and the [`ZipToolset`] registry

pub mod archiver;
pub mod config;
pub mod error;
pub mod extractor;
pub mod host;
pub mod mime;
pub mod names;
pub mod tools;

pub use archiver::{ArchiveOptions, BuiltArchive, InputFile, ZipArchiver};
pub use config::ToolsetConfig;
pub use error::{ToolError, ToolResult};
pub use extractor::{ExtractOptions, ExtractedFile, Extraction, ZipExtractor};
pub use host::{
    create_blob_message, BlobMessage, BlobMeta, FileRef, MessageStream, Tool, ToolDescriptor,
    ToolParameters,
};
pub use tools::{UnzipTool, ZipTool, ZipToolset, UNZIP_TOOL, ZIP_TOOL};
