//! Error taxonomy shared by both tools.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrong extension, missing or malformed parameters, bad entry names.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The archive bytes could not be parsed or an entry failed to decode.
    #[error("Not a valid zip file provided: {0}")]
    CorruptArchive(String),

    #[error("Entry {name} exceeds size limit ({limit} bytes)")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip codec error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type ToolResult<T> = Result<T, ToolError>;

impl ToolError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Map a codec error raised while *reading* an archive.
    ///
    /// Reading failures all mean the input is bad, so they are reported as
    /// `CorruptArchive` rather than as a codec fault.
    pub(crate) fn corrupt(err: impl std::fmt::Display) -> Self {
        Self::CorruptArchive(err.to_string())
    }
}
