//! The `zip` and `unzip` tools and the toolset that registers them.

use log::info;
use serde::Serialize;

use crate::archiver::{ArchiveOptions, ZipArchiver};
use crate::config::ToolsetConfig;
use crate::error::{ToolError, ToolResult};
use crate::extractor::{is_archive_extension, ExtractOptions, ZipExtractor};
use crate::host::{
    create_blob_message, BlobMeta, MessageStream, ParameterDescriptor, ParameterKind, Tool,
    ToolDescriptor, ToolParameters,
};
use crate::mime::ZIP_MIME_TYPE;

pub const TOOLSET_NAME: &str = "zip";
pub const ZIP_TOOL: &str = "zip";
pub const UNZIP_TOOL: &str = "unzip";

/// Compresses the `files` parameter into one archive.
#[derive(Debug, Clone, Default)]
pub struct ZipTool {
    archiver: ZipArchiver,
}

impl ZipTool {
    pub fn new(opts: ArchiveOptions) -> Self {
        Self { archiver: ZipArchiver::new(opts) }
    }
}

impl Tool for ZipTool {
    fn name(&self) -> &'static str {
        ZIP_TOOL
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: "Compress multiple files into a zip file.".to_string(),
            parameters: vec![
                ParameterDescriptor::new(
                    "files",
                    ParameterKind::Files,
                    true,
                    "The files you want to zip",
                ),
                ParameterDescriptor::new(
                    "file_name",
                    ParameterKind::String,
                    false,
                    "The name of the zip file, default is \"files.zip\"",
                ),
            ],
        }
    }

    fn invoke(&self, params: &ToolParameters) -> ToolResult<MessageStream> {
        let inputs = ZipArchiver::collect_inputs(params.files("files")?)?;
        let requested = params.string("file_name")?;

        let built = self.archiver.build(&inputs, requested.as_deref())?;
        let message = create_blob_message(
            built.data,
            BlobMeta { mime_type: ZIP_MIME_TYPE.to_string(), filename: built.filename },
        );
        Ok(Box::new(std::iter::once(Ok(message))))
    }
}

/// Extracts the `file` parameter, one blob per file entry.
#[derive(Debug, Clone, Default)]
pub struct UnzipTool {
    extractor: ZipExtractor,
}

impl UnzipTool {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { extractor: ZipExtractor::new(opts) }
    }
}

impl Tool for UnzipTool {
    fn name(&self) -> &'static str {
        UNZIP_TOOL
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: "Extract files from a zip file. Yields one file per archive entry."
                .to_string(),
            parameters: vec![ParameterDescriptor::new(
                "file",
                ParameterKind::File,
                true,
                "The zip file to extract",
            )],
        }
    }

    fn invoke(&self, params: &ToolParameters) -> ToolResult<MessageStream> {
        let file = params
            .file("file")?
            .ok_or_else(|| ToolError::invalid_input("No file provided"))?;

        if !file.extension().as_deref().is_some_and(is_archive_extension) {
            return Err(ToolError::invalid_input("Not a zip file provided"));
        }

        info!("Extracting {} ({} bytes)", file.filename, file.blob.len());
        let extraction = self.extractor.open(file.blob)?;
        Ok(Box::new(extraction.map(|result| {
            result.map(|entry| {
                let meta = BlobMeta { mime_type: entry.mime_type, filename: entry.name };
                create_blob_message(entry.data, meta)
            })
        })))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsetMeta {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
}

pub const TOOLSET_META: ToolsetMeta = ToolsetMeta {
    name: TOOLSET_NAME,
    label: "Zip",
    description: "Compress multiple files into a zip file and extract files from zip archives.",
    tags: &["zip", "compression", "archive", "tool"],
};

/// Both tools, configured from one [`ToolsetConfig`].
pub struct ZipToolset {
    config: ToolsetConfig,
    tools: Vec<Box<dyn Tool>>,
}

impl ZipToolset {
    pub fn new(config: ToolsetConfig) -> ToolResult<Self> {
        config.validate()?;
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(ZipTool::new(ArchiveOptions::from(&config))),
            Box::new(UnzipTool::new(ExtractOptions::from(&config))),
        ];
        Ok(Self { config, tools })
    }

    pub fn meta(&self) -> &'static ToolsetMeta {
        &TOOLSET_META
    }

    pub fn config(&self) -> &ToolsetConfig {
        &self.config
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| &**t)
    }

    pub fn invoke(&self, name: &str, params: &ToolParameters) -> ToolResult<MessageStream> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(params)
    }
}
