//! Interface to the plugin host: parameters in, blob messages out.

use base64::engine::general_purpose::STANDARD as B64_STD;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ToolError, ToolResult};
use crate::mime;

/// A file reference as handed over by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(alias = "name")]
    pub filename: String,

    /// Extension as reported by the host, with or without a leading dot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(with = "blob")]
    pub blob: Bytes,
}

impl FileRef {
    pub fn new(filename: impl Into<String>, blob: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            extension: None,
            mime_type: None,
            blob: blob.into(),
        }
    }

    /// Lowercased extension without the dot. The host's `extension` field
    /// wins over the filename.
    pub fn extension(&self) -> Option<String> {
        match self.extension.as_deref().map(|e| e.trim_start_matches('.')) {
            Some(ext) if !ext.is_empty() => Some(ext.to_ascii_lowercase()),
            _ => mime::extension_of(&self.filename).map(str::to_ascii_lowercase),
        }
    }
}

/// Named parameters for one tool invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolParameters(Map<String, Value>);

impl ToolParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters from a JSON object.
    pub fn from_value(value: Value) -> ToolResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ToolError::invalid_input(format!(
                "Tool parameters must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with_file(self, key: impl Into<String>, file: &FileRef) -> Self {
        self.with(key, file_value(file))
    }

    pub fn with_files<'a>(
        self,
        key: impl Into<String>,
        files: impl IntoIterator<Item = &'a FileRef>,
    ) -> Self {
        let list: Vec<Value> = files.into_iter().map(file_value).collect();
        self.with(key, Value::Array(list))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Optional string parameter. Null and absent are both `None`.
    pub fn string(&self, key: &str) -> ToolResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ToolError::invalid_input(format!(
                "Parameter '{}' must be a string, got {}",
                key,
                json_kind(other)
            ))),
        }
    }

    /// Optional single-file parameter.
    pub fn file(&self, key: &str) -> ToolResult<Option<FileRef>> {
        self.get(key).map(|v| decode_file(key, v)).transpose()
    }

    /// File-list parameter. Null slots are kept as `None` so callers can
    /// decide how to treat them. A single object is accepted as a list of one.
    pub fn files(&self, key: &str) -> ToolResult<Vec<Option<FileRef>>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Null => Ok(None),
                    v => decode_file(key, v).map(Some),
                })
                .collect(),
            Some(v @ Value::Object(_)) => Ok(vec![Some(decode_file(key, v)?)]),
            Some(other) => Err(ToolError::invalid_input(format!(
                "Parameter '{}' must be a list of files, got {}",
                key,
                json_kind(other)
            ))),
        }
    }
}

fn decode_file(key: &str, value: &Value) -> ToolResult<FileRef> {
    FileRef::deserialize(value)
        .map_err(|e| ToolError::invalid_input(format!("Parameter '{}' is not a file: {}", key, e)))
}

/// The JSON shape `FileRef`'s `Deserialize` reads back, blob as base64.
fn file_value(file: &FileRef) -> Value {
    let mut map = Map::new();
    map.insert("filename".to_string(), Value::from(file.filename.as_str()));
    if let Some(extension) = &file.extension {
        map.insert("extension".to_string(), Value::from(extension.as_str()));
    }
    if let Some(mime_type) = &file.mime_type {
        map.insert("mime_type".to_string(), Value::from(mime_type.as_str()));
    }
    map.insert("blob".to_string(), Value::from(encode_blob(&file.blob)));
    Value::Object(map)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Metadata attached to every yielded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub mime_type: String,
    pub filename: String,
}

/// One result yielded back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobMessage {
    #[serde(with = "blob")]
    pub blob: Bytes,
    pub meta: BlobMeta,
}

pub fn create_blob_message(blob: impl Into<Bytes>, meta: BlobMeta) -> BlobMessage {
    BlobMessage { blob: blob.into(), meta }
}

/// Lazy stream of results from one invocation.
pub type MessageStream = Box<dyn Iterator<Item = ToolResult<BlobMessage>> + Send>;

/// A tool the host can invoke.
///
/// `invoke` validates its parameters eagerly: any error it returns means
/// nothing was produced. Errors yielded by the stream itself are terminal.
pub trait Tool: Send + Sync {
    /// Registry key. Matches `descriptor().name`.
    fn name(&self) -> &'static str;

    fn descriptor(&self) -> ToolDescriptor;

    fn invoke(&self, params: &ToolParameters) -> ToolResult<MessageStream>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    File,
    Files,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl ParameterDescriptor {
    pub(crate) fn new(name: &str, kind: ParameterKind, required: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required,
            description: description.to_string(),
        }
    }
}

/// Blob (de)serialisation: written as base64, read from base64 or a byte list.
mod blob {
    use super::B64_STD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Base64(String),
        Raw(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64_STD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Raw(raw) => Ok(Bytes::from(raw)),
            Repr::Base64(text) => B64_STD
                .decode(text.trim())
                .map(Bytes::from)
                .map_err(|e| de::Error::custom(format!("blob is not valid base64: {}", e))),
        }
    }
}

/// Encode bytes the way blobs travel inside JSON parameters.
pub fn encode_blob(data: &[u8]) -> String {
    B64_STD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_from_byte_list_and_base64() {
        let raw = ToolParameters::new()
            .with("file", json!({ "filename": "a.txt", "blob": [104, 105] }));
        let b64 = ToolParameters::new().with("file", json!({ "name": "a.txt", "blob": "aGk=" }));

        let a = raw.file("file").unwrap().unwrap();
        let b = b64.file("file").unwrap().unwrap();
        assert_eq!(a.blob, Bytes::from_static(b"hi"));
        assert_eq!(a, b);
    }

    #[test]
    fn bad_base64_is_invalid_input() {
        let params =
            ToolParameters::new().with("file", json!({ "filename": "a.zip", "blob": "%%%" }));
        assert!(matches!(params.file("file"), Err(ToolError::InvalidInput(_))));
    }

    #[test]
    fn extension_prefers_host_field() {
        let mut file = FileRef::new("archive.bin", Bytes::new());
        assert_eq!(file.extension().as_deref(), Some("bin"));

        file.extension = Some(".ZIP".to_string());
        assert_eq!(file.extension().as_deref(), Some("zip"));

        file.extension = Some(String::new());
        assert_eq!(file.extension().as_deref(), Some("bin"));
    }

    #[test]
    fn files_keeps_null_slots() {
        let params = ToolParameters::new().with(
            "files",
            json!([{ "filename": "a", "blob": [] }, null]),
        );
        let files = params.files("files").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].is_some());
        assert!(files[1].is_none());

        assert!(ToolParameters::new().files("files").unwrap().is_empty());
    }

    #[test]
    fn string_rejects_non_strings() {
        let params = ToolParameters::new().with("file_name", 42).with("empty", Value::Null);
        assert!(params.string("file_name").is_err());
        assert_eq!(params.string("empty").unwrap(), None);
        assert_eq!(params.string("missing").unwrap(), None);
    }

    #[test]
    fn builders_round_trip_through_json() {
        let file = FileRef::new("notes.md", Bytes::from_static(b"# hi"));
        let params = ToolParameters::new().with_files("files", [&file]).with_file("file", &file);
        assert_eq!(params.files("files").unwrap(), vec![Some(file.clone())]);
        assert_eq!(params.file("file").unwrap(), Some(file));
    }

    #[test]
    fn with_file_keeps_optional_fields() {
        let mut file = FileRef::new("bundle.zip", Bytes::from_static(b"PK"));
        file.extension = Some(".zip".to_string());
        file.mime_type = Some("application/zip".to_string());

        let params = ToolParameters::new().with_file("file", &file);
        let value = params.get("file").unwrap();
        assert!(value.is_object());
        assert_eq!(value["blob"], "UEs=");
        assert_eq!(params.file("file").unwrap(), Some(file));

        let bare = FileRef::new("a.txt", Bytes::new());
        let value = file_value(&bare);
        assert_eq!(value, json!({ "filename": "a.txt", "blob": "" }));
    }

    #[test]
    fn from_value_requires_object() {
        assert!(ToolParameters::from_value(json!([1, 2])).is_err());
        assert!(ToolParameters::from_value(json!({})).is_ok());
    }

    #[test]
    fn blob_message_serialises_meta() {
        let msg = create_blob_message(
            Bytes::from_static(b"hi"),
            BlobMeta { mime_type: "text/plain".into(), filename: "a.txt".into() },
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["blob"], "aGk=");
        assert_eq!(value["meta"]["mime_type"], "text/plain");
        assert_eq!(value["meta"]["filename"], "a.txt");
        assert_eq!(encode_blob(b"hi"), "aGk=");
    }
}
