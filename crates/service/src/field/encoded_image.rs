//! Image attachment field that travels either as a URL or inline as base64.
//!
//! Outbound (dehydrate) the field produces one of
//!
//! - `null` when the record has no attachment,
//! - the attachment URL (default),
//! - `{"name": ..., "file": <base64>, "content-type": ...}` when inline
//!   encoding is switched on.
//!
//! Inbound (hydrate) it accepts the same shapes back. A string equal to the
//! attachment's current URL means "unchanged" and resolves to the stored name,
//! so the URL is never persisted as if it were a new file reference. The same
//! holds for an inline payload carrying the current file's name and bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use profile_database::file_storage::{FileStorage, StorageError};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("image payload must carry `name` and `file`: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("image content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("could not read attachment {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: StorageError,
    },
}

#[derive(Debug, Deserialize)]
struct EncodedImagePayload {
    name: String,
    file: String,
    #[serde(default, rename = "content-type")]
    content_type: Option<String>,
}

/// A file received in a request body, not yet written to storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InMemoryUpload {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl InMemoryUpload {
    /// Checks the leading bytes against the image formats we know about.
    pub fn is_image(&self) -> bool {
        image::guess_format(&self.data).is_ok()
    }
}

/// What an inbound value means for the stored attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HydratedImage {
    /// The field was not in the payload at all.
    Absent,
    /// `null`, or a value of a shape the field does not understand.
    Clear,
    /// The caller echoed the current URL back; keep this stored name.
    Unchanged(String),
    /// A caller supplied storage name, taken as is.
    Raw(String),
    Upload(InMemoryUpload),
}

#[derive(Clone, Debug)]
pub struct EncodedImageField {
    attribute: &'static str,
    inline_encoding: bool,
}

impl EncodedImageField {
    pub fn new(attribute: &'static str) -> Self {
        Self { attribute, inline_encoding: false }
    }

    pub fn inline_encoding(mut self, inline_encoding: bool) -> Self {
        self.inline_encoding = inline_encoding;
        self
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn is_inline(&self) -> bool {
        self.inline_encoding
    }

    pub fn dehydrate<S: FileStorage>(
        &self,
        storage: &S,
        current: Option<&str>,
        bundle: &Map<String, Value>,
    ) -> Result<Value, FieldError> {
        let Some(name) = current.filter(|name| !name.is_empty()) else {
            return Ok(Value::Null);
        };

        if !self.inline_encoding {
            return Ok(match storage.url(name) {
                Ok(url) => Value::String(url),
                Err(e) => {
                    tracing::debug!(name, error = %e, "attachment url did not resolve");
                    Value::Null
                }
            });
        }

        // already supplied by the caller, skip the disk read
        if let Some(supplied) = bundle.get(self.attribute).filter(|value| !value.is_null()) {
            return Ok(supplied.clone());
        }

        let content = storage.open(name).map_err(|source| FieldError::Io {
            name: name.to_string(),
            source,
        })?;

        Ok(json!({
            "name": basename(name),
            "file": STANDARD.encode(&content),
            "content-type": guess_content_type(name),
        }))
    }

    pub fn hydrate<S: FileStorage>(
        &self,
        storage: &S,
        current: Option<&str>,
        incoming: Option<&Value>,
    ) -> Result<HydratedImage, FieldError> {
        let Some(value) = incoming else {
            return Ok(HydratedImage::Absent);
        };

        match value {
            Value::Object(_) => {
                let payload = EncodedImagePayload::deserialize(value)
                    .map_err(FieldError::MalformedPayload)?;

                // tolerate line-wrapped base64
                let compact: String = payload.file.split_ascii_whitespace().collect();
                let data = STANDARD.decode(compact.as_bytes())?;

                // an echo of what dehydrate produced for the current file
                if let Some(name) = current.filter(|name| basename(name) == payload.name) {
                    if storage.open(name).is_ok_and(|stored| stored == data) {
                        return Ok(HydratedImage::Unchanged(name.to_string()));
                    }
                }

                let content_type = payload
                    .content_type
                    .filter(|content_type| !content_type.is_empty())
                    .unwrap_or_else(|| OCTET_STREAM.to_string());

                Ok(HydratedImage::Upload(InMemoryUpload {
                    name: payload.name,
                    content_type,
                    data,
                }))
            }
            Value::String(raw) => {
                if let Some(name) = current {
                    if storage.url(name).is_ok_and(|url| url == *raw) {
                        return Ok(HydratedImage::Unchanged(name.to_string()));
                    }
                }

                Ok(HydratedImage::Raw(raw.clone()))
            }
            Value::Null => Ok(HydratedImage::Clear),
            other => {
                tracing::debug!(field = self.attribute, value = %other, "unrecognized image value, clearing");
                Ok(HydratedImage::Clear)
            }
        }
    }
}

pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
