//! Multipart form model
//!
//! Forms are assembled as plain values first and converted to a
//! `reqwest::multipart::Form` only at send time, so the assembly rules can be
//! checked without a network.

use crate::error::{ClientError, Result};
use std::path::Path;

/// What an attached file is used for, and which media types it accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    FaceImage,
    Voice,
    Video,
}

impl MediaKind {
    pub fn field(&self) -> &'static str {
        match self {
            MediaKind::FaceImage => "image",
            MediaKind::Voice => "voice",
            MediaKind::Video => "video",
        }
    }

    pub fn expected(&self) -> &'static str {
        match self {
            MediaKind::FaceImage => "image/*",
            MediaKind::Voice => "audio/wav",
            MediaKind::Video => "video/mp4",
        }
    }

    pub fn accepts(&self, mime: &str) -> bool {
        match self {
            MediaKind::FaceImage => mime.starts_with("image/"),
            MediaKind::Voice => matches!(mime, "audio/wav" | "audio/x-wav" | "audio/wave"),
            MediaKind::Video => mime == "video/mp4",
        }
    }
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Wrap in-memory bytes, typing them from the file name's extension.
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>, kind: MediaKind) -> Result<Self> {
        let mime = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        if !kind.accepts(&mime) {
            return Err(ClientError::UnsupportedMedia {
                field: kind.field(),
                file_name: file_name.to_string(),
                expected: kind.expected(),
            });
        }

        Ok(Self {
            file_name: file_name.to_string(),
            mime,
            bytes,
        })
    }

    /// Read a file from disk for the given purpose.
    pub async fn load(path: &Path, kind: MediaKind) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.field().to_string());

        // Check the type before reading a possibly large file
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        if !kind.accepts(mime.essence_str()) {
            return Err(ClientError::UnsupportedMedia {
                field: kind.field(),
                file_name,
                expected: kind.expected(),
            });
        }

        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(file = %file_name, size = bytes.len(), "Loaded attachment");
        Self::from_bytes(&file_name, bytes, kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    File(Attachment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// Ordered multipart form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::Text(value.into()),
        });
        self
    }

    pub fn file(mut self, name: &str, attachment: Attachment) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::File(attachment),
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }

    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match &p.value {
            PartValue::Text(text) if p.name == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn file_value(&self, name: &str) -> Option<&Attachment> {
        self.parts.iter().find_map(|p| match &p.value {
            PartValue::File(file) if p.name == name => Some(file),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_media_kinds() {
        assert!(MediaKind::FaceImage.accepts("image/png"));
        assert!(MediaKind::FaceImage.accepts("image/jpeg"));
        assert!(!MediaKind::FaceImage.accepts("video/mp4"));
        assert!(MediaKind::Voice.accepts("audio/wav"));
        assert!(!MediaKind::Voice.accepts("audio/mpeg"));
        assert!(MediaKind::Video.accepts("video/mp4"));
    }

    #[test]
    fn test_attachment_from_bytes() {
        let face = Attachment::from_bytes("me.jpg", vec![0xFF, 0xD8, 0xFF], MediaKind::FaceImage)
            .unwrap();
        assert_eq!(face.mime, "image/jpeg");

        let err = Attachment::from_bytes("song.mp3", vec![1, 2], MediaKind::Voice).unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedMedia { field: "voice", .. }));
    }

    #[tokio::test]
    async fn test_attachment_load_from_disk() {
        let mut file = Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[0x89, 0x50, 0x4E, 0x47]).unwrap();

        let attachment = Attachment::load(file.path(), MediaKind::FaceImage)
            .await
            .unwrap();
        assert_eq!(attachment.mime, "image/png");
        assert_eq!(attachment.bytes.len(), 4);

        let err = Attachment::load(file.path(), MediaKind::Video).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_form_lookup() {
        let form = FormPayload::new()
            .text("symptoms", "cough")
            .text("sensors", "{}");
        assert_eq!(form.names(), vec!["symptoms", "sensors"]);
        assert_eq!(form.text_value("symptoms"), Some("cough"));
        assert!(form.file_value("image").is_none());
        assert!(!form.has("voice"));
    }
}
