// crates/core/src/jobs/payload.rs
//! Multipart payloads for job submission.

use reqwest::multipart::{Form, Part};

use crate::error::JobError;

/// A single form field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    Text(String),
    File {
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
}

/// Ordered key/value pairs sent to a job endpoint as multipart form data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPayload {
    fields: Vec<(String, PayloadValue)>,
}

impl JobPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), PayloadValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        key: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
    ) -> Self {
        self.fields.push((
            key.into(),
            PayloadValue::File {
                file_name: file_name.into(),
                bytes,
                mime: mime.into(),
            },
        ));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[(String, PayloadValue)] {
        &self.fields
    }

    /// First text value stored under `key`.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.fields.iter().find_map(|(k, v)| match v {
            PayloadValue::Text(text) if k == key => Some(text.as_str()),
            _ => None,
        })
    }

    /// Field names and sizes, for logging without dumping file contents.
    pub fn describe(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(key, value)| match value {
                PayloadValue::Text(text) => format!("{key}={text}"),
                PayloadValue::File { file_name, bytes, .. } => {
                    format!("{key}=<{file_name}: {} bytes>", bytes.len())
                }
            })
            .collect()
    }

    pub fn into_form(self) -> Result<Form, JobError> {
        let mut form = Form::new();
        for (key, value) in self.fields {
            form = match value {
                PayloadValue::Text(text) => form.text(key, text),
                PayloadValue::File {
                    file_name,
                    bytes,
                    mime,
                } => {
                    let part = Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|e| JobError::InvalidPayload(format!("{key}: {e}")))?;
                    form.part(key, part)
                }
            };
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_preserves_order() {
        let payload = JobPayload::new()
            .text("uuid", "u-1")
            .text("datasets", "a,b")
            .file("file", "areas.zip", vec![1, 2, 3], "application/zip");

        assert_eq!(payload.len(), 3);
        let keys: Vec<&str> = payload.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["uuid", "datasets", "file"]);
        assert_eq!(payload.get_text("datasets"), Some("a,b"));
        assert_eq!(payload.get_text("file"), None);
    }

    #[test]
    fn test_payload_describe_hides_bytes() {
        let payload = JobPayload::new()
            .text("name", "Test areas")
            .file("file", "areas.zip", vec![0; 42], "application/zip");
        assert_eq!(
            payload.describe(),
            vec!["name=Test areas".to_string(), "file=<areas.zip: 42 bytes>".to_string()]
        );
    }

    #[test]
    fn test_into_form_rejects_bad_mime() {
        let payload = JobPayload::new().file("file", "areas.zip", vec![], "not a mime");
        let err = payload.into_form().unwrap_err();
        assert!(matches!(err, JobError::InvalidPayload(msg) if msg.starts_with("file:")));
    }

    #[test]
    fn test_empty_payload_builds_form() {
        let payload = JobPayload::new();
        assert!(payload.is_empty());
        assert!(payload.into_form().is_ok());
    }
}
