// ABOUTME: Multipart form collection for job submission and updates
// ABOUTME: Buffers text fields and file parts by field name

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::{ApiResult, AppError};

#[derive(Debug, Default)]
pub struct Form {
    text: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl Form {
    /// Drain every field. Parts named in `file_fields` or carrying a filename
    /// are kept as raw bytes; everything else must be UTF-8 text.
    pub async fn collect(mut multipart: Multipart, file_fields: &[&str]) -> ApiResult<Self> {
        let mut form = Form::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() || file_fields.contains(&name.as_str()) {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                form.files.insert(name, bytes.to_vec());
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                form.text.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Text field value, `None` when absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Text field that must be present and non-blank
    pub fn required_text(&self, name: &str) -> ApiResult<&str> {
        match self.text(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(AppError::validation(format!("missing field '{name}'"))),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }
}
