//! Multipart form collection.
//!
//! Buffers every part of a `multipart/form-data` body: text parts become
//! (possibly repeated) string fields, file parts become [`Upload`]s keyed by
//! field name. A trailing `[]` on a field name is ignored. File parts are
//! only accepted for the fields a handler lists, each with its own cap.

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use ut_core::models::Upload;
use ut_core::services::TagsInput;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<Upload>>,
}

impl FormData {
    /// `file_limits` names the file fields the caller expects and how many
    /// files each may carry. The cap is checked before a part is buffered.
    pub async fn collect(
        mut payload: Multipart,
        max_part_bytes: usize,
        file_limits: &[(&str, usize)],
    ) -> ApiResult<Self> {
        let mut form = FormData::default();

        while let Some(mut field) = payload
            .try_next()
            .await
            .map_err(|err| ApiError::invalid("body", err.to_string()))?
        {
            let disposition = field.content_disposition();
            let name = disposition
                .get_name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();
            let filename = disposition.get_filename().map(str::to_string);
            let declared_type = field.content_type().map(|mime| mime.essence_str().to_string());
            let file_cap = match filename {
                Some(_) => Some(file_limit(file_limits, &name)?),
                None => None,
            };

            let mut data = Vec::new();
            while let Some(chunk) = field
                .try_next()
                .await
                .map_err(|err| ApiError::invalid(&name, err.to_string()))?
            {
                if let Some(cap) = file_cap {
                    if data.is_empty() && form.file_count(&name) >= cap {
                        return Err(ApiError::invalid(&name, format!("accepts at most {cap} file(s)")));
                    }
                }
                if data.len() + chunk.len() > max_part_bytes {
                    return Err(ApiError::invalid(&name, format!("exceeds the {max_part_bytes} byte limit")));
                }
                data.extend_from_slice(&chunk);
            }

            match filename {
                // Browsers send an empty part for an untouched file input.
                Some(_) if data.is_empty() => {}
                Some(filename) => {
                    let content_type = declared_type
                        .filter(|ct| ct != "application/octet-stream")
                        .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());
                    form.files.entry(name).or_default().push(Upload {
                        filename: Some(filename),
                        content_type,
                        data,
                    });
                }
                None => {
                    let text = String::from_utf8(data).map_err(|_| ApiError::invalid(&name, "must be UTF-8 text"))?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }

        Ok(form)
    }

    /// Last value of a text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|values| values.last()).cloned()
    }

    /// Every value of a repeated field. A single value holding a JSON array
    /// is expanded.
    pub fn list(&self, name: &str) -> Vec<String> {
        match self.fields.get(name).map(Vec::as_slice) {
            None => Vec::new(),
            Some([single]) if single.trim_start().starts_with('[') => {
                serde_json::from_str(single).unwrap_or_else(|_| vec![single.clone()])
            }
            Some(values) => values.to_vec(),
        }
    }

    /// Tags as a comma-separated string (one part) or a list (repeated parts).
    pub fn tags(&self, name: &str) -> Option<TagsInput> {
        match self.fields.get(name).map(Vec::as_slice) {
            None => None,
            Some([single]) => Some(TagsInput::Csv(single.clone())),
            Some(values) => Some(TagsInput::List(values.to_vec())),
        }
    }

    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        self.files.remove(name).unwrap_or_default()
    }

    /// The file of a single-file field.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }

    fn file_count(&self, name: &str) -> usize {
        self.files.get(name).map_or(0, Vec::len)
    }
}

fn file_limit(file_limits: &[(&str, usize)], name: &str) -> ApiResult<usize> {
    file_limits
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, cap)| *cap)
        .ok_or_else(|| ApiError::invalid(name, "does not accept file uploads"))
}
