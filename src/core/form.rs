use std::collections::HashMap;

use spin_sdk::http::Request;
use uuid::Uuid;

use crate::config::{image_key, ALLOWED_IMAGE_TYPES};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::store::DocumentStore;

/// One uploaded file from a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Request body fields, whether they arrived as JSON or as a multipart form.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: Vec<FilePart>,
}

impl Form {
    pub fn from_request(req: &Request) -> ApiResult<Form> {
        let content_type = req
            .header("content-type")
            .and_then(|h| h.as_str())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("multipart/form-data") {
            let boundary = boundary(&content_type)
                .ok_or_else(|| ApiError::bad_request("Missing multipart boundary"))?;
            return parse_multipart(req.body(), &boundary);
        }

        Form::from_json(req.body())
    }

    pub fn from_json(body: &[u8]) -> ApiResult<Form> {
        let mut form = Form::default();
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(form);
        }

        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| ApiError::bad_request("Malformed request body"))?;
        let object = value
            .as_object()
            .ok_or_else(|| ApiError::bad_request("Malformed request body"))?;

        for (key, value) in object {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            form.fields.insert(key.clone(), text);
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed, non-empty text field.
    pub fn required(&self, name: &str) -> Option<&str> {
        self.text(name).map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.text(name)? {
            "true" | "1" | "on" => Some(true),
            "false" | "0" | "off" => Some(false),
            _ => None,
        }
    }

    pub fn files(&self, field: &str) -> Vec<&FilePart> {
        self.files.iter().filter(|f| f.field == field).collect()
    }

    /// Validates and stores every file uploaded under `field`, returning the
    /// stored image names in upload order.
    pub fn save_images(
        &self,
        store: &dyn DocumentStore,
        field: &str,
        prefix: &str,
        user_id: &str,
    ) -> ApiResult<Vec<String>> {
        let files = self.files(field);
        for file in &files {
            if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
                return Err(ApiError::bad_request("Please provide a valid image file"));
            }
        }

        let mut saved = Vec::with_capacity(files.len());
        for file in files {
            let extension = file.content_type.split('/').nth(1).unwrap_or("png");
            let name = format!("{}_{}_{}.{}", prefix, Uuid::new_v4(), user_id, extension);
            store.set(&image_key(&name), &file.data)?;
            tracing::debug!(image = %name, bytes = file.data.len(), source = %file.filename, "stored upload");
            saved.push(name);
        }
        Ok(saved)
    }

    /// Like [`Form::save_images`] for fields that take one picture. More than
    /// one file is rejected before anything is stored.
    pub fn save_single_image(
        &self,
        store: &dyn DocumentStore,
        field: &str,
        prefix: &str,
        user_id: &str,
    ) -> ApiResult<Option<String>> {
        if self.files(field).len() > 1 {
            return Err(ApiError::bad_request("Please provide a single image file"));
        }
        Ok(self.save_images(store, field, prefix, user_id)?.into_iter().next())
    }
}

fn boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key.eq_ignore_ascii_case("boundary")).then(|| value.trim_matches('"').to_string())
    })
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Value of a `key="value"` parameter in a Content-Disposition header.
fn disposition_param(header: &str, key: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let (k, v) = part.trim().split_once('=')?;
        (k.eq_ignore_ascii_case(key)).then(|| v.trim_matches('"').to_string())
    })
}

fn parse_multipart(body: &[u8], boundary: &str) -> ApiResult<Form> {
    let malformed = || ApiError::bad_request("Malformed multipart body");
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut form = Form::default();

    let mut cursor = find(body, &delimiter, 0).ok_or_else(malformed)? + delimiter.len();
    loop {
        // "--" after a delimiter closes the body
        if body[cursor..].starts_with(b"--") {
            break;
        }
        let part_start = find(body, b"\r\n", cursor).ok_or_else(malformed)? + 2;
        let next = find(body, &delimiter, part_start).ok_or_else(malformed)?;
        // Part data is followed by CRLF before the next delimiter
        let part = &body[part_start..next.saturating_sub(2).max(part_start)];

        let header_end = find(part, b"\r\n\r\n", 0).ok_or_else(malformed)?;
        let headers = String::from_utf8_lossy(&part[..header_end]);
        let data = &part[header_end + 4..];

        let mut disposition = None;
        let mut content_type = None;
        for line in headers.split("\r\n") {
            if let Some((name, value)) = line.split_once(':') {
                match name.trim().to_ascii_lowercase().as_str() {
                    "content-disposition" => disposition = Some(value.trim().to_string()),
                    "content-type" => content_type = Some(value.trim().to_ascii_lowercase()),
                    _ => {}
                }
            }
        }

        let disposition = disposition.ok_or_else(malformed)?;
        let field = disposition_param(&disposition, "name").ok_or_else(malformed)?;
        match disposition_param(&disposition, "filename") {
            Some(filename) => form.files.push(FilePart {
                field,
                filename,
                content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                data: data.to_vec(),
            }),
            None => {
                form.fields
                    .insert(field, String::from_utf8_lossy(data).into_owned());
            }
        }

        cursor = next + delimiter.len();
        if cursor >= body.len() {
            break;
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    const BOUNDARY: &str = "XyZ123";

    fn multipart_body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"--XyZ123\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"content\"\r\n\r\n");
        body.extend_from_slice(b"hello world\r\n");
        body.extend_from_slice(b"--XyZ123\r\n");
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"post_image\"; filename=\"a.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a]);
        body.extend_from_slice(b"\r\n--XyZ123--\r\n");
        body
    }

    #[test]
    fn test_parse_multipart_fields_and_files() {
        let form = parse_multipart(&multipart_body(), BOUNDARY).unwrap();
        assert_eq!(form.text("content"), Some("hello world"));

        let files = form.files("post_image");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "a.png");
        assert_eq!(files[0].content_type, "image/png");
        // Binary payload keeps its embedded CRLF
        assert_eq!(files[0].data, vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a]);
    }

    #[test]
    fn test_boundary_extraction() {
        assert_eq!(
            boundary("multipart/form-data; boundary=\"abc\"").as_deref(),
            Some("abc")
        );
        assert_eq!(boundary("multipart/form-data"), None);
    }

    #[test]
    fn test_json_form_stringifies_scalars() {
        let form = Form::from_json(br#"{"name":"bob","private":true,"skip":null}"#).unwrap();
        assert_eq!(form.text("name"), Some("bob"));
        assert_eq!(form.flag("private"), Some(true));
        assert_eq!(form.text("skip"), None);
        assert!(Form::from_json(b"[1,2]").is_err());
        assert!(Form::from_json(b"").unwrap().text("x").is_none());
    }

    #[test]
    fn test_save_images_rejects_non_images() {
        let store = MemoryStore::new();
        let mut form = parse_multipart(&multipart_body(), BOUNDARY).unwrap();
        let saved = form.save_images(&store, "post_image", "post", "u1").unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("post_") && saved[0].ends_with("_u1.png"));

        form.files[0].content_type = "text/html".to_string();
        let err = form.save_images(&store, "post_image", "post", "u1").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_save_single_image_rejects_extra_files() {
        let store = MemoryStore::new();
        let mut form = parse_multipart(&multipart_body(), BOUNDARY).unwrap();
        let extra = form.files[0].clone();
        form.files.push(extra);

        let err = form.save_single_image(&store, "post_image", "story", "u1").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(store.is_empty());

        form.files.pop();
        let saved = form.save_single_image(&store, "post_image", "story", "u1").unwrap();
        assert!(saved.is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(form.save_single_image(&store, "missing", "story", "u1").unwrap(), None);
    }
}
