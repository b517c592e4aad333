use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::Builder;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use regex::Regex;
use serde::Serialize;
use spin_sdk::http::Response;
use uuid::Uuid;

use crate::core::errors::{ApiError, ApiResult};

pub fn json_response<T: Serialize>(status: u16, body: &T) -> Response {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(bytes)
        .build()
}

/// `{"success": true, "data": ..., "message": ...}` with optional parts omitted.
pub fn success<T: Serialize>(status: u16, data: Option<T>, message: Option<&str>) -> ApiResult<Response> {
    let mut body = serde_json::json!({ "success": true });
    if let Some(data) = data {
        body["data"] = serde_json::to_value(data).map_err(anyhow::Error::from)?;
    }
    if let Some(message) = message {
        body["message"] = serde_json::Value::String(message.to_string());
    }
    Ok(json_response(status, &body))
}

pub fn ok_data<T: Serialize>(data: T) -> ApiResult<Response> {
    success(200, Some(data), None)
}

pub fn ok_message(message: &str) -> ApiResult<Response> {
    success::<()>(200, None, Some(message))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

pub fn require_id(id: &str) -> ApiResult<&str> {
    if id.is_empty() || !validate_uuid(id) {
        return Err(ApiError::bad_request("Please provide a valid id"));
    }
    Ok(id)
}

/// Strips markup and returns the remaining text as the user typed it.
pub fn sanitize_text(text: &str) -> String {
    let stripped = Builder::default().tags(HashSet::new()).clean(text).to_string();
    // ammonia entity-encodes the text it keeps
    html_escape::decode_html_entities(&stripped).into_owned()
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("Regex should compile")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}
