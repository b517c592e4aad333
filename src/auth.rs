use chrono::{Duration, Utc};
use spin_sdk::http::{Request, Response};

use crate::config::*;
use crate::core::db::{find_user_by_email, insert_user, load_user};
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::Form;
use crate::core::helpers::{hash_password, is_valid_email, sanitize_text, success, verify_password};
use crate::core::query_params::cookie_value;
use crate::core::store::DocumentStore;
use crate::core::token::{issue_token, verify_token};
use crate::models::models::User;

fn session_cookie(token: &str, max_age: Duration) -> String {
    let expires = Utc::now() + max_age;
    format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=None; Max-Age={}; Expires={}",
        ACCESS_TOKEN_COOKIE,
        token,
        max_age.num_seconds().max(0),
        expires.format("%a, %d %b %Y %H:%M:%S GMT"),
    )
}

fn with_cookie(status: u16, cookie: String, body: serde_json::Value) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Set-Cookie", cookie)
        .body(serde_json::to_vec(&body).unwrap_or_default())
        .build()
}

pub fn register(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let form = Form::from_request(&req)?;
    let name = sanitize_text(form.required("name").unwrap_or_default());
    let email = form.required("email").unwrap_or_default().to_lowercase();
    let password = form.text("password").unwrap_or_default();

    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(ApiError::bad_request("Please provide a name at least 3 characters"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::bad_request("Please provide a name with maximum 15 characters"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Please fill a valid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request("Please provide a password at least 6 characters"));
    }
    if find_user_by_email(store, &email)?.is_some() {
        return Err(ApiError::bad_request("This email is already registered"));
    }

    let mut user = User::new(&name, &email, hash_password(password)?);
    user.private = form.flag("private").unwrap_or(false);
    insert_user(store, &user)?;

    tracing::info!(user_id = %user.id, "user registered");
    success::<()>(201, None, Some("Successfully registered"))
}

pub fn login(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let form = Form::from_request(&req)?;
    let (email, password) = match (form.required("email"), form.text("password")) {
        (Some(email), Some(password)) if !password.is_empty() => (email, password),
        _ => return Err(ApiError::bad_request("Please check your inputs")),
    };

    let user = find_user_by_email(store, email)?
        .ok_or_else(|| ApiError::bad_request("There is no user with that email"))?;

    if !verify_password(password, &user.password) {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(ApiError::bad_request("Please check your credentials"));
    }

    let ttl = Duration::hours(token_expiration_hours());
    let token = issue_token(&user.id, &token_secret(), Utc::now(), ttl)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(with_cookie(
        200,
        session_cookie(&token, ttl),
        serde_json::json!({
            "success": true,
            "data": {
                "_id": user.id,
                "name": user.name,
                "profilePicture": user.profile_picture,
                "private": user.private,
            },
            "message": "Successfully login",
        }),
    ))
}

pub fn logout(store: &dyn DocumentStore, req: Request) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    tracing::info!(user_id = %user_id, "user logged out");
    Ok(with_cookie(
        200,
        session_cookie("", Duration::zero()),
        serde_json::json!({ "success": true, "message": "Logged out successfully" }),
    ))
}

fn request_token(req: &Request) -> Option<String> {
    let from_cookie = req
        .header("cookie")
        .and_then(|h| h.as_str())
        .and_then(|c| cookie_value(c, ACCESS_TOKEN_COOKIE))
        .filter(|t| !t.is_empty());
    if let Some(token) = from_cookie {
        return Some(token.to_string());
    }

    req.header("authorization")
        .and_then(|h| h.as_str())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Resolves the calling user from the access token, or fails with 401.
pub fn authenticate(store: &dyn DocumentStore, req: &Request) -> ApiResult<String> {
    let token = request_token(req).ok_or(ApiError::Unauthorized)?;
    let claims = verify_token(&token, &token_secret(), Utc::now()).ok_or(ApiError::Unauthorized)?;

    // Check if user still exists
    if load_user(store, &claims.id)?.is_none() {
        return Err(ApiError::Unauthorized);
    }
    Ok(claims.id)
}
