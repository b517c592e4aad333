use chrono::{Duration, Utc};
use spin_sdk::http::{Method, Request, Response};

use crate::config::{token_secret, ACCESS_TOKEN_COOKIE};
use crate::core::db::insert_user;
use crate::core::store::DocumentStore;
use crate::core::token::issue_token;
use crate::models::models::User;

/// Stores a user directly, skipping password hashing.
pub fn seed_user(store: &dyn DocumentStore, name: &str, private: bool) -> User {
    let mut user = User::new(name, &format!("{}@example.com", name), "unused".to_string());
    user.private = private;
    insert_user(store, &user).unwrap();
    user
}

pub fn reload(store: &dyn DocumentStore, user: &User) -> User {
    crate::core::db::load_user(store, &user.id).unwrap().unwrap()
}

pub fn session_cookie(user_id: &str) -> String {
    let token = issue_token(user_id, &token_secret(), Utc::now(), Duration::hours(1)).unwrap();
    format!("{}={}", ACCESS_TOKEN_COOKIE, token)
}

pub fn request(method: Method, uri: &str, body: Option<serde_json::Value>, as_user: Option<&str>) -> Request {
    let mut builder = Request::builder();
    let with_uri = builder.method(method).uri(uri);
    let mut with_headers = with_uri.header("content-type", "application/json");
    if let Some(user_id) = as_user {
        with_headers = with_headers.header("cookie", session_cookie(user_id));
    }
    let body = body.map(|b| serde_json::to_vec(&b).unwrap()).unwrap_or_default();
    with_headers.body(body).build()
}

pub fn get(uri: &str, as_user: &User) -> Request {
    request(Method::Get, uri, None, Some(&as_user.id))
}

pub fn post(uri: &str, body: serde_json::Value, as_user: &User) -> Request {
    request(Method::Post, uri, Some(body), Some(&as_user.id))
}

pub fn body_json(resp: &Response) -> serde_json::Value {
    serde_json::from_slice(resp.body()).unwrap()
}
