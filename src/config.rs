pub fn token_expiration_hours() -> i64 {
    std::env::var("GLIMPSE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(24)
}

pub fn token_secret() -> String {
    std::env::var("GLIMPSE_TOKEN_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEV_TOKEN_SECRET.to_string())
}

pub fn server_addr() -> String {
    std::env::var("GLIMPSE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

pub fn max_upload_bytes() -> usize {
    std::env::var("GLIMPSE_MAX_UPLOAD_MB")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(10)
        * 1024
        * 1024
}

pub fn seed_demo_data() -> bool {
    std::env::var("GLIMPSE_SEED_DEMO")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

pub const DEV_TOKEN_SECRET: &str = "glimpse-development-secret";
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

// Validation limits
pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 15;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;

pub const STORY_TTL_HOURS: i64 = 24;

// Fuzzy name search
pub const SEARCH_THRESHOLD: f64 = 0.65;
pub const SEARCH_DISTANCE: f64 = 100.0;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpg", "image/gif", "image/jpeg", "image/png"];

// Store keys
pub const USERS_LIST_KEY: &str = "users_list";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email.to_lowercase())
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn comment_key(id: &str) -> String {
    format!("comment:{}", id)
}

pub fn story_key(id: &str) -> String {
    format!("story:{}", id)
}

pub fn image_key(name: &str) -> String {
    format!("image:{}", name)
}
