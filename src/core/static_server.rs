use mime_guess::from_path;
use rust_embed::RustEmbed;
use spin_sdk::http::Response;

use crate::config::image_key;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::store::DocumentStore;

#[derive(RustEmbed)]
#[folder = "public"]
struct Assets;

fn file_response(path: &str, data: Vec<u8>) -> Response {
    let mime = from_path(path).first_or_octet_stream();
    Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .body(data)
        .build()
}

pub fn serve_static(path: &str) -> ApiResult<Response> {
    let file_path = match path {
        "/" | "/index.html" => "index.html",
        _ => path.trim_start_matches('/'),
    };

    let file = Assets::get(file_path).ok_or_else(|| ApiError::not_found("No route found"))?;
    Ok(file_response(file_path, file.data.to_vec()))
}

/// Serves an uploaded image by its stored name.
pub fn serve_image(store: &dyn DocumentStore, name: &str) -> ApiResult<Response> {
    if name.contains('/') || name.contains("..") {
        return Err(ApiError::bad_request("Invalid image name"));
    }
    let data = store
        .get(&image_key(name))?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;
    Ok(file_response(name, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    #[test]
    fn test_serve_index() {
        let resp = serve_static("/").unwrap();
        assert_eq!(*resp.status(), 200);
        let ct = resp.header("content-type").and_then(|h| h.as_str()).unwrap();
        assert!(ct.starts_with("text/html"));
    }

    #[test]
    fn test_missing_asset_is_not_found() {
        assert!(matches!(serve_static("/nope.js"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_serve_stored_image() {
        let store = MemoryStore::new();
        let dyn_store: &dyn DocumentStore = &store;
        dyn_store.set(&image_key("post_1_u.png"), &[1, 2, 3]).unwrap();

        let resp = serve_image(&store, "post_1_u.png").unwrap();
        assert_eq!(resp.body().to_vec(), vec![1u8, 2, 3]);
        assert!(matches!(serve_image(&store, "missing.png"), Err(ApiError::NotFound(_))));
        assert!(matches!(serve_image(&store, "../x"), Err(ApiError::BadRequest(_))));
    }
}
