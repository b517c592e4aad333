//! Native HTTP host. Translates actix requests into Spin requests so the same
//! handlers run under `cargo run` and inside the Spin component.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config;
use crate::core::store::MemoryStore;
use crate::handlers;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let uri = req.uri().to_string();

        let mut req_builder = Request::builder();
        let uri_set = req_builder.method(method).uri(&uri);

        // Copy headers
        let mut with_headers = uri_set;
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                with_headers = with_headers.header(name.as_str(), val_str);
            }
        }

        with_headers.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = actix_web::HttpResponse::build(status);
        for (name, value) in spin_resp.headers() {
            if let Some(val_str) = value.as_str() {
                response.append_header((name, val_str));
            }
        }

        response.body(spin_resp.body().to_vec())
    }
}

async fn handle_all(req: HttpRequest, body: web::Bytes, store: web::Data<MemoryStore>) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let spin_resp = handlers::route(store.get_ref(), spin_req);
    adapter::spin_to_actix_response(spin_resp)
}

/// Mounts every route. The store must be registered as `web::Data<MemoryStore>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(config::max_upload_bytes()))
        .default_service(web::route().to(handle_all));
}

pub async fn run(store: MemoryStore, addr: &str) -> std::io::Result<()> {
    let store = web::Data::new(store);
    tracing::info!("Server listening on http://{}", addr);

    HttpServer::new(move || App::new().app_data(store.clone()).configure(configure))
        .bind(addr)?
        .run()
        .await
}
