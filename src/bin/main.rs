#[cfg(not(target_arch = "wasm32"))]
mod native {
    use glimpse::config;
    use glimpse::core::db::init_demo_data;
    use glimpse::core::store::MemoryStore;
    use tracing_subscriber::EnvFilter;

    pub async fn run() -> std::io::Result<()> {
        dotenvy::dotenv().ok();
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("glimpse=info,actix_web=info")),
            )
            .init();

        let store = MemoryStore::new();
        if config::seed_demo_data() {
            match init_demo_data(&store) {
                Ok(()) => tracing::info!("demo accounts ready"),
                Err(e) => tracing::warn!(error = %e, "failed to seed demo data"),
            }
        }

        glimpse::server::run(store, &config::server_addr()).await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
