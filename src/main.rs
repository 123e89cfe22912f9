use tonebox::{create_router, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let config = Config::load();

    if !config.music_path.is_dir() {
        // Not fatal: the playlist endpoint reports 404 until the directory appears.
        error!(
            "Music directory {} does not exist",
            config.music_path.display()
        );
    }

    let address = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("Music server listening on http://{}", address);

    if let Err(e) = axum::serve(listener, create_router(config)).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
