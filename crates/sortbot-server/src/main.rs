use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use sortbot_api::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sortbot=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("SORTBOT_DB_PATH").unwrap_or_else(|_| "data/sorting_data.db".into());
    let host = std::env::var("SORTBOT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SORTBOT_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;

    // Open the store. The sorting rig is the writer; this process only
    // reads, relying on SQLite's own cross-process locking.
    let db_path = PathBuf::from(db_path);
    let db = sortbot_db::Database::open(&db_path)?;

    let state = Arc::new(AppStateInner { db, db_path });

    let app = sortbot_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Sorting dashboard listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
