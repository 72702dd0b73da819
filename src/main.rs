mod app;
mod auth;
mod config;
mod db;
mod error;
mod images;
mod nutrition;
mod progress;
mod state;
mod storage;

use crate::state::AppState;

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "memberfit=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState::init().await?;
    tracing::info!(
        bucket = %state.config.storage.bucket,
        max_image_bytes = state.config.max_image_bytes,
        "state initialised"
    );

    app::serve(app::build_app(state)).await
}
