use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod store;

use api::{AppState, SharedState, create_app};
use config::ServerConfig;
use store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("boredgames_server=info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let addr = config.addr();
    if let Some(seed) = config.seed {
        info!("使用固定的洗牌种子 {}", seed);
    }

    let state = SharedState::new(AppState::new(config, Box::new(MemoryStore::new())));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("服务器正在监听 {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("服务器已关闭");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("无法监听 Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，正在停止服务器...");
}

// --- 集成测试 ---
