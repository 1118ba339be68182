pub mod adapters;
pub mod config;
pub mod ports;
pub mod push;
pub mod state;
pub mod types;

mod app;
mod assets;
mod templates;

use std::net::SocketAddr;

pub use app::app;
pub use push::{VapidCredentials, generate_vapid_credentials};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app(config)).await.expect("server error");
}
