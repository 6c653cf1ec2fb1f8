//! どこで: HTTP参照面と送信経路 / 何を: accounts/tx APIとdriver RPC / なぜ: 外向きの読み書きをエンジンから切り離すため

pub mod args;
pub mod driver;
pub mod handlers;
pub mod keystore;

use std::io;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use evm_core::Engine;
use tracing::info;

use crate::driver::DriverClient;
use crate::keystore::Keystore;

/// Shared handler context. The service guard serializes every request the
/// way the original service mutex did; engine reads go through the
/// canonical handle and never touch the commit mutex.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub keystore: Arc<Keystore>,
    pub driver: DriverClient,
    guard: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, keystore: Arc<Keystore>, driver: DriverClient) -> Self {
        Self {
            engine,
            keystore,
            driver,
            guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub(crate) async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.guard.lock().await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/accounts", get(handlers::accounts))
        .route("/tx", post(handlers::send_tx))
        .route("/tx/{hash}", get(handlers::tx_receipt))
        .with_state(state)
}

pub async fn serve(api_addr: &str, state: AppState) -> io::Result<()> {
    let addr = normalize_api_addr(api_addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, router(state)).await
}

/// Accepts both `host:port` and the bare `:port` shorthand.
pub fn normalize_api_addr(api_addr: &str) -> String {
    if let Some(port) = api_addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        api_addr.to_string()
    }
}
