//! Shared helpers: spawn the gateway on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use imagegen_gateway::api;
use imagegen_gateway::app_state::AppState;
use imagegen_gateway::config::LedgerRules;
use imagegen_gateway::domain::EventBus;
use imagegen_gateway::generator::{ImageGenerator, PlaceholderGenerator};
use imagegen_gateway::persistence::{LedgerStore, MemoryLedgerStore};

/// A gateway running in the background of the current test runtime.
#[derive(Debug)]
pub struct TestServer {
    /// Bound loopback address.
    pub addr: SocketAddr,
    /// Store behind the server, for direct assertions and outage switching.
    pub store: Arc<MemoryLedgerStore>,
    /// HTTP client for REST calls.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Absolute HTTP URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// WebSocket endpoint URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Spawns a gateway with the placeholder generator.
pub async fn spawn() -> TestServer {
    spawn_with(Arc::new(PlaceholderGenerator::new())).await
}

/// Spawns a gateway backed by a fresh memory store and `generator`.
#[allow(clippy::panic)]
pub async fn spawn_with(generator: Arc<dyn ImageGenerator>) -> TestServer {
    let store = Arc::new(MemoryLedgerStore::new());
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn LedgerStore>,
        generator,
        LedgerRules::default(),
        EventBus::new(64),
    );
    let app = api::build_app(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        addr,
        store,
        client: reqwest::Client::new(),
    }
}
