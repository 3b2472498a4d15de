//! In-process HTTP server serving canned provider payloads for adapter tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::sync::Mutex;

use crate::config::ProviderSettings;
use crate::http::API_KEY_HEADER;

/// Response the server gives to every request.
#[derive(Debug, Clone)]
pub(crate) struct Canned {
    status: u16,
    body: String,
    content_type: &'static str,
    delay: Duration,
}

impl Canned {
    pub(crate) fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub(crate) fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json",
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn xml(mut self) -> Self {
        self.content_type = "application/xml";
        self
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Seen {
    body: Option<String>,
    api_key: Option<String>,
    content_type: Option<String>,
}

struct ServerState {
    canned: Canned,
    seen: Mutex<Seen>,
}

pub(crate) struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl TestServer {
    /// Provider settings pointing at this server.
    pub(crate) fn settings(&self, name: &str) -> ProviderSettings {
        ProviderSettings::new(name, format!("http://{}", self.addr), "/convert")
    }

    pub(crate) async fn last_body(&self) -> Option<String> {
        self.state.seen.lock().await.body.clone()
    }

    pub(crate) async fn last_api_key(&self) -> Option<String> {
        self.state.seen.lock().await.api_key.clone()
    }

    pub(crate) async fn last_content_type(&self) -> Option<String> {
        self.state.seen.lock().await.content_type.clone()
    }
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    {
        let mut seen = state.seen.lock().await;
        if !body.is_empty() {
            seen.body = Some(body);
        }
        seen.api_key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            seen.content_type = Some(ct.to_string());
        }
    }

    if !state.canned.delay.is_zero() {
        tokio::time::sleep(state.canned.delay).await;
    }

    let status =
        StatusCode::from_u16(state.canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, state.canned.content_type)],
        state.canned.body.clone(),
    )
        .into_response()
}

/// Start a server on an ephemeral local port.
pub(crate) async fn serve(canned: Canned) -> TestServer {
    let state = Arc::new(ServerState {
        canned,
        seen: Mutex::new(Seen::default()),
    });

    let app = Router::new().fallback(handle).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state }
}
