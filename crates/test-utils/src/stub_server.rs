//! Stub WMS endpoint for client tests.
//!
//! Binds an ephemeral port on localhost and answers every request on `/wms`
//! with a fixed response, recording the raw query strings it saw.

use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// What the stub answers with.
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// 200 with a JSON body
    Json(String),
    /// Arbitrary status with a plain body
    Status(u16, String),
}

struct StubState {
    response: StubResponse,
    queries: Mutex<Vec<String>>,
}

pub struct StubWmsServer {
    /// Base URL to hand to the client, e.g. `http://127.0.0.1:PORT/wms`
    pub base_url: String,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubWmsServer {
    pub async fn start(response: StubResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub WMS listener");
        let addr = listener.local_addr().expect("Stub listener has no address");

        let state = Arc::new(StubState {
            response,
            queries: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/wms", get(answer))
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}/wms", addr),
            state,
            handle,
        }
    }

    /// Raw query strings received so far.
    pub async fn queries(&self) -> Vec<String> {
        self.state.queries.lock().await.clone()
    }

    /// A localhost URL with nothing listening behind it.
    pub async fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind throwaway listener");
        let addr = listener.local_addr().expect("Throwaway listener has no address");
        drop(listener);
        format!("http://{}/wms", addr)
    }
}

impl Drop for StubWmsServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn answer(State(state): State<Arc<StubState>>, RawQuery(query): RawQuery) -> Response {
    state
        .queries
        .lock()
        .await
        .push(query.unwrap_or_default());

    match &state.response {
        StubResponse::Json(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        StubResponse::Status(code, body) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        )
            .into_response(),
    }
}
