//! Local HTTP stand-in for the upstream APIs, used by the client tests.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
};
use tokio::net::TcpListener;

/// One request as the stub received it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
struct Reply {
    status: StatusCode,
    body: &'static str,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct StubServer {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl StubServer {
    /// Answer every request with `status` and a JSON `body`.
    pub async fn start(status: u16, body: &'static str) -> Self {
        // reqwest is built without a default crypto provider.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let reply = Reply {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            seen: seen.clone(),
        };
        let router = Router::new().fallback(record).with_state(reply);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            seen,
        }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

async fn record(
    State(reply): State<Reply>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 1], &'static str) {
    reply.seen.lock().unwrap().push(SeenRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    (
        reply.status,
        [("content-type", "application/json")],
        reply.body,
    )
}
