//! Local HTTP server for exercising download code paths offline.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use futures_util::{StreamExt, stream};

/// How the server answers every request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Complete response with a `Content-Length` header.
    Full { status: u16, body: Vec<u8> },
    /// Advertise the full length but fail the body after `sent` bytes.
    Truncated { body: Vec<u8>, sent: usize },
    /// Chunked body, so the size is unknown upfront.
    Unsized { body: Vec<u8> },
    /// Advertise the full length, send `sent` bytes, then never finish.
    Stalled { body: Vec<u8>, sent: usize },
}

impl Reply {
    #[must_use]
    pub fn full(status: u16, body: Vec<u8>) -> Self {
        Self::Full { status, body }
    }
}

#[derive(Clone)]
struct ServerState {
    reply: Reply,
    requests: Arc<Mutex<Vec<String>>>,
}

pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Bind an ephemeral port and answer every path with `reply`.
    ///
    /// # Panics
    /// Panics when no loopback port can be bound.
    pub async fn start(reply: Reply) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("test listener should bind");
        let addr = listener
            .local_addr()
            .expect("test listener should have an address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new().fallback(respond).with_state(ServerState {
            reply,
            requests: Arc::clone(&requests),
        });
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, requests }
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// `METHOD /path` of every request seen so far.
    ///
    /// # Panics
    /// Panics when a handler panicked while holding the request log.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("request log lock should not be poisoned")
            .clone()
    }
}

/// A client that never routes loopback traffic through an env proxy.
///
/// # Panics
/// Panics when the TLS backend cannot be initialized.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("test client should build")
}

async fn respond(State(state): State<ServerState>, method: Method, uri: Uri) -> Response {
    state
        .requests
        .lock()
        .expect("request log lock should not be poisoned")
        .push(format!("{method} {uri}"));

    match state.reply {
        Reply::Full { status, body } => {
            let status = StatusCode::from_u16(status).expect("test status should be valid");
            (status, body).into_response()
        }
        Reply::Truncated { body, sent } => {
            let chunks = stream::iter([
                Ok(Bytes::copy_from_slice(&body[..sent])),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "body cut off")),
            ]);
            with_length(body.len(), Body::from_stream(chunks))
        }
        Reply::Unsized { body } => {
            Body::from_stream(stream::iter([Ok::<_, io::Error>(Bytes::from(body))])).into_response()
        }
        Reply::Stalled { body, sent } => {
            let chunks = stream::iter([Ok::<_, io::Error>(Bytes::copy_from_slice(&body[..sent]))])
                .chain(stream::pending());
            with_length(body.len(), Body::from_stream(chunks))
        }
    }
}

fn with_length(length: usize, body: Body) -> Response {
    ([(header::CONTENT_LENGTH, length.to_string())], body).into_response()
}
