//! In-process stand-ins for the identity service, Helix and chat.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// One request as seen by the stub.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: &'static str,
    pub params: HashMap<String, String>,
    pub authorization: Option<String>,
    pub client_id: Option<String>,
}

/// Canned responses.
pub struct StubConfig {
    pub token: (StatusCode, String),
    pub validate: (StatusCode, String),
    /// Served in order; an empty queue answers 200 with an offline page.
    pub streams: Vec<(StatusCode, String)>,
    /// Held before every `/helix/streams` answer.
    pub streams_delay: Duration,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            token: (StatusCode::OK, token_body("apptoken")),
            validate: (StatusCode::OK, app_token_info("cid")),
            streams: Vec::new(),
            streams_delay: Duration::ZERO,
        }
    }
}

pub fn token_body(access_token: &str) -> String {
    format!(r#"{{"access_token":"{access_token}","expires_in":5011271,"token_type":"bearer"}}"#)
}

pub fn app_token_info(client_id: &str) -> String {
    format!(r#"{{"client_id":"{client_id}","scopes":null,"expires_in":5000}}"#)
}

pub fn user_token_info(client_id: &str, login: &str) -> String {
    format!(
        r#"{{"client_id":"{client_id}","login":"{login}","scopes":["chat:read","chat:edit"],"user_id":"141981764","expires_in":5520838}}"#
    )
}

pub fn online_page(login: &str, title: &str) -> String {
    format!(
        r#"{{"data":[{{"id":"1","user_id":"2","user_login":"{login}","user_name":"{login}","game_name":"Just Chatting","type":"live","title":"{title}","viewer_count":10,"started_at":"2024-03-01T02:30:00Z"}}],"pagination":{{}}}}"#
    )
}

pub const OFFLINE_PAGE: &str = r#"{"data":[],"pagination":{}}"#;

#[derive(Clone)]
struct StubState {
    token: Arc<(StatusCode, String)>,
    validate: Arc<(StatusCode, String)>,
    streams: Arc<Mutex<VecDeque<(StatusCode, String)>>>,
    streams_delay: Duration,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubState {
    fn record(
        &self,
        method: &'static str,
        path: &'static str,
        params: HashMap<String, String>,
        headers: &HeaderMap,
    ) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        };
        let Ok(mut guard) = self.requests.lock() else {
            return;
        };
        guard.push(RecordedRequest {
            method,
            path,
            params,
            authorization: header("authorization"),
            client_id: header("client-id"),
        });
    }
}

/// Handle for the stub server; the server stops when this is dropped.
pub struct StubHandle {
    base_url: String,
    join: JoinHandle<()>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubHandle {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn helix_base(&self) -> String {
        format!("{}/helix", self.base_url)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

pub async fn spawn_stub(config: StubConfig) -> StubHandle {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        token: Arc::new(config.token),
        validate: Arc::new(config.validate),
        streams: Arc::new(Mutex::new(config.streams.into())),
        streams_delay: config.streams_delay,
        requests: Arc::clone(&requests),
    };
    let app = Router::new()
        .route("/oauth2/token", post(handle_token))
        .route("/oauth2/validate", get(handle_validate))
        .route("/helix/streams", get(handle_streams))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let base_url = format!("http://{}", listener.local_addr().expect("stub address"));
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    StubHandle {
        base_url,
        join,
        requests,
    }
}

async fn handle_token(
    State(state): State<StubState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.record("POST", "/oauth2/token", form, &headers);
    let (status, body) = state.token.as_ref();
    (*status, body.clone())
}

async fn handle_validate(State(state): State<StubState>, headers: HeaderMap) -> impl IntoResponse {
    state.record("GET", "/oauth2/validate", HashMap::new(), &headers);
    let (status, body) = state.validate.as_ref();
    (*status, body.clone())
}

async fn handle_streams(
    State(state): State<StubState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state.record("GET", "/helix/streams", query, &headers);
    if !state.streams_delay.is_zero() {
        tokio::time::sleep(state.streams_delay).await;
    }
    state
        .streams
        .lock()
        .ok()
        .and_then(|mut queue| queue.pop_front())
        .unwrap_or_else(|| (StatusCode::OK, OFFLINE_PAGE.to_string()))
}

// ── Chat ───────────────────────────────────────────────────────────

/// WebSocket chat server that records every line it receives.
pub struct ChatStub {
    url: String,
    join: JoinHandle<()>,
    lines: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
}

impl ChatStub {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map_or_else(|_| Vec::new(), |lines| lines.clone())
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait up to two seconds for `line` to arrive.
    pub async fn wait_for_line(&self, line: &str) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if self.lines().iter().any(|seen| seen == line) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for ChatStub {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Start the chat stub. With `close_first`, the first connection is closed
/// by the server as soon as it has sent its JOIN.
pub async fn spawn_chat_stub(close_first: bool) -> ChatStub {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind chat listener");
    let url = format!("ws://{}", listener.local_addr().expect("chat address"));
    let lines = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));

    let join = {
        let lines = Arc::clone(&lines);
        let connections = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let index = connections.fetch_add(1, Ordering::SeqCst);
                let lines = Arc::clone(&lines);
                tokio::spawn(serve_chat(socket, lines, close_first && index == 0));
            }
        })
    };

    ChatStub {
        url,
        join,
        lines,
        connections,
    }
}

async fn serve_chat(
    socket: tokio::net::TcpStream,
    lines: Arc<Mutex<Vec<String>>>,
    close_after_join: bool,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
        return;
    };
    while let Some(Ok(msg)) = ws.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let mut joined = false;
        if let Ok(mut seen) = lines.lock() {
            for line in text.as_str().lines() {
                joined |= line.starts_with("JOIN ");
                seen.push(line.to_string());
            }
        }
        if joined && close_after_join {
            let _ = ws.send(Message::Close(None)).await;
        }
    }
}
