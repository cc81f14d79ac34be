//! In-process stand-in for the ledger server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::header::{ACCEPT, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

#[derive(Debug, Default)]
pub struct StubState {
    /// (institution, reference) -> accountId
    pub links: HashMap<(String, String), i64>,
    /// Replies for successive `POST /statement`; `(200, "0")` once exhausted.
    pub merge_replies: VecDeque<(StatusCode, String)>,
    pub statements: Vec<Value>,
    pub statement_accepts: Vec<Option<String>>,
    pub link_requests: usize,
    pub authorization: Vec<Option<String>>,
}

impl StubState {
    pub fn with_link(mut self, institution: &str, reference: &str, account_id: i64) -> Self {
        self.links
            .insert((institution.to_string(), reference.to_string()), account_id);
        self
    }

    pub fn with_merge_reply(mut self, status: StatusCode, body: &str) -> Self {
        self.merge_replies.push_back((status, body.to_string()));
        self
    }
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubServer {
    pub url: String,
    pub state: Shared,
}

impl StubServer {
    pub async fn start(state: StubState) -> Self {
        let state: Shared = Arc::new(Mutex::new(state));
        let app = Router::new()
            .route("/", get(root))
            .route("/institution_link/:institution/:reference", get(link))
            .route("/statement", post(statement))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn statements(&self) -> Vec<Value> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn link_requests(&self) -> usize {
        self.state.lock().unwrap().link_requests
    }
}

fn header(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn root() -> (StatusCode, &'static str) {
    // MergeSession::open does not care about the status.
    (StatusCode::UNAUTHORIZED, "ledgerdb")
}

async fn link(
    State(state): State<Shared>,
    Path((institution, reference)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut s = state.lock().unwrap();
    s.link_requests += 1;
    s.authorization.push(header(&headers, AUTHORIZATION));

    match s.links.get(&(institution.clone(), reference.clone())) {
        Some(id) => Json(json!({
            "institution": institution,
            "reference": reference,
            "accountId": id,
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, "institution link not found").into_response(),
    }
}

async fn statement(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let mut s = state.lock().unwrap();
    s.authorization.push(header(&headers, AUTHORIZATION));
    s.statement_accepts.push(header(&headers, ACCEPT));
    s.statements.push(body);
    s.merge_replies
        .pop_front()
        .unwrap_or((StatusCode::OK, "0".to_string()))
}
