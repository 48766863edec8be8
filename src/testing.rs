//! In-process stand-in for the search backend, used by the client and
//! controller tests. Binds an ephemeral port and records every request.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub params: Vec<(String, String)>,
    pub accept: Option<String>,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockReply {
    status: u16,
    content_type: &'static str,
    body: String,
    delay: Duration,
    only_for_query: Option<String>,
}

impl MockReply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
            delay: Duration::ZERO,
            only_for_query: None,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            content_type: "text/html",
            ..Self::json(status, body)
        }
    }

    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    /// Restricts the reply to requests whose `q` parameter equals `query`.
    pub fn for_query(mut self, query: &str) -> Self {
        self.only_for_query = Some(query.to_string());
        self
    }
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, Vec<MockReply>>,
    log: Mutex<Vec<RecordedRequest>>,
}

pub(crate) struct MockBackend {
    pub base: Url,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start(routes: Vec<(&str, MockReply)>) -> Self {
        let mut table: HashMap<String, Vec<MockReply>> = HashMap::new();
        for (path, reply) in routes {
            table.entry(path.to_string()).or_default().push(reply);
        }
        let state = Arc::new(MockState {
            routes: table,
            log: Mutex::new(Vec::new()),
        });
        let router = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self {
            base: Url::parse(&format!("http://{addr}/api/")).unwrap(),
            state,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.log.lock().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.state
            .log
            .lock()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap) -> Response {
    let params: Vec<(String, String)> = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let request = RecordedRequest {
        path: uri.path().to_string(),
        params,
        accept: headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    let query = request.param("q").map(str::to_string);
    state.log.lock().push(request);

    let reply = state.routes.get(uri.path()).and_then(|replies| {
        replies
            .iter()
            .find(|reply| reply.only_for_query.is_some() && reply.only_for_query == query)
            .or_else(|| replies.iter().find(|reply| reply.only_for_query.is_none()))
            .cloned()
    });
    let Some(reply) = reply else {
        return (StatusCode::NOT_FOUND, "no route").into_response();
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}
