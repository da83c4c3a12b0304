//! Local HTTP server with scripted replies for exercising the clients.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub uri: String,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<(StatusCode, &'static str, String)>>,
    seen: Mutex<Vec<Recorded>>,
}

/// Answers requests with `replies` in order, then 404 once they run out.
pub struct TestServer {
    pub url: String,
    script: Arc<Script>,
}

impl TestServer {
    pub async fn start(replies: Vec<(u16, &'static str, &str)>) -> Self {
        let script = Arc::new(Script::default());
        let scripted = replies.into_iter().map(|(status, content_type, body)| {
            (StatusCode::from_u16(status).unwrap(), content_type, body.to_string())
        });
        script.replies.lock().unwrap().extend(scripted);

        let app = Router::new().fallback(reply).with_state(script.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            script,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.seen.lock().unwrap().clone()
    }
}

async fn reply(
    State(script): State<Arc<Script>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    script.seen.lock().unwrap().push(Recorded {
        uri: uri.to_string(),
        headers,
        body,
    });
    let next = script.replies.lock().unwrap().pop_front();
    match next {
        Some((status, content_type, body)) => {
            (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
