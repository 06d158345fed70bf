//! Scripted HTTP transport for integration testing.
//!
//! Routes are matched in registration order by method and URL suffix.
//! Every request is recorded so tests can assert on what went over the
//! wire (or that nothing did). Unmatched requests get a 404.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use augur::error::ToolError;
use augur::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

struct Route {
    method: HttpMethod,
    url_suffix: String,
    response: Result<HttpResponse, ToolError>,
}

/// A deterministic, in-memory `HttpTransport`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` requests whose URL ends with `url_suffix`.
    pub fn route(self, method: HttpMethod, url_suffix: &str, status: u16, body: &str) -> Self {
        self.routes.lock().unwrap().push(Route {
            method,
            url_suffix: url_suffix.to_string(),
            response: Ok(HttpResponse { status, body: body.to_string() }),
        });
        self
    }

    pub fn get(self, url_suffix: &str, body: &str) -> Self {
        self.route(HttpMethod::Get, url_suffix, 200, body)
    }

    pub fn post(self, url_suffix: &str, body: &str) -> Self {
        self.route(HttpMethod::Post, url_suffix, 200, body)
    }

    /// Fail `method` requests to `url_suffix` at the transport level.
    pub fn fail(self, method: HttpMethod, url_suffix: &str, msg: &str) -> Self {
        self.routes.lock().unwrap().push(Route {
            method,
            url_suffix: url_suffix.to_string(),
            response: Err(ToolError::Transport(msg.to_string())),
        });
        self
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests whose URL ends with `url_suffix`.
    pub fn requests_to(&self, url_suffix: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(url_suffix))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ToolError> {
        let response = {
            let routes = self.routes.lock().unwrap();
            routes
                .iter()
                .find(|r| r.method == request.method && request.url.ends_with(&r.url_suffix))
                .map(|r| r.response.clone())
        };
        self.requests.lock().unwrap().push(request);
        response.unwrap_or_else(|| Ok(HttpResponse { status: 404, body: "not found".to_string() }))
    }
}
