//! The shared request pipeline used by every domain API module.
//!
//! # Design
//! `ApiClient` holds the base URL, the session store and a `Transport`.
//! Each call runs the same stages:
//!
//! 1. `build` / `build_json` produce an `HttpRequest` with the default
//!    `content-type: application/json` header.
//! 2. `authorize` (request interceptor) appends `authorization: Bearer <token>`
//!    when the session holds a token, and leaves the request alone otherwise.
//! 3. The transport performs the round-trip.
//! 4. `intercept` (response interceptor) passes 2xx through. A 401 clears the
//!    session and becomes `ApiError::Unauthorized`; every other failure
//!    status is returned unchanged.
//!
//! The client never navigates and never retries. Stages 1, 2 and 4 are pure
//! apart from the session read/clear, so they are tested without a network.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AuthApi;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionStore;
use crate::status::StatusApi;
use crate::todos::TodosApi;
use crate::transport::{Transport, UreqTransport};

pub const CONTENT_TYPE: &str = "content-type";
pub const AUTHORIZATION: &str = "authorization";
const APPLICATION_JSON: &str = "application/json";

pub struct ApiClient {
    base_url: String,
    session: Arc<SessionStore>,
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Self {
        Self::with_transport(base_url, session, UreqTransport::new())
    }

    pub fn with_transport(
        base_url: &str,
        session: Arc<SessionStore>,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            transport: Box::new(transport),
        }
    }

    pub fn from_config(config: &ClientConfig, session: Arc<SessionStore>) -> Self {
        Self::new(&config.api_url, session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn todos(&self) -> TodosApi<'_> {
        TodosApi::new(self)
    }

    pub fn status(&self) -> StatusApi<'_> {
        StatusApi::new(self)
    }

    /// Bodyless request for `path` (which must start with `/`).
    pub fn build(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())],
            body: None,
        }
    }

    pub fn build_json<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut request = self.build(method, path);
        request.body = Some(body);
        Ok(request)
    }

    /// Request interceptor: attach the current bearer token, if any.
    pub fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(token) = self.session.token() {
            request
                .headers
                .push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }
        request
    }

    /// Response interceptor with the session policy applied.
    pub fn intercept(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
        if response.status == 401 {
            let cleared = self.session.clear();
            tracing::warn!(
                session_cleared = cleared.had_session,
                generation = cleared.generation,
                "request rejected with 401, session cleared"
            );
            return Err(ApiError::Unauthorized {
                session_cleared: cleared.had_session,
                generation: cleared.generation,
            });
        }
        check_status(response)
    }

    /// Run a request through both interceptors.
    pub fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.send(request)?;
        self.intercept(response)
    }

    /// Run a request whose 401 means "credentials rejected" rather than
    /// "session invalid". The 401 is returned as `ApiError::Http` and the
    /// session is left untouched.
    pub fn execute_anonymous(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.send(request)?;
        check_status(response)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = self.authorize(request);
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(&request).map_err(|e| {
            tracing::debug!(error = %e, url = %request.url, "transport failed");
            e
        })?;
        tracing::debug!(status = response.status, url = %request.url, "received response");
        Ok(response)
    }

    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 404 {
        return Err(ApiError::NotFound {
            body: response.body,
        });
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::scripted_client;
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_sets_url_and_default_header() {
        let (client, _, _) = scripted_client();
        let req = client.build(HttpMethod::Get, "/api/todos");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/todos");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let session = Arc::new(SessionStore::in_memory());
        let client = ApiClient::new("http://localhost:8000/", session);
        assert_eq!(client.base_url(), "http://localhost:8000");
        let req = client.build(HttpMethod::Get, "/health");
        assert_eq!(req.url, "http://localhost:8000/health");
    }

    #[test]
    fn authorize_attaches_exact_token() {
        let (client, _, session) = scripted_client();
        session.set_token("tok-123");
        let req = client.authorize(client.build(HttpMethod::Get, "/api/auth/me"));
        assert_eq!(req.header("authorization"), Some("Bearer tok-123"));
    }

    #[test]
    fn authorize_without_token_adds_nothing() {
        let (client, _, _) = scripted_client();
        let req = client.authorize(client.build(HttpMethod::Get, "/api/todos"));
        assert_eq!(req.header("authorization"), None);
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn intercept_passes_success_through() {
        let (client, _, session) = scripted_client();
        session.set_token("tok");
        let resp = client.intercept(response(201, "{}")).unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(session.token().as_deref(), Some("tok"));
    }

    #[test]
    fn intercept_401_clears_session() {
        let (client, _, session) = scripted_client();
        session.set_token("tok");
        let err = client.intercept(response(401, r#"{"detail":"expired"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { session_cleared: true, .. }));
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);

        let err = client.intercept(response(401, "")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { session_cleared: false, .. }));
    }

    #[test]
    fn intercept_401_reports_cleared_generation() {
        let (client, _, session) = scripted_client();
        session.set_token("first");
        session.set_token("second");

        let err = client.intercept(response(401, "")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { generation: 2, .. }));

        session.set_token("third");
        let err = client.intercept(response(401, "")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { generation: 3, .. }));
    }

    #[test]
    fn intercept_other_failures_are_unchanged() {
        let (client, _, session) = scripted_client();
        session.set_token("tok");

        let err = client
            .intercept(response(404, r#"{"detail":"Todo not found"}"#))
            .unwrap_err();
        match err {
            ApiError::NotFound { body } => assert_eq!(body, r#"{"detail":"Todo not found"}"#),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client.intercept(response(400, "bad")).unwrap_err();
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.token().as_deref(), Some("tok"));
    }

    #[test]
    fn execute_anonymous_keeps_session_on_401() {
        let (client, transport, session) = scripted_client();
        session.set_token("tok");
        transport.respond(401, "nope");
        let req = client.build(HttpMethod::Post, "/api/auth/login");
        let err = client.execute_anonymous(req).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 401, .. }));
        assert_eq!(session.token().as_deref(), Some("tok"));
    }

    #[test]
    fn execute_sends_authorized_request() {
        let (client, transport, session) = scripted_client();
        session.set_token("tok");
        transport.respond(200, "[]");
        client.execute(client.build(HttpMethod::Get, "/api/todos")).unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn transport_failure_is_surfaced_once() {
        let (client, transport, _) = scripted_client();
        let err = client.execute(client.build(HttpMethod::Get, "/health")).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn parse_bad_json() {
        let (client, _, _) = scripted_client();
        let err = client.parse::<Vec<i64>>(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
