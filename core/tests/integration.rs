//! Client behavior against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises the client over
//! real HTTP through the default ureq transport. The server's `AppState` is
//! kept so tests can invalidate tokens behind the client's back.

use std::sync::{Arc, Barrier, Mutex};

use mock_server::{AppState, EnvironmentInfo, Store};
use todo_client::{
    ApiClient, ApiError, CreateTodo, HttpRequest, HttpResponse, Navigator, SessionCoordinator,
    SessionState, SessionStore, Transport, UpdateTodo, UreqTransport, View,
};

fn spawn_server(store: Store) -> (String, AppState) {
    let state = AppState::new(store, EnvironmentInfo::named("preview-7"));
    let server_state = state.clone();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_state).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), state)
}

fn seeded_client() -> (ApiClient, Arc<SessionStore>, AppState) {
    let (url, state) = spawn_server(Store::seeded());
    let session = Arc::new(SessionStore::in_memory());
    (ApiClient::new(&url, session.clone()), session, state)
}

#[derive(Default)]
struct Recorder(Mutex<Vec<View>>);

impl Navigator for Recorder {
    fn navigate(&self, view: View) {
        self.0.lock().unwrap().push(view);
    }
}

impl Recorder {
    fn views(&self) -> Vec<View> {
        self.0.lock().unwrap().clone()
    }
}

#[test]
fn login_then_current_user_returns_same_identity() {
    let (client, session, _state) = seeded_client();

    let token = client.auth().login("test@example.com", "password123").unwrap();
    assert_eq!(session.token().as_deref(), Some(token.access_token.as_str()));

    let user = client.auth().current_user().unwrap();
    assert_eq!(user.email, "test@example.com");
    assert_eq!(user.username, "testuser");
    assert_eq!(session.user(), Some(user));
}

#[test]
fn seeded_user_lists_only_own_todos() {
    let (client, _session, _state) = seeded_client();
    client.auth().login("test@example.com", "password123").unwrap();
    let me = client.auth().current_user().unwrap();

    let todos = client.todos().get_all().unwrap();
    assert_eq!(todos.len(), 3);
    assert!(todos.iter().all(|t| t.owner_id == me.id));
}

#[test]
fn created_todo_appears_in_refetched_list() {
    let (client, _session, _state) = seeded_client();
    client.auth().login("admin@example.com", "admin123").unwrap();

    let created = client.todos().create(&CreateTodo::titled("Buy milk")).unwrap();
    assert!(!created.completed);

    let todos = client.todos().get_all().unwrap();
    let found = todos.iter().find(|t| t.id == created.id).unwrap();
    assert_eq!(found.title, "Buy milk");
    assert!(!found.completed);
}

#[test]
fn toggle_twice_restores_completed() {
    let (client, _session, _state) = seeded_client();
    client.auth().login("john@example.com", "john123").unwrap();
    let original = client.todos().get_all().unwrap().remove(0);

    let once = client.todos().toggle(original.id).unwrap();
    assert_eq!(once.completed, !original.completed);
    let twice = client.todos().toggle(original.id).unwrap();
    assert_eq!(twice.completed, original.completed);
}

#[test]
fn crud_lifecycle() {
    let (url, _state) = spawn_server(Store::new());
    let session = Arc::new(SessionStore::in_memory());
    let client = ApiClient::new(&url, session.clone());

    client
        .auth()
        .register("fresh@example.com", "fresh", "secret12")
        .unwrap();
    client.auth().login("fresh@example.com", "secret12").unwrap();
    assert!(client.todos().get_all().unwrap().is_empty());

    let created = client
        .todos()
        .create(&CreateTodo {
            title: "Integration test".to_string(),
            description: Some("through ureq".to_string()),
            completed: None,
        })
        .unwrap();
    assert_eq!(created.description.as_deref(), Some("through ureq"));

    let fetched = client.todos().get(created.id).unwrap();
    assert_eq!(fetched, created);

    let update = UpdateTodo {
        title: Some("Updated title".to_string()),
        ..UpdateTodo::default()
    };
    let updated = client.todos().update(created.id, &update).unwrap();
    assert_eq!(updated.title, "Updated title");
    assert!(!updated.completed);
    assert!(updated.updated_at.is_some());

    let ack = client.todos().delete(created.id).unwrap();
    assert_eq!(ack.message, "Todo 'Updated title' deleted successfully");

    let err = client.todos().get(created.id).unwrap_err();
    match err {
        ApiError::NotFound { body } => assert!(body.contains("Todo not found")),
        other => panic!("unexpected error: {other:?}"),
    }
    let err = client.todos().delete(created.id).unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[test]
fn register_duplicate_propagates_backend_error() {
    let (client, _session, _state) = seeded_client();
    let err = client
        .auth()
        .register("test@example.com", "other", "secret12")
        .unwrap_err();
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Email already registered"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wrong_password_leaves_session_alone() {
    let (client, session, _state) = seeded_client();
    let err = client.auth().login("test@example.com", "wrong").unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_unauthorized());
    assert_eq!(session.state(), SessionState::Anonymous);
}

#[test]
fn anonymous_request_is_rejected_and_redirects() {
    let (client, session, _state) = seeded_client();
    let coordinator = SessionCoordinator::new(session.clone(), Recorder::default());

    let err = coordinator.observe(client.todos().get_all()).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { session_cleared: false, .. }));
    assert_eq!(coordinator.navigator().views(), vec![View::Login]);
}

#[test]
fn revoked_token_clears_session_and_redirects() {
    let (client, session, state) = seeded_client();
    let coordinator = SessionCoordinator::new(session.clone(), Recorder::default());

    client.auth().login("test@example.com", "password123").unwrap();
    coordinator.observe(client.auth().current_user()).unwrap();
    assert!(session.user().is_some());

    state.db.blocking_write().revoke_all_tokens();

    let err = coordinator.observe(client.todos().get_all()).unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { session_cleared: true, .. }));
    assert_eq!(session.token(), None);
    assert_eq!(session.user(), None);
    assert_eq!(coordinator.state(), SessionState::Anonymous);
    assert_eq!(coordinator.navigator().views(), vec![View::Login]);
}

#[test]
fn late_401_after_relogin_does_not_redirect() {
    let (client, session, state) = seeded_client();
    let coordinator = SessionCoordinator::new(session.clone(), Recorder::default());

    client.auth().login("test@example.com", "password123").unwrap();
    state.db.blocking_write().revoke_all_tokens();
    let late = client.todos().get_all();
    client.auth().login("test@example.com", "password123").unwrap();

    assert!(coordinator.observe(late).unwrap_err().is_unauthorized());
    assert_eq!(session.state(), SessionState::Authenticated);
    assert!(coordinator.navigator().views().is_empty());
    assert_eq!(coordinator.observe(client.todos().get_all()).unwrap().len(), 3);
}

#[test]
fn logout_makes_no_network_call() {
    let (client, session, _state) = seeded_client();
    client.auth().login("test@example.com", "password123").unwrap();
    // The only request this logout could make would hit a dead address.
    let offline = ApiClient::new("http://127.0.0.1:9", session.clone());
    offline.auth().logout();
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(client.todos().get_all().is_err());
}

#[test]
fn get_page_walks_the_list() {
    let (client, _session, _state) = seeded_client();
    client.auth().login("test@example.com", "password123").unwrap();
    let all = client.todos().get_all().unwrap();

    let first = client.todos().get_page(0, 2).unwrap();
    let rest = client.todos().get_page(2, 2).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(rest.len(), 1);
    let paged: Vec<_> = first.iter().chain(&rest).map(|t| t.id).collect();
    let ids: Vec<_> = all.iter().map(|t| t.id).collect();
    assert_eq!(paged, ids);
}

#[test]
fn status_endpoints() {
    let (client, _session, _state) = seeded_client();
    let health = client.status().health().unwrap().unwrap();
    assert_eq!(health.status, "healthy");

    let env = client.status().environment().unwrap();
    assert_eq!(env["environment"], "preview-7");
    assert_eq!(env["is_preview"], true);

    let ping = client.status().ping().unwrap();
    assert_eq!(ping["status"], "ok");
}

/// Holds todo-list requests after their token is attached until released.
struct GatedTransport {
    inner: UreqTransport,
    arrived: Barrier,
    release: Barrier,
    seen_tokens: Mutex<Vec<Option<String>>>,
}

impl Transport for GatedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        if request.url.ends_with("/api/todos") {
            self.seen_tokens
                .lock()
                .unwrap()
                .push(request.header("authorization").map(str::to_string));
            self.arrived.wait();
            self.release.wait();
        }
        self.inner.execute(request)
    }
}

#[test]
fn one_401_with_three_requests_in_flight_redirects_once() {
    let (url, state) = spawn_server(Store::seeded());
    let session = Arc::new(SessionStore::in_memory());
    let transport = Arc::new(GatedTransport {
        inner: UreqTransport::new(),
        arrived: Barrier::new(4),
        release: Barrier::new(4),
        seen_tokens: Mutex::new(Vec::new()),
    });

    struct Shared(Arc<GatedTransport>);
    impl Transport for Shared {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.0.execute(request)
        }
    }

    let client = ApiClient::with_transport(&url, session.clone(), Shared(transport.clone()));
    let coordinator = SessionCoordinator::new(session.clone(), Recorder::default());

    let token = client.auth().login("test@example.com", "password123").unwrap();

    let observed = std::thread::scope(|s| {
        let workers: Vec<_> = (0..3)
            .map(|_| {
                s.spawn(|| {
                    let result = coordinator.observe(client.todos().get_all());
                    (result.is_err(), session.token())
                })
            })
            .collect();

        // All three are in flight carrying the token.
        transport.arrived.wait();
        state.db.blocking_write().revoke_all_tokens();

        let err = coordinator.observe(client.auth().current_user()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { session_cleared: true, .. }));

        transport.release.wait();
        workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .collect::<Vec<_>>()
    });

    let expected_header = format!("Bearer {}", token.access_token);
    let seen = transport.seen_tokens.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|h| h.as_deref() == Some(expected_header.as_str())));

    for (failed, token_after) in observed {
        assert!(failed);
        assert_eq!(token_after, None);
    }
    assert_eq!(coordinator.state(), SessionState::Anonymous);
    assert_eq!(coordinator.navigator().views(), vec![View::Login]);
}
