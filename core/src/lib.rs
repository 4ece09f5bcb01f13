//! Authenticated API client for the todo service.
//!
//! # Overview
//! A persisted session (bearer token plus cached user), one request pipeline
//! that attaches the token to every request and applies a single 401 policy,
//! and thin typed modules for the auth, todo and status endpoints.
//!
//! # Design
//! - `SessionStore` is passed explicitly as `Arc<SessionStore>`; nothing reads
//!   ambient storage.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and a
//!   parse step, with a `Transport` doing the round-trip in between.
//! - A 401 clears the session and surfaces as `ApiError::Unauthorized`; the
//!   `SessionCoordinator` is the only place that navigates to login.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod session;
pub mod status;
pub mod storage;
pub mod todos;
pub mod transport;
pub mod types;

pub use auth::AuthApi;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use coordinator::{Navigator, SessionCoordinator, View};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Cleared, SessionState, SessionStore};
pub use status::StatusApi;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use todos::TodosApi;
pub use transport::{Transport, UreqTransport};
pub use types::{CreateTodo, HealthCheck, LoginRequest, Message, RegisterRequest, Todo, Token, UpdateTodo, User};
