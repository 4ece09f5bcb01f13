//! In-memory mock of the todo backend: health, environment, bearer-token
//! auth and owner-scoped todo CRUD.

pub mod error;
pub mod models;
pub mod state;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub use error::HttpError;
pub use models::{EnvironmentInfo, HealthCheck, ListParams, Message, Todo, TokenResponse, User};
pub use state::{AppState, Db, Store};

/// Empty backend reporting a `test` environment.
pub fn app() -> Router {
    app_with(AppState::new(Store::new(), EnvironmentInfo::named("test")))
}

/// Backend with the seed accounts and todos.
pub fn seeded_app() -> Router {
    app_with(AppState::new(Store::seeded(), EnvironmentInfo::named("test")))
}

pub fn app_with(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/test", get(test_endpoint))
        .route("/api/environment", get(environment))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .route("/api/todos/{id}/toggle", post(toggle_todo))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

/// Extractor resolving `Authorization: Bearer <token>` to the caller.
#[derive(Debug)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| HttpError::unauthorized("Not authenticated"))?
            .strip_prefix("Bearer ")
            .ok_or_else(|| HttpError::unauthorized("Invalid authorization header format"))?;

        let user = state.db.read().await.authenticate(token)?;
        Ok(CurrentUser(user))
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Todo demo API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

async fn health() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "healthy".to_string(),
        database: "connected".to_string(),
        message: "API is running".to_string(),
    })
}

async fn test_endpoint() -> Json<Value> {
    Json(json!({
        "message": "Backend API is reachable",
        "service": "backend",
        "status": "ok",
    }))
}

async fn environment(State(state): State<AppState>) -> Json<EnvironmentInfo> {
    Json(state.environment)
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<models::RegisterRequest>,
) -> Result<(StatusCode, Json<User>), HttpError> {
    let user = state
        .db
        .write()
        .await
        .register(&input.email, &input.username, &input.password)?;
    tracing::info!(user_id = user.id, "registered user");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<models::LoginRequest>,
) -> Result<Json<TokenResponse>, HttpError> {
    let access_token = state.db.write().await.login(&input.email, &input.password)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

async fn list_todos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Json<Vec<Todo>> {
    let todos = state.db.read().await.todos_for(user.id, params);
    Json(todos)
}

async fn create_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<models::CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), HttpError> {
    let todo = state.db.write().await.create_todo(user.id, input)?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, HttpError> {
    let todo = state.db.read().await.todo(user.id, id)?;
    Ok(Json(todo))
}

async fn update_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<models::UpdateTodo>,
) -> Result<Json<Todo>, HttpError> {
    let todo = state.db.write().await.update_todo(user.id, id, input)?;
    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Message>, HttpError> {
    let todo = state.db.write().await.delete_todo(user.id, id)?;
    Ok(Json(Message {
        message: format!("Todo '{}' deleted successfully", todo.title),
    }))
}

async fn toggle_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, HttpError> {
    let todo = state.db.write().await.toggle_todo(user.id, id)?;
    Ok(Json(todo))
}
