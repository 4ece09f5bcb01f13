//! Todo endpoints. Each call is a direct pass-through; the server owns
//! every todo and callers re-fetch after mutating.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{CreateTodo, Message, Todo, UpdateTodo};

pub const TODOS_PATH: &str = "/api/todos";

#[derive(Debug, Clone, Copy)]
pub struct TodosApi<'a> {
    client: &'a ApiClient,
}

fn todo_path(id: i64) -> String {
    format!("{TODOS_PATH}/{id}")
}

impl<'a> TodosApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn build_get_all(&self) -> HttpRequest {
        self.client.build(HttpMethod::Get, TODOS_PATH)
    }

    /// List request with explicit paging. The backend defaults to
    /// `skip=0&limit=100` when `build_get_all` sends neither.
    pub fn build_get_page(&self, skip: usize, limit: usize) -> HttpRequest {
        self.client.build(
            HttpMethod::Get,
            &format!("{TODOS_PATH}?skip={skip}&limit={limit}"),
        )
    }

    pub fn build_get(&self, id: i64) -> HttpRequest {
        self.client.build(HttpMethod::Get, &todo_path(id))
    }

    /// Fails with `ApiError::Validation` if the title is blank.
    pub fn build_create(&self, input: &CreateTodo) -> Result<HttpRequest, ApiError> {
        if input.title.trim().is_empty() {
            return Err(ApiError::Validation("todo title must not be empty".to_string()));
        }
        self.client.build_json(HttpMethod::Post, TODOS_PATH, input)
    }

    pub fn build_update(&self, id: i64, input: &UpdateTodo) -> Result<HttpRequest, ApiError> {
        self.client.build_json(HttpMethod::Put, &todo_path(id), input)
    }

    pub fn build_delete(&self, id: i64) -> HttpRequest {
        self.client.build(HttpMethod::Delete, &todo_path(id))
    }

    pub fn build_toggle(&self, id: i64) -> HttpRequest {
        self.client.build(HttpMethod::Post, &format!("{}/toggle", todo_path(id)))
    }

    pub fn get_all(&self) -> Result<Vec<Todo>, ApiError> {
        let response = self.client.execute(self.build_get_all())?;
        self.client.parse(response)
    }

    pub fn get_page(&self, skip: usize, limit: usize) -> Result<Vec<Todo>, ApiError> {
        let response = self.client.execute(self.build_get_page(skip, limit))?;
        self.client.parse(response)
    }

    pub fn get(&self, id: i64) -> Result<Todo, ApiError> {
        let response = self.client.execute(self.build_get(id))?;
        self.client.parse(response)
    }

    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub fn create(&self, input: &CreateTodo) -> Result<Todo, ApiError> {
        let response = self.client.execute(self.build_create(input)?)?;
        self.client.parse(response)
    }

    #[tracing::instrument(skip(self, input))]
    pub fn update(&self, id: i64, input: &UpdateTodo) -> Result<Todo, ApiError> {
        let response = self.client.execute(self.build_update(id, input)?)?;
        self.client.parse(response)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<Message, ApiError> {
        let response = self.client.execute(self.build_delete(id))?;
        self.client.parse(response)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle(&self, id: i64) -> Result<Todo, ApiError> {
        let response = self.client.execute(self.build_toggle(id))?;
        self.client.parse(response)
    }
}
