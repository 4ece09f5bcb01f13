//! Account endpoints and the local half of the session lifecycle.
//!
//! `login` is the only place a token enters the session store; `logout` is
//! local only and never touches the network.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::{LoginRequest, RegisterRequest, Token, User};

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const ME_PATH: &str = "/api/auth/me";

#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.client.build_json(HttpMethod::Post, REGISTER_PATH, input)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.client.build_json(HttpMethod::Post, LOGIN_PATH, input)
    }

    pub fn build_current_user(&self) -> HttpRequest {
        self.client.build(HttpMethod::Get, ME_PATH)
    }

    /// Create an account. Backend validation errors come back unchanged.
    #[tracing::instrument(skip(self, password))]
    pub fn register(&self, email: &str, username: &str, password: &str) -> Result<User, ApiError> {
        let request = self.build_register(&RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let response = self.client.execute_anonymous(request)?;
        self.client.parse(response)
    }

    /// Exchange credentials for a token and store it before returning.
    ///
    /// Rejected credentials come back as `ApiError::Http` and leave the
    /// session store exactly as it was.
    #[tracing::instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<Token, ApiError> {
        let request = self.build_login(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let response = self.client.execute_anonymous(request)?;
        let token: Token = self.client.parse(response)?;
        self.client.session().set_token(&token.access_token);
        tracing::info!("logged in");
        Ok(token)
    }

    pub fn logout(&self) {
        if self.client.session().clear().had_session {
            tracing::info!("logged out");
        }
    }

    /// Fetch the authenticated user and cache it in the session.
    #[tracing::instrument(skip(self))]
    pub fn current_user(&self) -> Result<User, ApiError> {
        let response = self.client.execute(self.build_current_user())?;
        let user: User = self.client.parse(response)?;
        self.client.session().set_user(&user);
        Ok(user)
    }
}
