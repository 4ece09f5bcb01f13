//! In-memory backing store for the mock backend.
//!
//! All mutation happens under the `Db` write lock, so ids and tokens are
//! assigned without races. Passwords are kept as given; this server only
//! exists to exercise clients.
//!
//! Tokens expire `TOKEN_TTL_MINUTES` after issue. Expired ones are dropped
//! whenever a new token is issued.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::HttpError;
use crate::models::{CreateTodo, EnvironmentInfo, ListParams, Todo, UpdateTodo, User};

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub environment: EnvironmentInfo,
}

impl AppState {
    pub fn new(store: Store, environment: EnvironmentInfo) -> Self {
        Self {
            db: Arc::new(RwLock::new(store)),
            environment,
        }
    }
}

pub const TOKEN_TTL_MINUTES: i64 = 30;

struct IssuedToken {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct Store {
    accounts: Vec<Account>,
    todos: BTreeMap<i64, Todo>,
    tokens: HashMap<String, IssuedToken>,
    next_user_id: i64,
    next_todo_id: i64,
}

const SEED_USERS: &[(&str, &str, &str)] = &[
    ("test@example.com", "testuser", "password123"),
    ("admin@example.com", "admin", "admin123"),
    ("john@example.com", "johndoe", "john123"),
];

const SEED_TODOS: &[(usize, &str, &str, bool)] = &[
    (0, "Complete Coolify testing", "Test preview environments with this app", false),
    (0, "Review PR preview docs", "Check documentation for accuracy", true),
    (0, "Test authentication flow", "Ensure login/register works in preview", false),
    (1, "Configure Coolify settings", "Set max preview deployments to 10", false),
    (1, "Setup DNS records", "Create wildcard A record for *.preview.domain.com", true),
    (1, "Monitor server resources", "Check CPU/RAM usage with multiple previews", false),
    (2, "Buy groceries", "Milk, eggs, bread, coffee", false),
    (2, "Finish project report", "Due by end of week", false),
    (2, "Call dentist", "Schedule cleaning appointment", true),
];

fn validate_title(title: &str) -> Result<(), HttpError> {
    let len = title.chars().count();
    if !(1..=200).contains(&len) {
        return Err(HttpError::unprocessable("title must be 1-200 characters"));
    }
    Ok(())
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with three accounts and their todos.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        let mut ids = Vec::with_capacity(SEED_USERS.len());
        for (email, username, password) in SEED_USERS {
            match store.register(email, username, password) {
                Ok(user) => ids.push(user.id),
                Err(e) => tracing::error!(detail = %e.detail, "seed user rejected"),
            }
        }
        for (owner, title, description, completed) in SEED_TODOS {
            let Some(&owner_id) = ids.get(*owner) else {
                continue;
            };
            let input = CreateTodo {
                title: title.to_string(),
                description: Some(description.to_string()),
                completed: *completed,
            };
            if let Err(e) = store.create_todo(owner_id, input) {
                tracing::error!(detail = %e.detail, "seed todo rejected");
            }
        }
        store
    }

    pub fn register(&mut self, email: &str, username: &str, password: &str) -> Result<User, HttpError> {
        if !email.contains('@') {
            return Err(HttpError::unprocessable("value is not a valid email address"));
        }
        if !(3..=50).contains(&username.chars().count()) {
            return Err(HttpError::unprocessable("username must be 3-50 characters"));
        }
        if !(6..=100).contains(&password.chars().count()) {
            return Err(HttpError::unprocessable("password must be 6-100 characters"));
        }
        if self.accounts.iter().any(|a| a.user.email == email) {
            return Err(HttpError::bad_request("Email already registered"));
        }
        if self.accounts.iter().any(|a| a.user.username == username) {
            return Err(HttpError::bad_request("Username already taken"));
        }

        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            email: email.to_string(),
            username: username.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        Ok(user)
    }

    /// Issue a fresh opaque token for matching credentials.
    pub fn login(&mut self, email: &str, password: &str) -> Result<String, HttpError> {
        self.login_at(email, password, Utc::now())
    }

    fn login_at(&mut self, email: &str, password: &str, now: DateTime<Utc>) -> Result<String, HttpError> {
        let user_id = self
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| a.user.id)
            .ok_or_else(|| HttpError::unauthorized("Incorrect email or password"))?;
        self.tokens.retain(|_, issued| issued.expires_at > now);
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(
            token.clone(),
            IssuedToken {
                user_id,
                expires_at: now + Duration::minutes(TOKEN_TTL_MINUTES),
            },
        );
        Ok(token)
    }

    /// Resolve a bearer token to an active user.
    pub fn authenticate(&self, token: &str) -> Result<User, HttpError> {
        let user = self
            .tokens
            .get(token)
            .filter(|issued| issued.expires_at > Utc::now())
            .and_then(|issued| self.accounts.iter().find(|a| a.user.id == issued.user_id))
            .map(|a| a.user.clone())
            .ok_or_else(|| HttpError::unauthorized("Could not validate credentials"))?;
        if !user.is_active {
            return Err(HttpError::bad_request("Inactive user"));
        }
        Ok(user)
    }

    /// Drop every token issued so far, as if the signing key were rotated.
    pub fn revoke_all_tokens(&mut self) {
        self.tokens.clear();
    }

    /// One page of the owner's todos, in id order.
    pub fn todos_for(&self, owner_id: i64, page: ListParams) -> Vec<Todo> {
        self.todos
            .values()
            .filter(|t| t.owner_id == owner_id)
            .skip(page.skip)
            .take(page.limit)
            .cloned()
            .collect()
    }

    pub fn todo(&self, owner_id: i64, id: i64) -> Result<Todo, HttpError> {
        self.todos
            .get(&id)
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .ok_or_else(HttpError::todo_not_found)
    }

    fn todo_mut(&mut self, owner_id: i64, id: i64) -> Result<&mut Todo, HttpError> {
        self.todos
            .get_mut(&id)
            .filter(|t| t.owner_id == owner_id)
            .ok_or_else(HttpError::todo_not_found)
    }

    pub fn create_todo(&mut self, owner_id: i64, input: CreateTodo) -> Result<Todo, HttpError> {
        validate_title(&input.title)?;
        self.next_todo_id += 1;
        let todo = Todo {
            id: self.next_todo_id,
            title: input.title,
            description: input.description,
            completed: input.completed,
            owner_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    pub fn update_todo(&mut self, owner_id: i64, id: i64, input: UpdateTodo) -> Result<Todo, HttpError> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }
        let todo = self.todo_mut(owner_id, id)?;
        if let Some(title) = input.title {
            todo.title = title;
        }
        if let Some(description) = input.description {
            todo.description = Some(description);
        }
        if let Some(completed) = input.completed {
            todo.completed = completed;
        }
        todo.updated_at = Some(Utc::now());
        Ok(todo.clone())
    }

    pub fn toggle_todo(&mut self, owner_id: i64, id: i64) -> Result<Todo, HttpError> {
        let todo = self.todo_mut(owner_id, id)?;
        todo.completed = !todo.completed;
        todo.updated_at = Some(Utc::now());
        Ok(todo.clone())
    }

    pub fn delete_todo(&mut self, owner_id: i64, id: i64) -> Result<Todo, HttpError> {
        self.todo(owner_id, id)?;
        self.todos.remove(&id).ok_or_else(HttpError::todo_not_found)
    }
}
