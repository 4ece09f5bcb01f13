use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use todo_client::{
    ApiClient, ApiError, ClientConfig, CreateTodo, FileStorage, Navigator, SessionCoordinator,
    SessionStore, Todo, UpdateTodo, View,
};

#[derive(Parser)]
#[command(name = "todo", version, about = "Todo demo client")]
struct Cli {
    /// Backend base URL [default: $TODO_API_URL or http://localhost:8000]
    #[arg(long)]
    api_url: Option<String>,

    /// File holding the persisted session [default: $TODO_SESSION_FILE or .todo-session.json]
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the local session
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Print the cached user without contacting the backend
        #[arg(long)]
        cached: bool,
    },
    /// List your todos
    List,
    /// Create a todo
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: bool,
    },
    /// Change fields of a todo
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Flip a todo between open and done
    Toggle { id: i64 },
    /// Delete a todo
    Rm { id: i64 },
    /// Backend health and deployment environment
    Status,
}

/// There is no page to load, so tell the user which command to run.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, view: View) {
        match view {
            View::Login => eprintln!("Not logged in. Run `todo login` to continue."),
            View::Todos => eprintln!("Run `todo list` to see your todos."),
        }
    }
}

struct App {
    client: ApiClient,
    coordinator: SessionCoordinator<TerminalNavigator>,
}

impl App {
    fn new(config: &ClientConfig) -> Result<Self> {
        let storage = FileStorage::open_or_reset(&config.session_path).with_context(|| {
            format!("Failed to open session file: {}", config.session_path.display())
        })?;
        let session = Arc::new(SessionStore::new(storage));
        Ok(Self {
            client: ApiClient::from_config(config, session.clone()),
            coordinator: SessionCoordinator::new(session, TerminalNavigator),
        })
    }

    fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        self.coordinator.observe(result)
    }

    /// Re-fetch and print the whole list, the way every mutation ends.
    fn refresh(&self) -> Result<()> {
        let todos = self
            .observe(self.client.todos().get_all())
            .context("Failed to load todos")?;
        print_todos(&todos);
        Ok(())
    }
}

fn print_todos(todos: &[Todo]) {
    if todos.is_empty() {
        println!("No todos yet.");
        return;
    }
    for todo in todos {
        let mark = if todo.completed { "x" } else { " " };
        match &todo.description {
            Some(description) => println!("[{mark}] {:>4}  {} - {description}", todo.id, todo.title),
            None => println!("[{mark}] {:>4}  {}", todo.id, todo.title),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(session_file) = cli.session_file {
        config.session_path = session_file;
    }
    tracing::debug!(api_url = %config.api_url, session = %config.session_path.display(), "starting");
    let app = App::new(&config)?;

    match cli.command {
        Commands::Register {
            email,
            username,
            password,
        } => {
            let user = app
                .observe(app.client.auth().register(&email, &username, &password))
                .context("Registration failed")?;
            println!("Registered {} <{}>. Run `todo login` next.", user.username, user.email);
        }
        Commands::Login { email, password } => {
            app.coordinator
                .login(app.client.auth(), &email, &password)
                .context("Login failed")?;
            let user = app
                .observe(app.client.auth().current_user())
                .context("Failed to load user")?;
            println!("Logged in as {}", user.username);
        }
        Commands::Logout => {
            app.coordinator.logout(app.client.auth());
            println!("Logged out.");
        }
        Commands::Whoami { cached } => {
            let user = if cached {
                app.client.session().user()
            } else {
                Some(
                    app.observe(app.client.auth().current_user())
                        .context("Failed to load user")?,
                )
            };
            match user {
                Some(user) => println!("{} <{}> (id {})", user.username, user.email, user.id),
                None => println!("Not logged in."),
            }
        }
        Commands::List => app.refresh()?,
        Commands::Add {
            title,
            description,
            completed,
        } => {
            let input = CreateTodo {
                title,
                description,
                completed: completed.then_some(true),
            };
            app.observe(app.client.todos().create(&input))
                .context("Failed to create todo")?;
            app.refresh()?;
        }
        Commands::Edit {
            id,
            title,
            description,
            completed,
        } => {
            let input = UpdateTodo {
                title,
                description,
                completed,
            };
            app.observe(app.client.todos().update(id, &input))
                .with_context(|| format!("Failed to update todo {id}"))?;
            app.refresh()?;
        }
        Commands::Toggle { id } => {
            app.observe(app.client.todos().toggle(id))
                .with_context(|| format!("Failed to toggle todo {id}"))?;
            app.refresh()?;
        }
        Commands::Rm { id } => {
            let ack = app
                .observe(app.client.todos().delete(id))
                .with_context(|| format!("Failed to delete todo {id}"))?;
            println!("{}", ack.message);
            app.refresh()?;
        }
        Commands::Status => {
            match app.observe(app.client.status().health()) {
                Ok(_) => println!("backend: healthy ({})", app.client.base_url()),
                Err(e) => println!("backend: unhealthy ({e})"),
            }
            let environment = app
                .observe(app.client.status().environment())
                .context("Failed to load environment")?;
            println!("{}", serde_json::to_string_pretty(&environment)?);
        }
    }

    Ok(())
}
