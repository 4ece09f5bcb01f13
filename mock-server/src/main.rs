use mock_server::{AppState, EnvironmentInfo, Store};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let environment = EnvironmentInfo::from_env();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, environment = %environment.environment, "listening");
    mock_server::run(listener, AppState::new(Store::seeded(), environment)).await
}
