mod app;
mod attendance;
mod auth;
mod bookings;
mod config;
mod error;
mod extract;
#[cfg(test)]
mod memory;
mod notify;
mod state;
mod users;
mod validation;
mod works;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "canopus=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let (state, background) = state::AppState::init().await?;
    let app = app::build_app(state);

    // The router owns the last AppState; it is dropped when serve returns,
    // which closes the mail queue.
    app::serve(app).await?;
    background.shutdown().await;

    Ok(())
}
