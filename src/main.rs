use std::sync::Arc;

mod app;
mod auth;
mod config;
mod error;
mod extract;
mod mail;
mod savings;
mod state;
mod users;

use crate::{
    config::AppConfig, mail::LogMailer, state::AppState, users::repo::PgUserRepo,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "savings_api=debug,axum=info,tower_http=info".to_string());
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

    let config = Arc::new(AppConfig::from_env()?);
    let db = state::connect(&config).await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let app_state = AppState::from_parts(
        config,
        Arc::new(PgUserRepo::new(db)),
        Arc::new(LogMailer),
    );

    app::serve(app::build_app(app_state)).await
}
