use anyhow::Context;
use clap::{Parser, Subcommand};

mod app;
mod balance;
mod config;
mod error;
mod extract;
mod ingredients;
mod planner;
mod recipes;
mod shopping;
mod state;
mod store;
mod transfer;
mod validation;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "meal-planner", about = "Weekly meal planner API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "meal_planner=debug,axum=info,tower_http=info".to_string());
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

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => migrate(&config).await,
        Command::Serve => {
            let bind = config.bind_addr();
            let app_state = state::AppState::init(config).await?;
            app::serve(app::build_app(app_state), &bind).await
        }
    }
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required to run migrations")?;
    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .context("connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("apply migrations")?;
    tracing::info!("migrations applied");
    Ok(())
}
