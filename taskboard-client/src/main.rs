//! # Taskboard
//!
//! Command-line entry point: loads configuration, restores the persisted
//! session and, when signed in, keeps the session role in sync while
//! printing the organization's projects.
//!
//! ## Usage
//!
//! ```bash
//! TASKBOARD_API__BASE_URL=http://localhost:8000 cargo run -p taskboard-client
//! ```

use std::sync::Arc;

use taskboard_client::api::TaskboardApi;
use taskboard_client::config::Config;
use taskboard_client::role_sync::spawn_role_sync;
use taskboard_shared::session::{FilePersistence, SessionStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard_client=debug,taskboard_board=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Taskboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let session = SessionStore::load(Arc::new(FilePersistence::new(&config.session.path)));
    let api = TaskboardApi::from_config(&config, session)?;

    let Some(user) = api.session().user() else {
        tracing::warn!("Not signed in, sign in to continue");
        return Ok(());
    };
    tracing::info!(username = %user.username, role = %user.role, "Session restored");

    let shutdown = CancellationToken::new();
    let role_sync = spawn_role_sync(api.clone(), shutdown.clone());

    match api.list_projects().await {
        Ok(projects) => {
            for project in projects.iter() {
                println!("{:>5}  {}", project.id, project.name);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "{}", e.user_message("load projects"));
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting...");
    shutdown.cancel();
    role_sync.await?;

    Ok(())
}
