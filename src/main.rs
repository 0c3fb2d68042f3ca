//! Intake questionnaire frontend server.
//!
//! - Axum HTTP, server-rendered pages
//! - Landing / questions / quiz-results services over HTTP (reqwest)
//! - Static assets from ./static (or `static_dir`)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   BACKEND_BASE_URL    : services base URL, default "http://localhost:3005"
//!   STORE_DIR           : keep session answers as files in this directory (default: in memory)
//!   INTAKE_CONFIG_PATH  : path to TOML config (backend, storage, labels, session TTL)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use intake_frontend::config::AppConfig;
use intake_frontend::routes::build_router;
use intake_frontend::state::{spawn_session_sweeper, AppState};
use intake_frontend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = AppConfig::from_env();

  // Shared state: backend client, session storage, templates.
  let state = Arc::new(AppState::from_config(&cfg)?);

  spawn_session_sweeper(state.clone(), cfg.storage.sweep_interval(), cfg.storage.session_ttl());
  info!(target: "intake_frontend", ttl_secs = cfg.storage.session_ttl_secs, "Idle session sweeper started");

  let app = build_router(state, &cfg.static_dir);

  let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "intake_frontend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "intake_frontend", "Shutdown requested");
    })
    .await?;
  Ok(())
}
