//! # Storefront
//!
//! Cart and mock checkout backend for the storefront UI.
//!
//! ## Usage
//!
//! ```bash
//! # Optional overrides
//! export PORT=8080
//! export CHECKOUT_PROCESSING_DELAY_MS=2000
//! export CHECKOUT_SUCCESS_PROBABILITY=0.9
//! export SESSION_IDLE_TIMEOUT_SECS=1800
//!
//! # Run the server
//! storefront
//! ```

use shop_api::{routes, state::AppState};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;

    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Services loaded: {}", state.catalog.len());
    info!("Session idle timeout: {:?}", state.config.session_idle_timeout);

    let sweep_period = (state.sessions.idle_timeout() / 4).max(Duration::from_secs(1));
    state.sessions.spawn_evictor(sweep_period);

    let app = routes::create_router(state);

    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Sessions: POST http://{}/api/v1/sessions", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Storefront
  ━━━━━━━━━━━━━━━━━━━━━━━
  Cart & mock checkout
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
