//! Documentation of the abacus server.
//!
//! A place-value abacus kept in memory and driven over HTTP. See [`abacus`] for the model.
//!
//!
//!
//! # API
//!
//! Every abacus route answers with the current box, `{ "width", "divider", "rows" }`, where
//! rows are `[y, count]` pairs sorted by `y`.
//!
//! | Route | Body | Defaults |
//! |-------|------|----------|
//! | `GET /api/abacus/state` | | |
//! | `POST /api/abacus/init` | `base` | 5 |
//! | `POST /api/abacus/add` | `y`, `k` | 0, 1 |
//! | `POST /api/abacus/sub` | `y`, `k` | 0, 1 |
//! | `POST /api/abacus/mul2` | `steps` | 1 |
//! | `POST /api/abacus/div2` | `steps` | 1 |
//! | `POST /api/abacus/convert` | `base` | 5 |
//! | `POST /api/abacus/interpret` | `legend`, `visible_rows`, `top_to_bottom`, `direction`, `joiner` | `[]`, 16, true, `"rtl"`, `""` |
//! | `GET /health` | | |
//!
//! - Bodies are optional, missing fields take their defaults
//! - Numbers may be sent as floats, strings or booleans, `"3"` and `3.7` both read as 3, `true` as 1
//! - A base below 2 is rejected with 400, nothing else is
//!
//!
//!
//! # Notes
//!
//! ## One box per process
//! The box lives in [`state::AppState`] behind a single mutex. Every operation holds the lock
//! for its whole run, so concurrent requests are serialized. Nothing is persisted, a restart
//! starts from an empty box in the configured base.
//!
//! ## Halving can stop early
//! `div2` gives up once a borrow would move past the units place. The response does not say
//! how many steps ran, the count only shows up in debug logs.
//!
//!
//!
//! # Setup
//!
//! Run with logs.
//! ```sh
//! RUST_LOG=debug cargo run -p abacus
//! ```
//!
//! Environment.
//! - `RUST_PORT`: listen port, default 1111
//! - `ABACUS_BASE`: base of the startup box, default 5
//! - `APP_ENV`: `production` also allows `FRONTEND_URL` through CORS
//!
//! Try it.
//! ```sh
//! curl -X POST localhost:1111/api/abacus/add -d '{"y": 0, "k": 3}'
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::ctrl_c;
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod abacus;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use error::AppError;
use routes::{
    add_handler, convert_handler, div2_handler, health_handler, init_handler, interpret_handler,
    mul2_handler, state_handler, sub_handler,
};
use state::AppState;

pub async fn start_server(port: Option<u16>, base: Option<i64>) -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?.with_overrides(port, base)?;

    info!("Initializing state with base {}...", config.base);
    let state = AppState::new(config)?;

    info!("Starting server...");
    let app = app(state.clone())?;

    let address = state.config.address();
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

pub fn app(state: Arc<AppState>) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config)?;

    Ok(Router::new()
        .route("/health", get(health_handler))
        .route("/api/abacus/state", get(state_handler))
        .route("/api/abacus/init", post(init_handler))
        .route("/api/abacus/add", post(add_handler))
        .route("/api/abacus/sub", post(sub_handler))
        .route("/api/abacus/mul2", post(mul2_handler))
        .route("/api/abacus/div2", post(div2_handler))
        .route("/api/abacus/convert", post(convert_handler))
        .route("/api/abacus/interpret", post(interpret_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(config: &Config) -> Result<CorsLayer, AppError> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|e| AppError::Config(format!("Invalid origin {origin}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
