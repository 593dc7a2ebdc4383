//! YelpCamp Backend
//!
//! Campground listings with threaded comments, backed by SQLite. Comment
//! mutations are gated on a login session and on comment ownership.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod flash;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting YelpCamp Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if !config.secure_cookies {
        tracing::warn!("Session cookies are not marked Secure (YELPCAMP_SECURE_COOKIES)");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo: repo.clone(),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.close().await;
    tracing::info!("Database closed");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public pages
    let public_routes = Router::new()
        .route("/", get(api::landing))
        .route(
            "/campgrounds",
            get(api::list_campgrounds).post(api::create_campground),
        )
        .route("/campgrounds/new", get(api::new_campground))
        .route("/campgrounds/{id}", get(api::show_campground))
        .route("/register", get(api::register_form).post(api::register))
        .route("/login", get(api::login_form).post(api::login))
        .route("/logout", get(api::logout));

    // Comment collection routes: login required
    let comment_routes = Router::new()
        .route("/campgrounds/{id}/comments/new", get(api::new_comment))
        .route("/campgrounds/{id}/comments", post(api::create_comment))
        .route_layer(middleware::from_fn(auth::require_login));

    // Comment member routes: login and ownership required.
    // Route layers added last run first, so the login gate runs before the owner gate.
    let owned_comment_routes = Router::new()
        .route(
            "/campgrounds/{id}/comments/{comment_id}/edit",
            get(api::edit_comment),
        )
        .route(
            "/campgrounds/{id}/comments/{comment_id}",
            post(api::override_comment)
                .put(api::update_comment)
                .delete(api::delete_comment),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_comment_owner,
        ))
        .route_layer(middleware::from_fn(auth::require_login));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(comment_routes)
        .merge(owned_comment_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::load_session,
        ))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
