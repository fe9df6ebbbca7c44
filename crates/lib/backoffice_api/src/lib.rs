//! # backoffice_api
//!
//! HTTP API library for the back-office service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use backoffice_core::services::Services;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::ROUTES;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Domain services, built once at start-up.
    pub services: Arc<Services>,
}

/// Run embedded database migrations.
///
/// Delegates to `backoffice_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    backoffice_core::migrate::migrate(pool).await
}

/// Builds the Axum router from the route table.
///
/// Each entry gets the authorization middleware bound to its own access
/// requirement, so several methods on one path may differ in access.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app: Router<AppState> = Router::new();
    for route in ROUTES {
        let access = axum::middleware::from_fn_with_state(
            (state.clone(), route.access),
            middleware::auth::authorize,
        );
        app = app.route(route.path, routes::method_router(route).route_layer(access));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
