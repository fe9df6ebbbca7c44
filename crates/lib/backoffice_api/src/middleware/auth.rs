//! Authorization middleware: bearer extraction and per-route access checks.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use backoffice_core::auth::guard::Access;
use backoffice_core::models::auth::Principal;

use crate::AppState;
use crate::error::AppError;

/// Principal resolved for the current request, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware: checks the route's [`Access`] through the guard and
/// injects [`AuthenticatedPrincipal`] for protected routes.
pub async fn authorize(
    State((state, access)): State<(AppState, Access)>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = bearer_token(request.headers()).map(str::to_owned);
    let principal = state
        .services
        .guard
        .authorize(bearer.as_deref(), access)
        .await?;

    if let Some(principal) = principal {
        request
            .extensions_mut()
            .insert(AuthenticatedPrincipal(principal));
    }
    Ok(next.run(request).await)
}
