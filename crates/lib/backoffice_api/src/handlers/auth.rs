//! Account request handlers: signup, sign-in, refresh, confirmation,
//! password recovery and change.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use backoffice_core::auth::guard::AuthorizationGuard;
use backoffice_core::auth::{AuthError, TokenRejection};
use backoffice_core::models::auth::{PrincipalProfile, TokenPair};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedPrincipal, bearer_token};
use crate::models::{
    MessageResponse, PasswordRequest, RecoverEmailRequest, RefreshRequest, SignInRequest,
    SignUpRequest,
};

/// `POST /auth/signup`: register an inactive account and mail the confirmation token.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<PrincipalProfile>)> {
    let principal = state.services.lifecycle.sign_up(body.into()).await?;
    Ok((StatusCode::CREATED, Json(principal.into())))
}

/// `POST /auth/signin`: exchange email + password for a token pair.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state
        .services
        .lifecycle
        .sign_in(&body.email, &body.password)
        .await?;
    Ok(Json(pair))
}

/// `POST /auth/refresh-token`: rotate the refresh token.
///
/// The token comes from the `refresh_token` body field, or from the bearer
/// header when the body omits it.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<TokenPair>> {
    let request = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?
    };
    let presented = request
        .refresh_token
        .or_else(|| bearer_token(&headers).map(str::to_owned))
        .ok_or(AuthError::InvalidToken(TokenRejection::Missing))?;

    let pair = state.services.lifecycle.refresh(&presented).await?;
    Ok(Json(pair))
}

/// `GET /auth/me`: profile of the caller. Inactive accounts may call this.
pub async fn me(
    axum::Extension(AuthenticatedPrincipal(principal)): axum::Extension<AuthenticatedPrincipal>,
) -> Json<PrincipalProfile> {
    Json(principal.into())
}

/// `GET /auth/confirm/{token}`: redeem a confirmation token.
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<PrincipalProfile>> {
    let principal = state.services.lifecycle.confirm_email(&token).await?;
    Ok(Json(principal.into()))
}

/// `POST /auth/send-recover-email`: mail a password recovery token.
pub async fn send_recover_email(
    State(state): State<AppState>,
    Json(body): Json<RecoverEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .lifecycle
        .send_recover_password_email(&body.email)
        .await?;
    Ok(Json(MessageResponse::new(
        "An email with password recovery instructions has been sent",
    )))
}

/// `PATCH /auth/reset-password/{token}`: set a new password with a recover token.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<PasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .lifecycle
        .reset_password(&token, &body.password, &body.password_confirmation)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// `PATCH /auth/{uuid}/change-password`: self or admin.
pub async fn change_password(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<PasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    AuthorizationGuard::require_self_or_admin(&actor, uuid)?;
    state
        .services
        .lifecycle
        .change_password(uuid, &body.password, &body.password_confirmation)
        .await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}
