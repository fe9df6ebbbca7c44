//! User administration handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use backoffice_core::models::auth::{PrincipalProfile, ProfileUpdate, UserQuery};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedPrincipal;
use crate::models::{SignUpRequest, UserListResponse};

/// `POST /users`: register another administrator (admin only).
pub async fn create_admin(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<PrincipalProfile>)> {
    let admin = state.services.users.create_admin(body.into()).await?;
    Ok((StatusCode::CREATED, Json(admin.into())))
}

/// `GET /users`: filtered, paginated listing (admin only).
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<UserListResponse>> {
    let (users, total) = state.services.users.list(&query).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(PrincipalProfile::from).collect(),
        total,
    }))
}

/// `GET /users/{uuid}` (admin only).
pub async fn get_user(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<PrincipalProfile>> {
    let user = state.services.users.find_by_uuid(uuid).await?;
    Ok(Json(user.into()))
}

/// `PATCH /users/{uuid}`: self or admin; only admins change roles.
pub async fn update_user(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<ProfileUpdate>,
) -> AppResult<Json<PrincipalProfile>> {
    let updated = state.services.users.update(&actor, uuid, body).await?;
    Ok(Json(updated.into()))
}

/// `DELETE /users/{uuid}` (admin only).
pub async fn delete_user(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.users.delete(uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}
