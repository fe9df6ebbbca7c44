//! Company handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use backoffice_core::models::company::{Company, CompanyQuery};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedPrincipal;
use crate::models::{CompanyListResponse, CompanyRequest};

/// `POST /companies` (admin only).
pub async fn create_company(
    State(state): State<AppState>,
    Json(body): Json<CompanyRequest>,
) -> AppResult<(StatusCode, Json<Company>)> {
    let company = state.services.companies.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// `GET /companies`: all companies, name search (admin only).
pub async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> AppResult<Json<CompanyListResponse>> {
    let (companies, total) = state.services.companies.list(&query).await?;
    Ok(Json(CompanyListResponse { companies, total }))
}

/// `GET /companies/me`: companies linked to the caller.
pub async fn my_companies(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Query(query): Query<CompanyQuery>,
) -> AppResult<Json<CompanyListResponse>> {
    let (companies, total) = state
        .services
        .companies
        .my_companies(&actor, &query)
        .await?;
    Ok(Json(CompanyListResponse { companies, total }))
}

/// `GET /companies/{uuid}`: owner or admin.
pub async fn get_company(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<Company>> {
    state.services.guard.require_owner(&actor, uuid).await?;
    let company = state.services.companies.find(uuid).await?;
    Ok(Json(company))
}

/// `PATCH /companies/{uuid}` (admin only).
pub async fn update_company(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<CompanyRequest>,
) -> AppResult<Json<Company>> {
    let company = state.services.companies.update(uuid, &body.name).await?;
    Ok(Json(company))
}

/// `DELETE /companies/{uuid}` (admin only).
pub async fn delete_company(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.companies.delete(uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /companies/{uuid}/users/{user_uuid}`: create the ownership edge (admin only).
pub async fn link_user(
    State(state): State<AppState>,
    Path((company_uuid, user_uuid)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Company>> {
    let company = state
        .services
        .companies
        .link_user(company_uuid, user_uuid)
        .await?;
    Ok(Json(company))
}
