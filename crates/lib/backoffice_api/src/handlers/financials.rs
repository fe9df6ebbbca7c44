//! Financial ledger handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use backoffice_core::models::company::{
    Financial, FinancialDetail, FinancialQuery, FinancialWithDetails,
};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedPrincipal;
use crate::models::{CreateFinancialDetailRequest, CreateFinancialRequest, FinancialListResponse};

/// `POST /financials`: admin, or owner of the target company.
pub async fn create_financial(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Json(body): Json<CreateFinancialRequest>,
) -> AppResult<(StatusCode, Json<Financial>)> {
    let financial = state
        .services
        .financials
        .create(&actor, body.company)
        .await?;
    Ok((StatusCode::CREATED, Json(financial)))
}

/// `GET /financials/{uuid}`: the ledger and its line items (admin or company owner).
pub async fn get_financial(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<FinancialWithDetails>> {
    let financial = state.services.financials.find(&actor, uuid).await?;
    Ok(Json(financial))
}

/// `POST /financials/{uuid}/details`: append a line item (admin or company owner).
pub async fn create_financial_detail(
    State(state): State<AppState>,
    axum::Extension(AuthenticatedPrincipal(actor)): axum::Extension<AuthenticatedPrincipal>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<CreateFinancialDetailRequest>,
) -> AppResult<(StatusCode, Json<FinancialDetail>)> {
    let detail = state
        .services
        .financials
        .add_detail(&actor, uuid, body.value_cents)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /financials`: optionally filtered by `company` (admin only).
pub async fn list_financials(
    State(state): State<AppState>,
    Query(query): Query<FinancialQuery>,
) -> AppResult<Json<FinancialListResponse>> {
    let (financials, total) = state.services.financials.list(&query).await?;
    Ok(Json(FinancialListResponse { financials, total }))
}

/// `DELETE /financials/{uuid}` (admin only).
pub async fn delete_financial(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.financials.delete(uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}
