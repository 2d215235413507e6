// HTTP handlers for ledger history and refunds

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedOperator;
use crate::error::LedgerError;
use crate::models::{ConsumptionListing, ConsumptionRecord, RechargeListing};
use crate::orders::models::RefundRequest;
use crate::query::{HistoryParams, QueryValidator};
use crate::AppState;

/// Handler for GET /api/recharges
/// Lists recharge records, newest first
#[utoipa::path(
    get,
    path = "/api/recharges",
    params(HistoryParams),
    responses(
        (status = 200, description = "Recharge history", body = [RechargeListing]),
        (status = 400, description = "Invalid date filter")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_recharges_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<RechargeListing>>, LedgerError> {
    let filter = QueryValidator::history_filter(params, &state.calendar, state.config.listing_limit)?;
    let rows = state.orders.list_recharges(&filter).await?;
    Ok(Json(rows))
}

/// Handler for GET /api/consumptions
/// Lists consumption records, newest first
#[utoipa::path(
    get,
    path = "/api/consumptions",
    params(HistoryParams),
    responses(
        (status = 200, description = "Consumption history", body = [ConsumptionListing]),
        (status = 400, description = "Invalid date filter")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_consumptions_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ConsumptionListing>>, LedgerError> {
    let filter = QueryValidator::history_filter(params, &state.calendar, state.config.listing_limit)?;
    let rows = state.orders.list_consumptions(&filter).await?;
    Ok(Json(rows))
}

/// Handler for POST /api/consumptions/:id/refund
/// Flags a consumption as refunded without moving any money
#[utoipa::path(
    post,
    path = "/api/consumptions/{id}/refund",
    params(("id" = Uuid, Path, description = "Consumption record id")),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Record flagged as refunded", body = ConsumptionRecord),
        (status = 404, description = "Consumption not found"),
        (status = 409, description = "Already refunded")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn refund_consumption_handler(
    State(state): State<AppState>,
    AuthenticatedOperator(operator): AuthenticatedOperator,
    Path(id): Path<Uuid>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<ConsumptionRecord>, LedgerError> {
    tracing::debug!("Refund of consumption {} requested by {}", id, operator.name);
    request.validate()?;

    let record = state.orders.mark_refunded(id, request.note).await?;
    Ok(Json(record))
}
