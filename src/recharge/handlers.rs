// HTTP handlers for recharge endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::AuthenticatedOperator;
use crate::error::LedgerError;
use crate::recharge::models::{BonusPreview, BonusPreviewParams, RechargeRequest, RechargeResponse};
use crate::AppState;

/// Handler for POST /api/recharges
/// Tops up a member's balance, applying the best matching bonus rule
#[utoipa::path(
    post,
    path = "/api/recharges",
    request_body = RechargeRequest,
    responses(
        (status = 201, description = "Recharge committed", body = RechargeResponse),
        (status = 400, description = "Invalid amount or payment method"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member kept changing concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "recharges"
)]
pub async fn create_recharge_handler(
    State(state): State<AppState>,
    AuthenticatedOperator(operator): AuthenticatedOperator,
    Json(request): Json<RechargeRequest>,
) -> Result<(StatusCode, Json<RechargeResponse>), LedgerError> {
    tracing::debug!("Recharge requested by {} for member {}", operator.name, request.member_id);
    request.validate()?;

    let receipt = state
        .recharges
        .recharge(request.member_id, request.amount, request.payment_method, &operator.name)
        .await?;

    let response = RechargeResponse {
        new_balance: receipt.member.balance,
        record: receipt.record,
        member: receipt.member,
        bonus: receipt.bonus,
        total_credited: receipt.total_credited,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET /api/recharges/preview
/// Shows the bonus an amount would earn under the active rules
#[utoipa::path(
    get,
    path = "/api/recharges/preview",
    params(BonusPreviewParams),
    responses(
        (status = 200, description = "Bonus preview", body = BonusPreview),
        (status = 400, description = "Invalid amount")
    ),
    security(("bearer_auth" = [])),
    tag = "recharges"
)]
pub async fn preview_bonus_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Query(params): Query<BonusPreviewParams>,
) -> Result<Json<BonusPreview>, LedgerError> {
    let preview = state.recharges.preview(params.amount).await?;
    Ok(Json(preview))
}
