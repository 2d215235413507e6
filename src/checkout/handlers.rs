// HTTP handlers for checkout endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::AuthenticatedOperator;
use crate::checkout::cart::Cart;
use crate::checkout::models::{CheckoutRequest, CheckoutResponse};
use crate::checkout::service::Payment;
use crate::error::LedgerError;
use crate::validation::normalize_optional;
use crate::AppState;

/// Handler for POST /api/checkouts
/// Charges a cart of catalog and custom lines to a member
#[utoipa::path(
    post,
    path = "/api/checkouts",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Checkout committed", body = CheckoutResponse),
        (status = 400, description = "Empty cart or invalid line"),
        (status = 404, description = "Member or service not found"),
        (status = 409, description = "Member kept changing concurrently"),
        (status = 422, description = "Balance too low for a balance payment")
    ),
    security(("bearer_auth" = [])),
    tag = "checkouts"
)]
pub async fn create_checkout_handler(
    State(state): State<AppState>,
    AuthenticatedOperator(operator): AuthenticatedOperator,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), LedgerError> {
    tracing::debug!("Checkout requested by {} for member {}", operator.name, request.member_id);
    request.validate()?;

    let catalog = state.checkouts.catalog_snapshot().await?;
    let cart = Cart::from_request(&request.lines, &catalog)?;
    let operator_name = normalize_optional(request.operator_name).unwrap_or(operator.name);

    let receipt = state
        .checkouts
        .checkout(
            request.member_id,
            &cart,
            Payment {
                method: request.payment_method,
                balance_override: request.balance_override,
            },
            &operator_name,
        )
        .await?;

    let response = CheckoutResponse {
        total_amount: receipt.record.total_amount,
        balance_paid: receipt.split.balance_paid,
        other_paid: receipt.split.other_paid,
        new_balance: receipt.member.balance,
        record: receipt.record,
        items: receipt.items,
        member: receipt.member,
    };

    Ok((StatusCode::CREATED, Json(response)))
}
