// HTTP handlers for bonus rules and the service catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AdminOperator, AuthenticatedOperator};
use crate::catalog::models::{RechargeRuleRequest, RuleListParams, ServiceItemRequest};
use crate::error::LedgerError;
use crate::models::{RechargeRule, ServiceItem};
use crate::AppState;

/// Handler for GET /api/recharge-rules
#[utoipa::path(
    get,
    path = "/api/recharge-rules",
    params(RuleListParams),
    responses((status = 200, description = "Rules by threshold ascending", body = [RechargeRule])),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn list_rules_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Query(params): Query<RuleListParams>,
) -> Result<Json<Vec<RechargeRule>>, LedgerError> {
    let rules = state.catalog.list_rules(params.active.unwrap_or(false)).await?;
    Ok(Json(rules))
}

/// Handler for POST /api/recharge-rules (admin)
#[utoipa::path(
    post,
    path = "/api/recharge-rules",
    request_body = RechargeRuleRequest,
    responses(
        (status = 201, description = "Rule created", body = RechargeRule),
        (status = 400, description = "Invalid amounts"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Threshold already used by another rule")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn create_rule_handler(
    State(state): State<AppState>,
    _admin: AdminOperator,
    Json(request): Json<RechargeRuleRequest>,
) -> Result<(StatusCode, Json<RechargeRule>), LedgerError> {
    request.validate()?;
    let rule = state.catalog.create_rule(request.into()).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// Handler for PUT /api/recharge-rules/:id (admin)
#[utoipa::path(
    put,
    path = "/api/recharge-rules/{id}",
    params(("id" = Uuid, Path, description = "Rule id")),
    request_body = RechargeRuleRequest,
    responses(
        (status = 200, description = "Rule updated", body = RechargeRule),
        (status = 404, description = "Rule not found"),
        (status = 409, description = "Threshold already used by another rule")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn update_rule_handler(
    State(state): State<AppState>,
    _admin: AdminOperator,
    Path(id): Path<Uuid>,
    Json(request): Json<RechargeRuleRequest>,
) -> Result<Json<RechargeRule>, LedgerError> {
    request.validate()?;
    let rule = state.catalog.update_rule(id, request.into()).await?;
    Ok(Json(rule))
}

/// Handler for DELETE /api/recharge-rules/:id (admin)
#[utoipa::path(
    delete,
    path = "/api/recharge-rules/{id}",
    params(("id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "Rule not found")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn delete_rule_handler(
    State(state): State<AppState>,
    _admin: AdminOperator,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, LedgerError> {
    state.catalog.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/services
#[utoipa::path(
    get,
    path = "/api/services",
    responses((status = 200, description = "Active services in display order", body = [ServiceItem])),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn list_services_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
) -> Result<Json<Vec<ServiceItem>>, LedgerError> {
    let services = state.catalog.list_services().await?;
    Ok(Json(services))
}

/// Handler for POST /api/services (admin)
#[utoipa::path(
    post,
    path = "/api/services",
    request_body = ServiceItemRequest,
    responses(
        (status = 201, description = "Service created", body = ServiceItem),
        (status = 400, description = "Invalid name or price"),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn create_service_handler(
    State(state): State<AppState>,
    _admin: AdminOperator,
    Json(request): Json<ServiceItemRequest>,
) -> Result<(StatusCode, Json<ServiceItem>), LedgerError> {
    request.validate()?;
    let item = state.catalog.create_service(request.into()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for PUT /api/services/:id (admin)
#[utoipa::path(
    put,
    path = "/api/services/{id}",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = ServiceItemRequest,
    responses(
        (status = 200, description = "Service updated", body = ServiceItem),
        (status = 404, description = "Service not found")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn update_service_handler(
    State(state): State<AppState>,
    _admin: AdminOperator,
    Path(id): Path<Uuid>,
    Json(request): Json<ServiceItemRequest>,
) -> Result<Json<ServiceItem>, LedgerError> {
    request.validate()?;
    let item = state.catalog.update_service(id, request.into()).await?;
    Ok(Json(item))
}

/// Handler for DELETE /api/services/:id (admin)
/// Soft delete: the service disappears from the catalog but history keeps it
#[utoipa::path(
    delete,
    path = "/api/services/{id}",
    params(("id" = Uuid, Path, description = "Service id")),
    responses(
        (status = 204, description = "Service deactivated"),
        (status = 404, description = "Service not found")
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn delete_service_handler(
    State(state): State<AppState>,
    _admin: AdminOperator,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, LedgerError> {
    state.catalog.deactivate_service(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
