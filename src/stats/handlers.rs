use axum::{extract::State, Json};
use chrono::Utc;

use crate::auth::AuthenticatedOperator;
use crate::error::LedgerError;
use crate::stats::service::Dashboard;
use crate::AppState;

/// Handler for GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Today and this month at a glance", body = Dashboard)),
    security(("bearer_auth" = [])),
    tag = "stats"
)]
pub async fn dashboard_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
) -> Result<Json<Dashboard>, LedgerError> {
    let dashboard = state.stats.dashboard(Utc::now()).await?;
    Ok(Json(dashboard))
}
