// HTTP handlers for member endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthenticatedOperator;
use crate::error::LedgerError;
use crate::members::models::{CreateMemberRequest, MemberDetail, MemberPageResponse, UpdateMemberRequest};
use crate::models::Member;
use crate::query::{MemberSearchParams, QueryValidator};
use crate::AppState;

/// Handler for GET /api/members
/// Searches members by member number, phone or name
#[utoipa::path(
    get,
    path = "/api/members",
    params(MemberSearchParams),
    responses(
        (status = 200, description = "Page of members", body = MemberPageResponse),
        (status = 400, description = "Invalid page")
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn search_members_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Query(params): Query<MemberSearchParams>,
) -> Result<Json<MemberPageResponse>, LedgerError> {
    let search = QueryValidator::member_search(params, state.config.member_page_size)?;
    let page = state.members.search(search).await?;
    Ok(Json(page))
}

/// Handler for POST /api/members
/// Registers a new member
#[utoipa::path(
    post,
    path = "/api/members",
    request_body = CreateMemberRequest,
    responses(
        (status = 201, description = "Member registered", body = Member),
        (status = 400, description = "Invalid name or phone")
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn create_member_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Json(request): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>), LedgerError> {
    tracing::debug!("Registering member: {}", request.name);
    request.validate()?;

    let member = state.members.register(request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Handler for GET /api/members/:id
/// Returns a member with recharge and consumption history
#[utoipa::path(
    get,
    path = "/api/members/{id}",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member with history", body = MemberDetail),
        (status = 404, description = "Member not found")
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn get_member_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
) -> Result<Json<MemberDetail>, LedgerError> {
    let detail = state.members.detail(id).await?;
    Ok(Json(detail))
}

/// Handler for PUT /api/members/:id
/// Edits a member's name, phone and notes
#[utoipa::path(
    put,
    path = "/api/members/{id}",
    params(("id" = Uuid, Path, description = "Member id")),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid name or phone"),
        (status = 404, description = "Member not found")
    ),
    security(("bearer_auth" = [])),
    tag = "members"
)]
pub async fn update_member_handler(
    State(state): State<AppState>,
    _operator: AuthenticatedOperator,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMemberRequest>,
) -> Result<Json<Member>, LedgerError> {
    request.validate()?;
    let member = state.members.update_profile(id, request).await?;
    Ok(Json(member))
}
