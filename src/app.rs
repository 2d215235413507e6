// Application state, router and OpenAPI document

use axum::{
    extract::{FromRef, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TokenService;
use crate::calendar::BusinessCalendar;
use crate::catalog::{self, CatalogService};
use crate::checkout::{self, CheckoutService};
use crate::config::{AppConfig, StoreBackend};
use crate::members::{self, MemberService};
use crate::models;
use crate::orders::{self, OrderService};
use crate::recharge::{self, RechargeService};
use crate::stats::{self, StatsService};
use crate::store::LedgerStore;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        members::handlers::search_members_handler,
        members::handlers::create_member_handler,
        members::handlers::get_member_handler,
        members::handlers::update_member_handler,
        catalog::handlers::list_rules_handler,
        catalog::handlers::create_rule_handler,
        catalog::handlers::update_rule_handler,
        catalog::handlers::delete_rule_handler,
        catalog::handlers::list_services_handler,
        catalog::handlers::create_service_handler,
        catalog::handlers::update_service_handler,
        catalog::handlers::delete_service_handler,
        recharge::handlers::create_recharge_handler,
        recharge::handlers::preview_bonus_handler,
        checkout::handlers::create_checkout_handler,
        orders::handlers::list_recharges_handler,
        orders::handlers::list_consumptions_handler,
        orders::handlers::refund_consumption_handler,
        stats::handlers::dashboard_handler,
    ),
    components(
        schemas(
            models::PaymentMethod,
            models::Member,
            models::RechargeRule,
            models::RechargeRecord,
            models::ConsumptionRecord,
            models::ConsumptionItem,
            models::ServiceItem,
            models::RechargeListing,
            models::ConsumptionListing,
            members::CreateMemberRequest,
            members::UpdateMemberRequest,
            members::MemberPageResponse,
            members::MemberDetail,
            catalog::RechargeRuleRequest,
            catalog::ServiceItemRequest,
            recharge::RechargeRequest,
            recharge::RechargeResponse,
            recharge::BonusPreview,
            checkout::CheckoutLineRequest,
            checkout::CheckoutRequest,
            checkout::CheckoutResponse,
            checkout::PaymentSplit,
            orders::RefundRequest,
            orders::ConsumptionWithItems,
            stats::Dashboard,
            stats::PeriodStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "members", description = "Member registration and lookup"),
        (name = "catalog", description = "Bonus rules and service catalog"),
        (name = "recharges", description = "Balance top-ups"),
        (name = "checkouts", description = "Service checkouts"),
        (name = "orders", description = "Ledger history and refunds"),
        (name = "stats", description = "Dashboard figures")
    ),
    info(
        title = "Barber Ledger API",
        version = "1.0.0",
        description = "Member balances, recharges and checkouts for a barbershop"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub calendar: BusinessCalendar,
    pub members: MemberService,
    pub catalog: CatalogService,
    pub recharges: RechargeService,
    pub checkouts: CheckoutService,
    pub orders: OrderService,
    pub stats: StatsService,
}

impl AppState {
    /// Wire every workflow to one store
    pub fn new(config: AppConfig, store: Arc<dyn LedgerStore>) -> Self {
        let calendar =
            BusinessCalendar::from_offset_hours(config.business_utc_offset_hours).unwrap_or_default();
        let attempts = config.ledger_max_attempts;

        Self {
            tokens: TokenService::new(&config.jwt_secret),
            calendar,
            members: MemberService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            recharges: RechargeService::new(store.clone(), attempts),
            checkouts: CheckoutService::new(store.clone(), attempts),
            orders: OrderService::new(store.clone()),
            stats: StatsService::new(store, calendar),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// Handler for GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "stats"
)]
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let backend = match state.config.backend {
        StoreBackend::Postgres => "postgres",
        StoreBackend::Memory => "memory",
    };
    Json(json!({ "status": "ok", "backend": backend }))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and request tracing
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        // Members
        .route(
            "/api/members",
            get(members::search_members_handler).post(members::create_member_handler),
        )
        .route(
            "/api/members/:id",
            get(members::get_member_handler).put(members::update_member_handler),
        )
        // Catalog
        .route(
            "/api/recharge-rules",
            get(catalog::list_rules_handler).post(catalog::create_rule_handler),
        )
        .route(
            "/api/recharge-rules/:id",
            put(catalog::update_rule_handler).delete(catalog::delete_rule_handler),
        )
        .route(
            "/api/services",
            get(catalog::list_services_handler).post(catalog::create_service_handler),
        )
        .route(
            "/api/services/:id",
            put(catalog::update_service_handler).delete(catalog::delete_service_handler),
        )
        // Ledger
        .route(
            "/api/recharges",
            post(recharge::create_recharge_handler).get(orders::list_recharges_handler),
        )
        .route("/api/recharges/preview", get(recharge::preview_bonus_handler))
        .route("/api/checkouts", post(checkout::create_checkout_handler))
        .route("/api/consumptions", get(orders::list_consumptions_handler))
        .route("/api/consumptions/:id/refund", post(orders::refund_consumption_handler))
        .route("/api/dashboard", get(stats::dashboard_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
