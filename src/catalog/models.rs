use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::store::{RechargeRuleInput, ServiceItemInput};
use crate::validation::{validate_non_negative_money, validate_not_blank, validate_positive_money};

/// Request DTO for creating or replacing a bonus rule
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RechargeRuleRequest {
    /// Minimum recharge that earns the bonus; unique across rules
    #[validate(custom = "validate_positive_money")]
    #[schema(value_type = String, example = "300.00")]
    pub recharge_amount: Decimal,

    #[validate(custom = "validate_non_negative_money")]
    #[schema(value_type = String, example = "50.00")]
    pub bonus_amount: Decimal,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<RechargeRuleRequest> for RechargeRuleInput {
    fn from(request: RechargeRuleRequest) -> Self {
        RechargeRuleInput {
            recharge_amount: request.recharge_amount,
            bonus_amount: request.bonus_amount,
            is_active: request.is_active,
        }
    }
}

/// Query parameters for GET /api/recharge-rules
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RuleListParams {
    /// Only return active rules (the quick-select tiers)
    pub active: Option<bool>,
}

/// Request DTO for creating or editing a catalog service
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ServiceItemRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    #[schema(example = "Wash, cut and blow-dry")]
    pub name: String,

    #[validate(custom = "validate_positive_money")]
    #[schema(value_type = String, example = "38.00")]
    pub price: Decimal,
}

impl From<ServiceItemRequest> for ServiceItemInput {
    fn from(request: ServiceItemRequest) -> Self {
        ServiceItemInput {
            name: request.name.trim().to_string(),
            price: request.price,
        }
    }
}
