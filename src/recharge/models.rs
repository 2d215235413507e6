use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Member, PaymentMethod, RechargeRecord};
use crate::validation::validate_positive_money;

/// Request DTO for POST /api/recharges
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RechargeRequest {
    pub member_id: Uuid,

    /// Amount paid by the customer, bonus excluded
    #[validate(custom = "validate_positive_money")]
    #[schema(value_type = String, example = "300.00")]
    pub amount: Decimal,

    /// One of cash, wechat, alipay or card
    pub payment_method: PaymentMethod,
}

/// Result of a committed recharge
#[derive(Debug, Serialize, ToSchema)]
pub struct RechargeResponse {
    pub record: RechargeRecord,
    pub member: Member,
    #[schema(value_type = String, example = "50.00")]
    pub bonus: Decimal,
    /// amount + bonus
    #[schema(value_type = String, example = "350.00")]
    pub total_credited: Decimal,
    #[schema(value_type = String, example = "350.00")]
    pub new_balance: Decimal,
}

/// Query parameters for GET /api/recharges/preview
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BonusPreviewParams {
    #[param(value_type = String)]
    pub amount: Decimal,
}

/// Bonus a recharge of `amount` would earn under the active rules
#[derive(Debug, Serialize, ToSchema)]
pub struct BonusPreview {
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub bonus: Decimal,
    #[schema(value_type = String)]
    pub total_credited: Decimal,
}
