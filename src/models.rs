use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// How a recharge or a checkout was paid
///
/// `Balance` and `Mixed` only apply to checkouts; a recharge is always paid
/// with an external method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Balance,
    Cash,
    Wechat,
    Alipay,
    Card,
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Balance => "balance",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Wechat => "wechat",
            PaymentMethod::Alipay => "alipay",
            PaymentMethod::Card => "card",
            PaymentMethod::Mixed => "mixed",
        }
    }

    /// Methods that bring money in from outside the member's balance
    pub fn is_external(&self) -> bool {
        !matches!(self, PaymentMethod::Balance | PaymentMethod::Mixed)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered customer holding a prepaid balance
///
/// `balance`, `total_recharged` and `total_spent` are maintained
/// incrementally by the recharge and checkout workflows. `version` is bumped
/// on every ledger commit and guards those writes against lost updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: Uuid,
    #[schema(example = "M000001")]
    pub member_no: String,
    #[schema(example = "Zhang Wei")]
    pub name: String,
    #[schema(example = "13800138000")]
    pub phone: String,
    #[schema(value_type = String, example = "350.00")]
    pub balance: Decimal,
    #[schema(value_type = String, example = "300.00")]
    pub total_recharged: Decimal,
    #[schema(value_type = String, example = "0.00")]
    pub total_spent: Decimal,
    pub notes: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// The money aggregates of this member
    pub fn balances(&self) -> MemberBalances {
        MemberBalances {
            balance: self.balance,
            total_recharged: self.total_recharged,
            total_spent: self.total_spent,
        }
    }
}

/// The three aggregates a ledger commit rewrites on a member row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalances {
    pub balance: Decimal,
    pub total_recharged: Decimal,
    pub total_spent: Decimal,
}

/// A promotional tier: recharging at least `recharge_amount` earns `bonus_amount`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RechargeRule {
    pub id: Uuid,
    #[schema(value_type = String, example = "300.00")]
    pub recharge_amount: Decimal,
    #[schema(value_type = String, example = "50.00")]
    pub bonus_amount: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Append-only ledger entry for a top-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RechargeRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub bonus: Decimal,
    pub payment_method: PaymentMethod,
    pub operator_name: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry for a checkout; `balance_paid + other_paid == total_amount`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ConsumptionRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub balance_paid: Decimal,
    #[schema(value_type = String)]
    pub other_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub operator_name: String,
    pub is_refunded: bool,
    pub refund_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Line of a consumption record; name and price are a snapshot, not a catalog reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ConsumptionItem {
    pub id: Uuid,
    pub consumption_id: Uuid,
    pub service_name: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub quantity: i32,
}

/// Catalog entry; soft-deleted through `is_active`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ServiceItem {
    pub id: Uuid,
    #[schema(example = "Wash, cut and blow-dry")]
    pub name: String,
    #[schema(value_type = String, example = "38.00")]
    pub price: Decimal,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Recharge record joined with the owning member's display fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RechargeListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: RechargeRecord,
    pub member_name: String,
    pub member_no: String,
}

/// Consumption record joined with the owning member's display fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ConsumptionListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: ConsumptionRecord,
    pub member_name: String,
    pub member_no: String,
}
