use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::checkout::payment::deserialize_lenient_amount;
use crate::models::{ConsumptionItem, ConsumptionRecord, Member, PaymentMethod};

/// One cart line of a checkout request
///
/// Catalog lines carry a service id and take name and price from the active
/// catalog; custom lines carry their own name and price.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CheckoutLineRequest {
    Service {
        service_id: Uuid,
        #[serde(default = "default_quantity")]
        quantity: i32,
    },
    Custom {
        name: String,
        #[schema(value_type = String, example = "45.00")]
        unit_price: Decimal,
        #[serde(default = "default_quantity")]
        quantity: i32,
    },
}

fn default_quantity() -> i32 {
    1
}

/// Request DTO for POST /api/checkouts
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub member_id: Uuid,

    pub payment_method: PaymentMethod,

    #[validate(length(min = 1, message = "Cart must contain at least one item"))]
    pub lines: Vec<CheckoutLineRequest>,

    /// Balance portion for mixed payments; missing or non-numeric means zero
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    #[schema(value_type = Option<String>, example = "50.00")]
    pub balance_override: Option<Decimal>,

    /// Overrides the signed-in operator's name on the record
    #[validate(length(max = 50))]
    pub operator_name: Option<String>,
}

/// Result of a committed checkout
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub record: ConsumptionRecord,
    pub items: Vec<ConsumptionItem>,
    pub member: Member,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub balance_paid: Decimal,
    #[schema(value_type = String)]
    pub other_paid: Decimal,
    #[schema(value_type = String)]
    pub new_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_shapes() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"[{{"service_id": "{}", "quantity": 2}}, {{"name": "Wax", "unit_price": "45.00"}}]"#,
            id
        );
        let lines: Vec<CheckoutLineRequest> = serde_json::from_str(&json).unwrap();

        match &lines[0] {
            CheckoutLineRequest::Service { service_id, quantity } => {
                assert_eq!(*service_id, id);
                assert_eq!(*quantity, 2);
            }
            other => panic!("unexpected line: {:?}", other),
        }
        match &lines[1] {
            CheckoutLineRequest::Custom {
                name,
                unit_price,
                quantity,
            } => {
                assert_eq!(name, "Wax");
                assert_eq!(*unit_price, dec!(45));
                assert_eq!(*quantity, 1);
            }
            other => panic!("unexpected line: {:?}", other),
        }
    }

    #[test]
    fn test_empty_cart_fails_validation() {
        let json = format!(
            r#"{{"member_id": "{}", "payment_method": "cash", "lines": []}}"#,
            Uuid::new_v4()
        );
        let request: CheckoutRequest = serde_json::from_str(&json).unwrap();

        let errors = request.validate().unwrap_err();
        let lines = errors.field_errors()["lines"];
        assert_eq!(lines[0].code, "length");
        assert_eq!(lines[0].message.as_deref(), Some("Cart must contain at least one item"));
    }

    #[test]
    fn test_non_numeric_override_becomes_none() {
        let json = format!(
            r#"{{"member_id": "{}", "payment_method": "mixed", "lines": [{{"name": "Cut", "unit_price": 30}}], "balance_override": "lots"}}"#,
            Uuid::new_v4()
        );
        let request: CheckoutRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.balance_override, None);
        assert!(request.validate().is_ok());
    }
}
