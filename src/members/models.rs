use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Member, RechargeRecord};
use crate::orders::ConsumptionWithItems;
use crate::validation::{validate_not_blank, validate_phone};

/// Request DTO for registering a member
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMemberRequest {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    #[schema(example = "Zhang Wei")]
    pub name: String,

    #[validate(custom = "validate_phone")]
    #[schema(example = "13800138000")]
    pub phone: String,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Request DTO for editing a member profile; balances are not editable
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// One page of member search results
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberPageResponse {
    pub items: Vec<Member>,
    pub total: i64,
    pub page: u32,
    pub page_size: i64,
}

/// A member with full ledger history, newest first
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberDetail {
    pub member: Member,
    pub recharges: Vec<RechargeRecord>,
    pub consumptions: Vec<ConsumptionWithItems>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, phone: &str) -> CreateMemberRequest {
        CreateMemberRequest {
            name: name.to_string(),
            phone: phone.to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_valid_member() {
        assert!(request("Zhang Wei", "13800138000").validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let errors = request("   ", "13800138000").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_bad_phone_rejected() {
        let errors = request("Zhang Wei", "12ab").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
    }
}
