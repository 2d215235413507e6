// Validation utilities module
// Custom validators for money amounts, phone numbers and free-text fields

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::error::{LedgerError, LedgerResult};

/// Amounts are stored as NUMERIC(12, 2)
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a NUMERIC(12, 2) column holds: 9,999,999,999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, MONEY_SCALE);

/// Upper bound for the quantity of one cart line
pub const MAX_QUANTITY: i32 = 999;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{3,18}[0-9]$").expect("phone regex is valid"));

/// Validates that a money amount is strictly positive with at most two decimals
pub fn validate_positive_money(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_positive"));
    }
    validate_money_range(amount)
}

/// Validates that a money amount is zero or positive with at most two decimals
pub fn validate_non_negative_money(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::new("amount_must_not_be_negative"));
    }
    validate_money_range(amount)
}

fn validate_money_range(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount > MAX_MONEY {
        Err(ValidationError::new("amount_too_large"))
    } else if amount.normalize().scale() > MONEY_SCALE {
        Err(ValidationError::new("too_many_decimal_places"))
    } else {
        Ok(())
    }
}

/// Phone numbers: digits with optional leading '+', spaces or dashes, 5 to 20 characters
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}

/// Rejects strings that are empty after trimming
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Workflow-level guard for amounts that did not come through a DTO
pub fn ensure_positive_amount(amount: Decimal, field: &str) -> LedgerResult<()> {
    validate_positive_money(&amount).map_err(|e| {
        LedgerError::Validation(format!(
            "{} must be a positive amount up to {} with at most two decimals ({})",
            field, MAX_MONEY, e.code
        ))
    })
}

/// Checks the result of checked ledger arithmetic
/// Overflow (`None`) and magnitudes beyond `MAX_MONEY` become validation errors
pub fn ensure_storable(value: Option<Decimal>, field: &str) -> LedgerResult<Decimal> {
    match value {
        Some(v) if v.abs() <= MAX_MONEY => Ok(v),
        _ => Err(LedgerError::Validation(format!(
            "{} would exceed the maximum amount of {}",
            field, MAX_MONEY
        ))),
    }
}

/// Trims a string and maps empty results to None
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
