use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::{LedgerError, LedgerResult};
use crate::models::PaymentMethod;

/// How a checkout total is divided between the member balance and other money
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentSplit {
    #[schema(value_type = String)]
    pub balance_paid: Decimal,
    #[schema(value_type = String)]
    pub other_paid: Decimal,
}

/// Split `total` according to the payment method
///
/// * `balance` - the whole total from the balance, or `InsufficientBalance`
/// * `mixed` - `min(override, balance, total)` from the balance, the rest from elsewhere
/// * any external method - nothing from the balance
///
/// A missing or negative override counts as zero.
pub fn split_payment(
    method: PaymentMethod,
    total: Decimal,
    balance: Decimal,
    balance_override: Option<Decimal>,
) -> LedgerResult<PaymentSplit> {
    let balance_paid = match method {
        PaymentMethod::Balance => {
            if balance < total {
                return Err(LedgerError::InsufficientBalance {
                    balance,
                    required: total,
                });
            }
            total
        }
        PaymentMethod::Mixed => {
            let requested = balance_override.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
            requested.min(balance.max(Decimal::ZERO)).min(total)
        }
        PaymentMethod::Cash | PaymentMethod::Wechat | PaymentMethod::Alipay | PaymentMethod::Card => {
            Decimal::ZERO
        }
    };

    Ok(PaymentSplit {
        balance_paid,
        other_paid: total - balance_paid,
    })
}

/// Reads a balance override leniently: numbers and numeric strings parse,
/// anything else (including null and garbage text) becomes `None`
pub fn deserialize_lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(serde_json::Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    })
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn any_method() -> impl Strategy<Value = PaymentMethod> {
        prop_oneof![
            Just(PaymentMethod::Balance),
            Just(PaymentMethod::Mixed),
            Just(PaymentMethod::Cash),
            Just(PaymentMethod::Wechat),
            Just(PaymentMethod::Alipay),
            Just(PaymentMethod::Card),
        ]
    }

    proptest! {
        /// balance_paid + other_paid == total for every method that succeeds
        #[test]
        fn prop_split_sums_to_total(
            method in any_method(),
            total in money(),
            balance in money(),
            balance_override in proptest::option::of(money()),
        ) {
            if let Ok(split) = split_payment(method, total, balance, balance_override) {
                prop_assert_eq!(split.balance_paid + split.other_paid, total);
                prop_assert!(split.balance_paid >= Decimal::ZERO);
                prop_assert!(split.other_paid >= Decimal::ZERO);
                prop_assert!(split.balance_paid <= balance);
            }
        }

        /// Balance payment fails exactly when the total exceeds the balance
        #[test]
        fn prop_balance_payment_fails_iff_insufficient(total in money(), balance in money()) {
            let result = split_payment(PaymentMethod::Balance, total, balance, None);
            prop_assert_eq!(result.is_err(), total > balance);
        }

        /// Mixed payment takes min(override, balance, total) from the balance
        #[test]
        fn prop_mixed_takes_minimum(
            total in money(),
            balance in money(),
            balance_override in money(),
        ) {
            let split = split_payment(PaymentMethod::Mixed, total, balance, Some(balance_override)).unwrap();
            prop_assert_eq!(split.balance_paid, balance_override.min(balance).min(total));
        }
    }
}
