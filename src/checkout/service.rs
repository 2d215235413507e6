use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::checkout::cart::Cart;
use crate::checkout::payment::{split_payment, PaymentSplit};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    ConsumptionItem, ConsumptionRecord, Member, MemberBalances, PaymentMethod, ServiceItem,
};
use crate::store::{ConsumptionEntry, LedgerStore, StoreError};
use crate::validation::ensure_storable;

/// Aggregates after a checkout: the balance loses what it paid, total_spent
/// grows by the whole total regardless of how it was paid
pub fn debit_checkout(
    current: MemberBalances,
    total: Decimal,
    split: PaymentSplit,
) -> LedgerResult<MemberBalances> {
    Ok(MemberBalances {
        balance: ensure_storable(current.balance.checked_sub(split.balance_paid), "balance")?,
        total_recharged: current.total_recharged,
        total_spent: ensure_storable(current.total_spent.checked_add(total), "total_spent")?,
    })
}

/// Payment instructions for one checkout
#[derive(Debug, Clone, Copy)]
pub struct Payment {
    pub method: PaymentMethod,
    pub balance_override: Option<Decimal>,
}

/// Outcome of a committed checkout
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub record: ConsumptionRecord,
    pub items: Vec<ConsumptionItem>,
    pub member: Member,
    pub split: PaymentSplit,
}

/// Checkout workflow
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn LedgerStore>,
    max_attempts: u32,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn LedgerStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Active catalog snapshot used to resolve cart lines
    pub async fn catalog_snapshot(&self) -> LedgerResult<Vec<ServiceItem>> {
        Ok(self.store.list_service_items(true).await?)
    }

    /// Charge a cart to a member
    ///
    /// The payment split is recomputed from a fresh member read on every
    /// attempt, so a balance payment that became unaffordable because of a
    /// concurrent checkout fails with `InsufficientBalance` instead of
    /// overdrawing.
    pub async fn checkout(
        &self,
        member_id: Uuid,
        cart: &Cart,
        payment: Payment,
        operator_name: &str,
    ) -> LedgerResult<CheckoutReceipt> {
        debug!(
            "Checkout for member {}: {} line(s) via {}",
            member_id,
            cart.lines().len(),
            payment.method
        );

        if cart.is_empty() {
            return Err(LedgerError::Validation(
                "Cart must contain at least one item".to_string(),
            ));
        }
        let operator_name = operator_name.trim();
        if operator_name.is_empty() {
            return Err(LedgerError::Validation(
                "Operator name must not be empty".to_string(),
            ));
        }

        let total = cart.total()?;
        let lines = cart.to_consumption_lines();

        for attempt in 1..=self.max_attempts {
            let member = self
                .store
                .find_member(member_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Member", member_id))?;

            let split = split_payment(payment.method, total, member.balance, payment.balance_override)?;

            let entry = ConsumptionEntry {
                member_id,
                expected_version: member.version,
                total_amount: total,
                balance_paid: split.balance_paid,
                other_paid: split.other_paid,
                payment_method: payment.method,
                operator_name: operator_name.to_string(),
                lines: lines.clone(),
                balances: debit_checkout(member.balances(), total, split)?,
            };

            match self.store.commit_consumption(&entry).await {
                Ok(committed) => {
                    info!(
                        "Consumption {} committed for member {}: total={}, balance_paid={}, other_paid={}",
                        committed.record.id,
                        committed.member.member_no,
                        total,
                        split.balance_paid,
                        split.other_paid
                    );
                    return Ok(CheckoutReceipt {
                        record: committed.record,
                        items: committed.items,
                        member: committed.member,
                        split,
                    });
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(
                        "Checkout for member {} lost a concurrent update (attempt {}/{})",
                        member_id, attempt, self.max_attempts
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LedgerError::Conflict(format!(
            "Member {} is being updated by another terminal, please retry",
            member_id
        )))
    }
}
