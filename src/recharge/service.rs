use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Member, MemberBalances, PaymentMethod, RechargeRecord};
use crate::recharge::bonus::BonusTable;
use crate::recharge::models::BonusPreview;
use crate::store::{LedgerStore, RechargeEntry, StoreError};
use crate::validation::{ensure_positive_amount, ensure_storable};

/// Aggregates after crediting a recharge: the balance gains amount + bonus,
/// total_recharged gains the paid amount only
pub fn credit_recharge(
    current: MemberBalances,
    amount: Decimal,
    bonus: Decimal,
) -> LedgerResult<MemberBalances> {
    let credited = amount.checked_add(bonus);
    Ok(MemberBalances {
        balance: ensure_storable(
            credited.and_then(|c| current.balance.checked_add(c)),
            "balance",
        )?,
        total_recharged: ensure_storable(
            current.total_recharged.checked_add(amount),
            "total_recharged",
        )?,
        total_spent: current.total_spent,
    })
}

/// Outcome of a committed recharge
#[derive(Debug, Clone)]
pub struct RechargeReceipt {
    pub record: RechargeRecord,
    pub member: Member,
    pub bonus: Decimal,
    pub total_credited: Decimal,
}

/// Recharge workflow
#[derive(Clone)]
pub struct RechargeService {
    store: Arc<dyn LedgerStore>,
    max_attempts: u32,
}

impl RechargeService {
    pub fn new(store: Arc<dyn LedgerStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Credit `amount` plus the matching bonus to a member
    ///
    /// The record and the member update commit together. If another terminal
    /// updates the member first, the member is re-read and the credit is
    /// recomputed, up to `max_attempts` times.
    pub async fn recharge(
        &self,
        member_id: Uuid,
        amount: Decimal,
        payment_method: PaymentMethod,
        operator_name: &str,
    ) -> LedgerResult<RechargeReceipt> {
        debug!("Recharging member {} with {} via {}", member_id, amount, payment_method);

        ensure_positive_amount(amount, "amount")?;
        if !payment_method.is_external() {
            return Err(LedgerError::Validation(format!(
                "Payment method '{}' cannot be used for a recharge",
                payment_method
            )));
        }

        let rules = self.store.list_recharge_rules(true).await?;
        let bonus = BonusTable::new(&rules).bonus_for(amount);
        let total_credited = ensure_storable(amount.checked_add(bonus), "total credited")?;

        for attempt in 1..=self.max_attempts {
            let member = self
                .store
                .find_member(member_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Member", member_id))?;

            let entry = RechargeEntry {
                member_id,
                expected_version: member.version,
                amount,
                bonus,
                payment_method,
                operator_name: operator_name.to_string(),
                balances: credit_recharge(member.balances(), amount, bonus)?,
            };

            match self.store.commit_recharge(&entry).await {
                Ok(committed) => {
                    info!(
                        "Recharge {} committed for member {}: amount={}, bonus={}, balance={}",
                        committed.record.id,
                        committed.member.member_no,
                        amount,
                        bonus,
                        committed.member.balance
                    );
                    return Ok(RechargeReceipt {
                        record: committed.record,
                        member: committed.member,
                        bonus,
                        total_credited,
                    });
                }
                Err(StoreError::VersionConflict { .. }) => {
                    warn!(
                        "Recharge for member {} lost a concurrent update (attempt {}/{})",
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

    /// Bonus a recharge would earn, without writing anything
    pub async fn preview(&self, amount: Decimal) -> LedgerResult<BonusPreview> {
        ensure_positive_amount(amount, "amount")?;
        let rules = self.store.list_recharge_rules(true).await?;
        let bonus = BonusTable::new(&rules).bonus_for(amount);

        Ok(BonusPreview {
            amount,
            bonus,
            total_credited: ensure_storable(amount.checked_add(bonus), "total credited")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryLedgerStore, NewMember, RechargeRuleInput};
    use rust_decimal_macros::dec;

    async fn setup() -> (Arc<MemoryLedgerStore>, RechargeService, Member) {
        let store = Arc::new(MemoryLedgerStore::new());
        for (threshold, bonus) in [(dec!(100), dec!(10)), (dec!(300), dec!(50)), (dec!(500), dec!(100))] {
            store
                .insert_recharge_rule(&RechargeRuleInput {
                    recharge_amount: threshold,
                    bonus_amount: bonus,
                    is_active: true,
                })
                .await
                .unwrap();
        }
        let member = store
            .insert_member(&NewMember {
                name: "Zhang Wei".to_string(),
                phone: "13800138000".to_string(),
                notes: None,
            })
            .await
            .unwrap();
        let service = RechargeService::new(store.clone(), 3);
        (store, service, member)
    }

    #[test]
    fn test_credit_recharge() {
        let current = MemberBalances {
            balance: dec!(20),
            total_recharged: dec!(100),
            total_spent: dec!(90),
        };
        let next = credit_recharge(current, dec!(300), dec!(50)).unwrap();

        assert_eq!(next.balance, dec!(370));
        assert_eq!(next.total_recharged, dec!(400));
        assert_eq!(next.total_spent, dec!(90));
    }

    #[test]
    fn test_credit_recharge_rejects_unstorable_balance() {
        let current = MemberBalances {
            balance: dec!(9999999000),
            total_recharged: dec!(9999999000),
            total_spent: dec!(0),
        };
        assert!(matches!(
            credit_recharge(current, dec!(5000), dec!(0)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_recharge_credits_amount_and_bonus() {
        let (store, service, member) = setup().await;

        let receipt = service
            .recharge(member.id, dec!(300), PaymentMethod::Cash, "Li Na")
            .await
            .unwrap();

        assert_eq!(receipt.bonus, dec!(50));
        assert_eq!(receipt.total_credited, dec!(350));
        assert_eq!(receipt.member.balance, dec!(350));
        assert_eq!(receipt.member.total_recharged, dec!(300));
        assert_eq!(receipt.record.amount, dec!(300));
        assert_eq!(receipt.record.bonus, dec!(50));
        assert_eq!(receipt.record.operator_name, "Li Na");

        let stored = store.find_member(member.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, dec!(350));
        assert_eq!(stored.version, member.version + 1);
    }

    #[tokio::test]
    async fn test_recharge_without_qualifying_rule() {
        let (_, service, member) = setup().await;

        let receipt = service
            .recharge(member.id, dec!(50), PaymentMethod::Wechat, "Li Na")
            .await
            .unwrap();

        assert_eq!(receipt.bonus, dec!(0));
        assert_eq!(receipt.member.balance, dec!(50));
    }

    #[tokio::test]
    async fn test_recharge_rejects_non_positive_amount() {
        let (store, service, member) = setup().await;

        for amount in [dec!(0), dec!(-10), dec!(10.001)] {
            let result = service.recharge(member.id, amount, PaymentMethod::Cash, "Li Na").await;
            assert!(matches!(result, Err(LedgerError::Validation(_))));
        }

        let stored = store.find_member(member.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, dec!(0));
    }

    #[tokio::test]
    async fn test_recharge_rejects_balance_methods() {
        let (_, service, member) = setup().await;

        for method in [PaymentMethod::Balance, PaymentMethod::Mixed] {
            let result = service.recharge(member.id, dec!(100), method, "Li Na").await;
            assert!(matches!(result, Err(LedgerError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_recharge_unknown_member() {
        let (_, service, _) = setup().await;

        let result = service
            .recharge(Uuid::new_v4(), dec!(100), PaymentMethod::Cash, "Li Na")
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_recharges_do_not_lose_updates() {
        let (store, service, member) = setup().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = RechargeService::new(store.clone(), 50);
            let id = member.id;
            handles.push(tokio::spawn(async move {
                service.recharge(id, dec!(100), PaymentMethod::Cash, "Li Na").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        drop(service);

        let stored = store.find_member(member.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, dec!(880));
        assert_eq!(stored.total_recharged, dec!(800));
        assert_eq!(stored.version, member.version + 8);
    }

    #[tokio::test]
    async fn test_preview() {
        let (_, service, _) = setup().await;

        let preview = service.preview(dec!(299)).await.unwrap();
        assert_eq!(preview.bonus, dec!(10));
        assert_eq!(preview.total_credited, dec!(309));
        assert!(service.preview(dec!(0)).await.is_err());
    }
}
