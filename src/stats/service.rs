use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::calendar::BusinessCalendar;
use crate::error::LedgerResult;
use crate::store::{LedgerStore, LedgerTotals};

/// Totals for one reporting period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PeriodStats {
    /// Recharged amount, bonus excluded
    #[schema(value_type = String)]
    pub recharged: Decimal,
    /// Consumption total, refunded records excluded
    #[schema(value_type = String)]
    pub consumed: Decimal,
    pub new_members: i64,
}

impl From<LedgerTotals> for PeriodStats {
    fn from(totals: LedgerTotals) -> Self {
        PeriodStats {
            recharged: totals.recharged,
            consumed: totals.consumed,
            new_members: totals.new_members,
        }
    }
}

/// Front-page figures for the shop
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub today: PeriodStats,
    pub month: PeriodStats,
    pub total_members: i64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn LedgerStore>,
    calendar: BusinessCalendar,
}

impl StatsService {
    pub fn new(store: Arc<dyn LedgerStore>, calendar: BusinessCalendar) -> Self {
        Self { store, calendar }
    }

    /// Today and this month are local business periods containing `now`
    pub async fn dashboard(&self, now: DateTime<Utc>) -> LedgerResult<Dashboard> {
        let today = self.store.ledger_totals(self.calendar.today_start(now)).await?;
        let month = self.store.ledger_totals(self.calendar.month_start(now)).await?;
        let total_members = self.store.count_members().await?;

        Ok(Dashboard {
            today: today.into(),
            month: month.into(),
            total_members,
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{Cart, CheckoutService, Payment};
    use crate::models::PaymentMethod;
    use crate::orders::OrderService;
    use crate::recharge::RechargeService;
    use crate::store::{MemoryLedgerStore, NewMember};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_dashboard_excludes_bonus_and_refunds() {
        let store = Arc::new(MemoryLedgerStore::new());
        store
            .insert_recharge_rule(&crate::store::RechargeRuleInput {
                recharge_amount: dec!(100),
                bonus_amount: dec!(10),
                is_active: true,
            })
            .await
            .unwrap();
        let member = store
            .insert_member(&NewMember {
                name: "Zhang Wei".to_string(),
                phone: "13800138000".to_string(),
                notes: None,
            })
            .await
            .unwrap();

        RechargeService::new(store.clone(), 3)
            .recharge(member.id, dec!(100), PaymentMethod::Cash, "Li Na")
            .await
            .unwrap();

        let checkouts = CheckoutService::new(store.clone(), 3);
        let mut cart = Cart::new();
        cart.add_custom("Haircut", dec!(40), 1).unwrap();
        let cash = Payment {
            method: PaymentMethod::Cash,
            balance_override: None,
        };
        checkouts.checkout(member.id, &cart, cash, "Li Na").await.unwrap();
        let refunded = checkouts.checkout(member.id, &cart, cash, "Li Na").await.unwrap();
        OrderService::new(store.clone())
            .mark_refunded(refunded.record.id, None)
            .await
            .unwrap();

        let stats = StatsService::new(store.clone(), BusinessCalendar::default());
        let dashboard = stats.dashboard(Utc::now()).await.unwrap();

        assert_eq!(dashboard.today.recharged, dec!(100));
        assert_eq!(dashboard.today.consumed, dec!(40));
        assert_eq!(dashboard.today.new_members, 1);
        assert_eq!(dashboard.month.recharged, dec!(100));
        assert_eq!(dashboard.total_members, 1);
    }

    #[tokio::test]
    async fn test_empty_dashboard() {
        let stats = StatsService::new(Arc::new(MemoryLedgerStore::new()), BusinessCalendar::default());
        let dashboard = stats.dashboard(Utc::now()).await.unwrap();

        assert_eq!(dashboard.today.recharged, Decimal::ZERO);
        assert_eq!(dashboard.month.consumed, Decimal::ZERO);
        assert_eq!(dashboard.total_members, 0);
    }
}
