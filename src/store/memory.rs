// In-process ledger store
//
// Keeps every table behind a single tokio RwLock so that each commit observes
// and mutates a consistent state, mirroring the transaction boundaries of the
// postgres store. Used by tests and by STORE_BACKEND=memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CommittedConsumption, CommittedRecharge, ConsumptionEntry, LedgerFilter, LedgerStore,
    LedgerTotals, MemberPage, MemberProfile, MemberQuery, NewMember, RechargeEntry,
    RechargeRuleInput, ServiceItemInput, StoreError, StoreResult,
};
use crate::models::{
    ConsumptionItem, ConsumptionListing, ConsumptionRecord, Member, MemberBalances,
    RechargeListing, RechargeRecord, RechargeRule, ServiceItem,
};

#[derive(Debug, Default)]
struct Tables {
    members: HashMap<Uuid, Member>,
    member_seq: u64,
    rules: HashMap<Uuid, RechargeRule>,
    services: HashMap<Uuid, ServiceItem>,
    recharges: Vec<RechargeRecord>,
    consumptions: Vec<ConsumptionRecord>,
    items: Vec<ConsumptionItem>,
}

impl Tables {
    fn member_display(&self, member_id: Uuid) -> Option<(String, String)> {
        self.members
            .get(&member_id)
            .map(|m| (m.name.clone(), m.member_no.clone()))
    }

    /// Version-checked write of a member's aggregates, the in-memory
    /// counterpart of the `balance >= 0` check in the members table
    fn write_balances(
        &mut self,
        member_id: Uuid,
        expected_version: i64,
        balances: &MemberBalances,
        now: DateTime<Utc>,
    ) -> StoreResult<Member> {
        let member = self
            .members
            .get_mut(&member_id)
            .ok_or(StoreError::NotFound {
                entity: "Member",
                id: member_id,
            })?;
        if member.version != expected_version {
            return Err(StoreError::VersionConflict {
                member_id,
                expected: expected_version,
            });
        }
        if balances.balance.is_sign_negative() && !balances.balance.is_zero() {
            return Err(StoreError::CheckViolation(format!(
                "balance of member {} cannot become {}",
                member_id, balances.balance
            )));
        }
        member.balance = balances.balance;
        member.total_recharged = balances.total_recharged;
        member.total_spent = balances.total_spent;
        member.version += 1;
        member.updated_at = now;
        Ok(member.clone())
    }

    fn has_threshold(&self, amount: Decimal, except: Option<Uuid>) -> bool {
        self.rules
            .values()
            .any(|r| r.recharge_amount == amount && Some(r.id) != except)
    }
}

/// `LedgerStore` kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(
    member_id: Uuid,
    created_at: DateTime<Utc>,
    display: Option<&(String, String)>,
    filter: &LedgerFilter,
) -> bool {
    if filter.member_id.is_some_and(|id| id != member_id) {
        return false;
    }
    if filter.from.is_some_and(|from| created_at < from) {
        return false;
    }
    if filter.until.is_some_and(|until| created_at >= until) {
        return false;
    }
    if let Some(ref needle) = filter.member_no {
        let needle = needle.to_lowercase();
        match display {
            Some((_, member_no)) if member_no.to_lowercase().contains(&needle) => {}
            _ => return false,
        }
    }
    true
}

fn apply_limit<T>(mut rows: Vec<T>, limit: Option<i64>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit.max(0) as usize);
    }
    rows
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_member(&self, id: Uuid) -> StoreResult<Option<Member>> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn search_members(&self, query: &MemberQuery) -> StoreResult<MemberPage> {
        let tables = self.tables.read().await;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<Member> = tables
            .members
            .values()
            .filter(|m| match needle {
                Some(ref n) => {
                    m.member_no.to_lowercase().contains(n)
                        || m.phone.to_lowercase().contains(n)
                        || m.name.to_lowercase().contains(n)
                }
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.member_no.cmp(&a.member_no))
        });

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();

        Ok(MemberPage { items, total })
    }

    async fn insert_member(&self, member: &NewMember) -> StoreResult<Member> {
        let mut tables = self.tables.write().await;
        tables.member_seq += 1;
        let now = Utc::now();
        let row = Member {
            id: Uuid::new_v4(),
            member_no: format!("M{:06}", tables.member_seq),
            name: member.name.clone(),
            phone: member.phone.clone(),
            balance: Decimal::ZERO,
            total_recharged: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            notes: member.notes.clone(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        tables.members.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_member_profile(
        &self,
        id: Uuid,
        profile: &MemberProfile,
    ) -> StoreResult<Option<Member>> {
        let mut tables = self.tables.write().await;
        Ok(tables.members.get_mut(&id).map(|member| {
            member.name = profile.name.clone();
            member.phone = profile.phone.clone();
            member.notes = profile.notes.clone();
            member.updated_at = Utc::now();
            member.clone()
        }))
    }

    async fn count_members(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.members.len() as i64)
    }

    async fn list_recharge_rules(&self, active_only: bool) -> StoreResult<Vec<RechargeRule>> {
        let tables = self.tables.read().await;
        let mut rules: Vec<RechargeRule> = tables
            .rules
            .values()
            .filter(|r| !active_only || r.is_active)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.recharge_amount.cmp(&b.recharge_amount));
        Ok(rules)
    }

    async fn insert_recharge_rule(&self, rule: &RechargeRuleInput) -> StoreResult<RechargeRule> {
        let mut tables = self.tables.write().await;
        if tables.has_threshold(rule.recharge_amount, None) {
            return Err(StoreError::Duplicate(format!(
                "recharge rule for amount {}",
                rule.recharge_amount
            )));
        }
        let row = RechargeRule {
            id: Uuid::new_v4(),
            recharge_amount: rule.recharge_amount,
            bonus_amount: rule.bonus_amount,
            is_active: rule.is_active,
            created_at: Utc::now(),
        };
        tables.rules.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_recharge_rule(
        &self,
        id: Uuid,
        rule: &RechargeRuleInput,
    ) -> StoreResult<Option<RechargeRule>> {
        let mut tables = self.tables.write().await;
        if !tables.rules.contains_key(&id) {
            return Ok(None);
        }
        if tables.has_threshold(rule.recharge_amount, Some(id)) {
            return Err(StoreError::Duplicate(format!(
                "recharge rule for amount {}",
                rule.recharge_amount
            )));
        }
        Ok(tables.rules.get_mut(&id).map(|row| {
            row.recharge_amount = rule.recharge_amount;
            row.bonus_amount = rule.bonus_amount;
            row.is_active = rule.is_active;
            row.clone()
        }))
    }

    async fn delete_recharge_rule(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.rules.remove(&id).is_some())
    }

    async fn list_service_items(&self, active_only: bool) -> StoreResult<Vec<ServiceItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<ServiceItem> = tables
            .services
            .values()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }

    async fn insert_service_item(&self, item: &ServiceItemInput) -> StoreResult<ServiceItem> {
        let mut tables = self.tables.write().await;
        let next_sort = tables
            .services
            .values()
            .map(|s| s.sort_order)
            .max()
            .unwrap_or(0)
            + 1;
        let row = ServiceItem {
            id: Uuid::new_v4(),
            name: item.name.clone(),
            price: item.price,
            sort_order: next_sort,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.services.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_service_item(
        &self,
        id: Uuid,
        item: &ServiceItemInput,
    ) -> StoreResult<Option<ServiceItem>> {
        let mut tables = self.tables.write().await;
        Ok(tables.services.get_mut(&id).map(|row| {
            row.name = item.name.clone();
            row.price = item.price;
            row.clone()
        }))
    }

    async fn deactivate_service_item(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(match tables.services.get_mut(&id) {
            Some(row) => {
                row.is_active = false;
                true
            }
            None => false,
        })
    }

    async fn commit_recharge(&self, entry: &RechargeEntry) -> StoreResult<CommittedRecharge> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let member =
            tables.write_balances(entry.member_id, entry.expected_version, &entry.balances, now)?;

        let record = RechargeRecord {
            id: Uuid::new_v4(),
            member_id: entry.member_id,
            amount: entry.amount,
            bonus: entry.bonus,
            payment_method: entry.payment_method,
            operator_name: entry.operator_name.clone(),
            created_at: now,
        };
        tables.recharges.push(record.clone());

        Ok(CommittedRecharge { record, member })
    }

    async fn commit_consumption(
        &self,
        entry: &ConsumptionEntry,
    ) -> StoreResult<CommittedConsumption> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let member =
            tables.write_balances(entry.member_id, entry.expected_version, &entry.balances, now)?;

        let record = ConsumptionRecord {
            id: Uuid::new_v4(),
            member_id: entry.member_id,
            total_amount: entry.total_amount,
            balance_paid: entry.balance_paid,
            other_paid: entry.other_paid,
            payment_method: entry.payment_method,
            operator_name: entry.operator_name.clone(),
            is_refunded: false,
            refund_note: None,
            created_at: now,
        };
        let items: Vec<ConsumptionItem> = entry
            .lines
            .iter()
            .map(|line| ConsumptionItem {
                id: Uuid::new_v4(),
                consumption_id: record.id,
                service_name: line.service_name.clone(),
                price: line.price,
                quantity: line.quantity,
            })
            .collect();

        tables.consumptions.push(record.clone());
        tables.items.extend(items.iter().cloned());

        Ok(CommittedConsumption {
            record,
            items,
            member,
        })
    }

    async fn list_recharges(&self, filter: &LedgerFilter) -> StoreResult<Vec<RechargeListing>> {
        let tables = self.tables.read().await;
        // Records are appended in commit order, so reversing yields newest first
        let rows = tables
            .recharges
            .iter()
            .rev()
            .filter_map(|record| {
                let display = tables.member_display(record.member_id);
                if !matches_filter(record.member_id, record.created_at, display.as_ref(), filter) {
                    return None;
                }
                let (member_name, member_no) = display?;
                Some(RechargeListing {
                    record: record.clone(),
                    member_name,
                    member_no,
                })
            })
            .collect();
        Ok(apply_limit(rows, filter.limit))
    }

    async fn list_consumptions(
        &self,
        filter: &LedgerFilter,
    ) -> StoreResult<Vec<ConsumptionListing>> {
        let tables = self.tables.read().await;
        let rows = tables
            .consumptions
            .iter()
            .rev()
            .filter_map(|record| {
                let display = tables.member_display(record.member_id);
                if !matches_filter(record.member_id, record.created_at, display.as_ref(), filter) {
                    return None;
                }
                let (member_name, member_no) = display?;
                Some(ConsumptionListing {
                    record: record.clone(),
                    member_name,
                    member_no,
                })
            })
            .collect();
        Ok(apply_limit(rows, filter.limit))
    }

    async fn list_consumption_items(
        &self,
        consumption_ids: &[Uuid],
    ) -> StoreResult<Vec<ConsumptionItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .iter()
            .filter(|item| consumption_ids.contains(&item.consumption_id))
            .cloned()
            .collect())
    }

    async fn find_consumption(&self, id: Uuid) -> StoreResult<Option<ConsumptionRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.consumptions.iter().find(|c| c.id == id).cloned())
    }

    async fn mark_refunded(
        &self,
        id: Uuid,
        note: Option<&str>,
    ) -> StoreResult<Option<ConsumptionRecord>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .consumptions
            .iter_mut()
            .find(|c| c.id == id)
            .map(|record| {
                record.is_refunded = true;
                record.refund_note = note.map(str::to_string);
                record.clone()
            }))
    }

    async fn ledger_totals(&self, since: DateTime<Utc>) -> StoreResult<LedgerTotals> {
        let tables = self.tables.read().await;
        let recharged = tables
            .recharges
            .iter()
            .filter(|r| r.created_at >= since)
            .map(|r| r.amount)
            .sum();
        let consumed = tables
            .consumptions
            .iter()
            .filter(|c| c.created_at >= since && !c.is_refunded)
            .map(|c| c.total_amount)
            .sum();
        let new_members = tables
            .members
            .values()
            .filter(|m| m.created_at >= since)
            .count() as i64;

        Ok(LedgerTotals {
            recharged,
            consumed,
            new_members,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use crate::store::ConsumptionLine;
    use rust_decimal_macros::dec;

    fn new_member(name: &str) -> NewMember {
        NewMember {
            name: name.to_string(),
            phone: "13800138000".to_string(),
            notes: None,
        }
    }

    fn recharge_entry(member: &Member, amount: Decimal, bonus: Decimal) -> RechargeEntry {
        RechargeEntry {
            member_id: member.id,
            expected_version: member.version,
            amount,
            bonus,
            payment_method: PaymentMethod::Cash,
            operator_name: "tester".to_string(),
            balances: MemberBalances {
                balance: member.balance + amount + bonus,
                total_recharged: member.total_recharged + amount,
                total_spent: member.total_spent,
            },
        }
    }

    #[tokio::test]
    async fn test_member_numbers_are_sequential() {
        let store = MemoryLedgerStore::new();
        let first = store.insert_member(&new_member("A")).await.unwrap();
        let second = store.insert_member(&new_member("B")).await.unwrap();

        assert_eq!(first.member_no, "M000001");
        assert_eq!(second.member_no, "M000002");
        assert_eq!(first.balance, Decimal::ZERO);
        assert_eq!(first.version, 0);
    }

    #[tokio::test]
    async fn test_commit_recharge_bumps_version() {
        let store = MemoryLedgerStore::new();
        let member = store.insert_member(&new_member("A")).await.unwrap();

        let committed = store
            .commit_recharge(&recharge_entry(&member, dec!(300), dec!(50)))
            .await
            .unwrap();

        assert_eq!(committed.member.version, 1);
        assert_eq!(committed.member.balance, dec!(350));
        assert_eq!(committed.member.total_recharged, dec!(300));
        assert_eq!(committed.record.bonus, dec!(50));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_without_side_effects() {
        let store = MemoryLedgerStore::new();
        let member = store.insert_member(&new_member("A")).await.unwrap();

        store
            .commit_recharge(&recharge_entry(&member, dec!(100), dec!(0)))
            .await
            .unwrap();

        // Second writer still holds the version-0 snapshot
        let result = store
            .commit_recharge(&recharge_entry(&member, dec!(200), dec!(0)))
            .await;
        assert!(matches!(result, Err(StoreError::VersionConflict { expected: 0, .. })));

        let current = store.find_member(member.id).await.unwrap().unwrap();
        assert_eq!(current.balance, dec!(100));
        let history = store.list_recharges(&LedgerFilter::default()).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_consumption_stores_lines() {
        let store = MemoryLedgerStore::new();
        let member = store.insert_member(&new_member("A")).await.unwrap();

        let entry = ConsumptionEntry {
            member_id: member.id,
            expected_version: 0,
            total_amount: dec!(76),
            balance_paid: dec!(0),
            other_paid: dec!(76),
            payment_method: PaymentMethod::Wechat,
            operator_name: "tester".to_string(),
            lines: vec![ConsumptionLine {
                service_name: "Haircut".to_string(),
                price: dec!(38),
                quantity: 2,
            }],
            balances: MemberBalances {
                balance: dec!(0),
                total_recharged: dec!(0),
                total_spent: dec!(76),
            },
        };
        let committed = store.commit_consumption(&entry).await.unwrap();

        let items = store
            .list_consumption_items(&[committed.record.id])
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].consumption_id, committed.record.id);
        assert_eq!(committed.member.total_spent, dec!(76));
    }

    #[tokio::test]
    async fn test_negative_balance_is_rejected_without_side_effects() {
        let store = MemoryLedgerStore::new();
        let member = store.insert_member(&new_member("A")).await.unwrap();

        let entry = ConsumptionEntry {
            member_id: member.id,
            expected_version: 0,
            total_amount: dec!(30),
            balance_paid: dec!(30),
            other_paid: dec!(0),
            payment_method: PaymentMethod::Balance,
            operator_name: "tester".to_string(),
            lines: vec![ConsumptionLine {
                service_name: "Shave".to_string(),
                price: dec!(30),
                quantity: 1,
            }],
            balances: MemberBalances {
                balance: dec!(-30),
                total_recharged: dec!(0),
                total_spent: dec!(30),
            },
        };
        let result = store.commit_consumption(&entry).await;
        assert!(matches!(result, Err(StoreError::CheckViolation(_))));

        let current = store.find_member(member.id).await.unwrap().unwrap();
        assert_eq!(current.balance, Decimal::ZERO);
        assert_eq!(current.version, 0);
        let history = store.list_consumptions(&LedgerFilter::default()).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_rule_threshold_rejected() {
        let store = MemoryLedgerStore::new();
        let input = RechargeRuleInput {
            recharge_amount: dec!(300),
            bonus_amount: dec!(50),
            is_active: true,
        };
        store.insert_recharge_rule(&input).await.unwrap();

        let result = store.insert_recharge_rule(&input).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_rule_update_may_keep_its_own_threshold() {
        let store = MemoryLedgerStore::new();
        let rule = store
            .insert_recharge_rule(&RechargeRuleInput {
                recharge_amount: dec!(300),
                bonus_amount: dec!(50),
                is_active: true,
            })
            .await
            .unwrap();

        let updated = store
            .update_recharge_rule(
                rule.id,
                &RechargeRuleInput {
                    recharge_amount: dec!(300),
                    bonus_amount: dec!(60),
                    is_active: true,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.bonus_amount, dec!(60));
    }

    #[tokio::test]
    async fn test_service_sort_order_appends() {
        let store = MemoryLedgerStore::new();
        let first = store
            .insert_service_item(&ServiceItemInput {
                name: "Cut".to_string(),
                price: dec!(30),
            })
            .await
            .unwrap();
        let second = store
            .insert_service_item(&ServiceItemInput {
                name: "Shave".to_string(),
                price: dec!(20),
            })
            .await
            .unwrap();
        assert_eq!(first.sort_order, 1);
        assert_eq!(second.sort_order, 2);

        assert!(store.deactivate_service_item(first.id).await.unwrap());
        let active = store.list_service_items(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
        assert_eq!(store.list_service_items(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_members_is_case_insensitive() {
        let store = MemoryLedgerStore::new();
        store.insert_member(&new_member("Alice")).await.unwrap();
        store.insert_member(&new_member("Bob")).await.unwrap();

        let page = store
            .search_members(&MemberQuery {
                search: Some("ALI".to_string()),
                offset: 0,
                limit: 15,
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Alice");

        let by_no = store
            .search_members(&MemberQuery {
                search: Some("m00000".to_string()),
                offset: 0,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(by_no.total, 2);
        assert_eq!(by_no.items.len(), 1);
    }
}
