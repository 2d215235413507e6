// PostgreSQL ledger store
//
// Every ledger commit runs in one transaction: the member row is rewritten
// only if its version still matches the snapshot the workflow computed from,
// and the ledger rows are inserted in the same transaction. Dropping the
// transaction on any error rolls everything back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
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

const MEMBER_COLUMNS: &str = "id, member_no, name, phone, balance, total_recharged, total_spent, notes, version, created_at, updated_at";
const RULE_COLUMNS: &str = "id, recharge_amount, bonus_amount, is_active, created_at";
const SERVICE_COLUMNS: &str = "id, name, price, sort_order, is_active, created_at";
const RECHARGE_COLUMNS: &str =
    "id, member_id, amount, bonus, payment_method, operator_name, created_at";
const CONSUMPTION_COLUMNS: &str = "id, member_id, total_amount, balance_paid, other_paid, payment_method, operator_name, is_refunded, refund_note, created_at";

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for check_violation
const CHECK_VIOLATION: &str = "23514";

/// `LedgerStore` backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards in user input and wrap it for substring matching
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn map_unique_violation(err: sqlx::Error, what: String) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(what)
        }
        other => StoreError::Database(other),
    }
}

fn map_check_violation(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some(CHECK_VIOLATION) => {
            StoreError::CheckViolation(db.message().to_string())
        }
        other => StoreError::Database(other),
    }
}

/// Conditionally rewrite the member aggregates inside an open transaction
async fn write_balances(
    tx: &mut Transaction<'_, Postgres>,
    member_id: Uuid,
    expected_version: i64,
    balances: &MemberBalances,
) -> StoreResult<Member> {
    let member = sqlx::query_as::<_, Member>(&format!(
        r#"
        UPDATE members
        SET balance = $1,
            total_recharged = $2,
            total_spent = $3,
            version = version + 1,
            updated_at = NOW()
        WHERE id = $4 AND version = $5
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(balances.balance)
    .bind(balances.total_recharged)
    .bind(balances.total_spent)
    .bind(member_id)
    .bind(expected_version)
    .fetch_optional(&mut **tx)
    .await
    .map_err(map_check_violation)?;

    member.ok_or(StoreError::VersionConflict {
        member_id,
        expected: expected_version,
    })
}

fn push_ledger_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    alias: &str,
    filter: &LedgerFilter,
) {
    builder.push(" WHERE TRUE");
    if let Some(member_id) = filter.member_id {
        builder.push(format!(" AND {alias}.member_id = "));
        builder.push_bind(member_id);
    }
    if let Some(ref member_no) = filter.member_no {
        builder.push(" AND m.member_no ILIKE ");
        builder.push_bind(like_pattern(member_no));
    }
    if let Some(from) = filter.from {
        builder.push(format!(" AND {alias}.created_at >= "));
        builder.push_bind(from);
    }
    if let Some(until) = filter.until {
        builder.push(format!(" AND {alias}.created_at < "));
        builder.push_bind(until);
    }
    builder.push(format!(" ORDER BY {alias}.created_at DESC"));
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_member(&self, id: Uuid) -> StoreResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn search_members(&self, query: &MemberQuery) -> StoreResult<MemberPage> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM members
            WHERE $1::text IS NULL
               OR member_no ILIKE $1 OR phone ILIKE $1 OR name ILIKE $1
            "#,
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Member>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS} FROM members
            WHERE $1::text IS NULL
               OR member_no ILIKE $1 OR phone ILIKE $1 OR name ILIKE $1
            ORDER BY created_at DESC, member_no DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern.as_deref())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(MemberPage { items, total })
    }

    async fn insert_member(&self, member: &NewMember) -> StoreResult<Member> {
        let row = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (name, phone, notes)
            VALUES ($1, $2, $3)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_member_profile(
        &self,
        id: Uuid,
        profile: &MemberProfile,
    ) -> StoreResult<Option<Member>> {
        let row = sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE members
            SET name = $1, phone = $2, notes = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn count_members(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_recharge_rules(&self, active_only: bool) -> StoreResult<Vec<RechargeRule>> {
        let rules = sqlx::query_as::<_, RechargeRule>(&format!(
            r#"
            SELECT {RULE_COLUMNS} FROM recharge_rules
            WHERE is_active OR NOT $1
            ORDER BY recharge_amount
            "#
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    async fn insert_recharge_rule(&self, rule: &RechargeRuleInput) -> StoreResult<RechargeRule> {
        sqlx::query_as::<_, RechargeRule>(&format!(
            r#"
            INSERT INTO recharge_rules (recharge_amount, bonus_amount, is_active)
            VALUES ($1, $2, $3)
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(rule.recharge_amount)
        .bind(rule.bonus_amount)
        .bind(rule.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, format!("recharge rule for amount {}", rule.recharge_amount))
        })
    }

    async fn update_recharge_rule(
        &self,
        id: Uuid,
        rule: &RechargeRuleInput,
    ) -> StoreResult<Option<RechargeRule>> {
        sqlx::query_as::<_, RechargeRule>(&format!(
            r#"
            UPDATE recharge_rules
            SET recharge_amount = $1, bonus_amount = $2, is_active = $3
            WHERE id = $4
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(rule.recharge_amount)
        .bind(rule.bonus_amount)
        .bind(rule.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, format!("recharge rule for amount {}", rule.recharge_amount))
        })
    }

    async fn delete_recharge_rule(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM recharge_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_service_items(&self, active_only: bool) -> StoreResult<Vec<ServiceItem>> {
        let items = sqlx::query_as::<_, ServiceItem>(&format!(
            r#"
            SELECT {SERVICE_COLUMNS} FROM service_items
            WHERE is_active OR NOT $1
            ORDER BY sort_order, created_at
            "#
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn insert_service_item(&self, item: &ServiceItemInput) -> StoreResult<ServiceItem> {
        let row = sqlx::query_as::<_, ServiceItem>(&format!(
            r#"
            INSERT INTO service_items (name, price, sort_order)
            VALUES ($1, $2, (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM service_items))
            RETURNING {SERVICE_COLUMNS}
            "#
        ))
        .bind(&item.name)
        .bind(item.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_service_item(
        &self,
        id: Uuid,
        item: &ServiceItemInput,
    ) -> StoreResult<Option<ServiceItem>> {
        let row = sqlx::query_as::<_, ServiceItem>(&format!(
            r#"
            UPDATE service_items SET name = $1, price = $2
            WHERE id = $3
            RETURNING {SERVICE_COLUMNS}
            "#
        ))
        .bind(&item.name)
        .bind(item.price)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn deactivate_service_item(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE service_items SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit_recharge(&self, entry: &RechargeEntry) -> StoreResult<CommittedRecharge> {
        let mut tx = self.pool.begin().await?;

        let member = write_balances(
            &mut tx,
            entry.member_id,
            entry.expected_version,
            &entry.balances,
        )
        .await?;

        let record = sqlx::query_as::<_, RechargeRecord>(&format!(
            r#"
            INSERT INTO recharge_records (member_id, amount, bonus, payment_method, operator_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {RECHARGE_COLUMNS}
            "#
        ))
        .bind(entry.member_id)
        .bind(entry.amount)
        .bind(entry.bonus)
        .bind(entry.payment_method)
        .bind(&entry.operator_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CommittedRecharge { record, member })
    }

    async fn commit_consumption(
        &self,
        entry: &ConsumptionEntry,
    ) -> StoreResult<CommittedConsumption> {
        let mut tx = self.pool.begin().await?;

        let member = write_balances(
            &mut tx,
            entry.member_id,
            entry.expected_version,
            &entry.balances,
        )
        .await?;

        let record = sqlx::query_as::<_, ConsumptionRecord>(&format!(
            r#"
            INSERT INTO consumption_records
                (member_id, total_amount, balance_paid, other_paid, payment_method, operator_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONSUMPTION_COLUMNS}
            "#
        ))
        .bind(entry.member_id)
        .bind(entry.total_amount)
        .bind(entry.balance_paid)
        .bind(entry.other_paid)
        .bind(entry.payment_method)
        .bind(&entry.operator_name)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(entry.lines.len());
        for line in &entry.lines {
            let item = sqlx::query_as::<_, ConsumptionItem>(
                r#"
                INSERT INTO consumption_items (consumption_id, service_name, price, quantity)
                VALUES ($1, $2, $3, $4)
                RETURNING id, consumption_id, service_name, price, quantity
                "#,
            )
            .bind(record.id)
            .bind(&line.service_name)
            .bind(line.price)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        Ok(CommittedConsumption {
            record,
            items,
            member,
        })
    }

    async fn list_recharges(&self, filter: &LedgerFilter) -> StoreResult<Vec<RechargeListing>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT r.id, r.member_id, r.amount, r.bonus, r.payment_method, r.operator_name, r.created_at, \
             m.name AS member_name, m.member_no \
             FROM recharge_records r JOIN members m ON m.id = r.member_id",
        );
        push_ledger_filter(&mut builder, "r", filter);

        let rows = builder
            .build_query_as::<RechargeListing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_consumptions(
        &self,
        filter: &LedgerFilter,
    ) -> StoreResult<Vec<ConsumptionListing>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.member_id, c.total_amount, c.balance_paid, c.other_paid, c.payment_method, \
             c.operator_name, c.is_refunded, c.refund_note, c.created_at, \
             m.name AS member_name, m.member_no \
             FROM consumption_records c JOIN members m ON m.id = c.member_id",
        );
        push_ledger_filter(&mut builder, "c", filter);

        let rows = builder
            .build_query_as::<ConsumptionListing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_consumption_items(
        &self,
        consumption_ids: &[Uuid],
    ) -> StoreResult<Vec<ConsumptionItem>> {
        if consumption_ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = sqlx::query_as::<_, ConsumptionItem>(
            r#"
            SELECT id, consumption_id, service_name, price, quantity
            FROM consumption_items
            WHERE consumption_id = ANY($1)
            "#,
        )
        .bind(consumption_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn find_consumption(&self, id: Uuid) -> StoreResult<Option<ConsumptionRecord>> {
        let record = sqlx::query_as::<_, ConsumptionRecord>(&format!(
            "SELECT {CONSUMPTION_COLUMNS} FROM consumption_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_refunded(
        &self,
        id: Uuid,
        note: Option<&str>,
    ) -> StoreResult<Option<ConsumptionRecord>> {
        let record = sqlx::query_as::<_, ConsumptionRecord>(&format!(
            r#"
            UPDATE consumption_records
            SET is_refunded = TRUE, refund_note = $1
            WHERE id = $2
            RETURNING {CONSUMPTION_COLUMNS}
            "#
        ))
        .bind(note)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn ledger_totals(&self, since: DateTime<Utc>) -> StoreResult<LedgerTotals> {
        let recharged: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM recharge_records WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let consumed: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) FROM consumption_records
            WHERE created_at >= $1 AND NOT is_refunded
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let new_members: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE created_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;

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

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("M0001"), "%M0001%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn test_non_unique_errors_stay_database_errors() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, "rule".to_string());
        assert!(matches!(err, StoreError::Database(_)));

        let err = map_check_violation(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_ledger_filter_sql() {
        let filter = LedgerFilter {
            member_id: Some(Uuid::nil()),
            member_no: Some("M00".to_string()),
            from: Some(Utc::now()),
            until: None,
            limit: Some(100),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM recharge_records r");
        push_ledger_filter(&mut builder, "r", &filter);

        let sql = builder.sql();
        assert!(sql.contains("r.member_id = $1"));
        assert!(sql.contains("m.member_no ILIKE $2"));
        assert!(sql.contains("r.created_at >= $3"));
        assert!(!sql.contains("r.created_at <"));
        assert!(sql.contains("ORDER BY r.created_at DESC LIMIT $4"));
    }
}
