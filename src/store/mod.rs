// Member ledger store
//
// The persistence seam of the service. Workflows never touch SQL directly: they
// read rows through `LedgerStore`, compute new aggregates, and hand back a
// complete ledger entry that the store commits as one unit.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    ConsumptionItem, ConsumptionListing, ConsumptionRecord, Member, MemberBalances, PaymentMethod,
    RechargeListing, RechargeRecord, RechargeRule, ServiceItem,
};

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Errors raised by a `LedgerStore` implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The member row changed between read and commit
    #[error("Member {member_id} was modified concurrently (expected version {expected})")]
    VersionConflict { member_id: Uuid, expected: i64 },

    /// A uniqueness constraint rejected the write
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// A row-level check rejected the write (e.g. a negative balance)
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields supplied when registering a member
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// Editable profile fields; money fields are never part of a profile update
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub name: String,
    pub phone: String,
    pub notes: Option<String>,
}

/// Case-insensitive substring search over member_no, phone and name
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
    pub search: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

/// A page of members plus the total number of matches
#[derive(Debug, Clone)]
pub struct MemberPage {
    pub items: Vec<Member>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct RechargeRuleInput {
    pub recharge_amount: Decimal,
    pub bonus_amount: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct ServiceItemInput {
    pub name: String,
    pub price: Decimal,
}

/// A recharge ready to be committed
///
/// `balances` holds the member's aggregates after the recharge; the store
/// writes them only if the member row is still at `expected_version`.
#[derive(Debug, Clone)]
pub struct RechargeEntry {
    pub member_id: Uuid,
    pub expected_version: i64,
    pub amount: Decimal,
    pub bonus: Decimal,
    pub payment_method: PaymentMethod,
    pub operator_name: String,
    pub balances: MemberBalances,
}

/// Snapshot line stored under a consumption record
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionLine {
    pub service_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

/// A checkout ready to be committed, same version rule as `RechargeEntry`
#[derive(Debug, Clone)]
pub struct ConsumptionEntry {
    pub member_id: Uuid,
    pub expected_version: i64,
    pub total_amount: Decimal,
    pub balance_paid: Decimal,
    pub other_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub operator_name: String,
    pub lines: Vec<ConsumptionLine>,
    pub balances: MemberBalances,
}

/// What a committed recharge produced
#[derive(Debug, Clone)]
pub struct CommittedRecharge {
    pub record: RechargeRecord,
    pub member: Member,
}

/// What a committed checkout produced
#[derive(Debug, Clone)]
pub struct CommittedConsumption {
    pub record: ConsumptionRecord,
    pub items: Vec<ConsumptionItem>,
    pub member: Member,
}

/// Filter for ledger history listings; `until` is exclusive
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub member_id: Option<Uuid>,
    pub member_no: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Aggregates over records created at or after a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerTotals {
    pub recharged: Decimal,
    pub consumed: Decimal,
    pub new_members: i64,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_member(&self, id: Uuid) -> StoreResult<Option<Member>>;

    async fn search_members(&self, query: &MemberQuery) -> StoreResult<MemberPage>;

    async fn insert_member(&self, member: &NewMember) -> StoreResult<Member>;

    async fn update_member_profile(
        &self,
        id: Uuid,
        profile: &MemberProfile,
    ) -> StoreResult<Option<Member>>;

    async fn count_members(&self) -> StoreResult<i64>;

    /// Rules ordered by `recharge_amount` ascending
    async fn list_recharge_rules(&self, active_only: bool) -> StoreResult<Vec<RechargeRule>>;

    async fn insert_recharge_rule(&self, rule: &RechargeRuleInput) -> StoreResult<RechargeRule>;

    async fn update_recharge_rule(
        &self,
        id: Uuid,
        rule: &RechargeRuleInput,
    ) -> StoreResult<Option<RechargeRule>>;

    async fn delete_recharge_rule(&self, id: Uuid) -> StoreResult<bool>;

    /// Services ordered by `sort_order`
    async fn list_service_items(&self, active_only: bool) -> StoreResult<Vec<ServiceItem>>;

    /// Appends the service after the current highest `sort_order`
    async fn insert_service_item(&self, item: &ServiceItemInput) -> StoreResult<ServiceItem>;

    async fn update_service_item(
        &self,
        id: Uuid,
        item: &ServiceItemInput,
    ) -> StoreResult<Option<ServiceItem>>;

    async fn deactivate_service_item(&self, id: Uuid) -> StoreResult<bool>;

    /// Insert the recharge record and rewrite the member aggregates atomically
    async fn commit_recharge(&self, entry: &RechargeEntry) -> StoreResult<CommittedRecharge>;

    /// Insert the consumption record, its lines and rewrite the member aggregates atomically
    async fn commit_consumption(
        &self,
        entry: &ConsumptionEntry,
    ) -> StoreResult<CommittedConsumption>;

    /// Newest first
    async fn list_recharges(&self, filter: &LedgerFilter) -> StoreResult<Vec<RechargeListing>>;

    /// Newest first
    async fn list_consumptions(
        &self,
        filter: &LedgerFilter,
    ) -> StoreResult<Vec<ConsumptionListing>>;

    async fn list_consumption_items(
        &self,
        consumption_ids: &[Uuid],
    ) -> StoreResult<Vec<ConsumptionItem>>;

    async fn find_consumption(&self, id: Uuid) -> StoreResult<Option<ConsumptionRecord>>;

    /// Sets the refund flag and note; touches nothing else
    async fn mark_refunded(
        &self,
        id: Uuid,
        note: Option<&str>,
    ) -> StoreResult<Option<ConsumptionRecord>>;

    /// Recharged amount (bonus excluded), non-refunded consumption and new members since `since`
    async fn ledger_totals(&self, since: DateTime<Utc>) -> StoreResult<LedgerTotals>;
}
