use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{RechargeRule, ServiceItem};
use crate::store::{LedgerStore, RechargeRuleInput, ServiceItemInput};

/// Administration of bonus rules and the service catalog
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LedgerStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Rules ordered by threshold ascending
    pub async fn list_rules(&self, active_only: bool) -> LedgerResult<Vec<RechargeRule>> {
        Ok(self.store.list_recharge_rules(active_only).await?)
    }

    /// Fails with `Conflict` when another rule already uses the threshold
    pub async fn create_rule(&self, input: RechargeRuleInput) -> LedgerResult<RechargeRule> {
        let rule = self.store.insert_recharge_rule(&input).await?;
        info!(
            "Created recharge rule {}: {} -> {}",
            rule.id, rule.recharge_amount, rule.bonus_amount
        );
        Ok(rule)
    }

    pub async fn update_rule(&self, id: Uuid, input: RechargeRuleInput) -> LedgerResult<RechargeRule> {
        self.store
            .update_recharge_rule(id, &input)
            .await?
            .ok_or_else(|| LedgerError::not_found("Recharge rule", id))
    }

    pub async fn delete_rule(&self, id: Uuid) -> LedgerResult<()> {
        if !self.store.delete_recharge_rule(id).await? {
            return Err(LedgerError::not_found("Recharge rule", id));
        }
        info!("Deleted recharge rule {}", id);
        Ok(())
    }

    /// Active services ordered by sort_order
    pub async fn list_services(&self) -> LedgerResult<Vec<ServiceItem>> {
        Ok(self.store.list_service_items(true).await?)
    }

    pub async fn create_service(&self, input: ServiceItemInput) -> LedgerResult<ServiceItem> {
        let item = self.store.insert_service_item(&input).await?;
        info!("Created service {} ({}) at position {}", item.name, item.id, item.sort_order);
        Ok(item)
    }

    pub async fn update_service(&self, id: Uuid, input: ServiceItemInput) -> LedgerResult<ServiceItem> {
        self.store
            .update_service_item(id, &input)
            .await?
            .ok_or_else(|| LedgerError::not_found("Service", id))
    }

    /// Soft delete; past consumption lines keep their own name and price
    pub async fn deactivate_service(&self, id: Uuid) -> LedgerResult<()> {
        if !self.store.deactivate_service_item(id).await? {
            return Err(LedgerError::not_found("Service", id));
        }
        info!("Deactivated service {}", id);
        Ok(())
    }
}
