use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ConsumptionListing, ConsumptionRecord, RechargeListing};
use crate::store::{LedgerFilter, LedgerStore};
use crate::validation::normalize_optional;

/// Read-only views over the ledger, plus the refund flag
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn LedgerStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Recharge history, newest first
    pub async fn list_recharges(&self, filter: &LedgerFilter) -> LedgerResult<Vec<RechargeListing>> {
        debug!("Listing recharges: {:?}", filter);
        Ok(self.store.list_recharges(filter).await?)
    }

    /// Consumption history, newest first
    pub async fn list_consumptions(
        &self,
        filter: &LedgerFilter,
    ) -> LedgerResult<Vec<ConsumptionListing>> {
        debug!("Listing consumptions: {:?}", filter);
        Ok(self.store.list_consumptions(filter).await?)
    }

    /// Flag a consumption as refunded
    ///
    /// Only the flag and the note change. The member's balance and
    /// total_spent stay as they are; refunded money is handled at the till.
    pub async fn mark_refunded(
        &self,
        consumption_id: Uuid,
        note: Option<String>,
    ) -> LedgerResult<ConsumptionRecord> {
        let existing = self
            .store
            .find_consumption(consumption_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Consumption", consumption_id))?;

        if existing.is_refunded {
            return Err(LedgerError::Conflict(format!(
                "Consumption {} is already refunded",
                consumption_id
            )));
        }

        let note = normalize_optional(note);
        let updated = self
            .store
            .mark_refunded(consumption_id, note.as_deref())
            .await?
            .ok_or_else(|| LedgerError::not_found("Consumption", consumption_id))?;

        info!("Consumption {} marked as refunded", consumption_id);
        Ok(updated)
    }
}
