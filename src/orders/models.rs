use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{ConsumptionItem, ConsumptionRecord};

/// Request DTO for POST /api/consumptions/:id/refund
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RefundRequest {
    /// Free-text reason shown next to the refunded record
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// A consumption record with its snapshot lines
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsumptionWithItems {
    #[serde(flatten)]
    pub record: ConsumptionRecord,
    pub items: Vec<ConsumptionItem>,
}

/// Group items under their records, keeping the record order
pub fn attach_items(
    records: Vec<ConsumptionRecord>,
    items: Vec<ConsumptionItem>,
) -> Vec<ConsumptionWithItems> {
    let mut by_record: HashMap<Uuid, Vec<ConsumptionItem>> = HashMap::new();
    for item in items {
        by_record.entry(item.consumption_id).or_default().push(item);
    }

    records
        .into_iter()
        .map(|record| {
            let items = by_record.remove(&record.id).unwrap_or_default();
            ConsumptionWithItems { record, items }
        })
        .collect()
}
