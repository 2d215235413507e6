use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::members::models::{CreateMemberRequest, MemberDetail, MemberPageResponse, UpdateMemberRequest};
use crate::models::Member;
use crate::orders::attach_items;
use crate::query::MemberSearch;
use crate::store::{LedgerFilter, LedgerStore, MemberProfile, NewMember};
use crate::validation::normalize_optional;

/// Member registration, profile edits and lookups
#[derive(Clone)]
pub struct MemberService {
    store: Arc<dyn LedgerStore>,
}

impl MemberService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Register a member with zero balances and the next member number
    pub async fn register(&self, request: CreateMemberRequest) -> LedgerResult<Member> {
        let member = self
            .store
            .insert_member(&NewMember {
                name: request.name.trim().to_string(),
                phone: request.phone.trim().to_string(),
                notes: normalize_optional(request.notes),
            })
            .await?;

        info!("Registered member {} ({})", member.member_no, member.id);
        Ok(member)
    }

    /// Update name, phone and notes; money fields are never touched here
    pub async fn update_profile(&self, id: Uuid, request: UpdateMemberRequest) -> LedgerResult<Member> {
        let profile = MemberProfile {
            name: request.name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            notes: normalize_optional(request.notes),
        };

        self.store
            .update_member_profile(id, &profile)
            .await?
            .ok_or_else(|| LedgerError::not_found("Member", id))
    }

    pub async fn search(&self, search: MemberSearch) -> LedgerResult<MemberPageResponse> {
        debug!("Searching members: {:?}", search.query);
        let page = self.store.search_members(&search.query).await?;

        Ok(MemberPageResponse {
            items: page.items,
            total: page.total,
            page: search.page,
            page_size: search.page_size,
        })
    }

    /// Member plus recharge and consumption history, items grouped per consumption
    pub async fn detail(&self, id: Uuid) -> LedgerResult<MemberDetail> {
        let member = self
            .store
            .find_member(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Member", id))?;

        let filter = LedgerFilter {
            member_id: Some(id),
            ..Default::default()
        };
        let recharges = self.store.list_recharges(&filter).await?;
        let consumptions = self.store.list_consumptions(&filter).await?;

        let ids: Vec<Uuid> = consumptions.iter().map(|c| c.record.id).collect();
        let items = self.store.list_consumption_items(&ids).await?;

        Ok(MemberDetail {
            member,
            recharges: recharges.into_iter().map(|r| r.record).collect(),
            consumptions: attach_items(consumptions.into_iter().map(|c| c.record).collect(), items),
        })
    }
}
