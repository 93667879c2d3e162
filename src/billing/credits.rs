//! AI attendance metering.
//!
//! Each automated (bot-driven) attendance is logged; a credit is only
//! drawn the first time a client phone shows up within the calendar
//! month. Once the tier's base allowance is exhausted, draws come from
//! purchased add-on packs, oldest purchase first.

use crate::billing::{BillingError, LimitValue, SubscriptionService};
use crate::shared::models::{AdditionalAiCredit, AiUsageRecord};
use crate::store::Store;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// The UTC calendar month containing `now`, as a half-open window.
pub fn month_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = now.date_naive();
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first of month is always valid");
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
    .expect("first of next month is always valid");

    let to_utc = |d: NaiveDate| {
        DateTime::<Utc>::from_naive_utc_and_offset(d.and_hms_opt(0, 0, 0).unwrap(), Utc)
    };
    (to_utc(first), to_utc(next))
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditConsumption {
    pub used_additional_credit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditBalance {
    pub used: u64,
    pub limit: LimitValue,
    pub remaining: LimitValue,
}

pub struct AiCreditService {
    store: Arc<Store>,
    subscriptions: Arc<SubscriptionService>,
}

impl AiCreditService {
    pub fn new(store: Arc<Store>, subscriptions: Arc<SubscriptionService>) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    /// Records one attendance and decides whether it draws an add-on
    /// credit. The whole decision runs under one store write guard so
    /// two concurrent first-time clients cannot both claim the last
    /// base-allowance slot.
    pub async fn consume_credit(
        &self,
        tenant_id: Uuid,
        client_phone: &str,
        conversation_id: &str,
        service_type: &str,
        source: &str,
    ) -> Result<CreditConsumption, BillingError> {
        let plan = self.subscriptions.plan_for_tenant(tenant_id).await;
        let now = Utc::now();
        let (month_start, month_end) = month_window(now);

        let mut tables = self.store.write().await;

        let log_attendance = |tables: &mut crate::store::Tables| {
            tables.ai_usage.push(AiUsageRecord {
                id: Uuid::new_v4(),
                tenant_id,
                client_phone: client_phone.to_string(),
                conversation_id: conversation_id.to_string(),
                service_type: service_type.to_string(),
                source: source.to_string(),
                recorded_at: now,
            });
        };

        // A repeat attendance this month already spent its credit on
        // first contact.
        if tables.has_attendance(tenant_id, client_phone, month_start, month_end) {
            log_attendance(&mut tables);
            return Ok(CreditConsumption {
                used_additional_credit: false,
            });
        }

        let unique = tables.unique_attendances(tenant_id, month_start, month_end) as u64;
        if plan.base_credit_limit.allows(unique) {
            log_attendance(&mut tables);
            return Ok(CreditConsumption {
                used_additional_credit: false,
            });
        }

        let Some(pack_id) = tables.active_packs_oldest_first(tenant_id).into_iter().next() else {
            tracing::info!(%tenant_id, phone = client_phone, "AI credit draw refused: no credits left");
            return Err(BillingError::NoCreditsAvailable);
        };

        let pack = tables
            .ai_credit_packs
            .get_mut(&pack_id)
            .expect("pack id came from the same guard");
        pack.used += 1;
        if pack.used >= pack.quantity {
            pack.active = false;
        }
        log_attendance(&mut tables);

        tracing::debug!(%tenant_id, %pack_id, "attendance drew an add-on credit");
        Ok(CreditConsumption {
            used_additional_credit: true,
        })
    }

    /// Remaining base allowance plus headroom across active packs.
    pub async fn remaining_credits(&self, tenant_id: Uuid) -> CreditBalance {
        let plan = self.subscriptions.plan_for_tenant(tenant_id).await;
        let (month_start, month_end) = month_window(Utc::now());

        let tables = self.store.read().await;
        let used = tables.unique_attendances(tenant_id, month_start, month_end) as u64;

        let remaining = match plan.base_credit_limit {
            LimitValue::Unlimited => LimitValue::Unlimited,
            LimitValue::Limited(base) => {
                let pack_headroom: u64 = tables
                    .ai_credit_packs
                    .values()
                    .filter(|p| p.tenant_id == tenant_id && p.active)
                    .map(|p| u64::from(p.remaining()))
                    .sum();
                LimitValue::Limited(base.saturating_sub(used) + pack_headroom)
            }
        };

        CreditBalance {
            used,
            limit: plan.base_credit_limit,
            remaining,
        }
    }

    /// Registers a purchased add-on pack.
    pub async fn grant_pack(&self, tenant_id: Uuid, quantity: u32) -> AdditionalAiCredit {
        let pack = AdditionalAiCredit {
            id: Uuid::new_v4(),
            tenant_id,
            purchased_at: Utc::now(),
            quantity,
            used: 0,
            active: quantity > 0,
        };
        self.store
            .write()
            .await
            .ai_credit_packs
            .insert(pack.id, pack.clone());
        pack
    }
}
