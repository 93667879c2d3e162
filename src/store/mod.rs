//! In-process relational state.
//!
//! Every table lives behind a single `tokio::sync::RwLock`. Holding the
//! write guard across a check-then-write sequence is the transactional
//! boundary: two concurrent bookings for the same calendar cannot both
//! pass the conflict check, and multi-row mutations (session swaps,
//! credit draws) either apply completely or not at all.

use crate::shared::models::{
    AdditionalAiCredit, AiUsageRecord, Appointment, AppointmentStatus, CalendarSurface, Client,
    ClientCombo, ClientComboSession, Collaborator, Combo, ServiceCollaborator, ServiceOffering,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct Tables {
    pub collaborators: HashMap<Uuid, Collaborator>,
    pub calendars: HashMap<Uuid, CalendarSurface>,
    pub services: HashMap<Uuid, ServiceOffering>,
    pub service_collaborators: Vec<ServiceCollaborator>,
    pub clients: HashMap<Uuid, Client>,
    pub appointments: HashMap<Uuid, Appointment>,
    pub combos: HashMap<Uuid, Combo>,
    pub client_combos: HashMap<Uuid, ClientCombo>,
    pub combo_sessions: HashMap<Uuid, ClientComboSession>,
    pub ai_usage: Vec<AiUsageRecord>,
    pub ai_credit_packs: HashMap<Uuid, AdditionalAiCredit>,
}

impl Tables {
    /// Scheduled appointments in a calendar, the only ones that can
    /// conflict with a new booking.
    pub fn scheduled_in_calendar<'a>(
        &'a self,
        calendar_id: Uuid,
    ) -> impl Iterator<Item = &'a Appointment> {
        self.appointments.values().filter(move |a| {
            a.calendar_id == calendar_id && a.status == AppointmentStatus::Scheduled
        })
    }

    pub fn session_for(&self, client_combo_id: Uuid, service_id: Uuid) -> Option<&ClientComboSession> {
        self.combo_sessions
            .values()
            .find(|s| s.client_combo_id == client_combo_id && s.service_id == service_id)
    }

    pub fn session_for_mut(
        &mut self,
        client_combo_id: Uuid,
        service_id: Uuid,
    ) -> Option<&mut ClientComboSession> {
        self.combo_sessions
            .values_mut()
            .find(|s| s.client_combo_id == client_combo_id && s.service_id == service_id)
    }

    pub fn sessions_of<'a>(
        &'a self,
        client_combo_id: Uuid,
    ) -> impl Iterator<Item = &'a ClientComboSession> {
        self.combo_sessions
            .values()
            .filter(move |s| s.client_combo_id == client_combo_id)
    }

    pub fn client_by_phone(&self, tenant_id: Uuid, phone: &str) -> Option<&Client> {
        self.clients
            .values()
            .find(|c| c.tenant_id == tenant_id && c.phone == phone)
    }

    /// Distinct client phones with at least one attendance row inside
    /// the half-open window `[start, end)`.
    pub fn unique_attendances(
        &self,
        tenant_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> usize {
        let mut phones: Vec<&str> = self
            .ai_usage
            .iter()
            .filter(|u| u.tenant_id == tenant_id && u.recorded_at >= start && u.recorded_at < end)
            .map(|u| u.client_phone.as_str())
            .collect();
        phones.sort_unstable();
        phones.dedup();
        phones.len()
    }

    pub fn has_attendance(
        &self,
        tenant_id: Uuid,
        phone: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        self.ai_usage.iter().any(|u| {
            u.tenant_id == tenant_id
                && u.client_phone == phone
                && u.recorded_at >= start
                && u.recorded_at < end
        })
    }

    /// Active credit packs for a tenant, oldest purchase first.
    pub fn active_packs_oldest_first(&self, tenant_id: Uuid) -> Vec<Uuid> {
        let mut packs: Vec<(&DateTime<Utc>, Uuid)> = self
            .ai_credit_packs
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.active)
            .map(|p| (&p.purchased_at, p.id))
            .collect();
        packs.sort_by_key(|(purchased_at, _)| **purchased_at);
        packs.into_iter().map(|(_, id)| id).collect()
    }

    pub fn collaborators_for_service(&self, service_id: Uuid) -> Vec<Uuid> {
        self.service_collaborators
            .iter()
            .filter(|sc| sc.service_id == service_id)
            .map(|sc| sc.collaborator_id)
            .collect()
    }
}

pub struct Store {
    inner: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Tables::default()),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.inner.write().await
    }

    // Seeding helpers used by bootstrap code and tests.

    pub async fn insert_collaborator(&self, collaborator: Collaborator) {
        self.write().await.collaborators.insert(collaborator.id, collaborator);
    }

    pub async fn insert_calendar(&self, calendar: CalendarSurface) {
        self.write().await.calendars.insert(calendar.id, calendar);
    }

    pub async fn insert_service(&self, service: ServiceOffering) {
        self.write().await.services.insert(service.id, service);
    }

    pub async fn assign_collaborator(&self, service_id: Uuid, collaborator_id: Uuid) {
        let mut tables = self.write().await;
        let link = ServiceCollaborator {
            service_id,
            collaborator_id,
        };
        if !tables.service_collaborators.contains(&link) {
            tables.service_collaborators.push(link);
        }
    }

    pub async fn insert_client(&self, client: Client) {
        self.write().await.clients.insert(client.id, client);
    }

    pub async fn insert_combo(&self, combo: Combo) {
        self.write().await.combos.insert(combo.id, combo);
    }

    pub async fn get_appointment(&self, id: Uuid) -> Option<Appointment> {
        self.read().await.appointments.get(&id).cloned()
    }

    pub async fn get_client_combo(&self, id: Uuid) -> Option<ClientCombo> {
        self.read().await.client_combos.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn usage(tenant_id: Uuid, phone: &str, at: DateTime<Utc>) -> AiUsageRecord {
        AiUsageRecord {
            id: Uuid::new_v4(),
            tenant_id,
            client_phone: phone.to_string(),
            conversation_id: "conv-1".to_string(),
            service_type: "booking".to_string(),
            source: "whatsapp".to_string(),
            recorded_at: at,
        }
    }

    #[tokio::test]
    async fn test_unique_attendances_dedupes_by_phone() {
        let store = Store::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        {
            let mut tables = store.write().await;
            tables.ai_usage.push(usage(tenant, "+5511999990001", now));
            tables.ai_usage.push(usage(tenant, "+5511999990001", now));
            tables.ai_usage.push(usage(tenant, "+5511999990002", now));
        }

        let tables = store.read().await;
        let count = tables.unique_attendances(tenant, now - Duration::hours(1), now + Duration::hours(1));
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_unique_attendances_window_is_half_open() {
        let store = Store::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        {
            let mut tables = store.write().await;
            tables.ai_usage.push(usage(tenant, "+5511999990001", now));
        }

        let tables = store.read().await;
        assert_eq!(tables.unique_attendances(tenant, now, now + Duration::hours(1)), 1);
        assert_eq!(tables.unique_attendances(tenant, now - Duration::hours(1), now), 0);
    }

    #[tokio::test]
    async fn test_active_packs_ordered_by_purchase_date() {
        let store = Store::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        let old_pack = AdditionalAiCredit {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            purchased_at: now - Duration::days(5),
            quantity: 10,
            used: 0,
            active: true,
        };
        let new_pack = AdditionalAiCredit {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            purchased_at: now - Duration::days(1),
            quantity: 10,
            used: 0,
            active: true,
        };
        let spent_pack = AdditionalAiCredit {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            purchased_at: now - Duration::days(9),
            quantity: 10,
            used: 10,
            active: false,
        };

        let (old_id, new_id) = (old_pack.id, new_pack.id);
        {
            let mut tables = store.write().await;
            tables.ai_credit_packs.insert(new_pack.id, new_pack);
            tables.ai_credit_packs.insert(old_pack.id, old_pack);
            tables.ai_credit_packs.insert(spent_pack.id, spent_pack);
        }

        let tables = store.read().await;
        assert_eq!(tables.active_packs_oldest_first(tenant), vec![old_id, new_id]);
    }

    #[tokio::test]
    async fn test_collaborators_for_service_join() {
        let store = Store::new();
        let service = Uuid::new_v4();
        let marina = Uuid::new_v4();
        let paulo = Uuid::new_v4();

        store.assign_collaborator(service, marina).await;
        // Re-assigning is a no-op.
        store.assign_collaborator(service, marina).await;
        store.assign_collaborator(service, paulo).await;
        store.assign_collaborator(Uuid::new_v4(), Uuid::new_v4()).await;

        let tables = store.read().await;
        assert_eq!(tables.collaborators_for_service(service), vec![marina, paulo]);
    }

    #[tokio::test]
    async fn test_client_lookup_by_phone_is_tenant_scoped() {
        let store = Store::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        store
            .insert_client(Client {
                id: Uuid::new_v4(),
                tenant_id: tenant_a,
                name: "Ana".to_string(),
                phone: "+5511988880000".to_string(),
                created_at: Utc::now(),
            })
            .await;

        let tables = store.read().await;
        assert!(tables.client_by_phone(tenant_a, "+5511988880000").is_some());
        assert!(tables.client_by_phone(tenant_b, "+5511988880000").is_none());
    }
}
