//! Combo credit ledger.
//!
//! Session counts and package status are mutated here and nowhere else.
//! Every multi-row change (the service-swap path in particular) runs
//! under a single store write guard, so a partial swap is never
//! observable.

use crate::combo::{CollaboratorInfo, ComboError};
use crate::shared::models::{
    Appointment, ClientCombo, ClientComboSession, ClientComboStatus, Combo, ComboItem,
    DiscountPolicy,
};
use crate::store::{Store, Tables};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Increments the session counter for (package, service) after the
/// precondition chain: session row exists, capacity left, package not
/// expired. Parent status is re-evaluated before returning.
pub(crate) fn apply_consume(
    tables: &mut Tables,
    client_combo_id: Uuid,
    service_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ClientComboSession, ComboError> {
    let session = tables
        .session_for(client_combo_id, service_id)
        .ok_or(ComboError::SessionNotFound)?;
    if session.is_exhausted() {
        return Err(ComboError::InsufficientCredit);
    }

    let combo = tables
        .client_combos
        .get(&client_combo_id)
        .ok_or(ComboError::NotFound)?;
    if let Some(expires_at) = combo.expires_at {
        if expires_at < now {
            return Err(ComboError::ExpiredPackage);
        }
    }

    let session = tables
        .session_for_mut(client_combo_id, service_id)
        .expect("session existence checked above");
    session.used_sessions += 1;
    let updated = session.clone();

    refresh_status(tables, client_combo_id);
    Ok(updated)
}

/// Gives one session back to (package, service). Never drives the
/// counter below zero.
pub(crate) fn apply_release(
    tables: &mut Tables,
    client_combo_id: Uuid,
    service_id: Uuid,
) -> Result<ClientComboSession, ComboError> {
    let session = tables
        .session_for_mut(client_combo_id, service_id)
        .ok_or(ComboError::SessionNotFound)?;
    session.used_sessions = session.used_sessions.saturating_sub(1);
    let updated = session.clone();

    refresh_status(tables, client_combo_id);
    Ok(updated)
}

/// A package is completed iff every session row is exhausted; any
/// release flips it back to active.
pub(crate) fn refresh_status(tables: &mut Tables, client_combo_id: Uuid) {
    let has_sessions = tables.sessions_of(client_combo_id).next().is_some();
    let all_exhausted =
        has_sessions && tables.sessions_of(client_combo_id).all(|s| s.is_exhausted());

    if let Some(combo) = tables.client_combos.get_mut(&client_combo_id) {
        combo.status = if all_exhausted {
            ClientComboStatus::Completed
        } else {
            ClientComboStatus::Active
        };
    }
}

/// Moves a combo-paid appointment to another service: release the old
/// session, consume the new one, and rewrite the appointment's service
/// and collaborator snapshots, all-or-nothing. The target capacity is
/// verified before anything is touched.
pub(crate) fn apply_service_swap(
    tables: &mut Tables,
    appointment_id: Uuid,
    to_service_id: Uuid,
    collaborator: Option<CollaboratorInfo>,
    now: DateTime<Utc>,
) -> Result<Appointment, ComboError> {
    let appointment = tables
        .appointments
        .get(&appointment_id)
        .ok_or(ComboError::NotFound)?;
    let client_combo_id = appointment.combo_id.ok_or(ComboError::NotFound)?;
    let from_service_id = appointment.service_id;

    if from_service_id == to_service_id {
        return Ok(appointment.clone());
    }

    let target = tables
        .session_for(client_combo_id, to_service_id)
        .ok_or(ComboError::SessionNotFound)?;
    if target.is_exhausted() {
        return Err(ComboError::InsufficientCredit);
    }
    if tables.session_for(client_combo_id, from_service_id).is_none() {
        return Err(ComboError::SessionNotFound);
    }
    let service_name = tables
        .services
        .get(&to_service_id)
        .map(|s| s.name.clone())
        .ok_or(ComboError::NotFound)?;

    // All preconditions hold; from here on everything applies.
    {
        let source = tables
            .session_for_mut(client_combo_id, from_service_id)
            .expect("source session checked above");
        source.used_sessions = source.used_sessions.saturating_sub(1);
    }
    {
        let target = tables
            .session_for_mut(client_combo_id, to_service_id)
            .expect("target session checked above");
        target.used_sessions += 1;
    }
    refresh_status(tables, client_combo_id);

    let appointment = tables
        .appointments
        .get_mut(&appointment_id)
        .expect("appointment checked above");
    appointment.service_id = to_service_id;
    appointment.service_name = service_name;
    if let Some(collaborator) = collaborator {
        appointment.collaborator_id = Some(collaborator.id);
        appointment.collaborator_name = Some(collaborator.name);
    }
    appointment.updated_at = now;

    Ok(appointment.clone())
}

/// Template prices: total is the plain sum, final applies the discount
/// policy and never goes below zero.
pub fn combo_prices(tables: &Tables, items: &[ComboItem], discount: DiscountPolicy) -> (i64, i64) {
    let total: i64 = items
        .iter()
        .filter_map(|item| {
            tables
                .services
                .get(&item.service_id)
                .map(|s| s.price_cents * i64::from(item.quantity))
        })
        .sum();

    let final_price = match discount {
        DiscountPolicy::Percentage(percent) => total - total * i64::from(percent.min(100)) / 100,
        DiscountPolicy::Fixed(amount_cents) => (total - amount_cents).max(0),
    };
    (total, final_price)
}

pub struct ComboLedger {
    store: Arc<Store>,
}

impl ComboLedger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Creates a combo template with computed prices.
    pub async fn create_template(
        &self,
        tenant_id: Uuid,
        name: &str,
        items: Vec<ComboItem>,
        discount: DiscountPolicy,
    ) -> Combo {
        let mut tables = self.store.write().await;
        let (total_price_cents, final_price_cents) = combo_prices(&tables, &items, discount);
        let combo = Combo {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            items,
            discount,
            total_price_cents,
            final_price_cents,
            created_at: Utc::now(),
        };
        tables.combos.insert(combo.id, combo.clone());
        combo
    }

    /// Instantiates a client's purchase of a template: one ClientCombo
    /// plus one session row per bundled service.
    pub async fn purchase(
        &self,
        client_id: Uuid,
        combo_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ClientCombo, ComboError> {
        let mut tables = self.store.write().await;
        let template = tables.combos.get(&combo_id).ok_or(ComboError::NotFound)?;

        let client_combo = ClientCombo {
            id: Uuid::new_v4(),
            tenant_id: template.tenant_id,
            client_id,
            combo_id: Some(combo_id),
            combo_name: template.name.clone(),
            purchased_at: Utc::now(),
            expires_at,
            amount_paid_cents: template.final_price_cents,
            status: ClientComboStatus::Active,
        };
        let items = template.items.clone();

        for item in items {
            let session = ClientComboSession {
                id: Uuid::new_v4(),
                client_combo_id: client_combo.id,
                service_id: item.service_id,
                total_sessions: item.quantity,
                used_sessions: 0,
            };
            tables.combo_sessions.insert(session.id, session);
        }
        tables
            .client_combos
            .insert(client_combo.id, client_combo.clone());
        Ok(client_combo)
    }

    pub async fn consume(
        &self,
        client_combo_id: Uuid,
        service_id: Uuid,
    ) -> Result<ClientComboSession, ComboError> {
        let mut tables = self.store.write().await;
        apply_consume(&mut tables, client_combo_id, service_id, Utc::now())
    }

    /// Service swap for a combo-paid appointment; see
    /// [`apply_service_swap`] for the atomicity contract.
    pub async fn reverse_and_reconsume(
        &self,
        appointment_id: Uuid,
        to_service_id: Uuid,
        collaborator: Option<CollaboratorInfo>,
    ) -> Result<Appointment, ComboError> {
        let mut tables = self.store.write().await;
        apply_service_swap(
            &mut tables,
            appointment_id,
            to_service_id,
            collaborator,
            Utc::now(),
        )
    }

    /// Clears the template reference, freezing the purchase against
    /// future template edits. Usage counts and status are untouched.
    pub async fn detach(&self, client_combo_id: Uuid) -> Result<ClientCombo, ComboError> {
        let mut tables = self.store.write().await;
        let combo = tables
            .client_combos
            .get_mut(&client_combo_id)
            .ok_or(ComboError::NotFound)?;
        combo.combo_id = None;
        Ok(combo.clone())
    }

    pub async fn sessions(&self, client_combo_id: Uuid) -> Result<Vec<ClientComboSession>, ComboError> {
        let tables = self.store.read().await;
        if !tables.client_combos.contains_key(&client_combo_id) {
            return Err(ComboError::NotFound);
        }
        Ok(tables.sessions_of(client_combo_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ServiceOffering;
    use chrono::Duration;

    fn offering(tenant: Uuid, name: &str, price_cents: i64) -> ServiceOffering {
        ServiceOffering {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: name.to_string(),
            duration_minutes: 60,
            price_cents,
            available_days: vec![],
            commission_percent: 40.0,
            created_at: Utc::now(),
        }
    }

    struct Fixture {
        ledger: ComboLedger,
        store: Arc<Store>,
        client_combo: ClientCombo,
        cut: Uuid,
        color: Uuid,
    }

    /// A purchased package with 2 haircut sessions and 3 coloring
    /// sessions.
    async fn fixture() -> Fixture {
        let store = Store::new();
        let tenant = Uuid::new_v4();
        let cut = offering(tenant, "Haircut", 5000);
        let color = offering(tenant, "Coloring", 12000);
        let (cut_id, color_id) = (cut.id, color.id);
        store.insert_service(cut).await;
        store.insert_service(color).await;

        let ledger = ComboLedger::new(store.clone());
        let template = ledger
            .create_template(
                tenant,
                "Beauty Month",
                vec![
                    ComboItem {
                        service_id: cut_id,
                        quantity: 2,
                    },
                    ComboItem {
                        service_id: color_id,
                        quantity: 3,
                    },
                ],
                DiscountPolicy::Percentage(10),
            )
            .await;

        let client_combo = ledger
            .purchase(Uuid::new_v4(), template.id, None)
            .await
            .unwrap();

        Fixture {
            ledger,
            store,
            client_combo,
            cut: cut_id,
            color: color_id,
        }
    }

    #[tokio::test]
    async fn test_template_prices_percentage_discount() {
        let fx = fixture().await;
        // 2 * 5000 + 3 * 12000 = 46000, minus 10%
        assert_eq!(fx.client_combo.amount_paid_cents, 41400);
    }

    #[tokio::test]
    async fn test_fixed_discount_floors_at_zero() {
        let store = Store::new();
        let tenant = Uuid::new_v4();
        let cheap = offering(tenant, "Quick trim", 1000);
        let cheap_id = cheap.id;
        store.insert_service(cheap).await;

        let ledger = ComboLedger::new(store);
        let template = ledger
            .create_template(
                tenant,
                "Oversold",
                vec![ComboItem {
                    service_id: cheap_id,
                    quantity: 1,
                }],
                DiscountPolicy::Fixed(5000),
            )
            .await;
        assert_eq!(template.total_price_cents, 1000);
        assert_eq!(template.final_price_cents, 0);
    }

    #[tokio::test]
    async fn test_purchase_creates_session_rows() {
        let fx = fixture().await;
        let sessions = fx.ledger.sessions(fx.client_combo.id).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions
            .iter()
            .any(|s| s.service_id == fx.cut && s.total_sessions == 2));
        assert!(sessions
            .iter()
            .any(|s| s.service_id == fx.color && s.total_sessions == 3));
    }

    #[tokio::test]
    async fn test_consume_increments_and_keeps_active() {
        let fx = fixture().await;
        let session = fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();
        assert_eq!(session.used_sessions, 1);

        let combo = fx.store.get_client_combo(fx.client_combo.id).await.unwrap();
        assert_eq!(combo.status, ClientComboStatus::Active);
    }

    #[tokio::test]
    async fn test_consume_exhausted_session_fails_without_mutation() {
        let fx = fixture().await;
        fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();
        fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();

        let result = fx.ledger.consume(fx.client_combo.id, fx.cut).await;
        assert_eq!(result, Err(ComboError::InsufficientCredit));

        let tables = fx.store.read().await;
        let session = tables.session_for(fx.client_combo.id, fx.cut).unwrap();
        assert_eq!(session.used_sessions, 2);
    }

    #[tokio::test]
    async fn test_consume_unknown_service_fails() {
        let fx = fixture().await;
        let result = fx.ledger.consume(fx.client_combo.id, Uuid::new_v4()).await;
        assert_eq!(result, Err(ComboError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_consume_expired_package_fails() {
        let fx = fixture().await;
        {
            let mut tables = fx.store.write().await;
            tables
                .client_combos
                .get_mut(&fx.client_combo.id)
                .unwrap()
                .expires_at = Some(Utc::now() - Duration::days(1));
        }
        let result = fx.ledger.consume(fx.client_combo.id, fx.cut).await;
        assert_eq!(result, Err(ComboError::ExpiredPackage));
    }

    #[tokio::test]
    async fn test_status_completed_when_all_sessions_spent() {
        let fx = fixture().await;
        for _ in 0..2 {
            fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();
        }
        for _ in 0..3 {
            fx.ledger.consume(fx.client_combo.id, fx.color).await.unwrap();
        }

        let combo = fx.store.get_client_combo(fx.client_combo.id).await.unwrap();
        assert_eq!(combo.status, ClientComboStatus::Completed);
    }

    #[tokio::test]
    async fn test_release_reactivates_completed_package() {
        let fx = fixture().await;
        for _ in 0..2 {
            fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();
        }
        for _ in 0..3 {
            fx.ledger.consume(fx.client_combo.id, fx.color).await.unwrap();
        }

        {
            let mut tables = fx.store.write().await;
            apply_release(&mut tables, fx.client_combo.id, fx.cut).unwrap();
        }

        let combo = fx.store.get_client_combo(fx.client_combo.id).await.unwrap();
        assert_eq!(combo.status, ClientComboStatus::Active);
    }

    #[tokio::test]
    async fn test_credit_conservation_over_mixed_operations() {
        let fx = fixture().await;
        fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();
        fx.ledger.consume(fx.client_combo.id, fx.color).await.unwrap();
        {
            let mut tables = fx.store.write().await;
            apply_release(&mut tables, fx.client_combo.id, fx.cut).unwrap();
            // A second release on an untouched counter must not go
            // negative.
            apply_release(&mut tables, fx.client_combo.id, fx.cut).unwrap();
        }

        let tables = fx.store.read().await;
        let used: u32 = tables.sessions_of(fx.client_combo.id).map(|s| s.used_sessions).sum();
        let total: u32 = tables.sessions_of(fx.client_combo.id).map(|s| s.total_sessions).sum();
        assert!(used <= total);
        assert_eq!(used, 1);
    }

    #[tokio::test]
    async fn test_detach_clears_template_but_keeps_usage() {
        let fx = fixture().await;
        fx.ledger.consume(fx.client_combo.id, fx.cut).await.unwrap();

        let detached = fx.ledger.detach(fx.client_combo.id).await.unwrap();
        assert!(detached.combo_id.is_none());
        assert_eq!(detached.status, ClientComboStatus::Active);

        let tables = fx.store.read().await;
        let session = tables.session_for(fx.client_combo.id, fx.cut).unwrap();
        assert_eq!(session.used_sessions, 1);
    }

    #[tokio::test]
    async fn test_detach_unknown_package_fails() {
        let fx = fixture().await;
        let result = fx.ledger.detach(Uuid::new_v4()).await;
        assert_eq!(result, Err(ComboError::NotFound));
    }
}
