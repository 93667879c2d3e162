//! Appointment lifecycle orchestration.
//!
//! The only component allowed to write appointment rows. Conflict
//! checks and the write they guard happen under one store write guard,
//! so two concurrent requests for overlapping windows cannot both get
//! through.

use crate::auth::CallerIdentity;
use crate::billing::SubscriptionService;
use crate::channels::MessagingGateway;
use crate::combo::{ledger, CollaboratorInfo};
use crate::scheduling::availability::is_collaborator_available;
use crate::scheduling::conflict::find_conflict;
use crate::scheduling::SchedulingError;
use crate::shared::models::{Appointment, AppointmentStatus, Client, DayOfWeek};
use crate::store::Store;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub calendar_id: Uuid,
    pub service_id: Uuid,
    pub collaborator_id: Option<Uuid>,
    /// Known client, or none when booking through a public link.
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Defaults to the service's current price when omitted.
    pub service_price_cents: Option<i64>,
    pub final_price_cents: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComboAppointment {
    pub calendar_id: Uuid,
    pub client_combo_id: Uuid,
    pub service_id: Uuid,
    pub collaborator_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub service_id: Option<Uuid>,
    pub collaborator_id: Option<Uuid>,
}

/// How the request reached us: through a public booking link or as an
/// authenticated tenant.
#[derive(Debug, Clone, Copy)]
pub enum RequestContext {
    Public,
    Authenticated(CallerIdentity),
}

pub struct AppointmentService {
    store: Arc<Store>,
    subscriptions: Arc<SubscriptionService>,
    gateway: Arc<dyn MessagingGateway>,
}

impl AppointmentService {
    pub fn new(
        store: Arc<Store>,
        subscriptions: Arc<SubscriptionService>,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            gateway,
        }
    }

    pub async fn create(
        &self,
        input: NewAppointment,
        caller: Option<&CallerIdentity>,
    ) -> Result<Appointment, SchedulingError> {
        if input.start_time >= input.end_time {
            return Err(SchedulingError::InvalidWindow);
        }

        let (appointment, client_phone) = {
            let mut tables = self.store.write().await;

            let calendar = tables
                .calendars
                .get(&input.calendar_id)
                .ok_or(SchedulingError::CalendarNotFound)?;
            if !calendar.active {
                return Err(SchedulingError::SlotUnavailable);
            }

            // Public bookings act on behalf of the calendar's owner.
            let tenant_id = match caller {
                Some(caller) if caller.id != calendar.tenant_id => {
                    return Err(SchedulingError::NotAuthorized)
                }
                Some(caller) => caller.id,
                None => calendar.tenant_id,
            };

            let service = tables
                .services
                .get(&input.service_id)
                .ok_or(SchedulingError::NotFound)?;
            if !service.available_on(DayOfWeek::from(input.start_time.weekday())) {
                return Err(SchedulingError::SlotUnavailable);
            }
            let service_name = service.name.clone();
            let service_price = service.price_cents;

            let collaborator_name = match input.collaborator_id {
                Some(collaborator_id) => {
                    let collaborator = tables
                        .collaborators
                        .get(&collaborator_id)
                        .ok_or(SchedulingError::NotFound)?;
                    if !is_collaborator_available(collaborator, input.start_time, input.end_time) {
                        return Err(SchedulingError::SlotUnavailable);
                    }
                    Some(collaborator.name.clone())
                }
                None => None,
            };

            let client = resolve_client(
                &mut tables,
                tenant_id,
                input.client_id,
                input.client_name.as_deref(),
                input.client_phone.as_deref(),
            )?;
            let client_id = client.id;
            let client_phone = client.phone.clone();

            if find_conflict(
                &tables,
                input.calendar_id,
                input.start_time,
                input.end_time,
                None,
            )
            .is_some()
            {
                return Err(SchedulingError::ConflictingAppointment);
            }

            let now = Utc::now();
            let appointment = Appointment {
                id: Uuid::new_v4(),
                tenant_id,
                calendar_id: input.calendar_id,
                client_id,
                service_id: input.service_id,
                collaborator_id: input.collaborator_id,
                combo_id: None,
                start_time: input.start_time,
                end_time: input.end_time,
                status: AppointmentStatus::Scheduled,
                service_name,
                collaborator_name,
                combo_name: None,
                service_price_cents: input.service_price_cents.unwrap_or(service_price),
                final_price_cents: input.final_price_cents.unwrap_or(service_price),
                created_at: now,
                updated_at: now,
            };
            tables.appointments.insert(appointment.id, appointment.clone());
            (appointment, client_phone)
        };

        self.notify_booked(&appointment, &client_phone);
        Ok(appointment)
    }

    /// Like [`Self::create`], but paid with a package session instead
    /// of money: the ledger draw and the appointment insert share one
    /// write guard.
    pub async fn create_combo_appointment(
        &self,
        input: NewComboAppointment,
        caller: Option<&CallerIdentity>,
    ) -> Result<Appointment, SchedulingError> {
        if input.start_time >= input.end_time {
            return Err(SchedulingError::InvalidWindow);
        }

        let (appointment, client_phone) = {
            let mut tables = self.store.write().await;

            let calendar = tables
                .calendars
                .get(&input.calendar_id)
                .ok_or(SchedulingError::CalendarNotFound)?;
            if !calendar.active {
                return Err(SchedulingError::SlotUnavailable);
            }
            let tenant_id = match caller {
                Some(caller) if caller.id != calendar.tenant_id => {
                    return Err(SchedulingError::NotAuthorized)
                }
                Some(caller) => caller.id,
                None => calendar.tenant_id,
            };

            let client_combo = tables
                .client_combos
                .get(&input.client_combo_id)
                .ok_or(SchedulingError::NotFound)?;
            if client_combo.tenant_id != tenant_id {
                return Err(SchedulingError::NotFound);
            }
            let client_id = client_combo.client_id;
            let combo_name = client_combo.combo_name.clone();

            let service = tables
                .services
                .get(&input.service_id)
                .ok_or(SchedulingError::NotFound)?;
            if !service.available_on(DayOfWeek::from(input.start_time.weekday())) {
                return Err(SchedulingError::SlotUnavailable);
            }
            let service_name = service.name.clone();

            let collaborator_name = match input.collaborator_id {
                Some(collaborator_id) => {
                    let collaborator = tables
                        .collaborators
                        .get(&collaborator_id)
                        .ok_or(SchedulingError::NotFound)?;
                    if !is_collaborator_available(collaborator, input.start_time, input.end_time) {
                        return Err(SchedulingError::SlotUnavailable);
                    }
                    Some(collaborator.name.clone())
                }
                None => None,
            };

            if find_conflict(
                &tables,
                input.calendar_id,
                input.start_time,
                input.end_time,
                None,
            )
            .is_some()
            {
                return Err(SchedulingError::ConflictingAppointment);
            }

            let now = Utc::now();
            ledger::apply_consume(&mut tables, input.client_combo_id, input.service_id, now)?;

            let client_phone = tables
                .clients
                .get(&client_id)
                .map(|c| c.phone.clone())
                .unwrap_or_default();

            // Paid at package-purchase time, so the booking itself
            // carries no price.
            let appointment = Appointment {
                id: Uuid::new_v4(),
                tenant_id,
                calendar_id: input.calendar_id,
                client_id,
                service_id: input.service_id,
                collaborator_id: input.collaborator_id,
                combo_id: Some(input.client_combo_id),
                start_time: input.start_time,
                end_time: input.end_time,
                status: AppointmentStatus::Scheduled,
                service_name,
                collaborator_name,
                combo_name: Some(combo_name),
                service_price_cents: 0,
                final_price_cents: 0,
                created_at: now,
                updated_at: now,
            };
            tables.appointments.insert(appointment.id, appointment.clone());
            (appointment, client_phone)
        };

        self.notify_booked(&appointment, &client_phone);
        Ok(appointment)
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        context: RequestContext,
    ) -> Result<Appointment, SchedulingError> {
        self.authorize_edit(id, context, true).await?;

        let mut tables = self.store.write().await;

        let appointment = tables.appointments.get(&id).ok_or(SchedulingError::NotFound)?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(SchedulingError::NotFound);
        }
        let calendar_id = appointment.calendar_id;
        let current_service = appointment.service_id;
        let is_combo = appointment.combo_id.is_some();

        let start_time = patch.start_time.unwrap_or(appointment.start_time);
        let end_time = patch.end_time.unwrap_or(appointment.end_time);
        if start_time >= end_time {
            return Err(SchedulingError::InvalidWindow);
        }

        if find_conflict(&tables, calendar_id, start_time, end_time, Some(id)).is_some() {
            return Err(SchedulingError::ConflictingAppointment);
        }

        let collaborator_info = match patch.collaborator_id {
            Some(collaborator_id) => {
                let collaborator = tables
                    .collaborators
                    .get(&collaborator_id)
                    .ok_or(SchedulingError::NotFound)?;
                Some(CollaboratorInfo {
                    id: collaborator.id,
                    name: collaborator.name.clone(),
                })
            }
            None => None,
        };

        let now = Utc::now();
        match patch.service_id {
            Some(to_service) if to_service != current_service && is_combo => {
                // Combo-paid bookings move their session credit along
                // with the service, atomically.
                ledger::apply_service_swap(&mut tables, id, to_service, collaborator_info, now)?;
            }
            Some(to_service) if to_service != current_service => {
                let service_name = tables
                    .services
                    .get(&to_service)
                    .map(|s| s.name.clone())
                    .ok_or(SchedulingError::NotFound)?;
                let appointment = tables
                    .appointments
                    .get_mut(&id)
                    .expect("fetched above under the same guard");
                appointment.service_id = to_service;
                appointment.service_name = service_name;
                if let Some(info) = collaborator_info {
                    appointment.collaborator_id = Some(info.id);
                    appointment.collaborator_name = Some(info.name);
                }
            }
            _ => {
                if let Some(info) = collaborator_info {
                    let appointment = tables
                        .appointments
                        .get_mut(&id)
                        .expect("fetched above under the same guard");
                    appointment.collaborator_id = Some(info.id);
                    appointment.collaborator_name = Some(info.name);
                }
            }
        }

        let appointment = tables
            .appointments
            .get_mut(&id)
            .expect("fetched above under the same guard");
        appointment.start_time = start_time;
        appointment.end_time = end_time;
        appointment.updated_at = now;
        Ok(appointment.clone())
    }

    /// One-way transition to cancelled. The record stays for reporting,
    /// and a combo session consumed by this appointment is forfeited,
    /// not returned.
    pub async fn cancel(
        &self,
        id: Uuid,
        context: RequestContext,
    ) -> Result<Appointment, SchedulingError> {
        self.authorize_edit(id, context, false).await?;

        let mut tables = self.store.write().await;
        let appointment = tables
            .appointments
            .get_mut(&id)
            .ok_or(SchedulingError::NotFound)?;
        if appointment.status != AppointmentStatus::Cancelled {
            appointment.status = AppointmentStatus::Cancelled;
            appointment.updated_at = Utc::now();
        }
        Ok(appointment.clone())
    }

    pub async fn list_for_calendar(
        &self,
        calendar_id: Uuid,
        day: Option<chrono::NaiveDate>,
    ) -> Vec<Appointment> {
        let tables = self.store.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.calendar_id == calendar_id)
            .filter(|a| day.map_or(true, |d| a.start_time.date_naive() == d))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.start_time);
        appointments
    }

    /// Shared authorization for update/cancel. Public-link writes hang
    /// off the owner's plan; authenticated writes require ownership,
    /// and editing additionally requires a non-pending subscription.
    async fn authorize_edit(
        &self,
        id: Uuid,
        context: RequestContext,
        gate_pending: bool,
    ) -> Result<(), SchedulingError> {
        let tenant_id = {
            let tables = self.store.read().await;
            tables
                .appointments
                .get(&id)
                .map(|a| a.tenant_id)
                .ok_or(SchedulingError::NotFound)?
        };

        match context {
            RequestContext::Public => {
                let plan = self.subscriptions.plan_for_tenant(tenant_id).await;
                if !plan.allows_external_write() {
                    return Err(SchedulingError::NotAuthorized);
                }
            }
            RequestContext::Authenticated(caller) => {
                if caller.id != tenant_id {
                    return Err(SchedulingError::NotAuthorized);
                }
                if gate_pending {
                    let plan = self.subscriptions.plan_for_tenant(tenant_id).await;
                    if plan.is_pending() {
                        return Err(SchedulingError::PendingBasicPlan);
                    }
                }
            }
        }
        Ok(())
    }

    fn notify_booked(&self, appointment: &Appointment, client_phone: &str) {
        if client_phone.is_empty() {
            return;
        }
        let gateway = Arc::clone(&self.gateway);
        let phone = client_phone.to_string();
        let message = format!(
            "Your {} appointment is confirmed for {}.",
            appointment.service_name,
            appointment.start_time.format("%Y-%m-%d %H:%M UTC"),
        );
        let appointment_id = appointment.id;
        tokio::spawn(async move {
            if let Err(e) = gateway.notify_client(&phone, &message).await {
                tracing::warn!(%appointment_id, error = %e, "booking notification failed");
            }
        });
    }
}

/// Finds or creates the client for a booking. Public bookings carry a
/// phone number; an existing client with that phone wins over creating
/// a duplicate.
fn resolve_client(
    tables: &mut crate::store::Tables,
    tenant_id: Uuid,
    client_id: Option<Uuid>,
    client_name: Option<&str>,
    client_phone: Option<&str>,
) -> Result<Client, SchedulingError> {
    if let Some(client_id) = client_id {
        return tables
            .clients
            .get(&client_id)
            .cloned()
            .ok_or(SchedulingError::NotFound);
    }

    let phone = client_phone.ok_or(SchedulingError::NotFound)?;
    if let Some(existing) = tables.client_by_phone(tenant_id, phone) {
        return Ok(existing.clone());
    }

    let client = Client {
        id: Uuid::new_v4(),
        tenant_id,
        name: client_name.unwrap_or(phone).to_string(),
        phone: phone.to_string(),
        created_at: Utc::now(),
    };
    tables.clients.insert(client.id, client.clone());
    Ok(client)
}
