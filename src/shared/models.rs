use chrono::{DateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Day of week used for working-hours schedules and service availability
/// masks. Kept separate from `chrono::Weekday` so it can be serialized
/// and used as a map key without extra impls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

/// One open/close interval within a working day. A close time of
/// 00:00 means the interval runs to the end of the day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkInterval {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl WorkInterval {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    fn open_minutes(&self) -> u32 {
        self.open.hour() * 60 + self.open.minute()
    }

    fn close_minutes(&self) -> u32 {
        let m = self.close.hour() * 60 + self.close.minute();
        if m == 0 {
            24 * 60
        } else {
            m
        }
    }

    /// Whether the half-open minute range `[start, end)` falls entirely
    /// inside this interval.
    pub fn contains_minutes(&self, start: u32, end: u32) -> bool {
        self.open_minutes() <= start && end <= self.close_minutes()
    }
}

/// Structured per-weekday working hours for a collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub intervals: HashMap<DayOfWeek, Vec<WorkInterval>>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_day(&mut self, day: DayOfWeek, intervals: Vec<WorkInterval>) {
        self.intervals.insert(day, intervals);
    }

    pub fn intervals_for(&self, day: DayOfWeek) -> &[WorkInterval] {
        self.intervals.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A staff member owned by a business tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub schedule: WeeklySchedule,
    pub created_at: DateTime<Utc>,
}

/// A named scheduling surface bound to at most one collaborator.
/// Inactive calendars accept no new bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSurface {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub collaborator_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A bookable offering. Prices are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub duration_minutes: u32,
    pub price_cents: i64,
    pub available_days: Vec<DayOfWeek>,
    pub commission_percent: f64,
    pub created_at: DateTime<Utc>,
}

impl ServiceOffering {
    /// Whether the service may be booked on the given weekday. An
    /// empty mask means every day.
    pub fn available_on(&self, day: DayOfWeek) -> bool {
        self.available_days.is_empty() || self.available_days.contains(&day)
    }
}

/// Explicit join recording which collaborators may perform which service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceCollaborator {
    pub service_id: Uuid,
    pub collaborator_id: Uuid,
}

/// An end client of a tenant, identified within the tenant by phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

/// The central booking record. The `*_name` and `*_price_cents` fields
/// are snapshots captured at creation so later edits to services,
/// collaborators or combos never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub calendar_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub collaborator_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub service_name: String,
    pub collaborator_name: Option<String>,
    pub combo_name: Option<String>,
    pub service_price_cents: i64,
    pub final_price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// A scheduled appointment whose start has passed is treated as
    /// completed by reporting consumers. Status itself never transitions.
    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Scheduled && self.start_time < now
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DiscountPolicy {
    Percentage(u32),
    Fixed(i64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComboItem {
    pub service_id: Uuid,
    pub quantity: u32,
}

/// A package template: a named bundle of service-session credits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combo {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub items: Vec<ComboItem>,
    pub discount: DiscountPolicy,
    pub total_price_cents: i64,
    pub final_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientComboStatus {
    Active,
    Completed,
}

/// A client's purchased instance of a combo. `combo_id` may be cleared
/// ("detached") to freeze the purchase against template edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientCombo {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub combo_id: Option<Uuid>,
    pub combo_name: String,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub amount_paid_cents: i64,
    pub status: ClientComboStatus,
}

/// One row per (client combo, service): purchased vs consumed sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientComboSession {
    pub id: Uuid,
    pub client_combo_id: Uuid,
    pub service_id: Uuid,
    pub total_sessions: u32,
    pub used_sessions: u32,
}

impl ClientComboSession {
    pub fn remaining(&self) -> u32 {
        self.total_sessions.saturating_sub(self.used_sessions)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used_sessions >= self.total_sessions
    }
}

/// One row per automated attendance event. Every attendance is logged
/// even when it does not draw a new credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiUsageRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub client_phone: String,
    pub conversation_id: String,
    pub service_type: String,
    pub source: String,
    pub recorded_at: DateTime<Utc>,
}

/// A purchased top-up of AI attendance credits. `active` is true iff
/// `used < quantity`; packs are drawn oldest-purchase-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalAiCredit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    pub quantity: u32,
    pub used: u32,
    pub active: bool,
}

impl AdditionalAiCredit {
    pub fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.used)
    }
}
