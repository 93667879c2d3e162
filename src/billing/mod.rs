use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod credits;

/// A quota that is either a fixed monthly allowance or unbounded
/// (lifetime tier).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LimitValue {
    Limited(u64),
    Unlimited,
}

impl LimitValue {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Limited(v) => Some(*v),
            Self::Unlimited => None,
        }
    }

    pub fn allows(&self, current: u64) -> bool {
        match self {
            Self::Limited(limit) => current < *limit,
            Self::Unlimited => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanPrice {
    Free,
    Fixed {
        amount_cents: i64,
        period: BillingPeriod,
    },
}

/// Per-plan limits relevant to the scheduling core: AI attendance
/// credits per calendar month, calendar count, and whether public
/// booking links may write through the external surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub name: String,
    pub description: Option<String>,
    pub price: PlanPrice,
    pub ai_credits_per_month: LimitValue,
    pub calendars: LimitValue,
    pub external_write: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSubscription {
    pub tenant_id: Uuid,
    pub plan_id: String,
    pub status: SubscriptionStatus,
}

/// Resolved view of a tenant's subscription handed to the scheduling
/// core: the billing gateway itself is an external collaborator.
#[derive(Debug, Clone)]
pub struct TenantPlan {
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub base_credit_limit: LimitValue,
    pub calendar_limit: LimitValue,
    pub external_write: bool,
}

impl TenantPlan {
    pub fn is_pending(&self) -> bool {
        self.status == SubscriptionStatus::Pending
    }

    pub fn allows_external_write(&self) -> bool {
        self.external_write && self.status == SubscriptionStatus::Active
    }
}

pub fn default_plan_catalog() -> HashMap<String, PlanConfig> {
    let mut plans = HashMap::new();

    plans.insert(
        "basic".to_string(),
        PlanConfig {
            name: "Basic".to_string(),
            description: Some("Single calendar with assisted booking".to_string()),
            price: PlanPrice::Fixed {
                amount_cents: 4990,
                period: BillingPeriod::Monthly,
            },
            ai_credits_per_month: LimitValue::Limited(30),
            calendars: LimitValue::Limited(1),
            external_write: true,
        },
    );

    plans.insert(
        "pro".to_string(),
        PlanConfig {
            name: "Pro".to_string(),
            description: Some("Multiple calendars and a larger AI allowance".to_string()),
            price: PlanPrice::Fixed {
                amount_cents: 9990,
                period: BillingPeriod::Monthly,
            },
            ai_credits_per_month: LimitValue::Limited(100),
            calendars: LimitValue::Limited(5),
            external_write: true,
        },
    );

    plans.insert(
        "lifetime".to_string(),
        PlanConfig {
            name: "Lifetime".to_string(),
            description: Some("One-time purchase, no usage caps".to_string()),
            price: PlanPrice::Free,
            ai_credits_per_month: LimitValue::Unlimited,
            calendars: LimitValue::Unlimited,
            external_write: true,
        },
    );

    plans
}

/// Plan catalog plus per-tenant subscription state. Lookups never fail:
/// an unknown tenant resolves to a pending basic subscription, which is
/// exactly what a freshly signed-up, not-yet-paying account has.
pub struct SubscriptionService {
    plans: HashMap<String, PlanConfig>,
    subscriptions: Arc<RwLock<HashMap<Uuid, TenantSubscription>>>,
}

impl SubscriptionService {
    pub fn new(plans: HashMap<String, PlanConfig>) -> Self {
        Self {
            plans,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_default_catalog() -> Self {
        Self::new(default_plan_catalog())
    }

    pub fn get_plan(&self, plan_id: &str) -> Option<&PlanConfig> {
        self.plans.get(plan_id)
    }

    pub fn list_plans(&self) -> Vec<(&String, &PlanConfig)> {
        self.plans.iter().collect()
    }

    pub async fn set_subscription(
        &self,
        tenant_id: Uuid,
        plan_id: &str,
        status: SubscriptionStatus,
    ) -> Result<(), BillingError> {
        if !self.plans.contains_key(plan_id) {
            return Err(BillingError::PlanNotFound(plan_id.to_string()));
        }
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(
            tenant_id,
            TenantSubscription {
                tenant_id,
                plan_id: plan_id.to_string(),
                status,
            },
        );
        Ok(())
    }

    pub async fn plan_for_tenant(&self, tenant_id: Uuid) -> TenantPlan {
        let subscriptions = self.subscriptions.read().await;
        let (plan_id, status) = subscriptions
            .get(&tenant_id)
            .map(|s| (s.plan_id.clone(), s.status))
            .unwrap_or_else(|| ("basic".to_string(), SubscriptionStatus::Pending));
        drop(subscriptions);

        let plan = self.plans.get(&plan_id);
        TenantPlan {
            plan_id,
            status,
            base_credit_limit: plan
                .map(|p| p.ai_credits_per_month)
                .unwrap_or(LimitValue::Limited(0)),
            calendar_limit: plan.map(|p| p.calendars).unwrap_or(LimitValue::Limited(0)),
            external_write: plan.map(|p| p.external_write).unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BillingError {
    #[error("Plan not found: {0}")]
    PlanNotFound(String),
    #[error("No AI credits available")]
    NoCreditsAvailable,
}

impl BillingError {
    /// Stable machine-readable code surfaced alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlanNotFound(_) => "PlanNotFound",
            Self::NoCreditsAvailable => "NoCreditsAvailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_value_limited() {
        let limit = LimitValue::Limited(30);
        assert!(!limit.is_unlimited());
        assert_eq!(limit.value(), Some(30));
        assert!(limit.allows(29));
        assert!(!limit.allows(30));
        assert!(!limit.allows(31));
    }

    #[test]
    fn test_limit_value_unlimited() {
        let limit = LimitValue::Unlimited;
        assert!(limit.is_unlimited());
        assert_eq!(limit.value(), None);
        assert!(limit.allows(u64::MAX));
    }

    #[test]
    fn test_default_catalog_tiers() {
        let plans = default_plan_catalog();
        assert!(plans.contains_key("basic"));
        assert!(plans.contains_key("pro"));
        assert!(plans.contains_key("lifetime"));

        assert_eq!(
            plans["basic"].ai_credits_per_month,
            LimitValue::Limited(30)
        );
        assert!(plans["lifetime"].ai_credits_per_month.is_unlimited());
        assert!(plans["lifetime"].calendars.is_unlimited());
    }

    #[tokio::test]
    async fn test_unknown_tenant_resolves_to_pending_basic() {
        let service = SubscriptionService::with_default_catalog();
        let plan = service.plan_for_tenant(Uuid::new_v4()).await;

        assert_eq!(plan.plan_id, "basic");
        assert!(plan.is_pending());
        assert!(!plan.allows_external_write());
        assert_eq!(plan.base_credit_limit, LimitValue::Limited(30));
    }

    #[tokio::test]
    async fn test_active_subscription_allows_external_write() {
        let service = SubscriptionService::with_default_catalog();
        let tenant = Uuid::new_v4();
        service
            .set_subscription(tenant, "pro", SubscriptionStatus::Active)
            .await
            .unwrap();

        let plan = service.plan_for_tenant(tenant).await;
        assert_eq!(plan.plan_id, "pro");
        assert!(!plan.is_pending());
        assert!(plan.allows_external_write());
        assert_eq!(plan.calendar_limit, LimitValue::Limited(5));
    }

    #[tokio::test]
    async fn test_set_subscription_rejects_unknown_plan() {
        let service = SubscriptionService::with_default_catalog();
        let result = service
            .set_subscription(Uuid::new_v4(), "platinum", SubscriptionStatus::Active)
            .await;
        assert!(matches!(result, Err(BillingError::PlanNotFound(_))));
    }

    #[tokio::test]
    async fn test_lifetime_plan_is_unbounded() {
        let service = SubscriptionService::with_default_catalog();
        let tenant = Uuid::new_v4();
        service
            .set_subscription(tenant, "lifetime", SubscriptionStatus::Active)
            .await
            .unwrap();

        let plan = service.plan_for_tenant(tenant).await;
        assert!(plan.base_credit_limit.is_unlimited());
    }
}
