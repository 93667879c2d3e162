//! Shared application state handed to every request handler.

use crate::auth::IdentityProvider;
use crate::billing::credits::AiCreditService;
use crate::billing::SubscriptionService;
use crate::channels::{MessagingGateway, NullGateway, WhatsAppGateway};
use crate::combo::ComboLedger;
use crate::config::AppConfig;
use crate::scheduling::{AppointmentService, ConflictDetector};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub subscriptions: Arc<SubscriptionService>,
    pub appointments: Arc<AppointmentService>,
    pub conflicts: Arc<ConflictDetector>,
    pub combos: Arc<ComboLedger>,
    pub credits: Arc<AiCreditService>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        let store = Store::new();
        let subscriptions = Arc::new(SubscriptionService::with_default_catalog());

        let gateway: Arc<dyn MessagingGateway> = if config.gateway.enabled {
            Arc::new(WhatsAppGateway::new(
                &config.gateway.api_url,
                &config.gateway.phone_number_id,
                &config.gateway.access_token,
            ))
        } else {
            Arc::new(NullGateway)
        };

        let appointments = Arc::new(AppointmentService::new(
            store.clone(),
            subscriptions.clone(),
            gateway,
        ));
        let conflicts = Arc::new(ConflictDetector::new(store.clone()));
        let combos = Arc::new(ComboLedger::new(store.clone()));
        let credits = Arc::new(AiCreditService::new(store.clone(), subscriptions.clone()));

        Self {
            config: Arc::new(config),
            store,
            subscriptions,
            appointments,
            conflicts,
            combos,
            credits,
            identity,
        }
    }
}
