use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    PayPerUse,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    pub credits: u32,
    pub subscription: Option<Subscription>,
}

impl Account {
    pub fn plan(&self) -> PlanTier {
        match &self.subscription {
            Some(sub) if sub.is_active() => PlanTier::Monthly,
            _ if self.credits > 0 => PlanTier::PayPerUse,
            _ => PlanTier::Free,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub email: String,
    pub plan: PlanTier,
    #[serde(flatten)]
    pub account: Account,
}

/// Payment grants per purchaser email, written by the Stripe webhook.
#[derive(Default)]
pub struct AccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

fn key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountStore {
    pub fn get(&self, email: &str) -> AccountSnapshot {
        let email = key(email);
        let account = self.accounts.read().get(&email).cloned().unwrap_or_default();
        AccountSnapshot { plan: account.plan(), email, account }
    }

    pub fn grant_credits(&self, email: &str, credits: u32) -> u32 {
        let mut accounts = self.accounts.write();
        let account = accounts.entry(key(email)).or_default();
        account.credits = account.credits.saturating_add(credits);
        info!("💳 Granted {} credits to {} (total {})", credits, email, account.credits);
        account.credits
    }

    pub fn activate_subscription(&self, email: &str, subscription_id: &str) {
        let mut accounts = self.accounts.write();
        accounts.entry(key(email)).or_default().subscription =
            Some(Subscription { id: subscription_id.to_string(), status: "active".to_string() });
        info!("⭐ Subscription {} active for {}", subscription_id, email);
    }

    /// Returns false when no account holds this subscription.
    pub fn update_subscription(&self, subscription_id: &str, status: &str) -> bool {
        let mut accounts = self.accounts.write();
        for account in accounts.values_mut() {
            if let Some(sub) = account.subscription.as_mut().filter(|s| s.id == subscription_id) {
                sub.status = status.to_string();
                return true;
            }
        }
        warn!("⚠️ Subscription {} is not linked to any account", subscription_id);
        false
    }

    pub fn cancel_subscription(&self, subscription_id: &str) -> bool {
        let mut accounts = self.accounts.write();
        for account in accounts.values_mut() {
            if account.subscription.as_ref().is_some_and(|s| s.id == subscription_id) {
                account.subscription = None;
                return true;
            }
        }
        warn!("⚠️ Cancelled subscription {} is not linked to any account", subscription_id);
        false
    }
}
