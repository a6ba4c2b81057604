use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{accounts::AccountStore, config::AppConfig};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;
const CURRENCY: &str = "usd";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Stripe secret key not configured")]
    Config,
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
    #[error("purchaser email is required")]
    MissingEmail,
    #[error("upstream error: {0}")]
    Upstream(String),
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Stripe webhook secret not configured")]
    Config,
    #[error("no signature provided")]
    MissingSignature,
    #[error("malformed signature header")]
    MalformedSignature,
    #[error("signature mismatch")]
    InvalidSignature,
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// The two purchasable plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    PayPerUse,
    Monthly,
}

impl Plan {
    pub fn from_id(id: &str) -> Option<Plan> {
        match id {
            "pago-por-uso" => Some(Plan::PayPerUse),
            "plan-mensual" => Some(Plan::Monthly),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Plan::PayPerUse => "pago-por-uso",
            Plan::Monthly => "plan-mensual",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Plan::PayPerUse => "Pago por Uso - 3 Sugerencias",
            Plan::Monthly => "Plan Mensual Ilimitado",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Plan::PayPerUse => "Obtén 3 sugerencias de outfit personalizadas",
            Plan::Monthly => "Sugerencias ilimitadas de outfits por un mes",
        }
    }

    /// Price in USD cents.
    pub fn unit_amount(&self) -> u32 {
        match self {
            Plan::PayPerUse => 390,
            Plan::Monthly => 790,
        }
    }

    pub fn mode(&self) -> CheckoutMode {
        match self {
            Plan::PayPerUse => CheckoutMode::Payment,
            Plan::Monthly => CheckoutMode::Subscription,
        }
    }

    /// Suggestion credits granted by a one-time purchase.
    pub fn credits(&self) -> Option<u32> {
        match self {
            Plan::PayPerUse => Some(3),
            Plan::Monthly => None,
        }
    }
}

/// Form fields for `POST /checkout/sessions`.
pub fn checkout_form(plan: Plan, email: &str, origin: &str) -> Vec<(String, String)> {
    let origin = origin.trim_end_matches('/');
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), plan.mode().as_str().into()),
        ("customer_email".into(), email.into()),
        ("line_items[0][price_data][currency]".into(), CURRENCY.into()),
        ("line_items[0][price_data][product_data][name]".into(), plan.name().into()),
        ("line_items[0][price_data][product_data][description]".into(), plan.description().into()),
        ("line_items[0][price_data][unit_amount]".into(), plan.unit_amount().to_string()),
        ("line_items[0][quantity]".into(), "1".into()),
        ("success_url".into(), format!("{origin}/planes/exito?session_id={{CHECKOUT_SESSION_ID}}")),
        ("cancel_url".into(), format!("{origin}/planes?canceled=true")),
        ("metadata[planId]".into(), plan.id().into()),
        ("metadata[userEmail]".into(), email.into()),
    ];
    if plan.mode() == CheckoutMode::Subscription {
        form.push(("line_items[0][price_data][recurring][interval]".into(), "month".into()));
    }
    if let Some(credits) = plan.credits() {
        form.push(("metadata[credits]".into(), credits.to_string()));
    }
    form
}

pub struct StripeClient {
    client: Client,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: Option<String>, webhook_secret: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            webhook_secret,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.stripe_secret_key.clone(),
            config.stripe_webhook_secret.clone(),
            config.stripe_base_url.clone(),
        )
    }

    /// Creates a hosted checkout page and returns its redirect URL.
    ///
    /// Plan and email are validated before the credential check, so bad input
    /// never reaches Stripe.
    pub async fn create_checkout_session(
        &self,
        plan_id: &str,
        email: Option<&str>,
        origin: &str,
    ) -> Result<String, CheckoutError> {
        let plan = Plan::from_id(plan_id.trim()).ok_or_else(|| CheckoutError::UnknownPlan(plan_id.to_string()))?;
        let email = email.map(str::trim).filter(|e| !e.is_empty()).ok_or(CheckoutError::MissingEmail)?;
        let secret = self.secret_key.as_deref().ok_or(CheckoutError::Config)?;

        info!("🛒 Creating {} checkout for {} ({})", plan.mode().as_str(), email, plan.id());

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(secret)
            .form(&checkout_form(plan, email, origin))
            .send()
            .await
            .map_err(|e| CheckoutError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ Stripe API error response ({}): {}", status, error_body);
            return Err(CheckoutError::Upstream(format!("status={status}")));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| CheckoutError::Upstream(format!("parse error: {e}")))?;
        let url = session
            .url
            .ok_or_else(|| CheckoutError::Upstream(format!("session {} has no url", session.id)))?;

        info!("✅ Checkout session {} created", session.id);
        Ok(url)
    }

    /// Verifies the `Stripe-Signature` header and decodes the event.
    pub fn verify_webhook(&self, payload: &[u8], signature: Option<&str>, now: i64) -> Result<StripeEvent, WebhookError> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        let secret = self.webhook_secret.as_deref().ok_or(WebhookError::Config)?;
        verify_signature(secret, payload, signature, now)?;
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }
}

/// Checks a `t=<unix>,v1=<hex>[,v1=...]` header against HMAC-SHA256 of
/// `"<t>.<payload>"`.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    let signed_at: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    if (now - signed_at).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    for candidate in signatures {
        let Ok(expected) = hex::decode(candidate) else { continue };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::Config)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(WebhookError::InvalidSignature)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    CreditsGranted { email: String, credits: u32 },
    SubscriptionActivated { email: String, subscription_id: String },
    SubscriptionUpdated { subscription_id: String, status: String },
    SubscriptionCancelled { subscription_id: String },
    Logged,
    Ignored(String),
}

fn str_at<'a>(object: &'a Value, pointer: &str) -> Option<&'a str> {
    object.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Applies a verified event to the account grants.
pub fn handle_event(accounts: &AccountStore, event: &StripeEvent) -> WebhookOutcome {
    let object = &event.data.object;
    match event.kind.as_str() {
        "checkout.session.completed" => checkout_completed(accounts, object),
        "customer.subscription.updated" => {
            let Some(id) = str_at(object, "/id") else {
                return WebhookOutcome::Ignored("subscription without id".into());
            };
            let status = str_at(object, "/status").unwrap_or("unknown");
            info!("🔄 Subscription updated: {} {}", id, status);
            accounts.update_subscription(id, status);
            WebhookOutcome::SubscriptionUpdated { subscription_id: id.into(), status: status.into() }
        }
        "customer.subscription.deleted" => {
            let Some(id) = str_at(object, "/id") else {
                return WebhookOutcome::Ignored("subscription without id".into());
            };
            info!("🚫 Subscription canceled: {}", id);
            accounts.cancel_subscription(id);
            WebhookOutcome::SubscriptionCancelled { subscription_id: id.into() }
        }
        "invoice.payment_succeeded" => {
            info!("🧾 Invoice paid: {}", str_at(object, "/id").unwrap_or("?"));
            WebhookOutcome::Logged
        }
        "invoice.payment_failed" => {
            warn!("⚠️ Invoice payment failed: {}", str_at(object, "/id").unwrap_or("?"));
            WebhookOutcome::Logged
        }
        other => {
            info!("Unhandled event type: {}", other);
            WebhookOutcome::Ignored(format!("unhandled event type {other}"))
        }
    }
}

fn checkout_completed(accounts: &AccountStore, session: &Value) -> WebhookOutcome {
    let email = str_at(session, "/metadata/userEmail")
        .or_else(|| str_at(session, "/customer_email"))
        .or_else(|| str_at(session, "/customer_details/email"));
    let Some(email) = email else {
        warn!("⚠️ Completed checkout without purchaser email");
        return WebhookOutcome::Ignored("no purchaser email".into());
    };
    let plan = str_at(session, "/metadata/planId").and_then(Plan::from_id);

    info!(
        "✅ Checkout completed: plan={:?} email={} customer={:?} subscription={:?}",
        plan.map(|p| p.id()),
        email,
        str_at(session, "/customer"),
        str_at(session, "/subscription")
    );

    if str_at(session, "/mode") == Some("subscription") {
        let Some(subscription_id) = str_at(session, "/subscription") else {
            return WebhookOutcome::Ignored("subscription checkout without subscription id".into());
        };
        accounts.activate_subscription(email, subscription_id);
        return WebhookOutcome::SubscriptionActivated { email: email.into(), subscription_id: subscription_id.into() };
    }

    if str_at(session, "/payment_status").is_some_and(|s| s != "paid") {
        return WebhookOutcome::Ignored("payment not settled".into());
    }
    let credits = str_at(session, "/metadata/credits")
        .and_then(|c| c.parse::<u32>().ok())
        .or_else(|| plan.and_then(|p| p.credits()));
    match credits {
        Some(credits) if credits > 0 => {
            accounts.grant_credits(email, credits);
            WebhookOutcome::CreditsGranted { email: email.into(), credits }
        }
        _ => WebhookOutcome::Ignored("no credits in checkout".into()),
    }
}
