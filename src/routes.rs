use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::{
    accounts::AccountStore,
    config::AppConfig,
    dashboard::{run_generation, GenerationBoard, GenerationState},
    error::{AppError, AppResult},
    models::{CheckoutRequest, CheckoutResponse, GenerateRequest, ImageResult, ImageSearchRequest, SuggestionsResponse},
    openrouter::OpenRouterClient,
    prompt::build_prompt,
    session::{IssuedSession, SessionStore, SessionUser},
    stripe::{handle_event, StripeClient},
    unsplash::{ImageSearch, UnsplashClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub openrouter: Arc<OpenRouterClient>,
    pub images: Arc<dyn ImageSearch>,
    pub stripe: Arc<StripeClient>,
    pub sessions: Arc<SessionStore>,
    pub accounts: Arc<AccountStore>,
    pub board: Arc<GenerationBoard>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            openrouter: Arc::new(OpenRouterClient::from_config(&config)),
            images: Arc::new(UnsplashClient::from_config(&config)),
            stripe: Arc::new(StripeClient::from_config(&config)),
            sessions: Arc::new(SessionStore::new(config.session_ttl)),
            accounts: Arc::default(),
            board: Arc::default(),
            config: Arc::new(config),
        }
    }
}

/// JSON body whose decode failures surface as `VALIDATION_ERROR` instead of
/// axum's plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Caller identified by a `Bearer` session token.
pub struct AuthUser {
    pub token: String,
    pub user: SessionUser,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;
        let user = state.sessions.resolve(token)?;
        Ok(AuthUser { token: token.to_string(), user })
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// --- Outfit pipeline ---

pub async fn generate_outfits(
    State(state): State<AppState>,
    AppJson(body): AppJson<GenerateRequest>,
) -> AppResult<Json<SuggestionsResponse>> {
    let prompt = build_prompt(&body.profile, &body.event);
    let outfits = state.openrouter.generate_suggestions(&prompt).await?;
    Ok(Json(SuggestionsResponse { outfits }))
}

pub async fn search_images(
    State(state): State<AppState>,
    AppJson(body): AppJson<ImageSearchRequest>,
) -> AppResult<Json<ImageResult>> {
    let image = state.images.resolve_image(&body.query).await?;
    Ok(Json(image))
}

// --- Dashboard ---

pub async fn dashboard_generate(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(body): AppJson<GenerateRequest>,
) -> AppResult<Response> {
    let outcome = run_generation(
        &state.board,
        &state.openrouter,
        state.images.as_ref(),
        &auth.user.email,
        &body.profile,
        &body.event,
    )
    .await?;
    let status = match outcome {
        GenerationState::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)).into_response())
}

pub async fn dashboard_state(State(state): State<AppState>, auth: AuthUser) -> Json<GenerationState> {
    Json(state.board.current(&auth.user.email))
}

// --- Sessions ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<IssuedSession>)> {
    let issued = state.sessions.register(&body.name, &body.email, &body.password)?;
    Ok((StatusCode::CREATED, Json(issued)))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<IssuedSession>> {
    Ok(Json(state.sessions.login(&body.email, &body.password)?))
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> StatusCode {
    state.sessions.logout(&auth.token);
    info!("👋 Logout for {}", auth.user.email);
    StatusCode::NO_CONTENT
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Json<serde_json::Value> {
    let account = state.accounts.get(&auth.user.email);
    Json(json!({ "user": auth.user, "account": account }))
}

// --- Payments ---

pub async fn create_checkout(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    AppJson(body): AppJson<CheckoutRequest>,
) -> AppResult<Json<CheckoutResponse>> {
    let email = body
        .user_email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .or(auth.as_ref().map(|a| a.user.email.as_str()));
    let url = state.stripe.create_checkout_session(&body.plan_id, email, &state.config.app_origin).await?;
    Ok(Json(CheckoutResponse { url }))
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<serde_json::Value>> {
    let signature = headers.get("stripe-signature").and_then(|v| v.to_str().ok());
    let event = state.stripe.verify_webhook(&body, signature, Utc::now().timestamp())?;
    let outcome = handle_event(&state.accounts, &event);
    info!("📬 Webhook {} ({}) -> {:?}", event.id, event.kind, outcome);
    Ok(Json(json!({ "received": true })))
}
