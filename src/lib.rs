pub mod accounts;
pub mod config;
pub mod dashboard;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod models;
pub mod openrouter;
pub mod prompt;
pub mod routes;
pub mod session;
pub mod stripe;
pub mod unsplash;

use axum::{routing::{get, post}, Router};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use crate::routes::{
    create_checkout, dashboard_generate, dashboard_state, generate_outfits, health, login, logout, me, register,
    search_images, stripe_webhook, AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-outfits", post(generate_outfits))
        .route("/api/search-images", post(search_images))
        .route("/api/stripe/create-checkout", post(create_checkout))
        .route("/api/stripe/webhook", post(stripe_webhook))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/dashboard/generate", post(dashboard_generate))
        .route("/api/dashboard/state", get(dashboard_state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
