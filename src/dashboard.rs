use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info};

use crate::{
    enrich::enrich_suggestions,
    error::{AppError, AppResult},
    models::{EnrichedSuggestion, Event, Profile},
    openrouter::OpenRouterClient,
    prompt::build_prompt,
    unsplash::ImageSearch,
};

pub const GENERATION_FAILED_MESSAGE: &str = "Hubo un error al generar los outfits. Por favor intenta de nuevo.";
const INTERRUPTED_MESSAGE: &str = "La generación se interrumpió. Por favor intenta de nuevo.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationState {
    Idle,
    Generating,
    Success { outfits: Vec<EnrichedSuggestion> },
    Failed { message: String },
}

/// Per-user generation slots. At most one generation is in flight per user.
#[derive(Default)]
pub struct GenerationBoard {
    slots: RwLock<HashMap<String, GenerationState>>,
}

/// Exclusive hold on a user's slot while it is `Generating`.
///
/// Dropping it without `succeed`/`fail` (e.g. the request was cancelled)
/// marks the slot failed so the user is never locked out.
pub struct GenerationTicket<'a> {
    board: &'a GenerationBoard,
    user: String,
    settled: bool,
}

impl GenerationBoard {
    pub fn current(&self, user: &str) -> GenerationState {
        self.slots.read().get(user).cloned().unwrap_or(GenerationState::Idle)
    }

    /// Enters `Generating`, clearing any previous result or error.
    pub fn begin(&self, user: &str) -> AppResult<GenerationTicket<'_>> {
        let mut slots = self.slots.write();
        if matches!(slots.get(user), Some(GenerationState::Generating)) {
            return Err(AppError::Conflict("a generation is already in progress".to_string()));
        }
        slots.insert(user.to_string(), GenerationState::Generating);
        Ok(GenerationTicket { board: self, user: user.to_string(), settled: false })
    }

    fn settle(&self, user: &str, state: GenerationState) {
        self.slots.write().insert(user.to_string(), state);
    }
}

impl GenerationTicket<'_> {
    pub fn succeed(mut self, outfits: Vec<EnrichedSuggestion>) -> GenerationState {
        self.settled = true;
        let state = GenerationState::Success { outfits };
        self.board.settle(&self.user, state.clone());
        state
    }

    pub fn fail(mut self, message: impl Into<String>) -> GenerationState {
        self.settled = true;
        let state = GenerationState::Failed { message: message.into() };
        self.board.settle(&self.user, state.clone());
        state
    }
}

impl Drop for GenerationTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.board.settle(&self.user, GenerationState::Failed { message: INTERRUPTED_MESSAGE.to_string() });
        }
    }
}

/// Full dashboard flow: prompt, suggestions, then photos.
///
/// A text generation failure voids the whole result; photo failures only
/// degrade their own item.
pub async fn run_generation(
    board: &GenerationBoard,
    generator: &OpenRouterClient,
    images: &dyn ImageSearch,
    user: &str,
    profile: &Profile,
    event: &Event,
) -> AppResult<GenerationState> {
    let ticket = board.begin(user)?;
    info!("🚀 Generating outfits for {}", user);

    let prompt = build_prompt(profile, event);
    match generator.generate_suggestions(&prompt).await {
        Ok(suggestions) => {
            let outfits = enrich_suggestions(images, suggestions).await;
            info!("✅ {} outfits ready for {}", outfits.len(), user);
            Ok(ticket.succeed(outfits))
        }
        Err(e) => {
            error!("❌ Outfit generation for {} failed: {}", user, e);
            Ok(ticket.fail(GENERATION_FAILED_MESSAGE))
        }
    }
}
