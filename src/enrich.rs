use futures::future::join_all;
use tracing::warn;

use crate::{
    models::{EnrichedSuggestion, ImageResult, Suggestion},
    unsplash::ImageSearch,
};

/// Resolves a photo for every suggestion concurrently.
///
/// Each lookup is independent: a failure only swaps that item's image for the
/// fallback. Output keeps the input order and length.
pub async fn enrich_suggestions(search: &dyn ImageSearch, suggestions: Vec<Suggestion>) -> Vec<EnrichedSuggestion> {
    let images = join_all(suggestions.iter().map(|s| search.resolve_image(&s.search_query))).await;

    suggestions
        .into_iter()
        .zip(images)
        .map(|(suggestion, image)| {
            let image = image.unwrap_or_else(|e| {
                warn!("⚠️ Image lookup for outfit {} failed ({}), using fallback", suggestion.id, e);
                ImageResult::fallback()
            });
            EnrichedSuggestion { suggestion, image }
        })
        .collect()
}
