use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::{config::AppConfig, models::ImageResult};

pub const FALLBACK_IMAGE_URL: &str = "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400";
pub const FALLBACK_THUMB_URL: &str = "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=200";
pub const FALLBACK_PHOTOGRAPHER: &str = "Unsplash";
pub const FALLBACK_PHOTOGRAPHER_URL: &str = "https://unsplash.com";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsplash API key not configured")]
    Config,
    #[error("search phrase is empty")]
    BadRequest,
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ImageResult {
    /// The fixed photo shown whenever a search yields nothing usable.
    pub fn fallback() -> Self {
        Self {
            image_url: FALLBACK_IMAGE_URL.to_string(),
            thumb_url: FALLBACK_THUMB_URL.to_string(),
            photographer: FALLBACK_PHOTOGRAPHER.to_string(),
            photographer_url: FALLBACK_PHOTOGRAPHER_URL.to_string(),
        }
    }
}

/// Maps a short search phrase to a displayable stock photo.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn resolve_image(&self, phrase: &str) -> Result<ImageResult, ImageError>;
}

pub struct UnsplashClient {
    client: Client,
    access_key: Option<String>,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(access_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.unsplash_access_key.clone(), config.unsplash_base_url.clone())
    }
}

#[async_trait]
impl ImageSearch for UnsplashClient {
    async fn resolve_image(&self, phrase: &str) -> Result<ImageResult, ImageError> {
        let access_key = self.access_key.as_deref().ok_or(ImageError::Config)?;
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(ImageError::BadRequest);
        }

        let url = format!("{}/search/photos", self.base_url);
        info!("🔎 Searching photo for '{}'", phrase);

        let response = self
            .client
            .get(&url)
            .query(&[("query", phrase), ("per_page", "1"), ("orientation", "portrait")])
            .header("Authorization", format!("Client-ID {access_key}"))
            .send()
            .await
            .map_err(|e| ImageError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!("❌ Unsplash API error response ({}): {}", status, error_body);
            return Err(ImageError::Upstream(format!("status={status}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Upstream(format!("parse error: {e}")))?;

        Ok(first_photo(parsed).unwrap_or_else(|| {
            info!("⚠️ No photo found for '{}', using fallback", phrase);
            ImageResult::fallback()
        }))
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
    user: Author,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
    thumb: String,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
    links: AuthorLinks,
}

#[derive(Debug, Deserialize)]
struct AuthorLinks {
    html: String,
}

fn first_photo(resp: SearchResponse) -> Option<ImageResult> {
    let photo = resp.results.into_iter().next()?;
    Some(ImageResult {
        image_url: photo.urls.regular,
        thumb_url: photo.urls.thumb,
        photographer: photo.user.name,
        photographer_url: photo.user.links.html,
    })
}
