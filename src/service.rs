//! Request handling: validate, extract, decode, compose.
//!
//! Failures past input validation collapse into one opaque response; the
//! detailed error is logged with its category.

use crate::card::{compose_card, Card, CardFonts, CardLayout};
use crate::color::resolve_palette;
use crate::extract::extract_signals;
use crate::favicon::load_favicon;
use crate::rendering::FontBook;
use crate::{CardifyConfig, Error, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use url::Url;

/// Generic message for every pipeline failure.
pub const GENERIC_FAILURE: &str = "Failed to generate card";

/// Inbound request: `{ "url": "..." }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Outbound response: `{ "cardImage": "data:..." }` or `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CardResponse {
    Card {
        #[serde(rename = "cardImage")]
        card_image: String,
    },
    Failure {
        error: String,
        #[serde(skip)]
        status: u16,
    },
}

impl CardResponse {
    /// HTTP-style status: 200, 400 for input errors, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            CardResponse::Card { .. } => 200,
            CardResponse::Failure { status, .. } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CardResponse::Card { .. })
    }

    fn failure(err: &Error) -> Self {
        if err.is_client_error() {
            return CardResponse::Failure {
                error: err.to_string(),
                status: 400,
            };
        }
        error!("card generation failed ({}): {}", err.category(), err);
        CardResponse::Failure {
            error: GENERIC_FAILURE.to_string(),
            status: 500,
        }
    }

    /// Map a pipeline outcome to a response; partial cards never escape.
    pub fn from_result(result: Result<Card>) -> Self {
        match result.and_then(|card| card.to_data_url()) {
            Ok(card_image) => CardResponse::Card { card_image },
            Err(e) => Self::failure(&e),
        }
    }
}

/// Require an absolute `http`/`https` URL.
pub fn validate_url(url: Option<&str>) -> Result<Url> {
    let raw = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::InvalidInput("URL is required".into()))?;
    let parsed =
        Url::parse(raw).map_err(|e| Error::InvalidInput(format!("URL is invalid: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidInput(format!(
            "URL is invalid: unsupported scheme '{}'",
            other
        ))),
    }
}

/// The card pipeline. Fonts and the HTTP client are loaded once and shared
/// across requests; browser sessions never are.
pub struct Cardify {
    config: CardifyConfig,
    layout: CardLayout,
    fonts: CardFonts,
    client: reqwest::Client,
}

impl Cardify {
    pub fn new(config: CardifyConfig) -> Result<Self> {
        let layout = CardLayout::default();
        let book = FontBook::load(&config.font_files)?;
        let fonts = CardFonts::load(&book, &layout)?;
        Self::with_fonts(config, layout, fonts)
    }

    /// Build with explicit geometry and faces.
    pub fn with_fonts(config: CardifyConfig, layout: CardLayout, fonts: CardFonts) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.browser.user_agent.clone())
            .timeout(Duration::from_millis(config.favicon_timeout_ms))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            layout,
            fonts,
            client,
        })
    }

    pub fn config(&self) -> &CardifyConfig {
        &self.config
    }

    /// Run the whole pipeline for `url`.
    pub async fn generate(&self, url: &str) -> Result<Card> {
        let started = Instant::now();
        let url = validate_url(Some(url))?;

        let signals = extract_signals(url.as_str(), &self.config.browser, self.config.backend).await?;
        let palette = resolve_palette(&signals.colors);
        let favicon = load_favicon(&self.client, &signals.favicon_url, self.layout.icon_size).await?;

        let card = compose_card(
            &self.layout,
            &self.fonts,
            &signals.title,
            &signals.description,
            &palette,
            &favicon,
        )?;
        info!(
            "generated card for {} in {}ms (main {}, header {}, anchor {})",
            signals.page_url,
            started.elapsed().as_millis(),
            palette.main,
            palette.header,
            palette.anchor
        );
        Ok(card)
    }

    pub async fn process(&self, request: &CardRequest) -> Result<Card> {
        let url = validate_url(request.url.as_deref())?;
        self.generate(url.as_str()).await
    }

    /// Process a request into its wire response.
    pub async fn handle(&self, request: CardRequest) -> CardResponse {
        CardResponse::from_result(self.process(&request).await)
    }
}
