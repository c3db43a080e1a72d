//! Cardify
//!
//! Turns a URL into a fixed-size preview card: the page is rendered
//! headlessly, its title, meta description, theme colors and favicon are
//! read out, and a 500×500 PNG is composed from them.
//!
//! # Pipeline
//!
//! - **Page signals** ([`extract`]): a [`PageSession`] navigates to the URL
//!   and answers declarative probes (selector chains + computed style).
//! - **Palette** ([`color`]): browser colors are normalized to `#RRGGBB`
//!   with a three-tier fallback per channel.
//! - **Favicon** ([`favicon`]): fetched, ICO containers unpacked, then fit
//!   into a transparent square.
//! - **Card** ([`card`]): canvas fill, wrapped/truncated text, icon, PNG.
//!
//! # Example
//!
//! ```no_run
//! use cardify::{Cardify, CardifyConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cardify = Cardify::new(CardifyConfig::default())?;
//! let card = cardify.generate("https://example.com").await?;
//! std::fs::write("card.png", card.to_png()?)?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod card;
pub mod color;
pub mod extract;
pub mod favicon;
pub mod rendering;
pub mod service;

// Browser-less session: HTTP GET + HTML parsing, inline styles only
pub mod simple;

// Headless Chrome session over the DevTools protocol
#[cfg(feature = "cdp")]
pub mod cdp;

pub use card::{compose_card, Card, CardFonts, CardLayout};
pub use color::{normalize_color, resolve_palette, ColorSample, ResolvedPalette};
pub use extract::{extract_page_signals, extract_signals, PageSignals, StyleProbe, StyleProperty};
pub use favicon::{decode_favicon, load_favicon, FaviconBitmap};
pub use service::{CardRequest, CardResponse, Cardify};

/// Which [`PageSession`] implementation drives page extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Headless Chrome over CDP (requires the `cdp` feature)
    Chrome,
    /// Plain HTTP fetch and HTML parsing; no JavaScript, inline styles only
    Simple,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "cdp") {
            Backend::Chrome
        } else {
            Backend::Simple
        }
    }
}

/// Browser session configuration
///
/// Defaults follow what the card pipeline expects: a 30 second navigation
/// budget and a 500 ms network-idle window.
///
/// # Examples
///
/// ```
/// let cfg = cardify::BrowserConfig::default();
/// assert_eq!(cfg.timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Navigation budget in milliseconds, including the network-idle wait
    pub timeout_ms: u64,
    /// How long the network must stay quiet before the page counts as idle
    pub idle_window_ms: u64,
    /// Polling interval while waiting for network idle
    pub poll_interval_ms: u64,
    /// When a navigation counts as finished
    pub wait_until: WaitUntil,
    /// Chrome/Chromium executable; `None` lets the launcher find one
    pub chrome_path: Option<PathBuf>,
    /// Run Chrome with its sandbox enabled
    pub sandbox: bool,
    /// Extra HTTP headers sent with every page request
    pub headers: HashMap<String, String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36 Cardify/0.1".to_string(),
            viewport: Viewport::default(),
            timeout_ms: 30_000,
            idle_window_ms: 500,
            poll_interval_ms: 100,
            wait_until: WaitUntil::NetworkIdle,
            chrome_path: None,
            sandbox: true,
            headers: HashMap::new(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone)]
pub struct CardifyConfig {
    pub browser: BrowserConfig,
    pub backend: Backend,
    /// Timeout for the favicon download in milliseconds
    pub favicon_timeout_ms: u64,
    /// Font files preferred over system fonts
    pub font_files: Vec<PathBuf>,
}

impl Default for CardifyConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            backend: Backend::default(),
            favicon_timeout_ms: 15_000,
            font_files: Vec::new(),
        }
    }
}

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WaitUntil {
    /// The load event fired
    Load,
    /// The load event fired and no new requests started for the idle window
    NetworkIdle,
}

/// Per-navigation options
#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub timeout_ms: u64,
    pub wait_until: WaitUntil,
}

impl NavigateOptions {
    /// Options for a session navigation under `config`
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            wait_until: config.wait_until,
        }
    }

    pub fn network_idle(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            wait_until: WaitUntil::NetworkIdle,
        }
    }
}

/// A `<link>` element as seen by the page, with `href` already absolute.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct LinkCandidate {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub rel: String,
    #[serde(default, rename = "type")]
    pub mime_type: String,
}

/// Control surface over one browser tab, used for exactly one navigation.
///
/// Implementations own their browser resources; `close` releases them and
/// dropping a session must release them too.
pub trait PageSession {
    /// Start the browser (or client) and open a tab
    fn launch(config: &BrowserConfig) -> Result<Self>
    where
        Self: Sized;

    /// Navigate to `url` and wait according to `options`
    fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<()>;

    /// URL of the loaded document after redirects
    fn current_url(&self) -> Result<String>;

    /// `document.title`
    fn title(&mut self) -> Result<String>;

    /// Resolve a selector chain and read a computed style property from the
    /// matched element. `None` when some selector in the chain matches nothing.
    fn computed_style(&mut self, probe: &StyleProbe) -> Result<Option<String>>;

    /// Attribute of the first element matching `selector`
    fn attribute(&mut self, selector: &str, attribute: &str) -> Result<Option<String>>;

    /// All `<link>` elements matching `selector`, in document order
    fn links(&mut self, selector: &str) -> Result<Vec<LinkCandidate>>;

    /// Close the tab and the browser
    fn close(self) -> Result<()>;
}
