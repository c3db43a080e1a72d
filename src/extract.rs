//! Page signal extraction.
//!
//! One session, one navigation:
//!
//! ```text
//! Launching -> Navigating -> ExtractingSignals -> Closed
//!          \_____________\__________________\--> Failed
//! ```
//!
//! What to read is described declaratively ([`StyleProbe`] and the selector
//! constants below) and handed to whichever [`PageSession`] is in use. The
//! session is closed on every exit path.

use crate::color::ColorSample;
use crate::{
    Backend, BrowserConfig, Error, LinkCandidate, NavigateOptions, PageSession, Result,
};
use log::{debug, info, warn};
use std::fmt;
use tokio::sync::oneshot;

/// Elements that usually carry a site's brand color.
pub const NAVBAR_SELECTOR: &str = "nav, header, .header, .navbar, #header, #navbar";
/// Heading-like children of the navbar.
pub const HEADER_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, .brand, .logo-text";
/// Link-like children of the navbar.
pub const ANCHOR_SELECTOR: &str = "a, .nav-link, .menu-item, li";
pub const BODY_SELECTOR: &str = "body";
pub const DESCRIPTION_SELECTOR: &str = r#"meta[name="description"]"#;
pub const FAVICON_SELECTOR: &str = r#"link[rel*="icon"]"#;

/// Title used when the document has none.
pub const DEFAULT_TITLE: &str = "Website Title";
pub const DEFAULT_BODY_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_BODY_TEXT: &str = "#D3D3D3";

/// Computed style properties the extractor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleProperty {
    BackgroundColor,
    Color,
}

impl StyleProperty {
    pub fn css_name(self) -> &'static str {
        match self {
            StyleProperty::BackgroundColor => "background-color",
            StyleProperty::Color => "color",
        }
    }
}

/// A selector chain plus the property to read from its final match.
///
/// Each selector after the first is resolved inside the previous match,
/// like chained `querySelector` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleProbe {
    pub chain: &'static [&'static str],
    pub property: StyleProperty,
}

pub const NAVBAR_BACKGROUND: StyleProbe = StyleProbe {
    chain: &[NAVBAR_SELECTOR],
    property: StyleProperty::BackgroundColor,
};
pub const HEADER_TEXT: StyleProbe = StyleProbe {
    chain: &[NAVBAR_SELECTOR, HEADER_SELECTOR],
    property: StyleProperty::Color,
};
pub const ANCHOR_TEXT: StyleProbe = StyleProbe {
    chain: &[NAVBAR_SELECTOR, ANCHOR_SELECTOR],
    property: StyleProperty::Color,
};
pub const BODY_BACKGROUND: StyleProbe = StyleProbe {
    chain: &[BODY_SELECTOR],
    property: StyleProperty::BackgroundColor,
};
pub const BODY_TEXT: StyleProbe = StyleProbe {
    chain: &[BODY_SELECTOR],
    property: StyleProperty::Color,
};

/// Everything the card needs from a page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    pub title: String,
    pub description: String,
    pub colors: ColorSample,
    pub favicon_url: String,
    /// Document URL after redirects
    pub page_url: String,
}

/// Lifecycle of a single extraction session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Launching,
    Navigating,
    ExtractingSignals,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Launching => "launching",
            SessionState::Navigating => "navigating",
            SessionState::ExtractingSignals => "extracting-signals",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(url: &str, state: SessionState) {
    debug!("session for {}: {}", url, state);
}

/// Pick the favicon among `<link rel*="icon">` candidates: the first
/// `image/png` link, else the first link whose href ends in `.png`, else the
/// first link. Candidates with an empty href are passed over.
pub fn select_favicon(links: &[LinkCandidate]) -> Option<&str> {
    fn href(l: &LinkCandidate) -> Option<&str> {
        Some(l.href.as_str()).filter(|h| !h.is_empty())
    }
    links
        .iter()
        .find(|l| l.mime_type == "image/png")
        .and_then(href)
        .or_else(|| links.iter().find(|l| l.href.ends_with(".png")).and_then(href))
        .or_else(|| links.first().and_then(href))
}

fn read_colors<S: PageSession>(session: &mut S) -> Result<ColorSample> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    Ok(ColorSample {
        navbar_background: session.computed_style(&NAVBAR_BACKGROUND)?,
        header_text: session.computed_style(&HEADER_TEXT)?,
        anchor_text: session.computed_style(&ANCHOR_TEXT)?,
        body_background_color: non_empty(session.computed_style(&BODY_BACKGROUND)?)
            .unwrap_or_else(|| DEFAULT_BODY_BACKGROUND.to_string()),
        body_text_color: non_empty(session.computed_style(&BODY_TEXT)?)
            .unwrap_or_else(|| DEFAULT_BODY_TEXT.to_string()),
    })
}

fn navigate_and_extract<S: PageSession>(
    session: &mut S,
    url: &str,
    config: &BrowserConfig,
) -> Result<PageSignals> {
    session.navigate(url, &NavigateOptions::from_config(config))?;
    enter(url, SessionState::ExtractingSignals);

    let title = session.title()?;
    let title = if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    };

    // A missing or unreadable description is not worth failing the card for.
    let description = match session.attribute(DESCRIPTION_SELECTOR, "content") {
        Ok(found) => found.unwrap_or_default(),
        Err(e) => {
            debug!("ignoring meta description error for {}: {}", url, e);
            String::new()
        }
    };

    let colors = read_colors(session)?;

    let links = session.links(FAVICON_SELECTOR)?;
    if links.is_empty() {
        return Err(Error::NoFavicon);
    }
    let favicon_url = select_favicon(&links).ok_or(Error::NoFavicon)?.to_string();
    debug!(
        "{} favicon candidates for {}; using {}",
        links.len(),
        url,
        favicon_url
    );

    Ok(PageSignals {
        title,
        description,
        colors,
        favicon_url,
        page_url: session.current_url()?,
    })
}

/// Drive an already-launched session through one navigation and close it,
/// whatever the outcome.
pub fn run_session<S: PageSession>(
    mut session: S,
    url: &str,
    config: &BrowserConfig,
) -> Result<PageSignals> {
    enter(url, SessionState::Navigating);
    let outcome = navigate_and_extract(&mut session, url, config);

    if let Err(e) = session.close() {
        warn!("failed to close session for {}: {}", url, e);
    }
    match &outcome {
        Ok(_) => enter(url, SessionState::Closed),
        Err(e) => {
            enter(url, SessionState::Failed);
            info!("extraction for {} failed: {}", url, e);
        }
    }
    outcome
}

/// Launch a `S` session and extract signals from `url`.
pub fn extract_page_signals<S: PageSession>(url: &str, config: &BrowserConfig) -> Result<PageSignals> {
    enter(url, SessionState::Launching);
    let session = S::launch(config).inspect_err(|_| enter(url, SessionState::Failed))?;
    run_session(session, url, config)
}

fn extract_with_backend(url: &str, config: &BrowserConfig, backend: Backend) -> Result<PageSignals> {
    match backend {
        #[cfg(feature = "cdp")]
        Backend::Chrome => extract_page_signals::<crate::cdp::CdpSession>(url, config),
        #[cfg(not(feature = "cdp"))]
        Backend::Chrome => Err(Error::ConfigError(
            "the Chrome backend requires the `cdp` feature".into(),
        )),
        Backend::Simple => extract_page_signals::<crate::simple::SimpleSession>(url, config),
    }
}

/// Async entry point: runs the session on a dedicated thread that owns it
/// end to end, and resolves once that thread reports back.
pub async fn extract_signals(url: &str, config: &BrowserConfig, backend: Backend) -> Result<PageSignals> {
    let (tx, rx) = oneshot::channel();
    let url = url.to_string();
    let config = config.clone();

    std::thread::Builder::new()
        .name("cardify-session".to_string())
        .spawn(move || {
            let res = extract_with_backend(&url, &config, backend);
            let _ = tx.send(res);
        })
        .map_err(|e| Error::InitializationError(format!("Failed to spawn session thread: {}", e)))?;

    rx.await
        .map_err(|e| Error::Other(format!("Session worker canceled: {}", e)))?
}
