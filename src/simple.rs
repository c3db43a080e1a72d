//! A lightweight, browser-less session that fetches HTML and reads it.
//!
//! This session performs an HTTP GET and parses the document with
//! `scraper`. No JavaScript runs and no stylesheets are applied: computed
//! styles are approximated from inline `style` attributes, with `color`
//! inherited from ancestors as CSS would.

use crate::color::{is_paintable, parse_css_color};
use crate::extract::{StyleProbe, StyleProperty};
use crate::{BrowserConfig, Error, LinkCandidate, NavigateOptions, PageSession, Result};
use log::debug;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use url::Url;

/// HTTP + HTML session. Holds the last loaded document.
pub struct SimpleSession {
    client: Client,
    config: BrowserConfig,
    document: Option<Html>,
    page_url: Option<Url>,
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::ExtractionError(format!("Invalid selector '{}': {:?}", selector, e)))
}

/// Declarations of an inline `style` attribute; later declarations win.
fn inline_declaration(style: &str, property: &str) -> Option<String> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value)
                .to_string()
        })
        .filter(|value| !value.is_empty())
        .last()
}

/// Split a shorthand value on whitespace outside parentheses.
fn split_components(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&value[s..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        parts.push(&value[s..]);
    }
    parts
}

/// Serialize a CSS color the way `getComputedStyle` reports it:
/// `rgb(r, g, b)` when opaque, `rgba(r, g, b, a)` otherwise.
fn computed_color(value: &str) -> Option<String> {
    let [r, g, b, a] = parse_css_color(value)?.0;
    if a == 255 {
        return Some(format!("rgb({}, {}, {})", r, g, b));
    }
    let alpha = (a as f32 / 255.0 * 100.0).round() / 100.0;
    Some(format!("rgba({}, {}, {}, {})", r, g, b, alpha))
}

fn inline_style<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    el.value().attr("style")
}

fn background_color(el: &ElementRef<'_>) -> Option<String> {
    let style = inline_style(el)?;
    let longhand = inline_declaration(style, "background-color");
    let shorthand = inline_declaration(style, "background").and_then(|bg| {
        split_components(&bg)
            .into_iter()
            .find(|c| is_paintable(c))
            .map(str::to_string)
    });
    // whichever comes last in the declaration block wins
    match (longhand, shorthand) {
        (Some(l), Some(s)) => {
            let l_pos = style.rfind("background-color");
            let s_pos = style.rfind("background:").or_else(|| style.rfind("background :"));
            if s_pos > l_pos {
                Some(s)
            } else {
                Some(l)
            }
        }
        (l, s) => l.or(s),
    }
}

fn inherited_color(el: &ElementRef<'_>) -> Option<String> {
    std::iter::once(*el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find_map(|e| inline_style(&e).and_then(|s| inline_declaration(s, "color")))
}

impl SimpleSession {
    fn document(&self) -> Result<&Html> {
        self.document
            .as_ref()
            .ok_or_else(|| Error::ExtractionError("No document loaded".into()))
    }
}

impl PageSession for SimpleSession {
    fn launch(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            document: None,
            page_url: None,
        })
    }

    fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<()> {
        let mut request = self
            .client
            .get(url)
            .timeout(Duration::from_millis(options.timeout_ms));
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                Error::Timeout(options.timeout_ms)
            } else {
                Error::NavigationError(format!("HTTP GET failed: {}", e))
            }
        };
        let res = request.send().and_then(|r| r.error_for_status()).map_err(map_err)?;
        let final_url = res.url().clone();
        let body = res.text().map_err(map_err)?;

        debug!("fetched {} bytes from {}", body.len(), final_url);
        self.document = Some(Html::parse_document(&body));
        self.page_url = Some(final_url);
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        self.page_url
            .as_ref()
            .map(Url::to_string)
            .ok_or_else(|| Error::ExtractionError("No document loaded".into()))
    }

    fn title(&mut self) -> Result<String> {
        let title_sel = parse_selector("title")?;
        Ok(self
            .document()?
            .select(&title_sel)
            .next()
            .map(|n| n.text().collect::<String>())
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default())
    }

    fn computed_style(&mut self, probe: &StyleProbe) -> Result<Option<String>> {
        let document = self.document()?;
        let mut selectors = probe.chain.iter();
        let Some(first) = selectors.next() else {
            return Ok(None);
        };
        let Some(mut el) = document.select(&parse_selector(first)?).next() else {
            return Ok(None);
        };
        for selector in selectors {
            match el.select(&parse_selector(selector)?).next() {
                Some(child) => el = child,
                None => return Ok(None),
            }
        }

        let declared = match probe.property {
            StyleProperty::Color => inherited_color(&el),
            StyleProperty::BackgroundColor => background_color(&el),
        };
        Ok(declared.and_then(|value| computed_color(&value)))
    }

    fn attribute(&mut self, selector: &str, attribute: &str) -> Result<Option<String>> {
        let sel = parse_selector(selector)?;
        Ok(self
            .document()?
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attribute))
            .map(str::to_string))
    }

    fn links(&mut self, selector: &str) -> Result<Vec<LinkCandidate>> {
        let sel = parse_selector(selector)?;
        let base = self.page_url.as_ref();
        Ok(self
            .document()?
            .select(&sel)
            .map(|el| {
                let attr = |name: &str| el.value().attr(name).unwrap_or_default().to_string();
                let raw = attr("href");
                // resolve like `HTMLLinkElement.href`
                let href = match base.map(|b| b.join(&raw)) {
                    Some(Ok(abs)) if !raw.is_empty() => abs.to_string(),
                    _ => raw,
                };
                LinkCandidate {
                    href,
                    rel: attr("rel"),
                    mime_type: attr("type"),
                }
            })
            .collect())
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
