//! Chrome DevTools Protocol session (uses the `headless_chrome` crate)
//!
//! Launches a headless Chrome, opens a single tab, and answers extraction
//! probes by evaluating small scripts in the page. Every script returns a
//! JSON string so results come back through one decoding path.

use crate::extract::StyleProbe;
use crate::{BrowserConfig, Error, LinkCandidate, NavigateOptions, PageSession, Result, WaitUntil};
use headless_chrome::browser::tab::Tab;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Lets Chrome outlive a slow navigation before its idle watchdog kills it
const BROWSER_IDLE_MARGIN: Duration = Duration::from_secs(30);

/// Headless Chrome session bound to one tab.
pub struct CdpSession {
    browser: Browser,
    tab: Arc<Tab>,
    config: BrowserConfig,
}

#[derive(Debug, Deserialize)]
struct LoadProgress {
    ready: String,
    resources: usize,
}

fn is_timeout(e: &anyhow::Error) -> bool {
    e.downcast_ref::<Timeout>().is_some()
}

/// Script resolving `chain` with nested `querySelector` calls and reading
/// `property` from the final element's computed style.
fn computed_style_script(probe: &StyleProbe) -> Result<String> {
    let chain = serde_json::to_string(probe.chain)?;
    let property = serde_json::to_string(probe.property.css_name())?;
    Ok(format!(
        r#"(function() {{
            let el = document;
            for (const sel of {chain}) {{
                el = el.querySelector(sel);
                if (!el) return JSON.stringify(null);
            }}
            return JSON.stringify(getComputedStyle(el).getPropertyValue({property}));
        }})()"#
    ))
}

fn attribute_script(selector: &str, attribute: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    let attribute = serde_json::to_string(attribute)?;
    Ok(format!(
        r#"(function() {{
            const el = document.querySelector({selector});
            return JSON.stringify(el ? el.getAttribute({attribute}) : null);
        }})()"#
    ))
}

fn links_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"JSON.stringify(Array.from(document.querySelectorAll({selector})).map(l => ({{
            href: l.href || '',
            rel: l.getAttribute('rel') || '',
            type: l.getAttribute('type') || ''
        }})))"#
    ))
}

const LOAD_PROGRESS_SCRIPT: &str = r#"JSON.stringify({
    ready: document.readyState,
    resources: performance.getEntriesByType('resource').length
})"#;

impl CdpSession {
    fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::ExtractionError(format!("Evaluation failed: {}", e)))?;

        let raw = match result.value {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => return Err(Error::ExtractionError("No value returned from evaluation".into())),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Poll until the document is complete and no new resources have been
    /// requested for the configured idle window.
    fn wait_for_network_idle(&self, deadline: Instant, timeout_ms: u64) -> Result<()> {
        let idle_window = Duration::from_millis(self.config.idle_window_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(10));

        let mut last_count = None;
        let mut quiet_since = Instant::now();
        loop {
            let progress: LoadProgress = self.evaluate_json(LOAD_PROGRESS_SCRIPT)?;
            let now = Instant::now();
            if last_count != Some(progress.resources) || progress.ready != "complete" {
                last_count = Some(progress.resources);
                quiet_since = now;
            } else if now.duration_since(quiet_since) >= idle_window {
                debug!(
                    "network idle after {} resources",
                    progress.resources
                );
                return Ok(());
            }
            if now >= deadline {
                return Err(Error::Timeout(timeout_ms));
            }
            std::thread::sleep(poll);
        }
    }
}

impl PageSession for CdpSession {
    fn launch(config: &BrowserConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .idle_browser_timeout(Duration::from_millis(config.timeout_ms) + BROWSER_IDLE_MARGIN)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;

        if !config.headers.is_empty() {
            // headless_chrome expects a HashMap<&str, &str>
            let headers: std::collections::HashMap<&str, &str> = config
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();

            tab.set_extra_http_headers(headers)
                .map_err(|e| Error::InitializationError(format!("Failed to set headers: {}", e)))?;
        }

        Ok(Self {
            browser,
            tab,
            config: config.clone(),
        })
    }

    fn navigate(&mut self, url: &str, options: &NavigateOptions) -> Result<()> {
        let budget = Duration::from_millis(options.timeout_ms);
        let deadline = Instant::now() + budget;
        self.tab.set_default_timeout(budget);

        self.tab
            .navigate_to(url)
            .map_err(|e| Error::NavigationError(format!("Navigation failed: {}", e)))?;

        self.tab.wait_until_navigated().map_err(|e| {
            if is_timeout(&e) {
                Error::Timeout(options.timeout_ms)
            } else {
                Error::NavigationError(format!("Wait for navigation failed: {}", e))
            }
        })?;

        match options.wait_until {
            WaitUntil::Load => Ok(()),
            WaitUntil::NetworkIdle => self.wait_for_network_idle(deadline, options.timeout_ms),
        }
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn title(&mut self) -> Result<String> {
        self.tab
            .get_title()
            .map_err(|e| Error::ExtractionError(format!("Failed to get title: {}", e)))
    }

    fn computed_style(&mut self, probe: &StyleProbe) -> Result<Option<String>> {
        self.evaluate_json(&computed_style_script(probe)?)
    }

    fn attribute(&mut self, selector: &str, attribute: &str) -> Result<Option<String>> {
        self.evaluate_json(&attribute_script(selector, attribute)?)
    }

    fn links(&mut self, selector: &str) -> Result<Vec<LinkCandidate>> {
        self.evaluate_json(&links_script(selector)?)
    }

    fn close(self) -> Result<()> {
        if let Err(e) = self.tab.close(false) {
            warn!("Failed to close tab: {}", e);
        }
        // Dropping the browser terminates the child process
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
