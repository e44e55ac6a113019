//! Live browser session: capture, scan, draw overlays.

use eoka::{Browser, Page, StealthConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::annotate::{AnnotationLayer, Overlay};
use crate::capture::capture;
use crate::{ElementDescriptor, Error, Result, ScanReport};

/// Whether a descriptor's locators still hit the live page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorCheck {
    /// Elements the XPath resolves to (1 when fresh).
    pub xpath_matches: usize,
    /// Elements the CSS selector matches; `None` if the page rejected it.
    pub selector_matches: Option<usize>,
}

impl LocatorCheck {
    pub fn is_fresh(&self) -> bool {
        self.xpath_matches == 1 && self.selector_matches.is_some_and(|n| n >= 1)
    }
}

// Paths are rooted at the body, so they are evaluated relative to it.
const LOCATE_JS: &str = r#"
((xpath, selector) => {
    const body = document.body;
    let xpathMatches = 0;
    if (body) {
        const rel = '.' + xpath.slice('/body'.length);
        try {
            xpathMatches = document.evaluate(rel, body, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength;
        } catch (e) {}
    }
    let selectorMatches = null;
    try { selectorMatches = document.querySelectorAll(selector).length; } catch (e) {}
    return { xpath_matches: xpathMatches, selector_matches: selectorMatches };
})
"#;

/// Clear old overlays, capture the page and scan it.
///
/// `overlay` is cleared in every case and, with `highlight`, filled and drawn.
pub async fn scan_page(page: &Page, highlight: bool, overlay: &mut Overlay) -> Result<ScanReport> {
    // Old overlay nodes would otherwise shift sibling positions in the capture.
    Overlay::remove(page).await?;
    let doc = capture(page).await?;
    let report = crate::scan(&doc, &doc, highlight, overlay)?;
    if highlight {
        overlay.render(page).await?;
    }
    Ok(report)
}

/// Browser launch options exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl LaunchOptions {
    pub fn stealth(&self) -> StealthConfig {
        StealthConfig {
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            ..Default::default()
        }
    }
}

/// A browser session that owns its browser, page and overlay.
pub struct Session {
    browser: Browser,
    page: Page,
    overlay: Overlay,
    last: Option<ScanReport>,
}

impl Session {
    /// Launch a new browser with a blank page.
    pub async fn launch() -> Result<Self> {
        let browser = Browser::launch().await?;
        Self::with_browser(browser).await
    }

    /// Launch with custom stealth config (headless, viewport size, ...).
    pub async fn launch_with_config(stealth: StealthConfig) -> Result<Self> {
        let browser = Browser::launch_with_config(stealth).await?;
        Self::with_browser(browser).await
    }

    pub async fn launch_with_options(options: LaunchOptions) -> Result<Self> {
        debug!(
            "Launching browser (headless: {}, viewport: {}x{})",
            options.headless, options.viewport_width, options.viewport_height
        );
        Self::launch_with_config(options.stealth()).await
    }

    async fn with_browser(browser: Browser) -> Result<Self> {
        let page = browser.new_page("about:blank").await?;
        Ok(Self {
            browser,
            page,
            overlay: Overlay::new(),
            last: None,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        // a new document invalidates every index
        self.last = None;
        self.overlay = Overlay::new();
        Ok(())
    }

    pub async fn url(&self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    pub async fn title(&self) -> Result<String> {
        Ok(self.page.title().await?)
    }

    /// Scan the page. Each call starts from a clean slate; overlays never accumulate.
    pub async fn scan(&mut self, highlight: bool) -> Result<&ScanReport> {
        let report = scan_page(&self.page, highlight, &mut self.overlay).await?;
        debug!(
            "scan found {} elements (highlight: {})",
            report.len(),
            highlight
        );
        Ok(self.last.insert(report))
    }

    /// The report of the most recent scan, if any.
    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last.as_ref()
    }

    /// The overlay marks of the most recent scan.
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Remove overlays from the page. Safe to call any number of times.
    pub async fn clear_highlights(&mut self) -> Result<()> {
        self.overlay.clear();
        Overlay::remove(&self.page).await?;
        Ok(())
    }

    /// PNG screenshot, overlays included if drawn.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }

    /// Check an element from the last scan against the live page.
    ///
    /// Reports staleness; it does not re-scan or repair anything.
    pub async fn locate(&self, index: usize) -> Result<(ElementDescriptor, LocatorCheck)> {
        let el = self
            .last
            .as_ref()
            .and_then(|r| r.get(index))
            .cloned()
            .ok_or(Error::UnknownIndex(index))?;
        let js = format!(
            "{}({},{})",
            LOCATE_JS,
            serde_json::to_string(&el.xpath)?,
            serde_json::to_string(&el.selector)?
        );
        let check: LocatorCheck = self.page.evaluate(&js).await?;
        if !check.is_fresh() {
            warn!("[{}] {} no longer resolves cleanly: {:?}", index, el.selector, check);
        }
        Ok((el, check))
    }

    pub async fn close(self) -> Result<()> {
        Ok(self.browser.close().await?)
    }
}
