use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use eoka_scan::{LaunchOptions, Session};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NavigateRequest {
    #[schemars(description = "URL to navigate to")]
    pub url: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScanRequest {
    #[schemars(description = "Draw numbered boxes over each element on the page")]
    #[serde(default)]
    pub highlight: bool,
    #[schemars(description = "Return a compact one-line-per-element list instead of JSON")]
    #[serde(default)]
    pub list: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LocateRequest {
    #[schemars(description = "Element index from the last scan")]
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn err(e: impl std::fmt::Display) -> ErrorData {
    ErrorData::internal_error(e.to_string(), None::<Value>)
}

fn text_ok(s: impl Into<String>) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(s.into())]))
}

fn no_page() -> ErrorData {
    ErrorData::internal_error("No page open. Use navigate first.", None::<Value>)
}

#[derive(Clone)]
pub struct ScanServer {
    session: Arc<Mutex<Option<Session>>>,
    launch: LaunchOptions,
    tool_router: ToolRouter<Self>,
}

impl ScanServer {
    async fn ensure_session(&self) -> Result<(), ErrorData> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let session = Session::launch_with_options(self.launch)
                .await
                .map_err(err)?;
            *guard = Some(session);
        }
        Ok(())
    }
}

#[tool_router]
impl ScanServer {
    pub fn new(launch: LaunchOptions) -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            launch,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Navigate to a URL. Launches browser on first call.")]
    async fn navigate(
        &self,
        req: Parameters<NavigateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        self.ensure_session().await?;
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_page)?;
        session.goto(&req.0.url).await.map_err(err)?;
        let url = session.url().await.map_err(err)?;
        let title = session.title().await.map_err(err)?;
        text_ok(format!("Navigated to: {}\nTitle: {}", url, title))
    }

    #[tool(
        description = "Scan the page for elements that can be clicked or typed into right now (visible, fully in the viewport). Returns the report as JSON with an index, XPath and CSS selector per element. Indices are only valid until the next scan."
    )]
    async fn scan(&self, req: Parameters<ScanRequest>) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_page)?;
        let report = session.scan(req.0.highlight).await.map_err(err)?;
        if req.0.list {
            let list = report.element_list();
            return text_ok(if list.is_empty() {
                "No interactive elements found.".into()
            } else {
                list
            });
        }
        let json = serde_json::to_string_pretty(report).map_err(err)?;
        text_ok(json)
    }

    #[tool(description = "Remove the numbered boxes drawn by scan.")]
    async fn clear_highlights(&self) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(no_page)?;
        session.clear_highlights().await.map_err(err)?;
        text_ok("Highlights cleared.")
    }

    #[tool(
        description = "Check whether an element from the last scan still resolves in the live page, by XPath and by CSS selector."
    )]
    async fn locate(&self, req: Parameters<LocateRequest>) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let (el, check) = session.locate(req.0.index).await.map_err(err)?;
        let state = if check.is_fresh() { "fresh" } else { "stale" };
        let selector = check
            .selector_matches
            .map(|n| n.to_string())
            .unwrap_or_else(|| "invalid".into());
        text_ok(format!(
            "{}\n  xpath {} -> {} match(es)\n  selector {} -> {}\n  {}",
            el, el.xpath, check.xpath_matches, el.selector, selector, state
        ))
    }

    #[tool(
        description = "Take a screenshot of the page, including any highlight boxes. Returns base64 PNG image."
    )]
    async fn screenshot(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let png = session.screenshot().await.map_err(err)?;
        let marks = session.overlay().len();
        let b64 = BASE64.encode(&png);
        Ok(CallToolResult::success(vec![
            Content::image(b64, "image/png"),
            Content::text(format!("{} highlighted elements.", marks)),
        ]))
    }

    #[tool(description = "Get the current page URL and title.")]
    async fn page_info(&self) -> Result<CallToolResult, ErrorData> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or_else(no_page)?;
        let url = session.url().await.map_err(err)?;
        let title = session.title().await.map_err(err)?;
        text_ok(format!("URL: {}\nTitle: {}", url, title))
    }

    #[tool(description = "Close the browser and release resources.")]
    async fn close(&self) -> Result<CallToolResult, ErrorData> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            session.close().await.map_err(err)?;
        }
        text_ok("Browser closed.")
    }
}

#[tool_handler]
impl ServerHandler for ScanServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "eoka-scan".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Interactive element scanner. Use 'navigate' to open a URL (launches browser automatically), \
                 then 'scan' to list what can be clicked or typed into, each with an index, XPath and CSS selector. \
                 'scan' with highlight draws the indices on the page; 'screenshot' shows them. \
                 'locate' checks whether an earlier result still resolves."
                    .into(),
            ),
        }
    }
}

pub async fn run_server(launch: LaunchOptions) -> anyhow::Result<()> {
    use rmcp::ServiceExt;

    let server = ScanServer::new(launch);
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
