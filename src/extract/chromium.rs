//! Chromium render engine over the DevTools protocol
//!
//! One browser process serves the whole crawl. Every session gets its own
//! browser context, so cookies and storage never leak between sessions.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{RenderEngine, RenderSession};
use crate::config::BrowserConfig;
use crate::utils::error::RenderError;

/// How often visibility is re-checked while waiting
const VISIBILITY_POLL: Duration = Duration::from_millis(250);

/// Chromium-backed [`RenderEngine`]
pub struct ChromiumEngine {
    browser: Arc<Mutex<Browser>>,
    handler: JoinHandle<()>,
}

impl ChromiumEngine {
    /// Launch the browser process
    pub async fn launch(config: &BrowserConfig) -> Result<Self, RenderError> {
        tracing::info!(headless = config.headless, "Launching browser");

        let mut builder = CdpBrowserConfig::builder();
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Close the browser process
    pub async fn shutdown(self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "Browser close failed");
        }
        let _ = browser.wait().await;
        drop(browser);
        self.handler.abort();
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let browser = self.browser.lock().await;

        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(RenderError::Session)?;

        let page = browser
            .new_page(target)
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?;

        Ok(Box::new(ChromiumSession {
            browser: Arc::clone(&self.browser),
            page,
            context,
        }))
    }
}

/// A page inside its own browser context
struct ChromiumSession {
    browser: Arc<Mutex<Browser>>,
    page: Page,
    context: BrowserContextId,
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|reason| RenderError::Navigation {
                url: url.to_string(),
                reason,
            })?;

        // Raw navigate returns once the request is committed, not on load.
        self.page
            .execute(params)
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn wait_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let script = visibility_script(selector);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.page.evaluate(script.as_str()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return Ok(());
                    }
                }
                // The document may be mid-navigation; keep polling.
                Err(e) => tracing::trace!(selector, error = %e, "Visibility probe failed"),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(RenderError::VisibleTimeout {
                    selector: selector.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    async fn evaluate(&mut self, expression: &str) -> Result<String, RenderError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(evaluation_error)?;

        Ok(value_to_text(result.value()))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let ChromiumSession {
            browser,
            page,
            context,
        } = *self;

        let page_closed = page.close().await;

        browser
            .lock()
            .await
            .dispose_browser_context(context)
            .await
            .map_err(|e| RenderError::Session(e.to_string()))?;

        page_closed.map_err(|e| RenderError::Session(e.to_string()))
    }
}

fn visibility_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const el = document.querySelector({selector}); \
         if (!el) return false; \
         const style = window.getComputedStyle(el); \
         return style.display !== 'none' && style.visibility !== 'hidden' \
         && el.getClientRects().length > 0; }})()"
    )
}

fn evaluation_error(error: CdpError) -> RenderError {
    match error {
        CdpError::JavascriptException(details) => {
            let description = details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or_else(|| details.text.clone());

            if details.text.contains("Uncaught") || description.contains("Uncaught") {
                RenderError::ElementAbsent(description)
            } else {
                RenderError::Evaluation(description)
            }
        }
        other => RenderError::Evaluation(other.to_string()),
    }
}

fn value_to_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(None), "");
        assert_eq!(value_to_text(Some(&json!(null))), "");
        assert_eq!(value_to_text(Some(&json!("abc"))), "abc");
        assert_eq!(value_to_text(Some(&json!(0))), "0");
        assert_eq!(value_to_text(Some(&json!(true))), "true");
    }

    #[test]
    fn test_visibility_script_quotes_selector() {
        let script = visibility_script("#webyclip-widget-3");
        assert!(script.contains(r##"document.querySelector("#webyclip-widget-3")"##));
    }

    #[test]
    fn test_non_exception_errors_are_evaluation_failures() {
        let err = evaluation_error(CdpError::Timeout);
        assert!(matches!(err, RenderError::Evaluation(_)));
        assert!(!err.is_element_absent());
    }
}
