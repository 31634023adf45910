//! Product extraction through a rendered page
//!
//! Extraction runs in two phases, each in its own fresh render session:
//!
//! 1. **Presence check** - navigate, wait a fixed settle time, read the widget's
//!    thumbnail list. An uncaught script error or an empty/`"0"` result means the
//!    page has no widget.
//! 2. **Field extraction** - navigate again, wait for the widget container to be
//!    visible, read the product id, product URL and the widget iframe's markup,
//!    then turn the markup into video links.
//!
//! The settle wait is fixed rather than content-based because the probed
//! element may legitimately never appear.

pub mod video;

#[cfg(feature = "browser")]
pub mod chromium;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::{BrowserConfig, WidgetConfig};
use crate::models::{ExtractionOutcome, ProductRecord};
use crate::utils::error::RenderError;

/// Opens isolated render sessions
#[async_trait]
pub trait RenderEngine: Send + Sync + 'static {
    /// Open a fresh session with no state shared with earlier sessions
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

#[async_trait]
impl<E: RenderEngine + ?Sized> RenderEngine for std::sync::Arc<E> {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        (**self).open_session().await
    }
}

/// One browser-driven page
#[async_trait]
pub trait RenderSession: Send {
    /// Start navigating to `url`; does not wait for the load event
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Wait until the element matching `selector` is visible
    async fn wait_visible(&mut self, selector: &str, timeout: Duration)
        -> Result<(), RenderError>;

    /// Evaluate a script expression and return its result as text
    ///
    /// Strings are returned as-is, `null`/`undefined` as an empty string and
    /// any other value in its JSON form.
    async fn evaluate(&mut self, expression: &str) -> Result<String, RenderError>;

    /// Tear the session down
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// Extraction capability used by the dispatcher
#[async_trait]
pub trait Extract: Send + Sync + 'static {
    async fn extract(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutcome, RenderError>;
}

/// Timing and selectors for one extraction
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub settle: Duration,
    pub visible_timeout: Duration,
    pub widget: WidgetConfig,
}

impl ExtractionSettings {
    pub fn from_config(browser: &BrowserConfig, widget: &WidgetConfig) -> Self {
        Self {
            settle: Duration::from_secs(browser.settle_secs),
            visible_timeout: Duration::from_secs(browser.visible_timeout_secs),
            widget: widget.clone(),
        }
    }

    fn presence_script(&self) -> String {
        format!(
            "document.getElementById('{}').innerHTML",
            self.widget.thumbnails_id
        )
    }

    fn field_script(id: &str) -> String {
        format!("document.getElementById('{id}').value")
    }

    fn container_selector(&self) -> String {
        format!("#{}", self.widget.container_id)
    }

    fn nested_document_script(&self) -> String {
        format!(
            "document.getElementById('{}').contentWindow.document.body.outerHTML",
            self.widget.container_id
        )
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default(), &WidgetConfig::default())
    }
}

/// Whether a presence capture means "no widget on this page"
#[must_use]
pub fn is_empty_capture(capture: &str) -> bool {
    capture.is_empty() || capture.eq_ignore_ascii_case("0")
}

enum Presence {
    Present,
    Absent,
    Cancelled,
}

/// Drives the two-phase extraction against a render engine
pub struct ExtractionOrchestrator<E> {
    engine: E,
    settings: ExtractionSettings,
}

impl<E: RenderEngine> ExtractionOrchestrator<E> {
    pub fn new(engine: E, settings: ExtractionSettings) -> Self {
        Self { engine, settings }
    }

    async fn check_presence(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Presence, RenderError> {
        let mut session = self.engine.open_session().await?;

        let capture = run_in_session(&mut session, cancel, |session| {
            Box::pin(async move {
                session.navigate(url).await?;
                tokio::time::sleep(self.settings.settle).await;
                session.evaluate(&self.settings.presence_script()).await
            })
        })
        .await;

        close_quietly(session, url).await;

        match capture {
            None => Ok(Presence::Cancelled),
            Some(Err(e)) if e.is_element_absent() => {
                tracing::debug!(url = %url, error = %e, "Presence probe threw; treating as absent");
                Ok(Presence::Absent)
            }
            Some(Err(e)) => Err(e),
            Some(Ok(capture)) if is_empty_capture(&capture) => Ok(Presence::Absent),
            Some(Ok(_)) => Ok(Presence::Present),
        }
    }

    async fn extract_fields(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutcome, RenderError> {
        let mut session = self.engine.open_session().await?;
        let settings = &self.settings;

        let fields = run_in_session(&mut session, cancel, |session| {
            Box::pin(async move {
                session.navigate(url).await?;
                session
                    .wait_visible(&settings.container_selector(), settings.visible_timeout)
                    .await?;
                let product_id = session
                    .evaluate(&ExtractionSettings::field_script(
                        &settings.widget.product_id_field,
                    ))
                    .await?;
                let product_url = session
                    .evaluate(&ExtractionSettings::field_script(
                        &settings.widget.product_url_field,
                    ))
                    .await?;
                let nested = session.evaluate(&settings.nested_document_script()).await?;
                Ok((product_id, product_url, nested))
            })
        })
        .await;

        close_quietly(session, url).await;

        match fields {
            None => Ok(ExtractionOutcome::Cancelled),
            Some(Ok((product_id, product_url, nested))) => {
                let links = video::parse_video_links(&nested);
                Ok(ExtractionOutcome::Record(ProductRecord::new(
                    product_id,
                    product_url,
                    links,
                )))
            }
            Some(Err(e)) if e.is_scoped() => {
                tracing::warn!(url = %url, error = %e, "Field extraction abandoned");
                Ok(ExtractionOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
            Some(Err(e)) => Err(e),
        }
    }
}

type SessionFuture<'a, T> =
    std::pin::Pin<Box<dyn Future<Output = Result<T, RenderError>> + Send + 'a>>;

/// Run `steps` against the session unless the crawl is cancelled first
async fn run_in_session<'s, T, F>(
    session: &'s mut Box<dyn RenderSession>,
    cancel: &CancellationToken,
    steps: F,
) -> Option<Result<T, RenderError>>
where
    F: FnOnce(&'s mut Box<dyn RenderSession>) -> SessionFuture<'s, T>,
{
    tokio::select! {
        _ = cancel.cancelled() => None,
        result = steps(session) => Some(result),
    }
}

async fn close_quietly(session: Box<dyn RenderSession>, url: &str) {
    if let Err(e) = session.close().await {
        tracing::debug!(url = %url, error = %e, "Session close failed");
    }
}

#[async_trait]
impl<E: RenderEngine> Extract for ExtractionOrchestrator<E> {
    async fn extract(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutcome, RenderError> {
        match self.check_presence(url, cancel).await? {
            Presence::Cancelled => return Ok(ExtractionOutcome::Cancelled),
            Presence::Absent => {
                tracing::info!(url = %url, "No widget on page");
                return Ok(ExtractionOutcome::NoWidget);
            }
            Presence::Present => {}
        }

        tracing::debug!(url = %url, "Widget present; extracting fields");
        self.extract_fields(url, cancel).await
    }
}
