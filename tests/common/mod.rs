//! Common test utilities

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clipscout::extract::{RenderEngine, RenderSession};
use clipscout::utils::error::RenderError;

/// Scripted reply to one render call
#[derive(Debug, Clone)]
pub enum Step {
    Value(&'static str),
    Fail(fn() -> RenderError),
}

/// Everything a fake session was asked to do
#[derive(Debug, Default)]
pub struct EngineLog {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub navigations: Vec<String>,
    pub waits: Vec<String>,
    pub evaluations: Vec<String>,
}

/// Render engine that replays scripted evaluation results
///
/// Each session pops the next script. `wait_visible` consumes a step too, so
/// a script for the field phase starts with the wait result.
#[derive(Clone, Default)]
pub struct FakeEngine {
    scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
    pub log: Arc<Mutex<EngineLog>>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            log: Arc::default(),
        }
    }

    /// Presence probe returns widget markup, field phase returns a full product
    pub fn with_product(id: &'static str, url: &'static str, nested: &'static str) -> Self {
        Self::new(vec![
            vec![Step::Value(r#"<li><img src="//i.ytimg.com/vi/abc123/default.jpg"></li>"#)],
            vec![
                Step::Value(""),
                Step::Value(id),
                Step::Value(url),
                Step::Value(nested),
            ],
        ])
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        self.log.lock().unwrap().sessions_opened += 1;
        Ok(Box::new(FakeSession {
            steps: steps.into(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSession {
    steps: VecDeque<Step>,
    log: Arc<Mutex<EngineLog>>,
}

impl FakeSession {
    fn next(&mut self) -> Result<String, RenderError> {
        match self.steps.pop_front() {
            Some(Step::Value(v)) => Ok(v.to_string()),
            Some(Step::Fail(make)) => Err(make()),
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn wait_visible(&mut self, selector: &str, _timeout: Duration) -> Result<(), RenderError> {
        self.log.lock().unwrap().waits.push(selector.to_string());
        self.next().map(|_| ())
    }

    async fn evaluate(&mut self, expression: &str) -> Result<String, RenderError> {
        self.log.lock().unwrap().evaluations.push(expression.to_string());
        self.next()
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        self.log.lock().unwrap().sessions_closed += 1;
        Ok(())
    }
}

/// Nested widget document with two thumbnails, as a script result serializes it
#[allow(dead_code)]
pub const NESTED_WIDGET: &str = r#"<body><div class=\"thumbs\"><img src=\"//i.ytimg.com/vi/abc123/hqdefault.jpg\"> <img src=\"//i.ytimg.com/vi/xyz789/hqdefault.jpg\"></div></body>"#;

/// Landing page linking to in-scope and out-of-scope pages
#[allow(dead_code)]
pub fn landing_page(base: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Shop</title><link href="{base}/style.css"></head>
<body>
  <a href="{base}/shoes/runner-x/reviews">Runner X reviews</a>
  <a href="{base}/shoes/runner-x">Runner X</a>
  <a href="https://elsewhere.test/shoes/other">Elsewhere</a>
  <a href="{base}/bags">Bags</a>
</body>
</html>"#
    )
}
