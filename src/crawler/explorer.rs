//! Link discovery over raw page markup
//!
//! The explorer fetches a page and streams its body through `lol_html`, forwarding
//! every in-scope `<a href>` to the dispatcher as soon as the tag is tokenized.
//! Discovery runs on a fixed pool of workers fed by a bounded queue:
//!
//! ```text
//!  Dispatcher ──explore queue (bounded)──▶ worker 0..N ──fetch + tokenize──┐
//!      ▲                                                                    │
//!      └───────────────────── inbox (unbounded) ◀───────────────────────────┘
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use lol_html::errors::RewritingError;
use lol_html::{element, send, OutputSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::url::LinkScope;
use crate::metrics::CrawlMetrics;
use crate::utils::error::FetchError;

/// Link discovery capability used by the dispatcher
#[async_trait]
pub trait Explore: Send + Sync + 'static {
    /// Discover links on `url` and push them into `links`
    ///
    /// Returns the number of links forwarded.
    async fn explore(
        &self,
        url: &str,
        links: &mpsc::UnboundedSender<String>,
        cancel: &CancellationToken,
    ) -> Result<usize, FetchError>;
}

struct NoopSink;

impl OutputSink for NoopSink {
    fn handle_chunk(&mut self, _chunk: &[u8]) {}
}

/// Incremental anchor tokenizer
///
/// Feed it markup in arbitrary chunks; `on_href` runs for every anchor `href`
/// as soon as its start tag is complete. Character references in the value are
/// decoded first.
pub struct LinkTokenizer {
    rewriter: send::HtmlRewriter<'static, NoopSink>,
}

impl LinkTokenizer {
    pub fn new<F>(mut on_href: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        let handler = element!("a[href]", move |el| {
            if let Some(href) = el.get_attribute("href") {
                on_href(&*html_escape::decode_html_entities(href.trim()));
            }
            Ok(())
        });

        let rewriter = send::HtmlRewriter::new(
            send::Settings {
                element_content_handlers: vec![handler],
                ..send::Settings::new_send()
            },
            NoopSink,
        );

        Self { rewriter }
    }

    /// Tokenize the next chunk of markup
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RewritingError> {
        self.rewriter.write(chunk)
    }

    /// Flush any buffered markup at end of stream
    pub fn end(self) -> Result<(), RewritingError> {
        self.rewriter.end()
    }
}

/// Fetches pages and forwards in-scope links
pub struct PageExplorer {
    fetcher: PageFetcher,
    scope: LinkScope,
}

impl PageExplorer {
    pub fn new(fetcher: PageFetcher, scope: LinkScope) -> Self {
        Self { fetcher, scope }
    }
}

#[async_trait]
impl Explore for PageExplorer {
    async fn explore(
        &self,
        url: &str,
        links: &mpsc::UnboundedSender<String>,
        cancel: &CancellationToken,
    ) -> Result<usize, FetchError> {
        tracing::info!(url = %url, "Visiting");

        let response = self.fetcher.fetch(url).await?;

        let forwarded = Arc::new(AtomicUsize::new(0));
        let mut tokenizer = {
            let scope = self.scope.clone();
            let links = links.clone();
            let forwarded = Arc::clone(&forwarded);
            LinkTokenizer::new(move |href| {
                if let Some(normalized) = scope.accept(href) {
                    // A closed inbox means the crawl is over; nothing left to feed.
                    if links.send(normalized).is_ok() {
                        forwarded.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        };

        let mut body = response.bytes_stream();
        let mut complete = true;
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    complete = false;
                    break;
                }
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    if let Err(e) = tokenizer.write(&bytes) {
                        tracing::debug!(url = %url, error = %e, "Tokenizer stopped early");
                        complete = false;
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(url = %url, error = %e, "Body stream ended early");
                    complete = false;
                    break;
                }
                None => break,
            }
        }

        if complete {
            if let Err(e) = tokenizer.end() {
                tracing::debug!(url = %url, error = %e, "Tokenizer failed at end of stream");
            }
        }

        Ok(forwarded.load(Ordering::Relaxed))
    }
}

/// Fixed-size pool of discovery workers
pub struct ExplorerPool {
    queue: mpsc::Sender<String>,
    handles: Vec<JoinHandle<()>>,
}

impl ExplorerPool {
    /// Spawn `workers` tasks pulling URLs from a queue of `capacity`
    pub fn spawn<E: Explore>(
        explorer: Arc<E>,
        workers: usize,
        capacity: usize,
        inbox: mpsc::UnboundedSender<String>,
        metrics: Arc<CrawlMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        let (queue, rx) = mpsc::channel::<String>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let explorer = Arc::clone(&explorer);
            let inbox = inbox.clone();
            let metrics = Arc::clone(&metrics);
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                loop {
                    let url = tokio::select! {
                        _ = cancel.cancelled() => break,
                        url = async { rx.lock().await.recv().await } => url,
                    };

                    let Some(url) = url else { break };

                    metrics.explorer_started();
                    let explored = tokio::select! {
                        _ = cancel.cancelled() => {
                            metrics.explorer_finished();
                            break;
                        }
                        explored = explorer.explore(&url, &inbox, &cancel) => explored,
                    };
                    match explored {
                        Ok(found) => {
                            metrics.record_links(found as u64);
                            tracing::debug!(worker_id, url = %url, links = found, "Explored page");
                        }
                        Err(e) => {
                            metrics.record_fetch_failure();
                            tracing::warn!(worker_id, url = %url, error = %e, "Fetch failed");
                        }
                    }
                    metrics.explorer_finished();
                }

                tracing::debug!(worker_id, "Explorer worker shutting down");
            });

            handles.push(handle);
        }

        Self { queue, handles }
    }

    /// Queue a URL for discovery, waiting while the queue is full
    ///
    /// Returns `false` once the pool has shut down.
    pub async fn submit(&self, url: String) -> bool {
        self.queue.send(url).await.is_ok()
    }

    /// Close the queue and wait for the workers to exit
    pub async fn shutdown(self) {
        drop(self.queue);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
