//! Frontier and worker pool
//!
//! The crawl engine owns all shared crawl state: the FIFO frontier of
//! pending tasks, the visited-location set, the pending-task counter, and
//! the run statistics. N identical workers drain the frontier until the
//! pool is drained.
//!
//! Termination: the pending counter is incremented on enqueue and
//! decremented only after a dequeued task has been fully processed and all
//! of its children enqueued. The pool is drained exactly when the counter
//! reaches zero; a worker observing an empty frontier with a nonzero
//! counter waits (bounded, woken on enqueue and on drain) and re-checks.
//! A worker mid-task therefore always holds the counter above zero, so the
//! pool can never exit while children are still to come.

use crate::config::CrawlConfig;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::processor::{DiscoveredChild, PageOutcome, PageProcessor};
use crate::resolve::PathResolver;
use crate::url::location_of;
use crate::Result;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// Bounded idle wait between frontier checks; workers are normally woken
/// earlier by an enqueue or by drain
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// One pending fetch
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// Canonical URL to fetch
    pub url: Url,

    /// Save location resolved by the task's creator; absent only for the
    /// entry task, which resolves against its fetched content-type
    pub save_path: Option<PathBuf>,

    /// Whether the resource is an HTML page; HTML tasks consume depth,
    /// asset tasks are page requisites fetched at their parent's depth
    pub is_html: bool,

    /// Levels of links still allowed below this task
    pub remaining_depth: u32,
}

#[derive(Debug, Default)]
struct CrawlStats {
    pages_mirrored: AtomicU64,
    assets_mirrored: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

impl CrawlStats {
    fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            pages_mirrored: self.pages_mirrored.load(Ordering::Relaxed),
            assets_mirrored: self.assets_mirrored.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Final counts for a drained crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    /// HTML pages rewritten and saved
    pub pages_mirrored: u64,

    /// Non-HTML resources streamed to disk
    pub assets_mirrored: u64,

    /// Tasks that resolved to "do not save" or carried no content-type
    pub skipped: u64,

    /// Soft failures (transport, rewrite, filesystem)
    pub failures: u64,

    /// Tasks dropped before processing (already visited or depth exhausted)
    pub discarded: u64,
}

/// The crawl engine: shared state plus the worker pool that drains it
///
/// Constructed once per run; workers share it through an `Arc`. Nothing
/// outside the engine holds references to the frontier or visited set.
pub struct CrawlEngine {
    config: CrawlConfig,
    processor: PageProcessor,
    frontier: Mutex<VecDeque<CrawlTask>>,
    visited: Mutex<HashSet<String>>,
    pending: AtomicUsize,
    wake: Notify,
    stats: CrawlStats,
}

impl CrawlEngine {
    /// Creates an engine for the configured crawl
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;

        let client = build_http_client()?;
        let resolver = PathResolver::new(
            &config.base_url,
            &config.internal_root(),
            &config.external_root(),
        );

        Ok(Self {
            processor: PageProcessor::new(client, resolver),
            config,
            frontier: Mutex::new(VecDeque::new()),
            visited: Mutex::new(HashSet::new()),
            pending: AtomicUsize::new(0),
            wake: Notify::new(),
            stats: CrawlStats::default(),
        })
    }

    /// Runs the crawl to drain and returns the final counts
    pub async fn run(self: Arc<Self>) -> Result<CrawlSummary> {
        tracing::info!(
            entry = %self.config.entry_url,
            base = %self.config.base_url,
            workers = self.config.workers,
            max_depth = self.config.max_depth,
            "starting crawl"
        );

        self.enqueue(CrawlTask {
            url: self.config.entry_url.clone(),
            save_path: None,
            is_html: true,
            remaining_depth: self.config.max_depth,
        });

        let workers: Vec<_> = (0..self.config.workers)
            .map(|worker_id| {
                let engine = Arc::clone(&self);
                tokio::spawn(async move { engine.worker_loop(worker_id).await })
            })
            .collect();

        for worker in workers {
            worker.await?;
        }

        let summary = self.stats.summary();
        tracing::info!(
            pages = summary.pages_mirrored,
            assets = summary.assets_mirrored,
            skipped = summary.skipped,
            failures = summary.failures,
            "crawl drained"
        );
        Ok(summary)
    }

    /// Adds a task to the frontier and wakes an idle worker
    fn enqueue(&self, task: CrawlTask) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.frontier.lock().unwrap().push_back(task);
        self.wake.notify_one();
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            let task = self.frontier.lock().unwrap().pop_front();

            let Some(task) = task else {
                if self.pending.load(Ordering::SeqCst) == 0 {
                    break;
                }
                // Another worker is still expanding a task; wait for new
                // work or for drain.
                let _ = tokio::time::timeout(IDLE_WAIT, self.wake.notified()).await;
                continue;
            };

            self.run_task(task, worker_id).await;

            // The task is fully expanded; if it was the last pending one,
            // the pool is drained.
            if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.wake.notify_waiters();
                break;
            }
        }
        tracing::debug!(worker_id, "worker idle, pool drained");
    }

    async fn run_task(&self, task: CrawlTask, worker_id: usize) {
        if task.remaining_depth == 0 {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        // At-most-once processing: the location is claimed exactly when the
        // task is accepted, never at enqueue time.
        let location = location_of(&task.url);
        if !self.visited.lock().unwrap().insert(location) {
            tracing::trace!(url = %task.url, "already visited");
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        tracing::debug!(
            worker_id,
            url = %task.url,
            depth = task.remaining_depth,
            "processing"
        );

        match self
            .processor
            .process(&task.url, task.save_path.as_deref())
            .await
        {
            PageOutcome::SavedHtml { children } => {
                self.stats.pages_mirrored.fetch_add(1, Ordering::Relaxed);
                for child in children {
                    self.enqueue_child(&task, child);
                }
            }
            PageOutcome::SavedAsset => {
                self.stats.assets_mirrored.fetch_add(1, Ordering::Relaxed);
            }
            PageOutcome::Skipped => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            PageOutcome::Failed => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Enqueues a discovered child under the parent's depth budget
    ///
    /// HTML children descend the link graph and consume one level; asset
    /// children are requisites of an already-mirrored page and are fetched
    /// at the parent's depth (they cannot expand the crawl).
    fn enqueue_child(&self, parent: &CrawlTask, child: DiscoveredChild) {
        let remaining_depth = if child.is_html {
            parent.remaining_depth - 1
        } else {
            parent.remaining_depth
        };

        if child.is_html && remaining_depth == 0 {
            tracing::trace!(url = %child.url, "depth exhausted, left as discovered");
            return;
        }

        self.enqueue(CrawlTask {
            url: child.url,
            save_path: Some(child.save_path),
            is_html: child.is_html,
            remaining_depth,
        });
    }

    #[cfg(test)]
    fn frontier_size(&self) -> usize {
        self.frontier.lock().unwrap().len()
    }
}
