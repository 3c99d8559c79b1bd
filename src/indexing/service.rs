//! Indexing orchestration across all configured sites
//!
//! One full run spawns a supervisor task which spawns one task per site.
//! Each site task reconciles the site row, wipes the previous index,
//! crawls the site and indexes every discovered page. All run state lives
//! in the [`IndexingService`] instance.

use crate::config::{Config, SiteEntry};
use crate::crawler::{FetchScheduler, SiteCrawler};
use crate::indexing::indexer::{IndexError, Indexer};
use crate::lemma::Lemmatizer;
use crate::state::SiteStatus;
use crate::storage::{SharedStorage, SiteRecord, SqliteStorage, Storage, StorageResult};
use crate::url::canonical_site_url;
use crate::SumiError;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Error message written to sites interrupted by `stop_indexing`
pub const STOPPED_BY_USER: &str = "Indexing stopped by user";

/// A full run in progress
struct ActiveRun {
    generation: u64,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
}

struct ServiceInner {
    config: Arc<Config>,
    storage: SharedStorage,
    indexer: Indexer,
    crawler: SiteCrawler,
    /// The indexing-active flag; only written while `run` is locked
    active: watch::Sender<bool>,
    generation: AtomicU64,
    run: Mutex<Option<ActiveRun>>,
}

/// How a site task's page loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SiteOutcome {
    Completed,
    Stopped,
}

/// Drives full and single-page indexing
///
/// Clones share the same run state.
#[derive(Clone)]
pub struct IndexingService {
    inner: Arc<ServiceInner>,
}

impl IndexingService {
    /// Creates a service over a shared storage handle
    pub fn new(
        config: Arc<Config>,
        storage: SharedStorage,
        lemmatizer: Lemmatizer,
    ) -> Result<Self, SumiError> {
        let scheduler = FetchScheduler::new(&config.crawler)?;
        let indexer = Indexer::new(scheduler.clone(), lemmatizer, storage.clone());
        let crawler = SiteCrawler::new(scheduler, config.crawler.max_depth);
        let (active, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                storage,
                indexer,
                crawler,
                active,
                generation: AtomicU64::new(0),
                run: Mutex::new(None),
            }),
        })
    }

    /// Returns true while a full run is in progress
    pub fn is_indexing_active(&self) -> bool {
        *self.inner.active.borrow()
    }

    /// Starts a full run over every configured site
    ///
    /// Returns false if a run is already active. Must be called from within
    /// a tokio runtime.
    pub fn start_full_indexing(&self) -> bool {
        let mut slot = self.inner.run.lock();
        if *self.inner.active.borrow() {
            tracing::warn!("Indexing already in progress");
            return false;
        }
        self.inner.active.send_replace(true);

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        tracing::info!(
            "Starting full indexing run {} over {} sites",
            generation,
            self.inner.config.sites.len()
        );

        let supervisor = tokio::spawn(supervise_run(
            self.inner.clone(),
            generation,
            cancel.clone(),
        ));

        *slot = Some(ActiveRun {
            generation,
            cancel,
            supervisor,
        });
        true
    }

    /// Stops the active run
    ///
    /// Returns false if no run is active. Otherwise clears the active flag,
    /// cancels all crawl and index work, waits up to the configured grace
    /// period before aborting what is left, and moves every `Indexing` site
    /// to `Failed`.
    pub async fn stop_indexing(&self) -> bool {
        let run = {
            let mut slot = self.inner.run.lock();
            let Some(run) = slot.take() else {
                return false;
            };
            self.inner.active.send_replace(false);
            run
        };

        tracing::info!("Stopping indexing run {}", run.generation);
        run.cancel.cancel();

        let grace = Duration::from_secs(self.inner.config.crawler.shutdown_grace_secs);
        let mut supervisor = run.supervisor;
        if tokio::time::timeout(grace, &mut supervisor).await.is_err() {
            tracing::warn!("Indexing tasks did not stop within {:?}, aborting", grace);
            supervisor.abort();
        }

        match self.inner.storage.lock().fail_indexing_sites(STOPPED_BY_USER) {
            Ok(count) => tracing::info!("Marked {} sites as failed", count),
            Err(e) => tracing::error!("Failed to update site statuses after stop: {}", e),
        }

        true
    }

    /// Waits until no full run is active
    pub async fn wait_until_idle(&self) {
        let mut active = self.inner.active.subscribe();
        let _ = active.wait_for(|active| !*active).await;
    }

    /// Re-indexes a single page of a configured site
    ///
    /// Returns false if `url` is not under any configured site or the index
    /// could not be written. A page that fails to fetch is removed from the
    /// index and the call still returns true. Works whether or not a full
    /// run is active.
    pub async fn index_single_page(&self, url: &str) -> bool {
        let Some(entry) = self.inner.config.site_for_url(url) else {
            tracing::warn!("{} is outside the configured sites", url);
            return false;
        };

        let site_url = match canonical_site_url(&entry.url) {
            Ok(site_url) => site_url,
            Err(e) => {
                tracing::error!("Invalid site URL {}: {}", entry.url, e);
                return false;
            }
        };

        let site = {
            let mut storage = self.inner.storage.lock();
            match resolve_site(&mut storage, &site_url, &entry.name, SiteStatus::Indexed) {
                Ok(site) => site,
                Err(e) => {
                    tracing::error!("Error indexing single page {}: {}", url, e);
                    return false;
                }
            }
        };

        let path = crate::url::site_relative_path_or_root(url, &site.url);
        if let Err(e) = self.inner.indexer.remove_page(site.id, &path) {
            tracing::error!("Error removing page {}: {}", url, e);
            return false;
        }

        match self.inner.indexer.index_page(url, &site).await {
            Ok(page) => {
                tracing::info!("Indexed {} ({})", url, page.status);
                true
            }
            Err(e) if e.is_page_local() => {
                tracing::warn!("Could not index {}: {}", url, e);
                true
            }
            Err(e) => {
                tracing::error!("Error indexing single page {}: {}", url, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for IndexingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingService")
            .field("active", &self.is_indexing_active())
            .finish_non_exhaustive()
    }
}

/// Finds the site row for `url`, creating it with `initial_status` if absent
///
/// Duplicate rows for the same URL are deleted with their dependent data;
/// the oldest row is kept.
fn resolve_site(
    storage: &mut SqliteStorage,
    url: &str,
    name: &str,
    initial_status: SiteStatus,
) -> StorageResult<SiteRecord> {
    let mut rows = storage.find_sites_by_url(url)?.into_iter();

    let Some(site) = rows.next() else {
        let site_id = storage.insert_site(url, name, initial_status)?;
        return storage.get_site(site_id);
    };

    for duplicate in rows {
        tracing::warn!("Deleting duplicate site row {} for {}", duplicate.id, url);
        storage.delete_site(duplicate.id)?;
    }

    Ok(site)
}

/// Wipes a site's index and marks it `Indexing`
fn reset_site(storage: &mut SqliteStorage, site_id: i64) -> StorageResult<SiteRecord> {
    storage.clear_site(site_id)?;
    storage.update_site_status(site_id, SiteStatus::Indexing, None)?;
    storage.get_site(site_id)
}

/// Site error message for a failure that ends the whole site task
fn critical_message(kind: &str, detail: &dyn std::fmt::Display) -> String {
    format!("Critical error: {} - {}", kind, detail)
}

/// Writes a settled status unless the site already left `Indexing`
fn settle_site(inner: &ServiceInner, site_id: i64, status: SiteStatus, error: Option<&str>) {
    let mut storage = inner.storage.lock();
    let current = match storage.get_site(site_id) {
        Ok(site) => site.status,
        Err(e) => {
            tracing::error!("Cannot read site {}: {}", site_id, e);
            return;
        }
    };

    if !current.can_transition_to(status) {
        tracing::debug!("Site {} is {}, not moving to {}", site_id, current, status);
        return;
    }

    if let Err(e) = storage.update_site_status(site_id, status, error) {
        tracing::error!("Cannot update site {}: {}", site_id, e);
    }
}

async fn supervise_run(inner: Arc<ServiceInner>, generation: u64, cancel: CancellationToken) {
    let permits = Arc::new(Semaphore::new(
        inner.config.crawler.max_concurrent_sites.max(1) as usize,
    ));

    let mut tasks = JoinSet::new();
    for entry in inner.config.sites.iter().cloned() {
        tasks.spawn(guard_site(
            inner.clone(),
            entry,
            permits.clone(),
            cancel.child_token(),
        ));
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                tracing::error!("Site task panicked: {}", e);
            }
        }
    }

    let mut slot = inner.run.lock();
    if slot.as_ref().map_or(false, |run| run.generation == generation) {
        *slot = None;
        inner.active.send_replace(false);
        tracing::info!("Indexing run {} finished", generation);
    }
}

/// Runs one site task, failing the site if the task panics
async fn guard_site(
    inner: Arc<ServiceInner>,
    entry: SiteEntry,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    let task = AssertUnwindSafe(run_site(inner.clone(), entry.clone(), permits, cancel));
    if let Err(panic) = task.catch_unwind().await {
        let message = critical_message("Panic", &panic_detail(&*panic));
        tracing::error!("Site task for {} panicked: {}", entry.url, message);
        fail_indexing_site(&inner, &entry.url, &message);
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Moves the site stored under `url` to `Failed` if it is still `Indexing`
fn fail_indexing_site(inner: &ServiceInner, url: &str, message: &str) {
    let Ok(site_url) = canonical_site_url(url) else {
        return;
    };
    let site = inner.storage.lock().get_site_by_url(&site_url);
    match site {
        Ok(Some(site)) => settle_site(inner, site.id, SiteStatus::Failed, Some(message)),
        Ok(None) => {}
        Err(e) => tracing::error!("Cannot read site {}: {}", site_url, e),
    }
}

async fn run_site(
    inner: Arc<ServiceInner>,
    entry: SiteEntry,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
) {
    let _permit = tokio::select! {
        _ = cancel.cancelled() => return,
        permit = permits.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
    };

    let site_url = match canonical_site_url(&entry.url) {
        Ok(site_url) => site_url,
        Err(e) => {
            tracing::error!("Skipping site {}: {}", entry.url, e);
            return;
        }
    };

    let site = {
        let mut storage = inner.storage.lock();
        resolve_site(&mut storage, &site_url, &entry.name, SiteStatus::Indexing)
    };
    let site = match site {
        Ok(site) => site,
        Err(e) => {
            tracing::error!("Cannot resolve site {}: {}", site_url, e);
            return;
        }
    };

    let reset = {
        let mut storage = inner.storage.lock();
        reset_site(&mut storage, site.id)
    };
    let site = match reset {
        Ok(site) => site,
        Err(e) => {
            let e = IndexError::from(e);
            let message = critical_message(e.kind(), &e);
            tracing::error!("Cannot prepare site {}: {}", site_url, message);
            // Written unconditionally: the row may still be Indexed from an earlier run
            let updated = inner.storage.lock().update_site_status(
                site.id,
                SiteStatus::Failed,
                Some(&message),
            );
            if let Err(e) = updated {
                tracing::error!("Cannot update site {}: {}", site.id, e);
            }
            return;
        }
    };

    tracing::info!("Indexing site {} ({})", site.name, site.url);

    let outcome = index_site(&inner, &site, &cancel).await;
    let still_active = *inner.active.borrow();

    match outcome {
        Ok(SiteOutcome::Completed) if still_active => {
            settle_site(&inner, site.id, SiteStatus::Indexed, None);
            tracing::info!("Site {} indexed", site.url);
        }
        Ok(_) => tracing::info!("Indexing of {} stopped", site.url),
        Err(e) => {
            let message = critical_message(e.kind(), &e);
            tracing::error!("Site {} failed: {}", site.url, message);
            settle_site(&inner, site.id, SiteStatus::Failed, Some(&message));
        }
    }
}

async fn index_site(
    inner: &ServiceInner,
    site: &SiteRecord,
    cancel: &CancellationToken,
) -> Result<SiteOutcome, IndexError> {
    let urls = inner.crawler.crawl(&site.url, cancel.clone()).await;
    let heartbeat_every = inner.config.crawler.heartbeat_every.max(1);

    let mut indexed = 0u32;
    let mut skipped = 0u32;

    for url in urls {
        let active = *inner.active.borrow();
        if !active || cancel.is_cancelled() {
            return Ok(SiteOutcome::Stopped);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => return Ok(SiteOutcome::Stopped),
            result = inner.indexer.index_page(&url, site) => result,
        };

        match result {
            Ok(_) => {
                indexed += 1;
                if indexed % heartbeat_every == 0 {
                    inner.storage.lock().touch_site(site.id)?;
                    tracing::info!("Progress {}: {} pages indexed", site.url, indexed);
                }
            }
            Err(e) if e.is_page_local() => {
                skipped += 1;
                tracing::warn!("Skipping {}: {}", url, e);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        "Finished {}: {} pages indexed, {} skipped",
        site.url,
        indexed,
        skipped
    );
    Ok(SiteOutcome::Completed)
}
