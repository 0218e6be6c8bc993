//! Vector index adapter
//!
//! Owns the embedding model and the vector store. Both are created lazily on
//! first use behind a single mutex, so concurrent first calls load the model
//! exactly once. A failed load is not retried until a cooldown has passed.
//!
//! Timed queries go through one long-lived worker thread with a bounded
//! queue. A caller that times out leaves its job behind; the worker drops
//! jobs whose deadline has passed instead of running them.

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::embedder::{create_embedder, Embedder};
use super::engine::{SemanticRanker, SemanticSignal};
use super::vectordb::{DocumentMetadata, IndexStats, IndexedDocument, VectorDB};
use crate::core::config::IndexConfig;
use crate::core::error::Error;
use crate::core::resource::Resource;

/// Upper bound on neighbours returned by a query
pub const MAX_RESULTS: usize = 5;

/// Default wait before retrying a failed model or store load
pub const DEFAULT_INIT_COOLDOWN: Duration = Duration::from_secs(30);

/// Pending timed queries; further queries are refused while full
const QUERY_QUEUE_DEPTH: usize = 8;

/// Builds the embedder on first use
pub type EmbedderFactory = Box<dyn Fn() -> Result<Box<dyn Embedder>> + Send + Sync>;

/// Where the vector store lives
#[derive(Debug, Clone)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Indexing statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexingStats {
    pub indexed: usize,
    pub skipped: usize,
    /// Stale documents deleted because their id is no longer loaded
    pub removed: usize,
    pub duration_ms: u128,
}

struct Backend {
    embedder: Box<dyn Embedder>,
    db: VectorDB,
}

enum BackendState {
    Empty,
    Ready(Backend),
    Failed { at: Instant, reason: String },
}

struct Inner {
    factory: EmbedderFactory,
    location: StoreLocation,
    top_n: usize,
    init_cooldown_ms: AtomicU64,
    backend: Mutex<BackendState>,
}

impl Inner {
    fn initialize(&self) -> Result<Backend> {
        let start = Instant::now();
        let embedder = (self.factory)()?;
        let db = match &self.location {
            StoreLocation::File(path) => VectorDB::open(path, embedder.dimension())?,
            StoreLocation::Memory => VectorDB::open_in_memory(embedder.dimension())?,
        };

        info!(
            embedder = embedder.name(),
            dimension = embedder.dimension(),
            documents = db.count()?,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Vector index ready"
        );
        Ok(Backend { embedder, db })
    }

    fn init_cooldown(&self) -> Duration {
        Duration::from_millis(self.init_cooldown_ms.load(Ordering::Relaxed))
    }

    /// Run `f` against the backend, initializing it first if needed.
    /// Within the cooldown after a failed initialization, fails without
    /// calling the factory.
    fn with_backend<T>(&self, f: impl FnOnce(&Backend) -> Result<T>) -> Result<T> {
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| Error::AdapterUnavailable("lock poisoned".to_string()))?;

        if let BackendState::Failed { at, reason } = &*guard {
            if at.elapsed() < self.init_cooldown() {
                return Err(Error::AdapterUnavailable(format!(
                    "initialization failed {}ms ago: {}",
                    at.elapsed().as_millis(),
                    reason
                ))
                .into());
            }
        }

        if !matches!(*guard, BackendState::Ready(_)) {
            match self.initialize() {
                Ok(backend) => *guard = BackendState::Ready(backend),
                Err(e) => {
                    *guard = BackendState::Failed {
                        at: Instant::now(),
                        reason: format!("{:#}", e),
                    };
                    return Err(e);
                }
            }
        }

        let BackendState::Ready(backend) = &*guard else {
            return Err(anyhow!("vector index not initialized"));
        };
        f(backend)
    }

    fn query(&self, text: &str) -> Result<Vec<DocumentMetadata>> {
        self.with_backend(|backend| {
            let embedding = backend.embedder.embed(text)?;
            let results = backend.db.search(&embedding, self.top_n)?;
            Ok(results.into_iter().map(|(metadata, _)| metadata).collect())
        })
    }
}

struct QueryJob {
    text: String,
    deadline: Instant,
    reply: mpsc::Sender<Result<Vec<DocumentMetadata>>>,
}

/// Handle to the query worker. Dropping the last handle closes the queue,
/// which ends the worker thread.
#[derive(Default)]
struct QueryWorker {
    jobs: Mutex<Option<SyncSender<QueryJob>>>,
}

impl QueryWorker {
    fn submit(&self, inner: &Arc<Inner>, job: QueryJob) -> Result<()> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| Error::AdapterUnavailable("lock poisoned".to_string()))?;

        let sender = match jobs.as_ref() {
            Some(sender) => sender.clone(),
            None => {
                let sender = spawn_worker(Arc::clone(inner))?;
                *jobs = Some(sender.clone());
                sender
            }
        };

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Err(Error::AdapterUnavailable("query queue full".to_string()).into())
            }
            Err(TrySendError::Disconnected(_)) => {
                *jobs = None;
                Err(Error::AdapterUnavailable("query worker exited".to_string()).into())
            }
        }
    }
}

fn spawn_worker(inner: Arc<Inner>) -> Result<SyncSender<QueryJob>> {
    let (tx, rx) = mpsc::sync_channel::<QueryJob>(QUERY_QUEUE_DEPTH);
    std::thread::Builder::new()
        .name("vector-query".to_string())
        .spawn(move || {
            for job in rx {
                if Instant::now() >= job.deadline {
                    debug!("Dropping expired vector query");
                    continue;
                }
                let _ = job.reply.send(inner.query(&job.text));
            }
            debug!("Vector query worker stopped");
        })?;
    Ok(tx)
}

/// Text-embedding index of resources, shared across requests
#[derive(Clone)]
pub struct VectorIndex {
    inner: Arc<Inner>,
    worker: Arc<QueryWorker>,
    timeout: Duration,
}

impl VectorIndex {
    /// Index backed by the configured embedder and on-disk store
    pub fn from_config(config: &IndexConfig) -> Self {
        let embedder_config = config.clone();
        Self::with_factory(
            Box::new(move || create_embedder(&embedder_config)),
            StoreLocation::File(config.paths().db),
            config.top_n,
            Duration::from_millis(config.query_timeout_ms),
        )
        .with_init_cooldown(Duration::from_secs(config.init_retry_secs))
    }

    /// A zero `timeout` runs queries inline without a bound. `top_n` is
    /// capped at [`MAX_RESULTS`].
    pub fn with_factory(
        factory: EmbedderFactory,
        location: StoreLocation,
        top_n: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                location,
                top_n: top_n.min(MAX_RESULTS),
                init_cooldown_ms: AtomicU64::new(DEFAULT_INIT_COOLDOWN.as_millis() as u64),
                backend: Mutex::new(BackendState::Empty),
            }),
            worker: Arc::new(QueryWorker::default()),
            timeout,
        }
    }

    /// Wait this long after a failed load before trying again
    pub fn with_init_cooldown(self, cooldown: Duration) -> Self {
        self.inner
            .init_cooldown_ms
            .store(cooldown.as_millis() as u64, Ordering::Relaxed);
        self
    }

    /// Whether the model and store have been loaded
    pub fn is_ready(&self) -> bool {
        self.inner
            .backend
            .lock()
            .map(|guard| matches!(*guard, BackendState::Ready(_)))
            .unwrap_or(false)
    }

    /// Replace the index contents with `resources`: every resource with
    /// non-empty text is embedded and upserted, and documents whose id is
    /// not among `resources` are deleted.
    pub fn index(&self, resources: &[Resource]) -> Result<IndexingStats> {
        let start = Instant::now();

        let documents: Vec<IndexedDocument> = resources
            .iter()
            .filter_map(IndexedDocument::from_resource)
            .collect();
        let skipped = resources.len() - documents.len();
        let live: HashSet<i64> = documents.iter().map(|d| d.id).collect();

        let removed = self.inner.with_backend(|backend| {
            if !documents.is_empty() {
                let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
                let embeddings = backend.embedder.embed_batch(&texts)?;

                for (doc, embedding) in documents.iter().zip(&embeddings) {
                    backend.db.upsert(doc, embedding)?;
                }
            }
            let removed = backend.db.retain(&live)?;
            backend.db.set_meta(
                "last_full_index",
                &chrono::Utc::now().timestamp().to_string(),
            )?;
            Ok(removed)
        })?;

        let stats = IndexingStats {
            indexed: documents.len(),
            skipped,
            removed,
            duration_ms: start.elapsed().as_millis(),
        };
        info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            removed = stats.removed,
            duration_ms = stats.duration_ms as u64,
            "Indexed resources"
        );
        Ok(stats)
    }

    /// Nearest documents to `text`, best first. Blank text never touches
    /// the index.
    pub fn query(&self, text: &str) -> Result<Vec<DocumentMetadata>> {
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        if self.timeout.is_zero() {
            return self.inner.query(text);
        }

        let (reply, rx) = mpsc::channel();
        self.worker.submit(
            &self.inner,
            QueryJob {
                text: text.to_string(),
                deadline: Instant::now() + self.timeout,
                reply,
            },
        )?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::AdapterUnavailable(format!(
                "query timed out after {}ms",
                self.timeout.as_millis()
            ))
            .into()),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::AdapterUnavailable("query dropped by worker".to_string()).into())
            }
        }
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.inner.with_backend(|backend| backend.db.get_stats())
    }
}

impl SemanticRanker for VectorIndex {
    fn rank(&self, text: &str) -> SemanticSignal {
        match self.query(text) {
            Ok(results) => {
                let ids: Vec<i64> = results.iter().map(|m| m.id).collect();
                debug!(query = text, ?ids, "Semantic ranking");
                SemanticSignal::Ranked(ids)
            }
            Err(e) => {
                warn!("Semantic ranking unavailable: {:#}", e);
                SemanticSignal::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::seed_resources;
    use crate::search::embedder::HashEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn hash_index() -> VectorIndex {
        VectorIndex::with_factory(
            Box::new(|| Ok(Box::new(HashEmbedder::new()) as Box<dyn Embedder>)),
            StoreLocation::Memory,
            5,
            Duration::ZERO,
        )
    }

    struct SlowEmbedder;

    impl Embedder for SlowEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![1.0, 0.0])
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_index_and_query() {
        let index = hash_index();
        let stats = index.index(&seed_resources()).unwrap();
        assert_eq!(stats.indexed, 5);
        assert_eq!(stats.skipped, 0);

        let results = index.query("Transition-age youth").unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 5);
        assert_eq!(results[0].id, 3);
        assert_eq!(results[0].name, "Resource Three");
    }

    #[test]
    fn test_empty_query_does_not_initialize() {
        let index = hash_index();
        assert!(index.query("").unwrap().is_empty());
        assert!(!index.is_ready());
    }

    #[test]
    fn test_reindex_overwrites() {
        let index = hash_index();
        index.index(&seed_resources()).unwrap();
        index.index(&seed_resources()).unwrap();
        assert_eq!(index.stats().unwrap().document_count, 5);
        assert!(index.stats().unwrap().last_indexed.is_some());
    }

    #[test]
    fn test_skips_records_without_text() {
        let mut resources = seed_resources();
        resources[1].name = String::new();
        resources[1].description = None;
        resources[1].eligibility = None;

        let index = hash_index();
        let stats = index.index(&resources).unwrap();
        assert_eq!(stats.indexed, 4);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_concurrent_first_use_initializes_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let index = VectorIndex::with_factory(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                Ok(Box::new(HashEmbedder::new()) as Box<dyn Embedder>)
            }),
            StoreLocation::Memory,
            5,
            Duration::ZERO,
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = index.clone();
                std::thread::spawn(move || index.query("housing").unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(index.is_ready());
    }

    #[test]
    fn test_failed_model_load_is_unavailable() {
        let index = VectorIndex::with_factory(
            Box::new(|| Err(anyhow!("model download failed"))),
            StoreLocation::Memory,
            5,
            Duration::ZERO,
        );

        assert!(index.query("housing").is_err());
        assert_eq!(index.rank("housing"), SemanticSignal::Unavailable);
        assert!(!index.is_ready());
    }

    #[test]
    fn test_query_timeout_is_unavailable() {
        let index = VectorIndex::with_factory(
            Box::new(|| Ok(Box::new(SlowEmbedder) as Box<dyn Embedder>)),
            StoreLocation::Memory,
            5,
            Duration::from_millis(20),
        );

        let err = index.query("anything").unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(index.rank("anything"), SemanticSignal::Unavailable);
    }

    #[test]
    fn test_persistent_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = IndexConfig {
            dir: dir.path().to_path_buf(),
            embedder: crate::core::config::EmbedderKind::Hash,
            query_timeout_ms: 0,
            ..Default::default()
        };

        VectorIndex::from_config(&config)
            .index(&seed_resources())
            .unwrap();

        let reopened = VectorIndex::from_config(&config);
        assert_eq!(reopened.stats().unwrap().document_count, 5);
        assert_eq!(reopened.query("Fifth").unwrap()[0].id, 5);
    }

    #[test]
    fn test_failed_load_waits_for_cooldown() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let index = VectorIndex::with_factory(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("model download failed"))
            }),
            StoreLocation::Memory,
            5,
            Duration::ZERO,
        );

        for _ in 0..5 {
            assert_eq!(index.rank("housing"), SemanticSignal::Unavailable);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let index = index.with_init_cooldown(Duration::ZERO);
        assert_eq!(index.rank("housing"), SemanticSignal::Unavailable);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timed_out_searches_share_one_slow_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let index = VectorIndex::with_factory(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
                Err(anyhow!("model download failed"))
            }),
            StoreLocation::Memory,
            5,
            Duration::from_millis(10),
        );

        for _ in 0..10 {
            assert_eq!(index.rank("housing"), SemanticSignal::Unavailable);
        }
        std::thread::sleep(Duration::from_millis(600));

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(index.rank("housing"), SemanticSignal::Unavailable);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_full_reindex_drops_stale_documents() {
        let dir = tempfile::tempdir().unwrap();
        let config = IndexConfig {
            dir: dir.path().to_path_buf(),
            embedder: crate::core::config::EmbedderKind::Hash,
            query_timeout_ms: 0,
            ..Default::default()
        };

        let mut larger = seed_resources();
        for id in 6..=12 {
            let mut extra = larger[2].clone();
            extra.id = id;
            extra.name = format!("Housing Program {}", id);
            extra.description = Some("Emergency housing and housing support".to_string());
            larger.push(extra);
        }
        VectorIndex::from_config(&config).index(&larger).unwrap();

        let reopened = VectorIndex::from_config(&config);
        let stats = reopened.index(&seed_resources()).unwrap();
        assert_eq!(stats.removed, 7);
        assert_eq!(reopened.stats().unwrap().document_count, 5);

        let ids: Vec<i64> = reopened
            .query("housing")
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| (1..=5).contains(id)));
    }

    #[test]
    fn test_results_capped_at_five() {
        let index = VectorIndex::with_factory(
            Box::new(|| Ok(Box::new(HashEmbedder::new()) as Box<dyn Embedder>)),
            StoreLocation::Memory,
            50,
            Duration::ZERO,
        );

        let mut resources = seed_resources();
        for id in 6..=12 {
            let mut extra = resources[0].clone();
            extra.id = id;
            resources.push(extra);
        }
        index.index(&resources).unwrap();

        assert_eq!(index.query("resource").unwrap().len(), MAX_RESULTS);
    }
}
