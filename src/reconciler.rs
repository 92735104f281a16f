//! Scheduled synchronization of the compiled schema artifact.
//!
//! The reconciler re-runs [`SchemaCompiler`] on a fixed interval so the
//! static schema document tracks live definitions, and exposes manual
//! start/stop/force-update controls alongside a status snapshot.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::schema::{CompiledSchema, SchemaCompiler, SchemaError};

/// Sled key under which the compiled artifact is persisted.
pub const COMPILED_SCHEMA_KEY: &str = "compiled_schema";

#[derive(Debug, Clone, Serialize)]
pub struct ReconcilerStatus {
    pub is_running: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub update_interval_secs: u64,
    pub next_update: Option<DateTime<Utc>>,
}

/// Shared with the background task; never touches the lifecycle lock,
/// which keeps `stop`'s join free of lock cycles.
struct Inner {
    compiler: Arc<SchemaCompiler>,
    metadata_tree: sled::Tree,
    compile_lock: Mutex<()>,
    published: RwLock<Option<CompiledSchema>>,
    last_update: RwLock<Option<DateTime<Utc>>>,
}

impl Inner {
    /// One compile-persist-publish cycle. Timer ticks and forced
    /// updates both funnel through the compile lock, so two cycles
    /// never interleave; a caller arriving mid-cycle queues behind the
    /// lock and runs immediately after.
    async fn run_cycle(&self) -> Result<(), SchemaError> {
        let _guard = self.compile_lock.lock().await;

        let document = self.compiler.compile()?;
        let bytes = serde_json::to_vec(&document)
            .map_err(|e| SchemaError::InvalidData(format!("Artifact serialization failed: {}", e)))?;
        self.metadata_tree
            .insert(COMPILED_SCHEMA_KEY, bytes)
            .map_err(|e| SchemaError::InvalidData(format!("Artifact store failed: {}", e)))?;
        self.metadata_tree
            .flush()
            .map_err(|e| SchemaError::InvalidData(format!("Artifact flush failed: {}", e)))?;

        *self.published.write().await = Some(document);
        *self.last_update.write().await = Some(Utc::now());
        Ok(())
    }
}

struct Lifecycle {
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Background job with two states: stopped (initial) and running.
///
/// `start` spawns an interval loop; `stop` signals it through a watch
/// channel, which cancels future runs without preempting an in-flight
/// compilation; `force_update` compiles immediately regardless of the
/// running state or timer phase.
pub struct SchemaReconciler {
    inner: Arc<Inner>,
    update_interval_secs: u64,
    lifecycle: Mutex<Lifecycle>,
}

impl SchemaReconciler {
    pub fn new(
        compiler: Arc<SchemaCompiler>,
        db: &sled::Db,
        update_interval_secs: u64,
    ) -> Result<Self, sled::Error> {
        let metadata_tree = db.open_tree("metadata")?;

        // Republish a previously persisted artifact so reads work
        // before the first cycle of this process.
        let published = match metadata_tree.get(COMPILED_SCHEMA_KEY)? {
            Some(bytes) => match serde_json::from_slice::<CompiledSchema>(&bytes) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!("Ignoring unreadable persisted schema artifact: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                compiler,
                metadata_tree,
                compile_lock: Mutex::new(()),
                published: RwLock::new(published),
                last_update: RwLock::new(None),
            }),
            update_interval_secs,
            lifecycle: Mutex::new(Lifecycle {
                shutdown: None,
                task: None,
            }),
        })
    }

    /// Begin the interval loop. No-op if already running.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.task.is_some() {
            info!("Schema reconciler already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let inner = self.inner.clone();
        let period = std::time::Duration::from_secs(self.update_interval_secs);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = inner.run_cycle().await {
                            warn!("Scheduled schema compilation failed: {}", e);
                        }
                    }
                    _ = rx.changed() => break,
                }
            }
        });

        lifecycle.shutdown = Some(tx);
        lifecycle.task = Some(task);
        info!(
            "Schema reconciler started ({}s interval)",
            self.update_interval_secs
        );
    }

    /// Cancel the interval loop and wait for it to wind down. No-op if
    /// already stopped. An in-flight compilation finishes first.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let tx = match lifecycle.shutdown.take() {
            Some(tx) => tx,
            None => {
                info!("Schema reconciler already stopped");
                return;
            }
        };
        let _ = tx.send(true);
        if let Some(task) = lifecycle.task.take() {
            if task.await.is_err() {
                warn!("Schema reconciler task ended abnormally");
            }
        }
        info!("Schema reconciler stopped");
    }

    /// Compile and publish immediately, independent of the running
    /// state. Serialized against scheduled cycles.
    pub async fn force_update(&self) -> Result<(), SchemaError> {
        self.inner.run_cycle().await
    }

    pub async fn status(&self) -> ReconcilerStatus {
        let is_running = self.lifecycle.lock().await.task.is_some();
        let last_update = *self.inner.last_update.read().await;
        let next_update =
            last_update.map(|t| t + ChronoDuration::seconds(self.update_interval_secs as i64));
        ReconcilerStatus {
            is_running,
            last_update,
            update_interval_secs: self.update_interval_secs,
            next_update,
        }
    }

    /// The most recently published artifact, if any cycle has run (or a
    /// persisted artifact was recovered at startup).
    pub async fn current(&self) -> Option<CompiledSchema> {
        self.inner.published.read().await.clone()
    }
}

impl Drop for SchemaReconciler {
    fn drop(&mut self) {
        if let Ok(mut lifecycle) = self.lifecycle.try_lock() {
            if let Some(task) = lifecycle.task.take() {
                task.abort();
            }
        }
    }
}
