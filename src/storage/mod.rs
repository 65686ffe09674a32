//! Durable string-keyed storage for the app, one row per key in the
//! `local_storage` table.
//!
//! `get_item` and `set_item` work on opaque string values; callers own their
//! serialization. Passing `":memory:"` as the path gives a private database
//! that lives as long as the store handle and skips directory creation and WAL.

use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

/// Path understood by SQLite as a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct LocalStoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for LocalStoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to local store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join local store thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<LocalStoreInner>,
}

impl LocalStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let in_memory = path.as_os_str() == IN_MEMORY;
        if !in_memory {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create local store directory {}", parent.display())
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = path.clone();

        let worker = thread::Builder::new()
            .name("classai-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open local store")));
                        return;
                    }
                };

                if !in_memory {
                    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                        error!("Failed to enable WAL mode: {err}");
                    }
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run local store migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Local store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => task(&mut conn),
                        StoreCommand::Shutdown => break,
                    }
                }

                info!("Local store thread shutting down");
            })
            .context("failed to spawn local store worker thread")?;

        ready_rx
            .recv()
            .context("local store worker exited before signaling readiness")??;

        info!("Local store opened at {}", path.display());

        Ok(Self {
            inner: Arc::new(LocalStoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(PathBuf::from(IN_MEMORY))
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Local store caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to local store thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("local store thread terminated unexpectedly"))?
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read key '{key}'"))
        })
        .await
    }

    /// Replaces the whole value under `key` in one statement.
    pub async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO local_storage (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, chrono::Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key '{key}'"))?;
            Ok(())
        })
        .await
    }
}
