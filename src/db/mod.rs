use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use models::{CachedSnapshot, JournalStatus, StatusChangeRecord};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Owns the connection thread. Dropping the last handle closes the job
/// channel, which ends the thread's receive loop, and then joins it.
struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("database thread panicked");
            }
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL journal mode unavailable: {err}");
    }
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    migrations::migrate(&mut conn)?;
    Ok(conn)
}

/// Local store for the snapshot cache and the status-change journal.
///
/// One thread owns the SQLite connection; every query is a closure shipped
/// to it with [`Database::execute`], and the result comes back on a oneshot.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (opened_tx, opened_rx) = mpsc::sync_channel::<Result<()>>(1);
        let thread_path = path.clone();

        let thread = thread::Builder::new()
            .name("hos-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&thread_path) {
                    Ok(conn) => {
                        let _ = opened_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = opened_tx.send(Err(err));
                        return;
                    }
                };
                for job in jobs_rx {
                    job(&mut conn);
                }
                info!("database thread stopped");
            })
            .context("failed to spawn database thread")?;

        let worker = Worker {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        };
        opened_rx
            .recv()
            .map_err(|_| anyhow!("database thread exited during startup"))??;

        info!("Database ready at {}", path.display());
        Ok(Self {
            worker: Arc::new(worker),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `task` on the database thread and awaits its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // the caller may have stopped waiting; nothing to do then
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("database is closed"))?
            .send(job)
            .map_err(|_| anyhow!("database thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread dropped the request"))?
    }
}
