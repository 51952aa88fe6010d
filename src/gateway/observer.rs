//! Side-channel sinks for gateway events.
//!
//! Observers see one event per [`AttemptRecord`] and one [`CallSummary`] per finished call.
//! They are optional and never influence routing; a failing sink only logs a warning.

use crate::gateway::attempt::{AttemptOutcome, AttemptRecord, CallSummary};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub trait GatewayObserver: Send + Sync {
    fn on_attempt(&self, record: &AttemptRecord);

    fn on_call_complete(&self, summary: &CallSummary);
}

/// Emits every event as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl GatewayObserver for TracingObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        match record.outcome {
            AttemptOutcome::Success => info!(
                request_id = %record.request_id,
                provider = %record.provider,
                index = record.index,
                latency_ms = record.latency.as_millis() as u64,
                "Attempt succeeded"
            ),
            AttemptOutcome::Failure => warn!(
                request_id = %record.request_id,
                provider = %record.provider,
                index = record.index,
                error = record.error.as_deref().unwrap_or(""),
                "Attempt failed"
            ),
            AttemptOutcome::Blocked => debug!(
                request_id = %record.request_id,
                provider = %record.provider,
                index = record.index,
                "Attempt blocked by circuit breaker"
            ),
        }
    }

    fn on_call_complete(&self, summary: &CallSummary) {
        match summary.provider {
            Some(ref provider) => info!(
                request_id = %summary.request_id,
                provider = %provider,
                attempts = summary.attempts,
                fallback = summary.fallback,
                cost = summary.cost,
                "Completion served"
            ),
            None => warn!(
                request_id = %summary.request_id,
                attempts = summary.attempts,
                "All providers exhausted"
            ),
        }
    }
}

/// Appends every event as one JSON line to a file.
///
/// Hooks only serialize and enqueue; a background task owns the file and does the writes
/// with `tokio::fs`, so gateway calls never wait on disk I/O. Must be opened inside a tokio
/// runtime.
#[derive(Debug)]
pub struct JsonlAuditObserver {
    path: PathBuf,
    sender: mpsc::UnboundedSender<AuditCommand>,
}

#[derive(Debug)]
enum AuditCommand {
    Line(String),
    Flush(oneshot::Sender<()>),
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum AuditEvent<'a> {
    Attempt(&'a AttemptRecord),
    Call(&'a CallSummary),
}

impl JsonlAuditObserver {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Self::write_loop(path.clone(), file, receiver));

        Ok(Self { path, sender })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every event enqueued so far has been written and flushed.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(AuditCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    async fn write_loop(
        path: PathBuf,
        mut file: File,
        mut receiver: mpsc::UnboundedReceiver<AuditCommand>,
    ) {
        while let Some(command) = receiver.recv().await {
            match command {
                AuditCommand::Line(line) => {
                    if let Err(e) = file.write_all(line.as_bytes()).await {
                        warn!("Failed to write audit log {:?}: {}", path, e);
                    }
                }
                AuditCommand::Flush(ack) => {
                    if let Err(e) = file.flush().await {
                        warn!("Failed to flush audit log {:?}: {}", path, e);
                    }
                    let _ = ack.send(());
                }
            }
        }

        if let Err(e) = file.flush().await {
            warn!("Failed to flush audit log {:?}: {}", path, e);
        }
        debug!("Audit writer for {:?} stopped", path);
    }

    fn append(&self, event: AuditEvent<'_>) {
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if self.sender.send(AuditCommand::Line(line)).is_err() {
            warn!("Audit writer for {:?} is gone, dropping event", self.path);
        }
    }
}

impl GatewayObserver for JsonlAuditObserver {
    fn on_attempt(&self, record: &AttemptRecord) {
        self.append(AuditEvent::Attempt(record));
    }

    fn on_call_complete(&self, summary: &CallSummary) {
        self.append(AuditEvent::Call(summary));
    }
}
