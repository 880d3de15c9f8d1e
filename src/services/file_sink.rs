use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use metrics::counter;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::SinkError;

use super::sink::RecordSink;

#[derive(Debug, Clone, Copy)]
enum Target {
    Log,
    Alert,
}

#[derive(Debug)]
struct PendingLine {
    target: Target,
    at: DateTime<Local>,
    text: String,
}

/// Appends timestamped lines to a log file and an alert file.
///
/// `append_*` only enqueues; a background task owns the files. The task exits
/// once every `FileSink` clone is dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct FileSink {
    tx: mpsc::UnboundedSender<PendingLine>,
}

impl FileSink {
    /// Spawn the writer task. Must be called from within a Tokio runtime.
    pub fn spawn(log_path: PathBuf, alert_path: PathBuf) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(rx, log_path, alert_path));
        (Self { tx }, handle)
    }

    fn enqueue(&self, target: Target, text: &str) -> Result<(), SinkError> {
        self.tx
            .send(PendingLine {
                target,
                at: Local::now(),
                text: text.to_string(),
            })
            .map_err(|_| SinkError::Closed)
    }
}

impl RecordSink for FileSink {
    fn append_log(&self, text: &str) -> Result<(), SinkError> {
        self.enqueue(Target::Log, text)
    }

    fn append_alert(&self, text: &str) -> Result<(), SinkError> {
        self.enqueue(Target::Alert, text)
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<PendingLine>,
    log_path: PathBuf,
    alert_path: PathBuf,
) {
    tracing::info!(
        log = %log_path.display(),
        alerts = %alert_path.display(),
        "File sink writer started"
    );

    let mut log = AppendFile::new(log_path);
    let mut alerts = AppendFile::new(alert_path);

    while let Some(line) = rx.recv().await {
        let file = match line.target {
            Target::Log => &mut log,
            Target::Alert => &mut alerts,
        };

        if let Err(e) = file.append(&stamp(line.at, &line.text)).await {
            counter!("sink_errors_total").increment(1);
            tracing::warn!(error = %e, path = %file.path.display(), "Failed to append line");
        }
    }

    tracing::debug!("File sink writer drained");
}

/// `"{local time}: {text}\n"`.
fn stamp(at: DateTime<Local>, text: &str) -> String {
    format!("{}: {}\n", at.format("%Y-%m-%d %H:%M:%S%.6f"), text)
}

/// Append-mode file opened on first use and kept open. A failed write drops
/// the handle so the next line reopens the file.
struct AppendFile {
    path: PathBuf,
    file: Option<File>,
}

impl AppendFile {
    fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    async fn append(&mut self, line: &str) -> Result<(), SinkError> {
        let result = self.write(line).await;
        if result.is_err() {
            self.file = None;
        }
        result
    }

    async fn write(&mut self, line: &str) -> Result<(), SinkError> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_append(&self.path).await?,
        };
        let file = self.file.insert(file);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

async fn open_append(path: &Path) -> Result<File, SinkError> {
    Ok(OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?)
}
