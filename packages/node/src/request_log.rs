//! Append-only JSON-lines logs.
//!
//! Each [`JsonlLog`] owns one file and one writer thread. Producers send
//! entries over a bounded channel and wait for capacity when the writer falls
//! behind, so lines are never interleaved or dropped. A failed write is logged
//! and counted; it never takes the node down.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

/// Entries buffered between producers and the writer.
pub const LOG_CHANNEL_CAPACITY: usize = 1024;

enum Command<T> {
    Append(T),
    Flush(oneshot::Sender<()>),
}

/// Handle to a JSON-lines log file. Cheap to clone.
pub struct JsonlLog<T> {
    path: PathBuf,
    tx: mpsc::Sender<Command<T>>,
    lines_written: Arc<AtomicU64>,
    write_errors: Arc<AtomicU64>,
    _entry: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonlLog<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            tx: self.tx.clone(),
            lines_written: Arc::clone(&self.lines_written),
            write_errors: Arc::clone(&self.write_errors),
            _entry: PhantomData,
        }
    }
}

impl<T> JsonlLog<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Open (creating directories as needed) the log at `path` and start its
    /// writer thread. The thread exits once every handle is dropped.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
        let lines_written = Arc::new(AtomicU64::new(0));
        let write_errors = Arc::new(AtomicU64::new(0));

        let writer = Writer {
            file,
            path: path.clone(),
            lines_written: Arc::clone(&lines_written),
            write_errors: Arc::clone(&write_errors),
        };
        std::thread::Builder::new()
            .name("cloelia-log-writer".into())
            .spawn(move || writer.run(rx))?;

        Ok(Self {
            path,
            tx,
            lines_written,
            write_errors,
            _entry: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue `entry` for writing. Waits only for channel capacity, not disk.
    pub async fn append(&self, entry: T) {
        if self.tx.send(Command::Append(entry)).await.is_err() {
            self.write_errors.fetch_add(1, Ordering::Relaxed);
            tracing::error!(path = %self.path.display(), "log writer has stopped; entry dropped");
        }
    }

    /// Wait until every entry queued before this call is on disk.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Flush, then read every entry back in file order.
    ///
    /// Lines that fail to parse are skipped with a warning. A missing file
    /// reads as empty.
    pub async fn read_all(&self) -> io::Result<Vec<T>> {
        self.flush().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_entries(&path))
            .await
            .map_err(io::Error::other)?
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }
}

fn read_entries<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut entries = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = idx + 1,
                error = %e,
                "skipping corrupt log line"
            ),
        }
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

struct Writer {
    file: fs::File,
    path: PathBuf,
    lines_written: Arc<AtomicU64>,
    write_errors: Arc<AtomicU64>,
}

impl Writer {
    fn run<T: Serialize>(mut self, mut rx: mpsc::Receiver<Command<T>>) {
        while let Some(cmd) = rx.blocking_recv() {
            match cmd {
                Command::Append(entry) => self.write_entry(&entry),
                Command::Flush(ack) => {
                    if let Err(e) = self.file.flush() {
                        tracing::warn!(path = %self.path.display(), error = %e, "log flush failed");
                    }
                    let _ = ack.send(());
                }
            }
        }
    }

    fn write_entry<T: Serialize>(&mut self, entry: &T) {
        let result = serde_json::to_string(entry)
            .map_err(io::Error::other)
            .and_then(|line| writeln!(self.file, "{line}"));
        match result {
            Ok(()) => {
                self.lines_written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(path = %self.path.display(), error = %e, "failed to write log line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloelia::FirewallLogEntry;

    #[tokio::test]
    async fn appends_are_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlLog::open(dir.path().join("logs/firewall_log.jsonl")).unwrap();
        for i in 0..25 {
            log.append(FirewallLogEntry::now("10.0.0.1", format!("/p/{i}"), false))
                .await;
        }
        let entries: Vec<FirewallLogEntry> = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 25);
        assert_eq!(entries[0].path, "/p/0");
        assert_eq!(entries[24].path, "/p/24");
        assert_eq!(log.lines_written(), 25);
        assert_eq!(log.write_errors(), 0);
    }

    #[tokio::test]
    async fn concurrent_producers_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlLog::open(dir.path().join("fw.jsonl")).unwrap();
        let mut tasks = Vec::new();
        for t in 0..8 {
            let log = log.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    log.append(FirewallLogEntry::now(format!("10.0.0.{t}"), format!("/{i}"), i % 2 == 0))
                        .await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        let entries: Vec<FirewallLogEntry> = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 400);
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.jsonl");
        fs::write(&path, "{not json\n").unwrap();

        let log = JsonlLog::open(&path).unwrap();
        log.append(FirewallLogEntry::now("1.2.3.4", "/", true)).await;
        let entries: Vec<FirewallLogEntry> = log.read_all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].threat_detected);
    }

    #[tokio::test]
    async fn existing_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.jsonl");
        {
            let log = JsonlLog::open(&path).unwrap();
            log.append(FirewallLogEntry::now("1.1.1.1", "/a", false)).await;
            log.flush().await;
        }
        let log: JsonlLog<FirewallLogEntry> = JsonlLog::open(&path).unwrap();
        log.append(FirewallLogEntry::now("1.1.1.1", "/b", false)).await;
        let paths: Vec<String> = log
            .read_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }
}
