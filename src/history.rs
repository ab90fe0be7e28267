//! Flat conversation log.
//!
//! Every answered question is appended as one JSON object per line to
//! `~/.how/history.jsonl`. The log is the only state `how` keeps between
//! invocations besides the config file.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Trait for providing timestamps.
///
/// Lets tests pin the time recorded in history entries.
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// Time provider backed by the system clock.
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// One question and the answer it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: u64,
    pub provider: String,
    pub question: String,
    pub response: String,
}

impl HistoryEntry {
    /// Local time of the entry, for display.
    pub fn formatted_time(&self) -> String {
        DateTime::from_timestamp(self.timestamp as i64, 0)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

pub struct ConversationLog {
    path: PathBuf,
    max_entries: usize,
    time_provider: Box<dyn TimeProvider>,
}

impl ConversationLog {
    pub fn new(path: PathBuf, max_entries: usize) -> Self {
        Self::with_time_provider(path, max_entries, Box::new(SystemTimeProvider))
    }

    /// Creates a log with a custom time provider (for testing).
    pub fn with_time_provider(
        path: PathBuf,
        max_entries: usize,
        time_provider: Box<dyn TimeProvider>,
    ) -> Self {
        Self {
            path,
            max_entries,
            time_provider,
        }
    }

    /// The default log location under the config directory.
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::Config::get_config_dir()?.join("history.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an entry, then trims the log to `max_entries`.
    pub fn append(&self, provider: &str, question: &str, response: &str) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            timestamp: self.time_provider.now(),
            provider: provider.to_string(),
            question: question.to_string(),
            response: response.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        drop(file);

        self.trim()?;
        debug!("Appended history entry to {}", self.path.display());
        Ok(entry)
    }

    /// All entries, oldest first. Lines that fail to parse are skipped.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping corrupt history line {}: {}", number + 1, e),
            }
        }
        Ok(entries)
    }

    /// The `limit` most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.entries()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Entry by 1-based position counted from the newest.
    pub fn get(&self, index: usize) -> Result<HistoryEntry> {
        if index == 0 {
            return Err(anyhow!("History entries are numbered from 1"));
        }
        self.recent(index)?
            .into_iter()
            .nth(index - 1)
            .ok_or_else(|| anyhow!("No history entry #{}", index))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn trim(&self) -> Result<()> {
        let entries = self.entries()?;
        if entries.len() <= self.max_entries {
            return Ok(());
        }

        let keep = &entries[entries.len() - self.max_entries..];
        let mut content = String::new();
        for entry in keep {
            content.push_str(&serde_json::to_string(entry)?);
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StepClock(AtomicU64);

    impl TimeProvider for StepClock {
        fn now(&self) -> u64 {
            self.0.fetch_add(60, Ordering::SeqCst)
        }
    }

    fn log_in(dir: &Path, max_entries: usize) -> ConversationLog {
        ConversationLog::with_time_provider(
            dir.join("history.jsonl"),
            max_entries,
            Box::new(StepClock(AtomicU64::new(1_700_000_000))),
        )
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path(), 10);

        let entry = log.append("mock", "list ports", "use lsof").unwrap();
        assert_eq!(entry.timestamp, 1_700_000_000);

        let entries = log.entries().unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path(), 10);
        for q in ["one", "two", "three"] {
            log.append("mock", q, "answer").unwrap();
        }

        let questions: Vec<String> = log.recent(2).unwrap().into_iter().map(|e| e.question).collect();
        assert_eq!(questions, vec!["three", "two"]);
        assert_eq!(log.get(3).unwrap().question, "one");
        assert!(log.get(4).is_err());
        assert!(log.get(0).is_err());
    }

    #[test]
    fn test_log_is_trimmed_to_max_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path(), 2);
        for q in ["a", "b", "c"] {
            log.append("mock", q, "r").unwrap();
        }

        let questions: Vec<String> = log.entries().unwrap().into_iter().map(|e| e.question).collect();
        assert_eq!(questions, vec!["b", "c"]);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path(), 10);
        log.append("mock", "ok", "r").unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(log.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_removes_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path(), 10);
        log.append("mock", "q", "r").unwrap();
        log.clear().unwrap();

        assert!(!log.path().exists());
        assert!(log.entries().unwrap().is_empty());
        log.clear().unwrap();
    }

    #[test]
    fn test_multiline_response_survives() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path(), 10);
        let response = "line one\n```bash\nls\n```\n";
        log.append("mock", "q", response).unwrap();

        assert_eq!(log.get(1).unwrap().response, response);
    }
}
