// src/session_log.rs
//
// In-memory record of everything sent and received in a session.

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to write log to {path}: {reason}")]
    Export { path: PathBuf, reason: String },
}

impl From<LogError> for String {
    fn from(e: LogError) -> String {
        e.to_string()
    }
}

/// How a sent line came about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOrigin {
    Manual,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Sent(SendOrigin),
    Received,
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub direction: Direction,
    /// Bytes as they went over the wire
    pub bytes: Vec<u8>,
    /// Rendered text as shown and exported
    pub text: String,
}

#[derive(Debug, Default)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
    hex_view: String,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk and make it the current hex view.
    /// Returns the decoded text, with invalid UTF-8 replaced.
    pub fn record_received(&mut self, bytes: &[u8]) -> &str {
        self.hex_view = hex_string(bytes);
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            direction: Direction::Received,
            bytes: bytes.to_vec(),
            text: String::from_utf8_lossy(bytes).into_owned(),
        });
        self.last_text()
    }

    /// Append a sent line. `line` is the text without its terminator, `bytes`
    /// what actually went to the transport. Returns the rendered text.
    pub fn record_sent(&mut self, line: &str, bytes: &[u8], origin: SendOrigin) -> &str {
        let text = match origin {
            SendOrigin::Manual => format!(">> {}\n", line),
            SendOrigin::Repeat => format!(">> {}  (repeat)\n", line),
        };
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            direction: Direction::Sent(origin),
            bytes: bytes.to_vec(),
            text,
        });
        self.last_text()
    }

    fn last_text(&self) -> &str {
        self.entries.last().map(|e| e.text.as_str()).unwrap_or_default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex rendering of the most recent received chunk only.
    pub fn hex_view(&self) -> &str {
        &self.hex_view
    }

    /// Drop all entries and the hex view.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hex_view.clear();
    }

    /// Full log text, entries concatenated in order.
    pub fn export_text(&self) -> String {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn export_to(&self, path: &Path) -> Result<(), LogError> {
        std::fs::write(path, self.export_text()).map_err(|e| LogError::Export {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tlog!(
            "[session] Log exported to {} ({} entries)",
            path.display(),
            self.entries.len()
        );
        Ok(())
    }

    /// Export into `dir` under a timestamped name
    /// (`YYYY-MM-DD_HH-MM-SS_term.txt`). Returns the path written.
    pub fn save_auto(&self, dir: &Path) -> Result<PathBuf, LogError> {
        std::fs::create_dir_all(dir).map_err(|e| LogError::Export {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = Local::now().format("%Y-%m-%d_%H-%M-%S_term.txt").to_string();
        let path = dir.join(name);
        self.export_to(&path)?;
        Ok(path)
    }
}

/// Uppercase, space-separated, two digits per byte.
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(b"\x00\x0a\xff"), "00 0A FF");
        assert_eq!(hex_string(b""), "");
    }

    #[test]
    fn test_hex_view_is_latest_chunk_only() {
        let mut log = SessionLog::new();
        log.record_received(b"AB");
        log.record_received(b"\x01\x02");
        assert_eq!(log.hex_view(), "01 02");

        // Sends don't touch the hex view
        log.record_sent("x", b"x\r", SendOrigin::Manual);
        assert_eq!(log.hex_view(), "01 02");
    }

    #[test]
    fn test_lossy_decoding() {
        let mut log = SessionLog::new();
        let text = log.record_received(b"ok\xff\n").to_string();
        assert_eq!(text, "ok\u{FFFD}\n");
        assert_eq!(log.entries()[0].bytes, b"ok\xff\n".to_vec());
    }

    #[test]
    fn test_sent_rendering_and_export_order() {
        let mut log = SessionLog::new();
        log.record_sent("AT", b"AT\r", SendOrigin::Manual);
        log.record_received(b"OK\n");
        log.record_sent("AT", b"AT\r", SendOrigin::Repeat);

        assert_eq!(log.export_text(), ">> AT\nOK\n>> AT  (repeat)\n");
        assert_eq!(
            log.entries()[2].direction,
            Direction::Sent(SendOrigin::Repeat)
        );
    }

    #[test]
    fn test_clear() {
        let mut log = SessionLog::new();
        log.record_received(b"x");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.hex_view(), "");
        assert_eq!(log.export_text(), "");
    }

    #[test]
    fn test_export_and_auto_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::new();
        log.record_received(b"hello\n");

        let path = dir.path().join("manual.txt");
        log.export_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");

        let auto = log.save_auto(&dir.path().join("logs")).unwrap();
        let name = auto.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_term.txt"));
        assert_eq!(name.len(), "2024-01-01_00-00-00_term.txt".len());
        assert_eq!(std::fs::read_to_string(&auto).unwrap(), "hello\n");
    }

    #[test]
    fn test_export_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new();
        // A directory can't be written as a file
        let err = log.export_to(dir.path()).unwrap_err();
        assert!(String::from(err).starts_with("failed to write log to"));
    }
}
