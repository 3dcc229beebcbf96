// src/logging.rs
//
// Diagnostic output. Every line goes to stderr with a wall-clock stamp; when a
// log directory is switched on the same lines are appended to a per-run file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Name of the link that always points at the newest run's file.
const LATEST_LINK: &str = "serialtap.log";

/// Open diagnostic file, if any. Read by `tlog!`.
#[doc(hidden)]
pub static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// `HH:MM:SS.mmm` in local time.
#[doc(hidden)]
pub fn stamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Start appending diagnostics to a fresh `<date>-<time>-serialtap.log` in
/// `log_dir` and return its path.
pub fn init_file_logging(log_dir: &Path) -> Result<PathBuf, String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create log dir: {}", e))?;

    let name = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-serialtap.log")
        .to_string();
    let path = log_dir.join(&name);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("Failed to create log file: {}", e))?;

    link_latest(log_dir, &name);

    if let Ok(mut slot) = LOG_FILE.lock() {
        *slot = Some(file);
    }
    // Not via tlog!: keep this line out of the file it announces
    eprintln!("{} [logging] Writing to {}", stamp(), path.display());
    Ok(path)
}

#[cfg(unix)]
fn link_latest(log_dir: &Path, target: &str) {
    let link = log_dir.join(LATEST_LINK);
    let _ = std::fs::remove_file(&link);
    if let Err(e) = std::os::unix::fs::symlink(target, &link) {
        eprintln!("{} [logging] No {} link: {}", stamp(), LATEST_LINK, e);
    }
}

// Symlinks need elevated rights on Windows
#[cfg(not(unix))]
fn link_latest(_log_dir: &Path, _target: &str) {}

/// Close the diagnostic file. Returns whether one was open.
pub fn stop_file_logging() -> bool {
    let Ok(mut slot) = LOG_FILE.lock() else {
        return false;
    };
    let was_open = slot.take().is_some();
    if was_open {
        eprintln!("{} [logging] File closed", stamp());
    }
    was_open
}

/// `eprintln!` with a time stamp, mirrored into the diagnostic file when one
/// is open.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let line = format!("{} {}", $crate::logging::stamp(), format_args!($($arg)*));
        eprintln!("{}", line);
        if let Ok(mut slot) = $crate::logging::LOG_FILE.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }};
}
