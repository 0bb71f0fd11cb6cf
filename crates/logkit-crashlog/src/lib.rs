//! Crash output capture for logkit
//!
//! Redirects panic reports (message, location, thread, backtrace) to a
//! dedicated file next to the executable, independently of the structured
//! log pipeline:
//!
//! ```no_run
//! let path = logkit_crashlog::init_to_time().expect("crash log");
//! // panics from here on are appended to `.<exec>.<YYYYMMDD_HHMMSS>.crashlog`
//! # let _ = path;
//! ```
//!
//! Installation runs once per process. Every later call, from any thread and
//! with any arguments, returns the outcome of the first one. Aborts that skip
//! the panic machinery (out-of-memory, stack overflow) are not captured.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Local};
use logkit_core_types::{exec_dir, exec_name};

pub use logkit_errors::CrashLogError;

mod hook;

/// Timestamp embedded in crash log names by the `init_to_time*` entry points
pub const TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

const EXTENSION: &str = "crashlog";

static INIT_LOCK: Mutex<()> = Mutex::new(());
static INIT_RESULT: OnceLock<Result<PathBuf, CrashLogError>> = OnceLock::new();

/// `.<exec>.crashlog` in the executable directory
pub fn init() -> Result<PathBuf, CrashLogError> {
    initialize("", "", false)
}

/// `.<exec>.crashlog` in `dir`
pub fn init_with_path(dir: impl AsRef<Path>) -> Result<PathBuf, CrashLogError> {
    initialize(dir, "", false)
}

/// `.<exec>.<YYYYMMDD_HHMMSS>.crashlog` in the executable directory
pub fn init_to_time() -> Result<PathBuf, CrashLogError> {
    initialize("", "", true)
}

/// `.<exec>.<YYYYMMDD_HHMMSS>.crashlog` in `dir`
pub fn init_to_time_with_path(dir: impl AsRef<Path>) -> Result<PathBuf, CrashLogError> {
    initialize(dir, "", true)
}

/// Open the crash log and route panic reports to it, once per process
///
/// An empty `dir` means the executable directory, an empty `file_name` the
/// executable name. The file is opened for appending and never truncated.
///
/// # Errors
///
/// [`CrashLogError::Open`] when the file cannot be opened, and
/// [`CrashLogError::Register`] when the panic hook cannot be installed (the
/// calling thread is already panicking). The error is stored: every later
/// call returns it again.
pub fn initialize(
    dir: impl AsRef<Path>,
    file_name: &str,
    add_timestamp: bool,
) -> Result<PathBuf, CrashLogError> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    INIT_RESULT
        .get_or_init(|| install(dir.as_ref(), file_name, add_timestamp))
        .clone()
}

/// Stop writing panic reports to the crash log and flush it
///
/// A no-op before initialisation and after an earlier close. The panic hook
/// stays installed (and keeps chaining to the previous hook), and
/// initialisation does not run again.
///
/// # Errors
///
/// [`CrashLogError::Close`] when flushing the file to disk fails; the file
/// is released either way.
pub fn close() -> Result<(), CrashLogError> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    hook::release()
}

/// Path panic reports currently go to, `None` before init or after close
pub fn current_path() -> Option<PathBuf> {
    hook::current_path()
}

/// `<dir>/.<name>[.<timestamp>].crashlog`
pub fn crash_log_path(dir: &Path, name: &str, timestamp: Option<DateTime<Local>>) -> PathBuf {
    let file_name = match timestamp {
        Some(time) => format!(".{}.{}.{}", name, time.format(TIME_FORMAT), EXTENSION),
        None => format!(".{}.{}", name, EXTENSION),
    };
    dir.join(file_name)
}

fn install(dir: &Path, file_name: &str, add_timestamp: bool) -> Result<PathBuf, CrashLogError> {
    let dir = if dir.as_os_str().is_empty() {
        exec_dir()
    } else {
        dir.to_path_buf()
    };
    let name = if file_name.is_empty() {
        exec_name()
    } else {
        file_name.to_string()
    };
    let path = crash_log_path(&dir, &name, add_timestamp.then(Local::now));

    let file = open_append(&path).map_err(|err| CrashLogError::Open {
        path: path.clone(),
        source: Arc::new(err),
    })?;
    hook::register(path.clone(), file)?;

    tracing::info!(path = %path.display(), "crash output redirected");
    Ok(path)
}

fn open_append(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_crash_log_path_without_timestamp() {
        let path = crash_log_path(Path::new("/srv/app"), "server", None);
        assert_eq!(path, PathBuf::from("/srv/app/.server.crashlog"));
    }

    #[test]
    fn test_crash_log_path_with_timestamp() {
        let time = Local.with_ymd_and_hms(2026, 10, 19, 8, 30, 5).unwrap();
        let path = crash_log_path(Path::new("/srv/app"), "server", Some(time));
        assert_eq!(
            path,
            PathBuf::from("/srv/app/.server.20261019_083005.crashlog")
        );
    }

    #[test]
    fn test_open_append_keeps_existing_content() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".app.crashlog");
        std::fs::write(&path, b"earlier crash\n").unwrap();

        let mut file = open_append(&path).unwrap();
        file.write_all(b"later crash\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier crash\nlater crash\n"
        );
    }

    fn is_timestamped_name(name: &str) -> bool {
        let Some(stamp) = name
            .strip_prefix(".app.")
            .and_then(|rest| rest.strip_suffix(".crashlog"))
        else {
            return false;
        };
        let bytes = stamp.as_bytes();
        bytes.len() == 15
            && bytes[8] == b'_'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_digit())
    }

    proptest! {
        #[test]
        fn prop_timestamped_names_match_pattern(secs in 0i64..4_102_444_800) {
            let time = Local.timestamp_opt(secs, 0).earliest().unwrap();
            let path = crash_log_path(Path::new("/tmp"), "app", Some(time));
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            prop_assert!(is_timestamped_name(&name), "unexpected name {}", name);
        }
    }
}
