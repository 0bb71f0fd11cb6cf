//! Panic hook writing reports to the crash log file

use std::any::Any;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::panic::{self, Location};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use backtrace::Backtrace;
use chrono::Local;
use logkit_errors::CrashLogError;

struct CrashFile {
    path: PathBuf,
    file: File,
}

static CRASH_FILE: Mutex<Option<CrashFile>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<CrashFile>> {
    CRASH_FILE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Make `file` the crash output and chain a hook in front of the current one
pub(crate) fn register(path: PathBuf, file: File) -> Result<(), CrashLogError> {
    // take_hook/set_hook panic when called from a panicking thread
    if thread::panicking() {
        drop(file);
        return Err(CrashLogError::Register {
            path,
            reason: "cannot install a panic hook while the thread is panicking".to_string(),
        });
    }

    *slot() = Some(CrashFile { path, file });

    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        write_report(info.location(), info.payload());
        previous(info);
    }));
    Ok(())
}

/// Detach the crash file, syncing it to disk
pub(crate) fn release() -> Result<(), CrashLogError> {
    let Some(CrashFile { path, file }) = slot().take() else {
        return Ok(());
    };
    file.sync_all().map_err(|err| CrashLogError::Close {
        path,
        source: Arc::new(err),
    })
}

pub(crate) fn current_path() -> Option<PathBuf> {
    slot().as_ref().map(|crash| crash.path.clone())
}

fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}

fn render_report(location: Option<&Location<'_>>, payload: &(dyn Any + Send)) -> String {
    let current = thread::current();
    let mut report = format!(
        "==== {} ====\nthread '{}' panicked",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"),
        current.name().unwrap_or("<unnamed>")
    );
    if let Some(location) = location {
        let _ = write!(
            report,
            " at {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    let _ = write!(
        report,
        ":\n{}\n\nstack backtrace:\n{:?}\n",
        payload_message(payload),
        Backtrace::new()
    );
    report
}

fn write_report(location: Option<&Location<'_>>, payload: &(dyn Any + Send)) {
    let mut slot = slot();
    let Some(crash) = slot.as_mut() else {
        return;
    };
    let report = render_report(location, payload);
    // nowhere left to report a failure to
    let _ = crash.file.write_all(report.as_bytes());
    let _ = crash.file.sync_all();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_message_downcasts() {
        let literal: Box<dyn Any + Send> = Box::new("static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(payload_message(&*literal), "static message");
        assert_eq!(payload_message(&*owned), "owned message");
        assert_eq!(payload_message(&*other), "Box<dyn Any>");
    }

    #[test]
    fn test_report_names_thread_location_and_message() {
        let payload: Box<dyn Any + Send> = Box::new("disk on fire");
        let report = render_report(Some(Location::caller()), &*payload);

        assert!(report.starts_with("==== "));
        assert!(report.contains("panicked at "));
        assert!(report.contains(":\ndisk on fire\n"));
        assert!(report.contains("stack backtrace:\n"));
    }
}
