//! Executable path resolution
//!
//! Used to derive default file locations (crash log, `logs/` directory)
//! next to the running binary.

use std::path::PathBuf;

/// Directory containing the running executable
///
/// Returns an empty path (and logs an error) if the executable path cannot
/// be determined.
pub fn exec_dir() -> PathBuf {
    match std::env::current_exe() {
        Ok(path) => path
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_default(),
        Err(err) => {
            tracing::error!(error = %err, "failed to resolve executable path");
            PathBuf::new()
        }
    }
}

/// File name of the running executable
///
/// Returns an empty string (and logs an error) if the executable path
/// cannot be determined.
pub fn exec_name() -> String {
    match std::env::current_exe() {
        Ok(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        Err(err) => {
            tracing::error!(error = %err, "failed to resolve executable name");
            String::new()
        }
    }
}
