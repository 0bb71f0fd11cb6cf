//! Size-rotating file sink
//!
//! Writes go to `filename` until the next write would push it past
//! `max_size` megabytes. The file is then renamed to a timestamped backup
//! (`app-2026-10-19T08-30-00.000.log`) and a fresh file is started. After
//! each rotation, backups beyond `max_backups` or older than `max_age` days
//! are removed and the survivors are gzipped when `compress` is set.
//!
//! Housekeeping problems are reported on stderr rather than through
//! `tracing`: the sink usually sits underneath the log handler itself.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use logkit_core_types::{exec_dir, exec_name};
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::MakeWriter;

const MEGABYTE: u64 = 1024 * 1024;
const DEFAULT_MAX_SIZE: u64 = 100;
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const COMPRESS_SUFFIX: &str = ".gz";

/// Rotation settings, keyed like the usual lumberjack-style configs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Target file; empty means `<tmp>/<exec>-logkit.log`
    pub filename: PathBuf,
    /// Megabytes before rotation; 0 means 100
    pub max_size: u64,
    /// Backups to keep; 0 keeps all
    pub max_backups: usize,
    /// Days to keep backups; 0 keeps them regardless of age
    pub max_age: u64,
    pub compress: bool,
    /// Name backups after local time instead of UTC
    pub local_time: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::new(),
            max_size: DEFAULT_MAX_SIZE,
            max_backups: 0,
            max_age: 0,
            compress: false,
            local_time: false,
        }
    }
}

/// Thread-safe rotating file writer; clones share the open file
#[derive(Debug, Clone)]
pub struct RotatingSink {
    state: Arc<Mutex<SinkState>>,
}

#[derive(Debug)]
struct SinkState {
    config: SinkConfig,
    max_bytes: u64,
    file: Option<File>,
    size: u64,
    last_backup: Option<NaiveDateTime>,
}

impl RotatingSink {
    pub fn new(config: SinkConfig) -> Self {
        let max_size = match config.max_size {
            0 => DEFAULT_MAX_SIZE,
            size => size,
        };
        let max_bytes = max_size.saturating_mul(MEGABYTE);
        Self {
            state: Arc::new(Mutex::new(SinkState {
                config,
                max_bytes,
                file: None,
                size: 0,
                last_backup: None,
            })),
        }
    }

    /// Override the rotation threshold with an exact byte count
    pub fn with_max_bytes(self, max_bytes: u64) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.max_bytes = max_bytes;
        }
        self
    }

    /// Path of the active log file
    pub fn path(&self) -> PathBuf {
        match self.state.lock() {
            Ok(state) => state.path(),
            Err(poisoned) => poisoned.into_inner().path(),
        }
    }

    pub fn config(&self) -> SinkConfig {
        match self.state.lock() {
            Ok(state) => state.config.clone(),
            Err(poisoned) => poisoned.into_inner().config.clone(),
        }
    }

    /// Close the current file, move it aside and start a new one
    pub fn rotate(&self) -> io::Result<()> {
        self.lock()?.rotate()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, SinkState>> {
        self.state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "rotating sink lock poisoned"))
    }
}

impl Write for RotatingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock()?.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RotatingSink {
    type Writer = RotatingSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl SinkState {
    fn path(&self) -> PathBuf {
        if self.config.filename.as_os_str().is_empty() {
            std::env::temp_dir().join(format!("{}-logkit.log", exec_name()))
        } else {
            self.config.filename.clone()
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {} exceeds maximum file size {}",
                    len, self.max_bytes
                ),
            ));
        }

        if self.file.is_none() {
            self.open_existing_or_new(len)?;
        }
        if self.size + len > self.max_bytes {
            self.rotate()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file not open"))?;
        let written = file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn open_existing_or_new(&mut self, write_len: u64) -> io::Result<()> {
        let path = self.path();
        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return self.open_new(),
            Err(err) => return Err(err),
        };
        if size + write_len >= self.max_bytes {
            return self.rotate();
        }

        match OpenOptions::new().append(true).open(&path) {
            Ok(file) => {
                self.file = Some(file);
                self.size = size;
                Ok(())
            }
            // Unreadable or vanished: start over with a fresh file
            Err(_) => self.open_new(),
        }
    }

    fn open_new(&mut self) -> io::Result<()> {
        let path = self.path();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        if path.exists() {
            let (backup, time) = backup_name(&path, self.config.local_time, self.last_backup);
            fs::rename(&path, &backup)?;
            self.last_backup = Some(time);
        }

        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        self.file = Some(options.open(&path)?);
        self.size = 0;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        self.open_new()?;
        self.mill();
        Ok(())
    }

    /// Prune and compress backups; failures only produce a warning
    fn mill(&self) {
        if self.config.max_backups == 0 && self.config.max_age == 0 && !self.config.compress {
            return;
        }
        if let Err(err) = self.mill_once() {
            eprintln!("logkit: failed to clean up rotated logs: {}", err);
        }
    }

    fn age_cutoff(&self) -> Option<DateTime<Utc>> {
        if self.config.max_age == 0 {
            return None;
        }
        let age = i64::try_from(self.config.max_age)
            .ok()
            .and_then(Duration::try_days)?;
        Utc::now().checked_sub_signed(age)
    }

    fn mill_once(&self) -> io::Result<()> {
        let path = self.path();
        let mut backups = list_backups(&path, self.config.local_time)?;
        // newest first
        backups.sort_by(|a, b| b.time.cmp(&a.time));

        let mut remove = Vec::new();
        if self.config.max_backups > 0 && backups.len() > self.config.max_backups {
            remove.extend(backups.split_off(self.config.max_backups));
        }
        // ages too large to represent keep everything
        if let Some(cutoff) = self.age_cutoff() {
            let (expired, kept): (Vec<_>, Vec<_>) =
                backups.into_iter().partition(|backup| backup.time < cutoff);
            remove.extend(expired);
            backups = kept;
        }

        for backup in &remove {
            fs::remove_file(&backup.path)?;
        }
        if self.config.compress {
            for backup in backups.iter().filter(|backup| !backup.compressed) {
                compress_file(&backup.path)?;
            }
        }
        Ok(())
    }
}

struct Backup {
    path: PathBuf,
    time: DateTime<Utc>,
    compressed: bool,
}

fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

fn backup_path(path: &Path, time: NaiveDateTime) -> PathBuf {
    let (stem, ext) = split_name(path);
    let name = format!("{}-{}{}", stem, time.format(BACKUP_TIME_FORMAT), ext);
    path.with_file_name(name)
}

/// Unused timestamped backup name for `path`, strictly after `after`
fn backup_name(
    path: &Path,
    local_time: bool,
    after: Option<NaiveDateTime>,
) -> (PathBuf, NaiveDateTime) {
    let now = if local_time {
        Local::now().naive_local()
    } else {
        Utc::now().naive_utc()
    };
    let mut time = match after {
        Some(after) if now <= after => after + Duration::milliseconds(1),
        _ => now,
    };
    let mut candidate = backup_path(path, time);
    // rotations within one millisecond still get distinct, ordered names
    while candidate.exists() || with_gz(&candidate).exists() {
        time += Duration::milliseconds(1);
        candidate = backup_path(path, time);
    }
    (candidate, time)
}

fn with_gz(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(COMPRESS_SUFFIX);
    PathBuf::from(name)
}

fn list_backups(path: &Path, local_time: bool) -> io::Result<Vec<Backup>> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let (stem, ext) = split_name(path);
    let prefix = format!("{}-", stem);

    let mut backups = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let (body, compressed) = match name.strip_suffix(COMPRESS_SUFFIX) {
            Some(body) => (body, true),
            None => (name.as_str(), false),
        };
        let Some(stamp) = body
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&ext))
        else {
            continue;
        };
        let Ok(naive) = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT) else {
            continue;
        };
        let time = if local_time {
            match Local.from_local_datetime(&naive).earliest() {
                Some(local) => local.with_timezone(&Utc),
                None => continue,
            }
        } else {
            Utc.from_utc_datetime(&naive)
        };
        backups.push(Backup {
            path: entry.path(),
            time,
            compressed,
        });
    }
    Ok(backups)
}

fn compress_file(src: &Path) -> io::Result<()> {
    let dst = with_gz(src);
    let mut input = File::open(src)?;
    let mut encoder = GzEncoder::new(File::create(&dst)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    fs::remove_file(src)
}

/// Sink for `<exec_dir>/logs/app.log`
///
/// # Panics
///
/// Panics if the `logs` directory cannot be created or is a file: logging
/// cannot come up without it.
pub fn default_sink() -> RotatingSink {
    default_sink_at(exec_dir())
}

/// Sink for `<base>/logs/app.log`: 100 MB, 10 backups, 30 days,
/// compressed, local-time backup names
///
/// # Panics
///
/// Panics if `<base>/logs` cannot be created or is a file.
pub fn default_sink_at(base: impl AsRef<Path>) -> RotatingSink {
    let log_dir = base.as_ref().join("logs");
    match fs::metadata(&log_dir) {
        Ok(meta) if !meta.is_dir() => {
            panic!("log directory path is a file: {}", log_dir.display())
        }
        Ok(_) => {}
        Err(_) => {
            if let Err(err) = fs::create_dir_all(&log_dir) {
                panic!(
                    "failed to create log directory {}: {}",
                    log_dir.display(),
                    err
                );
            }
        }
    }

    RotatingSink::new(SinkConfig {
        filename: log_dir.join("app.log"),
        max_size: 100,
        max_backups: 10,
        max_age: 30,
        compress: true,
        local_time: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_backup_path_format() {
        let time = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_milli_opt(8, 30, 5, 42)
            .unwrap();
        let path = backup_path(Path::new("/var/log/app.log"), time);
        assert_eq!(
            path,
            PathBuf::from("/var/log/app-2026-10-19T08-30-05.042.log")
        );
    }

    #[test]
    fn test_backup_path_without_extension() {
        let time = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 6)
            .unwrap();
        let path = backup_path(Path::new("/tmp/server"), time);
        assert_eq!(path, PathBuf::from("/tmp/server-2026-01-02T03-04-05.006"));
    }

    #[test]
    fn test_backup_names_strictly_increase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let (_, first) = backup_name(&path, false, None);
        let (_, second) = backup_name(&path, false, Some(first + Duration::seconds(5)));
        assert!(second > first + Duration::seconds(5));
    }

    #[test]
    fn test_default_config_values() {
        let config = SinkConfig::default();
        assert_eq!(config.max_size, 100);
        assert_eq!(config.max_backups, 0);
        assert!(!config.compress);
    }

    #[test]
    fn test_list_backups_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(dir.path().join("app-2026-10-19T08-30-05.042.log"), b"a").unwrap();
        fs::write(dir.path().join("app-2026-10-18T08-30-05.042.log.gz"), b"b").unwrap();
        fs::write(dir.path().join("app-notatime.log"), b"c").unwrap();
        fs::write(dir.path().join("other-2026-10-19T08-30-05.042.log"), b"d").unwrap();
        fs::write(&path, b"current").unwrap();

        let backups = list_backups(&path, false).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups.iter().filter(|b| b.compressed).count(), 1);
    }
}
