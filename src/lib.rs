//! # SizeRoller
//!
//! SizeRoller is a size-bounded, rotating append-only file writer. Bytes are
//! appended to a current file; once a write would push that file past the
//! configured maximum size, the file is renamed aside to a timestamped name
//! (`app.log.2025-04-01T19-55-02.123456`) and a fresh current file is opened.
//! Old rotated files beyond a retention count are removed. A [`Rotator`] is a
//! plain [`std::io::Write`] sink, so any formatter or logger can target it.
//!
//! A rotator either serializes concurrent writers itself or relies on the
//! caller to do so (for logging frameworks that already hold a write lock).
//!
//! ## Example
//!
//! ```rust
//! use {
//!    sizeroller::{RotationSize, RotatorBuilder},
//!    tracing_subscriber::util::SubscriberInitExt,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!    let appender = RotatorBuilder::new("./logs", "tracing.log")
//!        .max_size(RotationSize::KB(2))
//!        .max_keep_files(15)
//!        .serialize_writes(false) // the non-blocking worker is the only writer
//!        .build()?;
//!    let (non_blocking, _guard) = tracing_appender::non_blocking(appender);
//!    tracing_subscriber::fmt()
//!        .with_writer(non_blocking)
//!        .with_ansi(false)
//!        .finish()
//!        .try_init()?;
//!
//!    tracing::info!("This is an info message");
//!    tracing::warn!("This is a warning message");
//!
//!    Ok(())
//! }
//! ```
//!
//! ## Diagnostics
//!
//! Opening, rotating and pruning emit `tracing` events at `debug` level under
//! the `sizeroller` target. When a rotator is the writer of a subscriber that
//! writes synchronously, filter that target out so a rotation does not log
//! back into the rotator that is emitting it.
//!
//! ## Limitations
//!
//! One rotator owns a given `<directory>/<filename>` at a time. Building two
//! rotators for the same path, in one process or several, races on the
//! rename and is not detected.
use {
    chrono::{DateTime, Duration, FixedOffset, Local, SubsecRound, Utc},
    std::{
        fs,
        io::{self, Write as _},
        path::{Path, PathBuf},
        sync::{Mutex, MutexGuard, PoisonError, TryLockError},
    },
};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

mod error;
mod naming;
mod retention;

pub use {error::RotatorError, naming::RotatedFile};

use naming::RotatedNames;

/// Defines the size threshold for rotating the current file in various units.
///
/// * `Bytes` - Direct byte count (e.g., 1048576 bytes)
/// * `KB` - Kilobytes (1 KB = 1024 bytes)
/// * `MB` - Megabytes (1 MB = 1024 KB)
/// * `GB` - Gigabytes (1 GB = 1024 MB)
///
/// # Examples
/// ```
/// use sizeroller::{RotationSize, RotatorBuilder};
///
/// let dir = tempfile::tempdir().unwrap();
/// // Rotate before the file grows past 100 MB
/// let appender = RotatorBuilder::new(dir.path(), "large.log")
///     .max_size(RotationSize::MB(100))
///     .build()
///     .unwrap();
/// assert_eq!(appender.max_size(), 100 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub enum RotationSize {
    /// Raw byte count
    Bytes(u64),
    /// Kilobytes (1 KB = 1024 bytes)
    KB(u64),
    /// Megabytes (1 MB = 1024 KB = 1,048,576 bytes)
    MB(u64),
    /// Gigabytes (1 GB = 1024 MB = 1,073,741,824 bytes)
    GB(u64),
}

impl RotationSize {
    /// Get the size in bytes, saturating at `u64::MAX`.
    pub fn bytes(&self) -> u64 {
        match self {
            RotationSize::Bytes(b) => *b,
            RotationSize::KB(kb) => kb.saturating_mul(1024),
            RotationSize::MB(mb) => mb.saturating_mul(1024 * 1024),
            RotationSize::GB(gb) => gb.saturating_mul(1024 * 1024 * 1024),
        }
    }
}

/// Specifies the time zone used to timestamp rotated file names.
///
/// The zone is resolved to a fixed offset when the builder is configured and
/// that offset is used for the lifetime of the rotator. Names from one rotator
/// therefore stay ordered even if a daylight saving change happens while it
/// runs. A rotator rebuilt after such a change resolves a different offset,
/// and its names can sort before files rotated earlier under the old one, so
/// retention may then remove the newest files instead of the oldest. Prefer
/// [`TimeZone::UTC`] or a [`TimeZone::Fix`] offset whenever retention matters.
///
/// # Examples
/// ```
/// use sizeroller::TimeZone;
/// use chrono::FixedOffset;
///
/// let utc = TimeZone::UTC;
/// let local = TimeZone::Local;
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// ```
#[derive(Debug, Clone)]
pub enum TimeZone {
    /// Use UTC time zone.
    UTC,
    /// Use the system's local offset as of the builder call. It is not
    /// re-read afterwards, see the caveat above.
    Local,
    /// Use a fixed time zone offset.
    Fix(FixedOffset),
}

/// Configuration of a rotator, fixed once it is built.
#[derive(Debug, Clone)]
struct RotatorConfig {
    /// The directory holding the current and rotated files.
    directory: PathBuf,
    /// The name of the current file; rotated files append a timestamp to it.
    filename: PathBuf,
    /// Rotate when a write would grow the current file past this size.
    max_size: RotationSize,
    /// Offset used for rotated file timestamps.
    time_zone: FixedOffset,
    /// The number of rotated files to keep, 0 keeps all of them.
    max_keep_files: u64,
    /// Mode bits for created files and directories (Unix-like systems only).
    file_mode: Option<u32>,
    /// Whether writes through a shared reference take a blocking lock.
    serialize_writes: bool,
}

impl RotatorConfig {
    fn new<P: AsRef<Path>, F: AsRef<Path>>(directory: P, filename: F) -> Self {
        RotatorConfig {
            directory: directory.as_ref().to_path_buf(),
            filename: filename.as_ref().to_path_buf(),
            max_size: RotationSize::MB(10),
            time_zone: Local::now().offset().to_owned(),
            max_keep_files: 0,
            file_mode: None,
            serialize_writes: true,
        }
    }
}

/// Everything about a built rotator that does not change between writes.
#[derive(Debug)]
struct RotatorMeta {
    config: RotatorConfig,
    names: RotatedNames,
    curr_file_path: PathBuf,
    max_size_bytes: u64,
}

/// Mutable state, guarded by the rotator's lock.
#[derive(Debug)]
struct RotatorState {
    /// The open current file. `None` once closed, or if a rotation failed
    /// after releasing it.
    file: Option<fs::File>,
    /// Bytes appended to the current file since it was opened, including
    /// whatever it held when the rotator was built.
    curr_file_size_bytes: u64,
    /// Timestamp of the last rotated name handed out.
    last_rotated_at: Option<DateTime<FixedOffset>>,
    closed: bool,
}

/// A file writer that rotates the current file before it exceeds a size bound.
///
/// Each `write` call lands whole in one file: the rotator never splits a
/// buffer across a rotation, and with internal serialization a buffer from
/// one thread is never interleaved with another's.
#[derive(Debug)]
pub struct Rotator {
    meta: RotatorMeta,
    state: Mutex<RotatorState>,
}

impl RotatorMeta {
    /// Get the current time in the configured time zone, at the resolution
    /// of rotated file names.
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.config.time_zone).trunc_subsecs(6)
    }

    fn create_directory(&self) -> Result<(), RotatorError> {
        let directory = &self.config.directory;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            if let Some(mode) = self.config.file_mode {
                builder.mode(directory_mode(mode));
            }
        }
        builder
            .create(directory)
            .map_err(|err| RotatorError::CreateDirectoryFailed(directory.clone(), err))
    }

    /// Open the current file for appending, creating it if needed.
    fn open_log_file(&self) -> Result<fs::File, RotatorError> {
        let mut open_options = fs::OpenOptions::new();
        open_options.read(true).append(true).create(true);
        #[cfg(unix)]
        {
            if let Some(mode) = self.config.file_mode {
                open_options.mode(mode);
            }
        }
        open_options
            .open(&self.curr_file_path)
            .map_err(|err| RotatorError::OpenFileFailed(self.curr_file_path.clone(), err))
    }

    /// Pick the name for the next rotated file.
    ///
    /// Names handed out by one rotator strictly increase, and never collide
    /// with a file already on disk.
    fn next_rotated_path(&self, state: &mut RotatorState) -> PathBuf {
        let mut rotated_at = self.now();
        if let Some(last) = state.last_rotated_at {
            if rotated_at <= last {
                rotated_at = last + Duration::microseconds(1);
            }
        }
        let mut path = self.config.directory.join(self.names.name_for(&rotated_at));
        while path.exists() {
            rotated_at = rotated_at + Duration::microseconds(1);
            path = self.config.directory.join(self.names.name_for(&rotated_at));
        }
        state.last_rotated_at = Some(rotated_at);
        path
    }

    /// Remove old rotated files, leaving room for the one about to be made.
    fn enforce_retention(&self) -> Result<(), RotatorError> {
        if self.config.max_keep_files == 0 {
            return Ok(());
        }
        let keep = usize::try_from(self.config.max_keep_files - 1).unwrap_or(usize::MAX);
        let removed = retention::prune(&self.config.directory, &self.names, keep)?;
        if !removed.is_empty() {
            tracing::debug!(
                filename = %self.config.filename.display(),
                removed = removed.len(),
                "enforced retention"
            );
        }
        Ok(())
    }

    /// Close the current file, prune, rename it aside and open a fresh one.
    ///
    /// Pruning runs before the rename, so the file being rotated is never
    /// among the candidates. Any failure aborts the sequence; if it happens
    /// after the handle was released the rotator is left without a file.
    fn rotate(&self, state: &mut RotatorState) -> Result<(), RotatorError> {
        if let Some(file) = state.file.take() {
            file.sync_all()
                .map_err(|err| RotatorError::CloseFailed(self.curr_file_path.clone(), err))?;
        }

        self.enforce_retention()?;

        let rotated_path = self.next_rotated_path(state);
        fs::rename(&self.curr_file_path, &rotated_path).map_err(|err| RotatorError::RenameFileError {
            from: self.curr_file_path.clone(),
            to: rotated_path.clone(),
            error: err,
        })?;

        state.file = Some(self.open_log_file()?);
        tracing::debug!(
            rotated = %rotated_path.display(),
            size = state.curr_file_size_bytes,
            "rotated current file"
        );
        state.curr_file_size_bytes = 0;
        Ok(())
    }

    /// Append `buf` to the current file, rotating first if it would overflow.
    fn write(&self, state: &mut RotatorState, buf: &[u8]) -> Result<usize, RotatorError> {
        if state.closed {
            return Err(RotatorError::Closed(self.curr_file_path.clone()));
        }
        if state.file.is_none() {
            return Err(RotatorError::RotationIncomplete(self.curr_file_path.clone()));
        }

        let incoming = buf.len() as u64;
        if state.curr_file_size_bytes.saturating_add(incoming) > self.max_size_bytes {
            self.rotate(state)?;
        }

        let file = state
            .file
            .as_mut()
            .ok_or_else(|| RotatorError::RotationIncomplete(self.curr_file_path.clone()))?;
        file.write_all(buf)
            .map_err(|err| RotatorError::WriteFailed(self.curr_file_path.clone(), err))?;
        state.curr_file_size_bytes += incoming;
        Ok(buf.len())
    }

    fn flush(&self, state: &mut RotatorState) -> io::Result<()> {
        match state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Directory mode derived from a file mode: search permission wherever read
/// permission is granted, so `0o644` gives `0o755`.
#[cfg(unix)]
fn directory_mode(file_mode: u32) -> u32 {
    file_mode | ((file_mode & 0o444) >> 2)
}

fn validate_filename(filename: &Path) -> Result<String, RotatorError> {
    let name = filename.to_str().ok_or_else(|| {
        RotatorError::InvalidConfig(format!("filename '{}' is not valid UTF-8", filename.display()))
    })?;
    if name.is_empty() || name == "." || name == ".." {
        return Err(RotatorError::InvalidConfig(format!(
            "filename '{name}' does not name a file"
        )));
    }
    if name.contains(std::path::is_separator) {
        return Err(RotatorError::InvalidConfig(format!(
            "filename '{name}' must not contain a path separator"
        )));
    }
    Ok(name.to_string())
}

impl Rotator {
    /// Build a rotator from positional parameters.
    ///
    /// * `directory` - Where the current and rotated files live; created if missing.
    /// * `filename` - The name of the current file, e.g. `app.log`.
    /// * `max_size` - Rotate before a write would grow the file past this many bytes.
    /// * `mode` - Permission bits for created files (Unix-like systems only).
    /// * `files_to_keep` - Rotated files to keep, 0 keeps all of them.
    /// * `serialize_writes` - Lock writes made through a shared reference.
    pub fn new<P: AsRef<Path>, F: AsRef<Path>>(
        directory: P,
        filename: F,
        max_size: u64,
        mode: u32,
        files_to_keep: u64,
        serialize_writes: bool,
    ) -> Result<Self, RotatorError> {
        RotatorBuilder::new(directory, filename)
            .max_size(RotationSize::Bytes(max_size))
            .file_mode(mode)
            .max_keep_files(files_to_keep)
            .serialize_writes(serialize_writes)
            .build()
    }

    /// Start configuring a rotator.
    pub fn builder<P: AsRef<Path>, F: AsRef<Path>>(directory: P, filename: F) -> RotatorBuilder {
        RotatorBuilder::new(directory, filename)
    }

    /// Append `buf` to the current file, rotating first if needed.
    ///
    /// The write is never split: a single buffer larger than the maximum
    /// size lands whole in a fresh file. Returns the number of bytes written.
    pub fn append(&self, buf: &[u8]) -> Result<usize, RotatorError> {
        let mut state = self.lock_state()?;
        self.meta.write(&mut state, buf)
    }

    /// Close the current file.
    ///
    /// Waits for an in-flight write to finish. Later writes and a second
    /// close fail with [`RotatorError::Closed`].
    pub fn close(&self) -> Result<(), RotatorError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(RotatorError::Closed(self.meta.curr_file_path.clone()));
        }
        state.closed = true;
        if let Some(file) = state.file.take() {
            file.sync_all()
                .map_err(|err| RotatorError::CloseFailed(self.meta.curr_file_path.clone(), err))?;
        }
        tracing::debug!(path = %self.meta.curr_file_path.display(), "closed current file");
        Ok(())
    }

    /// Path of the current file.
    pub fn path(&self) -> &Path {
        &self.meta.curr_file_path
    }

    /// Directory holding the current and rotated files.
    pub fn directory(&self) -> &Path {
        &self.meta.config.directory
    }

    /// The size bound in bytes.
    pub fn max_size(&self) -> u64 {
        self.meta.max_size_bytes
    }

    /// Bytes in the current file, as tracked by the rotator.
    pub fn current_size(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .curr_file_size_bytes
    }

    /// Rotated files currently on disk, oldest first.
    pub fn rotated_files(&self) -> Result<Vec<RotatedFile>, RotatorError> {
        self.meta.names.list(&self.meta.config.directory)
    }

    /// Take the state lock for a write through a shared reference.
    ///
    /// Without internal serialization the caller promises there is no other
    /// writer, so the lock is only tried; a contended lock means that promise
    /// was broken and is reported instead of waited on.
    fn lock_state(&self) -> Result<MutexGuard<'_, RotatorState>, RotatorError> {
        if self.meta.config.serialize_writes {
            return Ok(self.state.lock().unwrap_or_else(PoisonError::into_inner));
        }
        match self.state.try_lock() {
            Ok(state) => Ok(state),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(RotatorError::ConcurrentWrite(self.meta.curr_file_path.clone())),
        }
    }
}

/// Provides a fluent interface for configuring [`Rotator`] instances.
///
/// # Default Configuration
///
/// * Rotate at 10 MB
/// * Keep all rotated files
/// * Local system time zone for rotated file names
/// * Standard file permissions
/// * Internally serialized writes
///
/// # Examples
///
/// ```rust
/// use sizeroller::{RotationSize, RotatorBuilder, TimeZone};
///
/// let dir = tempfile::tempdir().unwrap();
/// let appender = RotatorBuilder::new(dir.path(), "app.log")
///     .max_size(RotationSize::KB(256))
///     .max_keep_files(5)        // Keep only the 5 most recent rotated files
///     .time_zone(TimeZone::UTC) // Name rotated files in UTC
///     .file_mode(0o640)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct RotatorBuilder {
    config: RotatorConfig,
}

impl RotatorBuilder {
    /// Create a new rotator builder.
    /// # Arguments
    /// * `directory` - The directory where the files are stored.
    /// * `filename` - The name of the current file.
    pub fn new<P: AsRef<Path>, F: AsRef<Path>>(directory: P, filename: F) -> Self {
        RotatorBuilder {
            config: RotatorConfig::new(directory, filename),
        }
    }

    /// Set the size the current file may not exceed.
    pub fn max_size(self, max_size: RotationSize) -> Self {
        Self {
            config: RotatorConfig { max_size, ..self.config },
        }
    }

    /// Set the maximum number of rotated files to keep, 0 keeps all of them.
    pub fn max_keep_files(self, max_keep_files: u64) -> Self {
        Self {
            config: RotatorConfig {
                max_keep_files,
                ..self.config
            },
        }
    }

    /// Set the file permissions for created files (Unix-like systems only).
    /// For example, 0o644 for rw-r--r--. A created directory gets the same
    /// bits plus search permission wherever read is granted.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            config: RotatorConfig {
                file_mode: Some(mode),
                ..self.config
            },
        }
    }

    /// Set the time zone for rotated file names.
    ///
    /// [`TimeZone::Local`] is frozen to the offset in effect right now.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            config: RotatorConfig {
                time_zone: match time_zone {
                    TimeZone::UTC => Utc::now().fixed_offset().offset().to_owned(),
                    TimeZone::Local => Local::now().offset().to_owned(),
                    TimeZone::Fix(fixed_offset) => fixed_offset,
                },
                ..self.config
            },
        }
    }

    /// Set whether writes through `&Rotator` are serialized by the rotator.
    ///
    /// Turn this off when the caller already serializes its writes; an
    /// overlapping write then fails with [`RotatorError::ConcurrentWrite`].
    pub fn serialize_writes(self, serialize_writes: bool) -> Self {
        Self {
            config: RotatorConfig {
                serialize_writes,
                ..self.config
            },
        }
    }

    /// Build the rotator.
    ///
    /// Creates the directory if needed. An existing current file is adopted
    /// with its size; if it already exceeds the maximum size it is rotated
    /// before the rotator is handed out.
    pub fn build(self) -> Result<Rotator, RotatorError> {
        let filename = validate_filename(&self.config.filename)?;
        let meta = RotatorMeta {
            names: RotatedNames::new(&filename)?,
            curr_file_path: self.config.directory.join(&filename),
            max_size_bytes: self.config.max_size.bytes(),
            config: self.config,
        };

        #[cfg(not(unix))]
        {
            if meta.config.file_mode.is_some() {
                tracing::warn!("setting file permissions is not supported on non-Unix platforms");
            }
        }

        meta.create_directory()?;

        let mut state = RotatorState {
            file: None,
            curr_file_size_bytes: 0,
            last_rotated_at: None,
            closed: false,
        };
        match fs::metadata(&meta.curr_file_path) {
            Ok(metadata) if !metadata.is_file() => {
                return Err(RotatorError::OpenFileFailed(
                    meta.curr_file_path.clone(),
                    io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                ));
            }
            Ok(metadata) => {
                state.curr_file_size_bytes = metadata.len();
                if metadata.len() > meta.max_size_bytes {
                    meta.rotate(&mut state)?;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(RotatorError::MetadataFailed(meta.curr_file_path.clone(), err)),
        }
        if state.file.is_none() {
            state.file = Some(meta.open_log_file()?);
        }

        tracing::debug!(
            path = %meta.curr_file_path.display(),
            size = state.curr_file_size_bytes,
            max_size = meta.max_size_bytes,
            "opened current file"
        );
        Ok(Rotator {
            meta,
            state: Mutex::new(state),
        })
    }
}

impl io::Write for Rotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        Ok(self.meta.write(state, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        self.meta.flush(state)
    }
}

impl io::Write for &Rotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.append(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.lock_state()?;
        self.meta.flush(&mut state)
    }
}
