//! Names of rotated files.
//!
//! A rotated file is the former current file renamed to
//! `<filename>.<timestamp>`, e.g. `app.log.2025-04-01T19-55-02.123456`. The
//! timestamp is fixed width and zero padded, so comparing names as strings
//! gives the same order as comparing the instants they encode.

use {
    crate::RotatorError,
    chrono::{DateTime, FixedOffset, NaiveDateTime},
    regex::Regex,
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Timestamp suffix format, microsecond resolution and no colons.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6f";

const TIMESTAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}\.\d{6}";

/// A rotated file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedFile {
    /// Full path of the rotated file.
    pub path: PathBuf,
    /// The instant encoded in the file name, in the rotator's time zone.
    pub rotated_at: NaiveDateTime,
}

/// Builds and recognizes the rotated names belonging to one base filename.
#[derive(Debug, Clone)]
pub(crate) struct RotatedNames {
    filename: String,
    prefix: String,
    pattern: Regex,
}

impl RotatedNames {
    pub(crate) fn new(filename: &str) -> Result<Self, RotatorError> {
        let pattern = Regex::new(&format!(r"^{}\.({TIMESTAMP_PATTERN})$", regex::escape(filename)))
            .map_err(|err| RotatorError::InternalError(err.to_string()))?;
        Ok(RotatedNames {
            filename: filename.to_string(),
            prefix: format!("{filename}."),
            pattern,
        })
    }

    /// The rotated file name for a rotation happening at `datetime`.
    pub(crate) fn name_for(&self, datetime: &DateTime<FixedOffset>) -> String {
        format!("{}.{}", self.filename, datetime.format(TIMESTAMP_FORMAT))
    }

    /// Parse the rotation instant out of a file name.
    ///
    /// Returns `None` for names that do not belong to this base filename,
    /// `Some(None)` for names that do but carry an unparsable suffix.
    fn parse(&self, name: &str) -> Option<Option<NaiveDateTime>> {
        if !name.starts_with(&self.prefix) {
            return None;
        }
        Some(
            self.pattern
                .captures(name)
                .and_then(|captures| captures.get(1))
                .and_then(|suffix| NaiveDateTime::parse_from_str(suffix.as_str(), TIMESTAMP_FORMAT).ok()),
        )
    }

    /// List the rotated files in `directory`, oldest first.
    ///
    /// Any regular file named `<filename>.*` whose suffix is not a rotation
    /// timestamp, including a suffix that is not valid UTF-8, is reported as [`RotatorError::UnrecognizedRotatedFile`].
    pub(crate) fn list(&self, directory: &Path) -> Result<Vec<RotatedFile>, RotatorError> {
        let entries =
            fs::read_dir(directory).map_err(|err| RotatorError::ReadDirectoryFailed(directory.to_path_buf(), err))?;

        let mut rotated = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| RotatorError::ReadDirectoryFailed(directory.to_path_buf(), err))?;
            let file_name = entry.file_name();
            let parsed = match file_name.to_str() {
                Some(name) => self.parse(name),
                // A non-UTF-8 suffix can never be a rotation timestamp.
                None if file_name.as_encoded_bytes().starts_with(self.prefix.as_bytes()) => Some(None),
                None => None,
            };
            let Some(parsed) = parsed else {
                continue;
            };
            let file_type = entry
                .file_type()
                .map_err(|err| RotatorError::MetadataFailed(entry.path(), err))?;
            if !file_type.is_file() {
                continue;
            }
            let rotated_at = parsed.ok_or_else(|| RotatorError::UnrecognizedRotatedFile(entry.path()))?;
            rotated.push(RotatedFile {
                path: entry.path(),
                rotated_at,
            });
        }

        rotated.sort_by(|a, b| a.rotated_at.cmp(&b.rotated_at));
        Ok(rotated)
    }
}
