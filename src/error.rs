use std::{io, path::PathBuf};

/// Errors that can occur when using the rotator.
#[derive(Debug, thiserror::Error)]
pub enum RotatorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, #[source] io::Error),
    #[error("Failed to read metadata of '{0}': {1}")]
    MetadataFailed(PathBuf, #[source] io::Error),
    #[error("Failed to open file '{0}': {1}")]
    OpenFileFailed(PathBuf, #[source] io::Error),
    #[error("Failed to write to '{0}': {1}")]
    WriteFailed(PathBuf, #[source] io::Error),
    #[error("Failed to close '{0}': {1}")]
    CloseFailed(PathBuf, #[source] io::Error),
    #[error("Failed to rename file from '{from}' to '{to}': {error}")]
    RenameFileError {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Failed to list directory '{0}': {1}")]
    ReadDirectoryFailed(PathBuf, #[source] io::Error),
    #[error("Failed to remove rotated file '{0}': {1}")]
    RemoveFileFailed(PathBuf, #[source] io::Error),
    #[error("Unrecognized rotated file '{0}': suffix is not a rotation timestamp")]
    UnrecognizedRotatedFile(PathBuf),
    #[error("Rotator for '{0}' is closed")]
    Closed(PathBuf),
    #[error("Rotator for '{0}' has no current file after a failed rotation")]
    RotationIncomplete(PathBuf),
    #[error("Concurrent write to '{0}' while internal serialization is disabled")]
    ConcurrentWrite(PathBuf),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RotatorError {
    /// The underlying filesystem error, if this error came from one.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            RotatorError::CreateDirectoryFailed(_, err)
            | RotatorError::MetadataFailed(_, err)
            | RotatorError::OpenFileFailed(_, err)
            | RotatorError::WriteFailed(_, err)
            | RotatorError::CloseFailed(_, err)
            | RotatorError::ReadDirectoryFailed(_, err)
            | RotatorError::RemoveFileFailed(_, err)
            | RotatorError::RenameFileError { error: err, .. } => Some(err),
            _ => None,
        }
    }

    fn kind(&self) -> io::ErrorKind {
        if let Some(err) = self.io_error() {
            return err.kind();
        }
        match self {
            RotatorError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
            RotatorError::UnrecognizedRotatedFile(_) => io::ErrorKind::InvalidData,
            RotatorError::ConcurrentWrite(_) => io::ErrorKind::WouldBlock,
            RotatorError::Closed(_) | RotatorError::RotationIncomplete(_) => io::ErrorKind::BrokenPipe,
            _ => io::ErrorKind::Other,
        }
    }
}

impl From<RotatorError> for io::Error {
    fn from(err: RotatorError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kind_survives_conversion() {
        let err = RotatorError::OpenFileFailed(
            PathBuf::from("/logs/app.log"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(err.io_error().is_some());
        let converted: io::Error = err.into();
        assert_eq!(converted.kind(), io::ErrorKind::PermissionDenied);
        assert!(converted.to_string().contains("/logs/app.log"));
    }

    #[test]
    fn non_io_errors_map_to_descriptive_kinds() {
        let closed: io::Error = RotatorError::Closed(PathBuf::from("app.log")).into();
        assert_eq!(closed.kind(), io::ErrorKind::BrokenPipe);

        let racing = RotatorError::ConcurrentWrite(PathBuf::from("app.log"));
        assert!(racing.io_error().is_none());
        assert_eq!(io::Error::from(racing).kind(), io::ErrorKind::WouldBlock);
    }
}
