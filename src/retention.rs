//! Retention of rotated files.

use {
    crate::{naming::RotatedNames, RotatorError},
    std::{
        fs, io,
        path::{Path, PathBuf},
    },
};

/// Remove the oldest rotated files in `directory` until at most `keep` remain.
///
/// Files are removed oldest first. The first removal that fails aborts the
/// pass; files removed before it stay removed. Returns the removed paths.
pub(crate) fn prune(directory: &Path, names: &RotatedNames, keep: usize) -> Result<Vec<PathBuf>, RotatorError> {
    prune_with(directory, names, keep, |path| fs::remove_file(path))
}

fn prune_with(
    directory: &Path,
    names: &RotatedNames,
    keep: usize,
    mut remove: impl FnMut(&Path) -> io::Result<()>,
) -> Result<Vec<PathBuf>, RotatorError> {
    let rotated = names.list(directory)?;
    if rotated.len() <= keep {
        return Ok(Vec::new());
    }

    let excess = rotated.len() - keep;
    let mut removed = Vec::with_capacity(excess);
    for file in rotated.into_iter().take(excess) {
        remove(&file.path).map_err(|err| RotatorError::RemoveFileFailed(file.path.clone(), err))?;
        tracing::debug!(path = %file.path.display(), "removed rotated file");
        removed.push(file.path);
    }
    Ok(removed)
}
