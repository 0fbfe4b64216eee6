//! Filesystem helpers shared by the registry, cache and local index writers

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{RepoError, Result};

/// Write `contents` to `path` so readers see either the old or the new file
///
/// The temporary file lives in the destination directory so that the final
/// rename never crosses a filesystem boundary. Parent directories are created.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|e| RepoError::io(parent, e))?;
    }

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| RepoError::io(parent, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        let perms = std::fs::Permissions::from_mode(0o600);
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| RepoError::io(tmp.path(), e))?;
    }

    tmp.write_all(contents)
        .map_err(|e| RepoError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| RepoError::io(tmp.path(), e))?;

    tmp.persist(path)
        .map_err(|err| RepoError::io(path, err.error))?;

    Ok(())
}

/// Remove a file, treating "already absent" as success
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(RepoError::io(path, e)),
    }
}
