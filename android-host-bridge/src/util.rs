use std::path::PathBuf;

/// Accepts `path` only if it is rooted at `/`.
///
/// The framework reports unmounted or inaccessible volumes with empty or
/// placeholder paths, which are rejected here.
pub fn try_get_absolute_path(path: Option<&str>) -> Option<PathBuf> {
    let path = path?;
    if !path.starts_with('/') {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Combines the outcome of some work with the outcome of the release step
/// that has to follow it either way. The work's own error takes precedence.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) fn with_cleanup<T, E>(result: Result<T, E>, cleanup: Result<(), E>) -> Result<T, E> {
    let value = result?;
    cleanup?;
    Ok(value)
}
