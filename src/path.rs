//! Absolute-path tokenizing. Paths start at the root, components are
//! separated by `/`, and a single trailing slash is tolerated. Empty
//! intermediate components, over-long names and over-deep paths are
//! all malformed.

use crate::config::{NAME_MAX_LEN, PATH_DEPTH, PATH_MAX_LEN};
use crate::error::{FsError, Result};

/// Splits an absolute path into its components. The root path `/`
/// yields no components.
pub(crate) fn split(path: &str) -> Result<Vec<&str>> {
    if path.len() > PATH_MAX_LEN {
        return Err(FsError::Invalid);
    }
    let rest = path.strip_prefix('/').ok_or(FsError::Invalid)?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    let components: Vec<&str> = rest.split('/').collect();
    if components.len() > PATH_DEPTH {
        return Err(FsError::Invalid);
    }
    for component in &components {
        if component.is_empty() || component.len() > NAME_MAX_LEN {
            return Err(FsError::Invalid);
        }
    }
    Ok(components)
}
