// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where rendered dotfiles should land, and how template paths map
//! onto that location.

use std::path::{Component, Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Resolve output directory to deploy rendered dotfiles into.
///
/// Uses the configured directory if one was given, otherwise falls back to
/// the user's home directory.
///
/// # Errors
///
/// - Return [`NoWayHome`] if no directory was configured and home directory
///   path cannot be determined.
pub fn output_dir(configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) => Ok(path.to_path_buf()),
        None => home_dir(),
    }
}

/// Map template path onto its install location.
///
/// The first component of a template path names its config subdirectory, and
/// is dropped: `vim/.vimrc` installs to `<output_dir>/.vimrc`. Returns
/// [`None`] for paths that have no component past the subdirectory, or that
/// are not plain relative paths.
pub fn install_path(output_dir: &Path, template_path: &Path) -> Option<PathBuf> {
    let mut components = template_path.components();
    match components.next() {
        Some(Component::Normal(_)) => (),
        _ => return None,
    }

    let rest = components.as_path();
    if rest.as_os_str().is_empty()
        || !rest
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }

    Some(output_dir.join(rest))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
