// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Search path scanning.
//!
//! Templates and install conditions often need to know what programs are
//! available on the current machine, e.g., only install an i3 configuration
//! if `i3` is actually installed. The scanner collects the file name of every
//! executable found in the directories of `$PATH`, which the variable loader
//! then exposes as `PATH_BINARIES`.

use std::{
    collections::BTreeSet,
    env,
    ffi::OsStr,
    fs::{read_dir, DirEntry},
    path::Path,
};
use tracing::{debug, instrument};

/// Collect executable names visible through the `PATH` environment variable.
///
/// Returns an empty set if `PATH` is not set.
pub fn path_binaries() -> BTreeSet<String> {
    match env::var_os("PATH") {
        Some(path) => scan_search_path(path),
        None => {
            debug!("PATH is not set");
            BTreeSet::new()
        }
    }
}

/// Collect executable names from a `PATH`-style list of directories.
///
/// Entries that are not directories, or cannot be read, are skipped.
/// Duplicate names across directories collapse into one.
#[instrument(skip(search_path), level = "debug")]
pub fn scan_search_path(search_path: impl AsRef<OsStr>) -> BTreeSet<String> {
    let mut binaries = BTreeSet::new();
    for dir in env::split_paths(search_path.as_ref()) {
        if !dir.is_dir() {
            debug!("skip search path entry {:?}: not a directory", dir.display());
            continue;
        }

        let entries = match read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("skip search path entry {:?}: {err}", dir.display());
                continue;
            }
        };

        for entry in entries.flatten() {
            if !is_executable(&entry) {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) => {
                    binaries.insert(name);
                }
                Err(name) => debug!("skip non UTF-8 executable name {name:?}"),
            }
        }
    }

    debug!("found {} executables on search path", binaries.len());
    binaries
}

// INVARIANT: Follow symlinks, because most of /usr/bin is symlinks.
fn is_executable(entry: &DirEntry) -> bool {
    let path = entry.path();
    match path.metadata() {
        Ok(metadata) => metadata.is_file() && has_exec_bit(&path, &metadata),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn has_exec_bit(_path: &Path, metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(path: &Path, _metadata: &std::fs::Metadata) -> bool {
    path.extension().is_some_and(|ext| {
        ["exe", "bat", "cmd", "com"]
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}
