// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! First run bootstrap.
//!
//! The variable file is local to each machine, and is not tracked alongside
//! the templates. Instead, the machine directory holds one starter variable
//! file per known machine:
//!
//! ```text
//! machines/
//! ├── home_pc.txt
//! └── work_laptop.txt
//! ```
//!
//! When the variable file is missing, bootstrap asks which machine this is,
//! and symlinks the variable file to the matching starter. Edits to the
//! starter then show up on the next deploy without copying anything around.

use crate::prompt::{PromptError, Prompter};

use std::{
    fs::read_dir,
    io,
    path::{self, Path, PathBuf},
};
use tracing::{info, instrument};

/// State of the variable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableFileState {
    /// Variable file exists, deploy can go ahead.
    Ready,

    /// Variable file is missing, bootstrap is needed.
    Missing,
}

/// Bootstrap of a missing variable file from a starter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    variable_file: PathBuf,
    machine_dir: PathBuf,
}

impl Bootstrap {
    /// Construct new bootstrap for target variable file.
    pub fn new(variable_file: impl Into<PathBuf>, machine_dir: impl Into<PathBuf>) -> Self {
        Self {
            variable_file: variable_file.into(),
            machine_dir: machine_dir.into(),
        }
    }

    /// Check whether the variable file needs bootstrapping.
    ///
    /// A dangling symlink counts as missing.
    pub fn state(&self) -> VariableFileState {
        if self.variable_file.exists() {
            VariableFileState::Ready
        } else {
            VariableFileState::Missing
        }
    }

    /// List file names of starter variable files, sorted.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::ReadMachineDir`] if the machine directory
    ///   cannot be read.
    pub fn starters(&self) -> Result<Vec<String>> {
        let read_error = |err| BootstrapError::ReadMachineDir {
            source: err,
            path: self.machine_dir.clone(),
        };

        let mut starters = Vec::new();
        for entry in read_dir(&self.machine_dir).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            if !entry.path().is_file() {
                continue;
            }

            if let Ok(name) = entry.file_name().into_string() {
                starters.push(name);
            }
        }
        starters.sort();

        Ok(starters)
    }

    /// Symlink variable file to a starter in the machine directory.
    ///
    /// The link points at the absolute path of the starter, so it stays
    /// valid no matter where the variable file lives.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::UnknownStarter`] if there is no such
    ///   starter.
    /// - Return [`BootstrapError::Link`] if the symlink cannot be created.
    pub fn link(&self, starter: &str) -> Result<PathBuf> {
        let target = self.machine_dir.join(starter);
        if !target.is_file() {
            return Err(BootstrapError::UnknownStarter {
                name: starter.into(),
                path: self.machine_dir.clone(),
            });
        }

        let link_error = |err| BootstrapError::Link {
            source: err,
            path: self.variable_file.clone(),
        };
        let target = path::absolute(&target).map_err(link_error)?;
        if let Some(parent) = self.variable_file.parent() {
            mkdirp::mkdirp(parent).map_err(link_error)?;
        }
        symlink(&target, &self.variable_file).map_err(link_error)?;
        info!(
            "link {:?} to {:?}",
            self.variable_file.display(),
            target.display()
        );

        Ok(target)
    }

    /// Run bootstrap if the variable file is missing.
    ///
    /// Does nothing when the variable file already exists. Otherwise, asks
    /// the user to pick a starter and links it.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::NoStarters`] if there is nothing to pick.
    /// - Return [`BootstrapError::Declined`] if the user cancels.
    /// - Return [`BootstrapError::Prompt`] if prompting fails.
    /// - Same as [`Bootstrap::starters`] and [`Bootstrap::link`].
    #[instrument(skip(self, prompter), level = "debug")]
    pub fn run(&self, prompter: &mut impl Prompter) -> Result<VariableFileState> {
        if self.state() == VariableFileState::Ready {
            return Ok(VariableFileState::Ready);
        }

        info!(
            "variable file {:?} is missing",
            self.variable_file.display()
        );
        let starters = self.starters()?;
        if starters.is_empty() {
            return Err(BootstrapError::NoStarters {
                path: self.machine_dir.clone(),
            });
        }

        let Some(starter) = prompter.select_starter(&starters)? else {
            return Err(BootstrapError::Declined {
                path: self.variable_file.clone(),
            });
        };
        self.link(&starter)?;

        Ok(self.state())
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Bootstrap error types.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Machine directory cannot be read.
    #[error("failed to read machine directory {:?}", path.display())]
    ReadMachineDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Machine directory holds no starter variable files.
    #[error("no starter variable files in {:?}", path.display())]
    NoStarters { path: PathBuf },

    /// Requested starter does not exist.
    #[error("no starter {name:?} in {:?}", path.display())]
    UnknownStarter { name: String, path: PathBuf },

    /// User cancelled bootstrap.
    #[error("cannot deploy without variable file {:?}", path.display())]
    Declined { path: PathBuf },

    /// Variable file cannot be linked.
    #[error("failed to link variable file {:?}", path.display())]
    Link {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Prompting the user fails.
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Friendly result alias :3
pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
