// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template driven dotfile deployment.
//!
//! Dotplate keeps one set of dotfile templates for every machine a user owns,
//! and renders them with a small set of machine specific variables. A dotfile
//! repository looks like this:
//!
//! ```text
//! dotfiles/
//! ├── configs/
//! │   ├── bashrc/.bashrc
//! │   ├── i3/.config/i3/config
//! │   └── zsh/.zshrc
//! ├── machines/
//! │   ├── home_pc.txt
//! │   └── work_laptop.txt
//! ├── install_if.txt
//! └── variables.txt -> machines/work_laptop.txt
//! ```
//!
//! # Variables
//!
//! The variable file binds names to values written in a restricted
//! expression language: strings, booleans, and sets of strings. The reserved
//! `PATH_BINARIES` variable always holds the names of every executable on the
//! search path.
//!
//! # Install Conditions
//!
//! Each subdirectory of `configs/` groups the templates of one program. The
//! condition file gates a subdirectory behind a boolean expression, e.g.,
//! `i3="i3" in PATH_BINARIES`. Unlisted subdirectories are always installed.
//!
//! # Deployment
//!
//! Every template of an installed subdirectory is rendered, and written to
//! the output directory (the user's home by default) with its subdirectory
//! stripped from its path. Files are only written when their content changes.
//! See [`deploy`] for the full pipeline.

pub mod bootstrap;
pub mod condition;
pub mod config;
pub mod deploy;
pub mod diff;
pub mod expr;
pub mod path;
pub mod prompt;
pub mod scan;
pub mod template;
pub mod vars;
