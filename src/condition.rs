// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Install conditions.
//!
//! Each top-level subdirectory of the configs directory groups the templates
//! of one program. The condition file decides which of these groups get
//! installed on the current machine:
//!
//! ```text
//! bashrc=SHELL == "bash"
//! i3="i3" in PATH_BINARIES
//! xmodmap=WORK
//! ```
//!
//! A listed subdirectory is installed only if its expression is truthy, and a
//! subdirectory listed with an empty expression is never installed.
//! Subdirectories that are not listed are always installed.

use crate::{
    config::{ConfigError, DefinitionFile, Result},
    expr::Expr,
    vars::Variables,
};

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
    source: String,
    expr: Option<Expr>,
    line: usize,
}

/// Parsed condition file mapping subdirectories to gating expressions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallConditions {
    path: PathBuf,
    conditions: BTreeMap<String, Condition>,
}

impl InstallConditions {
    /// Load condition file at target path.
    ///
    /// A missing condition file is treated as an empty one, so every
    /// subdirectory gets installed.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadFile`] if condition file cannot be read.
    /// - Return [`ConfigError::Expression`] if an expression is malformed.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match DefinitionFile::load(path.as_ref()) {
            Ok(file) => Self::from_definitions(&file),
            Err(ConfigError::MissingFile { path }) => {
                info!("no condition file at {:?}, install everything", path.display());
                Ok(Self {
                    path,
                    conditions: BTreeMap::new(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Parse the expression of every entry in a definition file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Expression`] if an expression is malformed.
    pub fn from_definitions(file: &DefinitionFile) -> Result<Self> {
        let mut conditions = BTreeMap::new();
        for entry in file.entries() {
            let expr = if entry.expression.is_empty() {
                None
            } else {
                let expr =
                    Expr::parse(&entry.expression).map_err(|err| ConfigError::Expression {
                        source: err,
                        path: file.path().to_path_buf(),
                        line: entry.line,
                        name: entry.name.clone(),
                        expression: entry.expression.clone(),
                    })?;
                Some(expr)
            };

            conditions.insert(
                entry.name.clone(),
                Condition {
                    source: entry.expression.clone(),
                    expr,
                    line: entry.line,
                },
            );
        }

        Ok(Self {
            path: file.path().to_path_buf(),
            conditions,
        })
    }

    /// Decide whether a config subdirectory should be installed.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Expression`] if the subdirectory's expression
    ///   refers to an undefined variable, or misuses an operator.
    pub fn should_install(&self, subdir: &str, variables: &Variables) -> Result<bool> {
        let Some(condition) = self.conditions.get(subdir) else {
            debug!("{subdir}: no install condition");
            return Ok(true);
        };

        let Some(expr) = &condition.expr else {
            debug!("{subdir}: empty install condition");
            return Ok(false);
        };

        let install = expr
            .eval_bool(variables)
            .map_err(|err| ConfigError::Expression {
                source: err,
                path: self.path.clone(),
                line: condition.line,
                name: subdir.into(),
                expression: condition.source.clone(),
            })?;
        debug!("{subdir}: `{}` is {install}", condition.source);

        Ok(install)
    }

    /// Iterate through names of every listed subdirectory.
    pub fn listed(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    /// Check if there are no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
