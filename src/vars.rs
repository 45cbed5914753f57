// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Variable mapping.
//!
//! The variable file describes the machine being deployed to. Each entry
//! binds an identifier to the value of an expression, which templates and
//! install conditions can then refer to:
//!
//! ```text
//! SHELL="zsh"
//! WORK=true
//! STATUSBAR_DISPLAYS={"DP-3", "DP-3-8"}
//! ```
//!
//! Variable expressions cannot refer to each other, so every entry is
//! evaluated on its own in an empty scope. One name is reserved:
//! `PATH_BINARIES` always holds the executables found on the search path,
//! whatever the variable file says.

use crate::{
    config::{ConfigError, DefinitionFile, Result},
    expr::{EmptyScope, Expr, Scope, Value},
};

use std::{
    collections::{btree_map::Iter, BTreeMap, BTreeSet},
    path::Path,
};
use tracing::{debug, instrument, warn};

/// Reserved variable holding executables found on the search path.
pub const PATH_BINARIES: &str = "PATH_BINARIES";

/// Immutable name to value mapping driving templates and conditions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, Value>,
}

impl Variables {
    /// Load variables from definition file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingFile`] if variable file does not exist.
    /// - Return any other [`ConfigError`] if the file or one of its
    ///   expressions is invalid.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_definitions(&DefinitionFile::load(path)?)
    }

    /// Evaluate every entry of a parsed definition file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::InvalidName`] if a name is not an identifier.
    /// - Return [`ConfigError::Expression`] if an expression is malformed,
    ///   or refers to a variable.
    pub fn from_definitions(file: &DefinitionFile) -> Result<Self> {
        let mut values = BTreeMap::new();
        for entry in file.entries() {
            if !is_identifier(&entry.name) {
                return Err(ConfigError::InvalidName {
                    path: file.path().to_path_buf(),
                    line: entry.line,
                    name: entry.name.clone(),
                });
            }

            let value = Expr::parse(&entry.expression)
                .and_then(|expr| expr.eval(&EmptyScope))
                .map_err(|err| ConfigError::Expression {
                    source: err,
                    path: file.path().to_path_buf(),
                    line: entry.line,
                    name: entry.name.clone(),
                    expression: entry.expression.clone(),
                })?;

            // INVARIANT: Reserved entries are still checked, but never bound.
            if entry.name == PATH_BINARIES {
                warn!(
                    "{}:{}: ignore definition of reserved variable {PATH_BINARIES}",
                    file.path().display(),
                    entry.line
                );
                continue;
            }

            debug!("{} = {value}", entry.name);
            values.insert(entry.name.clone(), value);
        }

        Ok(Self { values })
    }

    /// Bind search path executables to [`PATH_BINARIES`].
    pub fn with_path_binaries(mut self, binaries: BTreeSet<String>) -> Self {
        self.values
            .insert(PATH_BINARIES.into(), Value::Set(binaries));
        self
    }

    /// Look up value of variable.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterate through variables ordered by name.
    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no variables.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Scope for Variables {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl<'a> IntoIterator for &'a Variables {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
