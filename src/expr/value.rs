// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Runtime values of the expression language.

use serde::Serialize;
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Evaluated value of an expression.
///
/// Serializes untagged, so templates see plain booleans, strings, and arrays
/// of strings. Sets are kept ordered to make rendering deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Str(String),
    Set(BTreeSet<String>),
}

impl Value {
    /// Determine truthiness of value.
    ///
    /// Booleans are themselves. Strings and sets are truthy when they are not
    /// empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Str(value) => !value.is_empty(),
            Self::Set(value) => !value.is_empty(),
        }
    }

    /// Name of value kind for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Set(_) => "set",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<BTreeSet<String>> for Value {
    fn from(value: BTreeSet<String>) -> Self {
        Self::Set(value)
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(values: [&str; N]) -> Self {
        Self::Set(values.into_iter().map(str::to_owned).collect())
    }
}

impl Display for Value {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Bool(true) => fmt.write_str("true"),
            Self::Bool(false) => fmt.write_str("false"),
            Self::Str(value) => write!(fmt, "{value:?}"),
            Self::Set(values) => {
                fmt.write_str("{")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        fmt.write_str(", ")?;
                    }
                    write!(fmt, "{value:?}")?;
                }
                fmt.write_str("}")
            }
        }
    }
}
