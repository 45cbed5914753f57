// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Dotplate reads two kinds of configuration: line-oriented definition files
//! like `variables.txt` and `install_if.txt`, and an optional settings file
//! `dotplate.toml` that picks where everything lives.
//!
//! # Definition Files
//!
//! Definition files hold one `name=expression` entry per line. The line is
//! split at the first `=`, so the expression itself may contain `==`. Blank
//! lines and lines starting with `#` or `//` are ignored. For example:
//!
//! ```text
//! # Shell to configure.
//! SHELL="zsh"
//! WORK=false
//! OTHER_DISPLAYS={"HDMI-0"}
//! ```
//!
//! # Settings File
//!
//! The settings file is a plain TOML table. Every key is optional, and every
//! path undergoes shell expansion so `~` and `$VAR` can be used:
//!
//! ```text
//! variable_file = "variables.txt"
//! install_if_file = "install_if.txt"
//! config_dir = "configs"
//! machine_dir = "machines"
//! output_dir = "~"
//! diff_context_lines = 2
//! ```

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Single `name=expression` entry of a definition file.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Entry {
    /// Left-hand side of the entry.
    pub name: String,

    /// Unparsed right-hand side of the entry.
    pub expression: String,

    /// Line number the entry was read from, starting at one.
    pub line: usize,
}

/// Line-oriented definition file.
///
/// # Invariants
///
/// - No two entries share a name.
/// - Entries keep the order they appear in the file.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DefinitionFile {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl DefinitionFile {
    /// Read and parse definition file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingFile`] if no file exists at path.
    /// - Return [`ConfigError::ReadFile`] if file cannot be read.
    /// - Return [`ConfigError::MalformedLine`] or
    ///   [`ConfigError::DuplicateEntry`] if file content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("read definition file {:?}", path.display());
        let content = read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ConfigError::MissingFile {
                path: path.to_path_buf(),
            },
            _ => ConfigError::ReadFile {
                source: err,
                path: path.to_path_buf(),
            },
        })?;

        Self::parse(path, &content)
    }

    /// Parse definition file content.
    ///
    /// The path is only used for error reporting.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MalformedLine`] if a line is not a comment, and
    ///   has no `=` or no name.
    /// - Return [`ConfigError::DuplicateEntry`] if a name is listed twice.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
                continue;
            }

            let Some((name, expression)) = trimmed.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    path,
                    line,
                    content: raw.into(),
                });
            };

            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::MalformedLine {
                    path,
                    line,
                    content: raw.into(),
                });
            }

            if !seen.insert(name.to_owned()) {
                return Err(ConfigError::DuplicateEntry {
                    path,
                    line,
                    name: name.into(),
                });
            }

            entries.push(Entry {
                name: name.into(),
                expression: expression.trim().into(),
                line,
            });
        }

        Ok(Self { path, entries })
    }

    /// Path definition file was read from.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Iterate through entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}

/// Settings layout.
///
/// Every field falls back to a default relative to the current working
/// directory, except the output directory, which falls back to the user's
/// home directory when left unset.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// File holding variable definitions for this install.
    pub variable_file: PathBuf,

    /// File holding conditional installation expressions.
    pub install_if_file: PathBuf,

    /// Directory holding dotfile templates.
    pub config_dir: PathBuf,

    /// Directory holding starter variable files for bootstrap.
    pub machine_dir: PathBuf,

    /// Directory to write rendered dotfiles to.
    pub output_dir: Option<PathBuf>,

    /// Lines of context to show around each change in a diff.
    pub diff_context_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            variable_file: "variables.txt".into(),
            install_if_file: "install_if.txt".into(),
            config_dir: "configs".into(),
            machine_dir: "machines".into(),
            output_dir: None,
            diff_context_lines: 2,
        }
    }
}

impl Settings {
    /// Load settings file at target path, or use defaults if it is missing.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadFile`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not valid settings.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(content) => {
                debug!("read settings from {:?}", path.display());
                content.parse()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no settings at {:?}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::ReadFile {
                source: err,
                path: path.to_path_buf(),
            }),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on all path fields.
        settings.variable_file = expand_path(&settings.variable_file)?;
        settings.install_if_file = expand_path(&settings.install_if_file)?;
        settings.config_dir = expand_path(&settings.config_dir)?;
        settings.machine_dir = expand_path(&settings.machine_dir)?;
        settings.output_dir = settings
            .output_dir
            .as_deref()
            .map(expand_path)
            .transpose()?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Perform shell expansion on path.
///
/// # Errors
///
/// - Return [`ConfigError::ShellExpansion`] if an environment variable in
///   the path is not set.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(shellexpand::full(path.to_string_lossy().as_ref())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned()
        .into())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required file does not exist.
    #[error("missing file {:?}", path.display())]
    MissingFile { path: PathBuf },

    /// File exists but could not be read.
    #[error("failed to read {:?}", path.display())]
    ReadFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Line is neither a comment nor a `name=expression` entry.
    #[error("{}:{line}: expected `name=expression`, found {content:?}", path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// Entry name is listed more than once.
    #[error("{}:{line}: `{name}` is already defined", path.display())]
    DuplicateEntry {
        path: PathBuf,
        line: usize,
        name: String,
    },

    /// Variable name is not a valid identifier.
    #[error("{}:{line}: `{name}` is not a valid variable name", path.display())]
    InvalidName {
        path: PathBuf,
        line: usize,
        name: String,
    },

    /// Expression of an entry is malformed or cannot be evaluated.
    #[error("{}:{line}: invalid expression for `{name}`: {expression:?}", path.display())]
    Expression {
        #[source]
        source: crate::expr::ExprError,
        path: PathBuf,
        line: usize,
        name: String,
        expression: String,
    },

    /// Failed to deserialize settings.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize settings.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on settings.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn parse_definition_file() -> anyhow::Result<()> {
        let content = indoc! {r#"
            # Machine specific settings.
            SHELL="zsh"

            // Work laptop only.
            WORK = true
            bashrc=SHELL == "bash"
        "#};
        let result = DefinitionFile::parse("variables.txt", content)?;
        let expect = vec![
            Entry {
                name: "SHELL".into(),
                expression: r#""zsh""#.into(),
                line: 2,
            },
            Entry {
                name: "WORK".into(),
                expression: "true".into(),
                line: 5,
            },
            Entry {
                name: "bashrc".into(),
                expression: r#"SHELL == "bash""#.into(),
                line: 6,
            },
        ];

        assert_eq!(result.entries().cloned().collect::<Vec<_>>(), expect);
        assert_eq!(result.path(), Path::new("variables.txt"));

        Ok(())
    }

    #[test]
    fn parse_definition_file_rejects_missing_equals() {
        let result = DefinitionFile::parse("variables.txt", "SHELL=\"zsh\"\nWORK\n");
        assert!(matches!(
            result,
            Err(ConfigError::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn parse_definition_file_rejects_empty_name() {
        let result = DefinitionFile::parse("install_if.txt", " = true\n");
        assert!(matches!(
            result,
            Err(ConfigError::MalformedLine { line: 1, .. })
        ));
    }

    #[test]
    fn parse_definition_file_rejects_duplicates() {
        let result = DefinitionFile::parse("variables.txt", "WORK=true\nWORK=false\n");
        match result {
            Err(ConfigError::DuplicateEntry { line, name, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(name, "WORK");
            }
            other => panic!("expected duplicate entry error, got {other:?}"),
        }
    }

    #[sealed_test]
    fn load_missing_definition_file() {
        let result = DefinitionFile::load("variables.txt");
        assert!(matches!(result, Err(ConfigError::MissingFile { .. })));
    }

    #[sealed_test(env = [("BLAH", "/home/blah")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = indoc! {r#"
            variable_file = "$BLAH/dotfiles/variables.txt"
            config_dir = "$BLAH/dotfiles/configs"
            output_dir = "$BLAH"
            diff_context_lines = 5
        "#}
        .parse()?;

        let expect = Settings {
            variable_file: "/home/blah/dotfiles/variables.txt".into(),
            install_if_file: "install_if.txt".into(),
            config_dir: "/home/blah/dotfiles/configs".into(),
            machine_dir: "machines".into(),
            output_dir: Some("/home/blah".into()),
            diff_context_lines: 5,
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_settings_rejects_unknown_keys() {
        let result = "template_dir = \"configs\"".parse::<Settings>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn serialize_default_settings() {
        let result = Settings::default().to_string();
        let expect = indoc! {r#"
            variable_file = "variables.txt"
            install_if_file = "install_if.txt"
            config_dir = "configs"
            machine_dir = "machines"
            diff_context_lines = 2
        "#};

        assert_eq!(result, expect);
    }

    #[sealed_test]
    fn load_or_default_without_settings_file() -> anyhow::Result<()> {
        let result = Settings::load_or_default("dotplate.toml")?;
        assert_eq!(result, Settings::default());
        Ok(())
    }
}
