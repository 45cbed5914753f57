// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User interaction.
//!
//! Every question dotplate asks goes through the [`Prompter`] trait, so that
//! bootstrap and the review loop can be driven by something other than a
//! terminal.

use crate::template::TemplateFile;

use inquire::{Confirm, Select};
use std::{
    env,
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    process::{Command, ExitStatus},
};
use tracing::{debug, instrument};

/// What to do with a rendered file that differs from the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    /// Open template and installed file in an editor, then render again.
    Edit,

    /// Render again, picking up changes made to the template elsewhere.
    Refresh,

    /// Leave installed file alone.
    Skip,

    /// Replace installed file with rendered one.
    Overwrite,

    /// Stop reviewing files.
    Quit,
}

impl ReviewAction {
    /// Every action, in the order they are offered.
    pub const ALL: [ReviewAction; 5] = [
        Self::Edit,
        Self::Refresh,
        Self::Skip,
        Self::Overwrite,
        Self::Quit,
    ];
}

impl Display for ReviewAction {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Edit => "edit",
            Self::Refresh => "refresh",
            Self::Skip => "skip",
            Self::Overwrite => "overwrite",
            Self::Quit => "quit",
        };
        fmt.write_str(label)
    }
}

/// Ask the user things.
pub trait Prompter {
    /// Pick one starter variable file, or none to cancel.
    fn select_starter(&mut self, starters: &[String]) -> Result<Option<String>>;

    /// Pick what to do with a rendered file.
    fn review(&mut self, file: &TemplateFile) -> Result<ReviewAction>;

    /// Ask a yes or no question.
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Open files in an editor, and wait until the user is done.
    fn edit(&mut self, paths: &[&Path]) -> Result<()>;
}

/// Terminal prompter built on [`inquire`].
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl InquirePrompter {
    /// Construct new terminal prompter.
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for InquirePrompter {
    fn select_starter(&mut self, starters: &[String]) -> Result<Option<String>> {
        Ok(
            Select::new("No variable file found. Link one of these?", starters.to_vec())
                .with_help_message("esc to cancel")
                .prompt_skippable()?,
        )
    }

    fn review(&mut self, file: &TemplateFile) -> Result<ReviewAction> {
        let message = format!("{}", file.output_path().display());
        let action = Select::new(&message, ReviewAction::ALL.to_vec())
            .with_help_message("esc to skip")
            .prompt_skippable()?;

        Ok(action.unwrap_or(ReviewAction::Skip))
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        Ok(Confirm::new(message).with_default(false).prompt()?)
    }

    #[instrument(skip(self), level = "debug")]
    fn edit(&mut self, paths: &[&Path]) -> Result<()> {
        let editor = editor();
        let mut words = editor.split_whitespace();
        let program = words.next().unwrap_or("vi");

        debug!("run {program:?} on {paths:?}");
        let status = Command::new(program)
            .args(words)
            .args(paths)
            .status()
            .map_err(|err| PromptError::Editor {
                source: err,
                editor: program.into(),
            })?;

        if !status.success() {
            return Err(PromptError::EditorStatus {
                editor: program.into(),
                status,
            });
        }

        Ok(())
    }
}

// INVARIANT: Prefer $VISUAL over $EDITOR, and ignore blank values.
fn editor() -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "vi".into())
}

/// User interaction error types.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Terminal prompt fails, or is interrupted.
    #[error(transparent)]
    Inquire(#[from] inquire::InquireError),

    /// Editor cannot be started.
    #[error("failed to start editor {editor:?}")]
    Editor {
        #[source]
        source: std::io::Error,
        editor: String,
    },

    /// Editor exits unsuccessfully.
    #[error("editor {editor:?} exited with {status}")]
    EditorStatus { editor: String, status: ExitStatus },
}

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;
