// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

// Shared fixtures for integration tests.
#![allow(dead_code)]

use dotplate::{
    config::Settings,
    deploy::{DeployMode, Deployer, Report},
    prompt::{Prompter, Result as PromptResult, ReviewAction},
    template::TemplateFile,
};

use anyhow::Result;
use std::{
    collections::VecDeque,
    fs::{create_dir_all, write},
    path::Path,
};

/// Prompter answering from a script instead of a terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    pub starter: Option<String>,
    pub offered: Vec<String>,
    pub actions: VecDeque<ReviewAction>,
    pub reviewed: Vec<String>,
}

impl ScriptedPrompter {
    pub fn picking(starter: &str) -> Self {
        Self {
            starter: Some(starter.into()),
            ..Self::default()
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn select_starter(&mut self, starters: &[String]) -> PromptResult<Option<String>> {
        self.offered = starters.to_vec();
        Ok(self.starter.clone())
    }

    fn review(&mut self, file: &TemplateFile) -> PromptResult<ReviewAction> {
        self.reviewed.push(file.source().name());
        Ok(self.actions.pop_front().unwrap_or(ReviewAction::Skip))
    }

    fn confirm(&mut self, _message: &str) -> PromptResult<bool> {
        Ok(true)
    }

    fn edit(&mut self, _paths: &[&Path]) -> PromptResult<()> {
        Ok(())
    }
}

/// Write file relative to current directory, creating parents.
pub fn write_file(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    write(path, contents)?;
    Ok(())
}

/// Settings that install into `home/` under the current directory.
pub fn settings() -> Settings {
    Settings {
        output_dir: Some("home".into()),
        ..Settings::default()
    }
}

/// Deploy with default settings, returning report and printed diffs.
pub fn deploy(mode: DeployMode, prompter: &mut ScriptedPrompter) -> Result<(Report, String)> {
    let mut out = Vec::new();
    let report = Deployer::new(settings(), mode).run(prompter, &mut out)?;
    Ok((report, String::from_utf8(out)?))
}

/// Place executable in `bin/`.
#[cfg(unix)]
pub fn install_binary(name: &str) -> Result<()> {
    use std::{fs::set_permissions, os::unix::fs::PermissionsExt};

    let path = Path::new("bin").join(name);
    write_file(&path, "#!/bin/sh\n")?;
    set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}
