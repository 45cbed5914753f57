// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment pipeline.
//!
//! A deploy runs every stage in order:
//!
//! 1. Bootstrap the variable file if it is missing.
//! 2. Scan the search path, and load variables.
//! 3. Load install conditions, and decide which config subdirectories are
//!    wanted on this machine.
//! 4. Render every template of a wanted subdirectory.
//! 5. Show the diff of every rendered file that differs from the installed
//!    one, and install it according to the [`DeployMode`].
//!
//! Nothing is cached between runs. Deploying twice with the same inputs
//! writes nothing the second time.

use crate::{
    bootstrap::{Bootstrap, BootstrapError},
    condition::InstallConditions,
    config::{ConfigError, Settings},
    diff,
    path::{self, NoWayHome},
    prompt::{PromptError, Prompter, ReviewAction},
    scan,
    template::{self, Renderer, TemplateError, TemplateFile, TemplateSource},
    vars::Variables,
};

use owo_colors::OwoColorize;
use std::{
    collections::BTreeMap,
    io::Write,
    ops::ControlFlow,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// How rendered files that differ from installed ones are handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// Show diff, then ask what to do.
    #[default]
    Review,

    /// Show diff, then write file without asking.
    Apply,

    /// Show diff, write nothing.
    DiffOnly,
}

/// Outcome of a deploy.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Files written to the output directory.
    pub written: Vec<PathBuf>,

    /// Files that differ from the installed ones, but were left alone.
    pub skipped: Vec<PathBuf>,

    /// Number of rendered files identical to the installed ones.
    pub unchanged: usize,

    /// Config subdirectories excluded by their install condition.
    pub excluded: Vec<String>,
}

/// Render and install dotfiles for the current machine.
#[derive(Debug, Clone)]
pub struct Deployer {
    settings: Settings,
    mode: DeployMode,
    color: bool,
}

impl Deployer {
    /// Construct new deployer using target settings.
    pub fn new(settings: Settings, mode: DeployMode) -> Self {
        Self {
            settings,
            mode,
            color: false,
        }
    }

    /// Color diffs written to the output stream.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Run the whole pipeline.
    ///
    /// Diffs are written to `out`. The prompter is used to bootstrap a
    /// missing variable file, and in [`DeployMode::Review`].
    ///
    /// # Errors
    ///
    /// - Return [`DeployError::Bootstrap`] if the variable file is missing and
    ///   cannot be bootstrapped.
    /// - Return [`DeployError::Config`] if a definition file is invalid.
    /// - Return [`DeployError::Template`] if a template cannot be rendered or
    ///   installed.
    /// - Return [`DeployError::Prompt`] if asking the user fails.
    /// - Return [`DeployError::NoWayHome`] if no output directory was
    ///   configured, and the home directory cannot be determined.
    /// - Return [`DeployError::Io`] if writing to `out` fails.
    #[instrument(skip(self, prompter, out), fields(mode = ?self.mode), level = "debug")]
    pub fn run(&self, prompter: &mut impl Prompter, out: &mut impl Write) -> Result<Report> {
        let settings = &self.settings;
        Bootstrap::new(&settings.variable_file, &settings.machine_dir).run(prompter)?;

        // INVARIANT: Scan search path exactly once per run.
        let variables =
            Variables::load(&settings.variable_file)?.with_path_binaries(scan::path_binaries());
        debug!("loaded {} variables", variables.len());

        let conditions = InstallConditions::load(&settings.install_if_file)?;
        for subdir in conditions.listed() {
            if !settings.config_dir.join(subdir).is_dir() {
                warn!(
                    "{:?} lists {subdir:?}, which is not in {:?}",
                    settings.install_if_file.display(),
                    settings.config_dir.display()
                );
            }
        }

        let output_dir = path::output_dir(settings.output_dir.as_deref())?;
        let sources = template::discover(&settings.config_dir)?;

        let mut report = Report::default();
        let mut decisions = BTreeMap::new();
        let mut wanted = Vec::new();
        for source in &sources {
            let Some(subdir) = source.subdir() else {
                continue;
            };

            let install = match decisions.get(subdir).copied() {
                Some(install) => install,
                None => {
                    let install = conditions.should_install(subdir, &variables)?;
                    if !install {
                        info!("skip {subdir:?}: install condition is false");
                        report.excluded.push(subdir.to_string());
                    }
                    decisions.insert(subdir.to_string(), install);
                    install
                }
            };

            if install {
                wanted.push(source);
            }
        }

        // INVARIANT: Templates of excluded subdirectories are never read.
        let mut renderer = Renderer::new(&variables, output_dir);
        renderer.register(wanted.iter().copied())?;

        for source in wanted {
            let file = renderer.render(source)?;
            if !file.has_diff()? {
                debug!("{:?} is up to date", file.output_path().display());
                report.unchanged += 1;
                continue;
            }

            let flow = match self.mode {
                DeployMode::Apply => {
                    self.show(&file, out)?;
                    file.install()?;
                    report.written.push(file.output_path().to_path_buf());
                    ControlFlow::Continue(())
                }
                DeployMode::DiffOnly => {
                    self.show(&file, out)?;
                    report.skipped.push(file.output_path().to_path_buf());
                    ControlFlow::Continue(())
                }
                DeployMode::Review => {
                    self.review(&mut renderer, source, file, prompter, out, &mut report)?
                }
            };

            if flow.is_break() {
                info!("stop reviewing");
                break;
            }
        }

        info!(
            "{} written, {} skipped, {} unchanged",
            report.written.len(),
            report.skipped.len(),
            report.unchanged
        );

        Ok(report)
    }

    fn review(
        &self,
        renderer: &mut Renderer,
        source: &TemplateSource,
        mut file: TemplateFile,
        prompter: &mut impl Prompter,
        out: &mut impl Write,
        report: &mut Report,
    ) -> Result<ControlFlow<()>> {
        loop {
            self.show(&file, out)?;
            match prompter.review(&file)? {
                ReviewAction::Edit => {
                    prompter.edit(&[source.absolute.as_path(), file.output_path()])?;
                    renderer.reload(source)?;
                    file = renderer.render(source)?;
                }
                ReviewAction::Refresh => {
                    renderer.reload(source)?;
                    file = renderer.render(source)?;
                }
                ReviewAction::Skip => {
                    report.skipped.push(file.output_path().to_path_buf());
                    return Ok(ControlFlow::Continue(()));
                }
                ReviewAction::Overwrite => {
                    if prompter.confirm("Are you sure?")? {
                        file.install()?;
                        report.written.push(file.output_path().to_path_buf());
                        return Ok(ControlFlow::Continue(()));
                    }
                }
                ReviewAction::Quit => {
                    report.skipped.push(file.output_path().to_path_buf());
                    return Ok(ControlFlow::Break(()));
                }
            }

            // INVARIANT: Editing may leave nothing left to review.
            if !file.has_diff()? {
                report.unchanged += 1;
                return Ok(ControlFlow::Continue(()));
            }
        }
    }

    fn show(&self, file: &TemplateFile, out: &mut impl Write) -> Result<()> {
        let installed = file.read_installed()?;
        let header = header(file.output_path(), &file.source().absolute, installed.is_some());
        if self.color {
            writeln!(out, "{}", header.bold())?;
        } else {
            writeln!(out, "{header}")?;
        }

        let lines = diff::diff(installed.as_deref().unwrap_or(""), file.contents());
        write!(
            out,
            "{}",
            diff::format(&lines, self.settings.diff_context_lines, self.color)
        )?;

        Ok(())
    }
}

fn header(output: &Path, template: &Path, exists: bool) -> String {
    let verb = if exists { "update" } else { "create" };
    format!("{verb} {} (from {})", output.display(), template.display())
}

/// Deployment error types.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Definition or settings file is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Template cannot be discovered, rendered, or installed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Variable file is missing, and cannot be bootstrapped.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Asking the user fails.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Output directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),

    /// Diff cannot be written out.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = DeployError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{
        collections::VecDeque,
        fs::{create_dir_all, read_to_string, write},
    };

    /// Answers review questions from a script.
    #[derive(Default)]
    struct Scripted {
        actions: VecDeque<ReviewAction>,
        confirms: VecDeque<bool>,
        edits: Vec<Vec<PathBuf>>,
    }

    impl Prompter for Scripted {
        fn select_starter(&mut self, _starters: &[String]) -> crate::prompt::Result<Option<String>> {
            Ok(None)
        }

        fn review(&mut self, _file: &TemplateFile) -> crate::prompt::Result<ReviewAction> {
            Ok(self.actions.pop_front().unwrap_or(ReviewAction::Quit))
        }

        fn confirm(&mut self, _message: &str) -> crate::prompt::Result<bool> {
            Ok(self.confirms.pop_front().unwrap_or(false))
        }

        fn edit(&mut self, paths: &[&Path]) -> crate::prompt::Result<()> {
            self.edits.push(paths.iter().map(|path| path.to_path_buf()).collect());
            // Pretend the user fixed the template in their editor.
            write(paths[0], "set relativenumber").map_err(|err| PromptError::Editor {
                source: err,
                editor: "scripted".into(),
            })
        }
    }

    fn settings() -> Settings {
        Settings {
            output_dir: Some("home".into()),
            ..Settings::default()
        }
    }

    fn layout() -> anyhow::Result<()> {
        create_dir_all("configs/vim")?;
        create_dir_all("configs/git")?;
        write("variables.txt", "EDITOR=\"vim\"\n")?;
        write("configs/vim/.vimrc", "set number")?;
        write("configs/git/.gitconfig", "[core]\n\teditor = {{ EDITOR }}")?;
        Ok(())
    }

    fn review(actions: &[ReviewAction], confirms: &[bool]) -> anyhow::Result<(Report, Scripted)> {
        let mut prompter = Scripted {
            actions: actions.iter().copied().collect(),
            confirms: confirms.iter().copied().collect(),
            ..Scripted::default()
        };
        let mut out = Vec::new();
        let report = Deployer::new(settings(), DeployMode::Review).run(&mut prompter, &mut out)?;
        Ok((report, prompter))
    }

    #[sealed_test]
    fn review_skip_then_overwrite() -> anyhow::Result<()> {
        layout()?;
        let (report, _) = review(
            &[ReviewAction::Skip, ReviewAction::Overwrite],
            &[true],
        )?;

        assert_eq!(report.skipped, vec![PathBuf::from("home/.gitconfig")]);
        assert_eq!(report.written, vec![PathBuf::from("home/.vimrc")]);
        assert_eq!(read_to_string("home/.vimrc")?, "set number\n");
        assert!(!Path::new("home/.gitconfig").exists());

        Ok(())
    }

    #[sealed_test]
    fn review_overwrite_needs_confirmation() -> anyhow::Result<()> {
        layout()?;
        let (report, _) = review(
            &[ReviewAction::Overwrite, ReviewAction::Skip, ReviewAction::Quit],
            &[false],
        )?;

        assert_eq!(report.written, Vec::<PathBuf>::new());
        assert_eq!(report.skipped.len(), 2);
        assert!(!Path::new("home").exists());

        Ok(())
    }

    #[sealed_test]
    fn review_quit_stops_early() -> anyhow::Result<()> {
        layout()?;
        let (report, _) = review(&[ReviewAction::Quit], &[])?;
        assert_eq!(report.skipped, vec![PathBuf::from("home/.gitconfig")]);
        assert!(report.written.is_empty());
        Ok(())
    }

    #[sealed_test]
    fn review_edit_renders_again() -> anyhow::Result<()> {
        layout()?;
        let (report, prompter) = review(
            &[
                ReviewAction::Skip,
                ReviewAction::Edit,
                ReviewAction::Overwrite,
            ],
            &[true],
        )?;

        assert_eq!(
            prompter.edits,
            vec![vec![
                PathBuf::from("configs/vim/.vimrc"),
                PathBuf::from("home/.vimrc")
            ]]
        );
        assert_eq!(report.written, vec![PathBuf::from("home/.vimrc")]);
        assert_eq!(read_to_string("home/.vimrc")?, "set relativenumber\n");

        Ok(())
    }

    #[sealed_test]
    fn review_refresh_picks_up_template_changes() -> anyhow::Result<()> {
        layout()?;
        let mut prompter = Scripted {
            actions: [
                ReviewAction::Skip,
                ReviewAction::Refresh,
                ReviewAction::Overwrite,
            ]
            .into(),
            confirms: [true].into(),
            ..Scripted::default()
        };

        // Template changes while its diff is on screen.
        struct Rewrite<'a>(&'a mut Scripted);

        impl Prompter for Rewrite<'_> {
            fn select_starter(
                &mut self,
                starters: &[String],
            ) -> crate::prompt::Result<Option<String>> {
                self.0.select_starter(starters)
            }

            fn review(&mut self, file: &TemplateFile) -> crate::prompt::Result<ReviewAction> {
                let action = self.0.review(file)?;
                if action == ReviewAction::Refresh {
                    write(&file.source().absolute, "set list").map_err(|err| {
                        PromptError::Editor {
                            source: err,
                            editor: "scripted".into(),
                        }
                    })?;
                }
                Ok(action)
            }

            fn confirm(&mut self, message: &str) -> crate::prompt::Result<bool> {
                self.0.confirm(message)
            }

            fn edit(&mut self, paths: &[&Path]) -> crate::prompt::Result<()> {
                self.0.edit(paths)
            }
        }

        let mut out = Vec::new();
        let mut rewrite = Rewrite(&mut prompter);
        let report = Deployer::new(settings(), DeployMode::Review).run(&mut rewrite, &mut out)?;

        assert!(prompter.edits.is_empty());
        assert_eq!(report.written, vec![PathBuf::from("home/.vimrc")]);
        assert_eq!(read_to_string("home/.vimrc")?, "set list\n");
        assert!(String::from_utf8(out)?.contains("+ set list\n"));

        Ok(())
    }

    #[test]
    fn review_is_default_mode() {
        assert_eq!(DeployMode::default(), DeployMode::Review);
    }

    #[test]
    fn header_names_both_paths() {
        let result = header(Path::new("home/.vimrc"), Path::new("configs/vim/.vimrc"), false);
        assert_eq!(result, "create home/.vimrc (from configs/vim/.vimrc)");
    }
}
