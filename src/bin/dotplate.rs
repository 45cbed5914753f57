// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotplate::{
    config::{expand_path, Settings},
    deploy::{DeployMode, Deployer},
    prompt::InquirePrompter,
};

use anyhow::Result;
use clap::Parser;
use std::{
    io::{stdout, IsTerminal},
    path::PathBuf,
    process::exit,
};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Render dotfile templates with machine specific variables, and install them.
#[derive(Debug, Clone, Parser)]
#[command(about, version, override_usage = "dotplate [options]")]
struct Cli {
    /// Path to settings file.
    #[arg(long, value_name = "path", default_value = "dotplate.toml")]
    pub settings: PathBuf,

    /// Path to variable file.
    #[arg(long, value_name = "path")]
    pub variable_file: Option<PathBuf>,

    /// Path to install condition file.
    #[arg(long, value_name = "path")]
    pub install_if_file: Option<PathBuf>,

    /// Path to directory of dotfile templates.
    #[arg(long, value_name = "path")]
    pub config_dir: Option<PathBuf>,

    /// Path to directory of starter variable files.
    #[arg(long, value_name = "path")]
    pub machine_dir: Option<PathBuf>,

    /// Directory to install rendered dotfiles into [default: $HOME].
    #[arg(long, value_name = "path")]
    pub output_dir: Option<PathBuf>,

    /// Lines of context shown around each change.
    #[arg(long, value_name = "lines")]
    pub diff_context_lines: Option<usize>,

    /// Write every changed file without asking.
    #[arg(short, long, group = "mode")]
    pub apply: bool,

    /// Show what would change without writing anything.
    #[arg(short, long, group = "mode")]
    pub diff_only: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        let mode = self.mode();
        let settings = self.settings()?;
        debug!("using settings:\n{settings}");

        let deployer = Deployer::new(settings, mode).with_color(stdout().is_terminal());
        deployer.run(&mut InquirePrompter::new(), &mut stdout().lock())?;

        Ok(())
    }

    fn mode(&self) -> DeployMode {
        if self.apply {
            DeployMode::Apply
        } else if self.diff_only {
            DeployMode::DiffOnly
        } else {
            DeployMode::Review
        }
    }

    // INVARIANT: Command line overrides settings file, which overrides defaults.
    fn settings(self) -> Result<Settings> {
        let mut settings = Settings::load_or_default(expand_path(&self.settings)?)?;
        if let Some(path) = self.variable_file {
            settings.variable_file = path;
        }
        if let Some(path) = self.install_if_file {
            settings.install_if_file = path;
        }
        if let Some(path) = self.config_dir {
            settings.config_dir = path;
        }
        if let Some(path) = self.machine_dir {
            settings.machine_dir = path;
        }
        if let Some(path) = self.output_dir {
            settings.output_dir = Some(path);
        }
        if let Some(lines) = self.diff_context_lines {
            settings.diff_context_lines = lines;
        }

        Ok(settings)
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
