// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template discovery and rendering.
//!
//! Every file under the configs directory is a template. The first component
//! of its path names the config subdirectory it belongs to, and the rest of
//! the path is where it gets installed relative to the output directory:
//!
//! ```text
//! configs/
//! ├── bashrc/.bashrc           -> ~/.bashrc
//! ├── i3/.config/i3/config     -> ~/.config/i3/config
//! └── vim/.vimrc               -> ~/.vimrc
//! ```
//!
//! Templates are rendered with [Tera](https://keats.github.io/tera/), a
//! Jinja2-like engine, with every variable bound in the rendering context.
//! Referring to an undefined variable is an error, and nothing is escaped.

use crate::{path::install_path, vars::Variables};

use ignore::WalkBuilder;
use std::{
    fs::{read_to_string, write},
    io,
    path::{Path, PathBuf},
};
use tera::{Context, ErrorKind, Tera};
use tracing::{debug, info, instrument, warn};

/// Template found under the configs directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateSource {
    /// Path relative to the configs directory.
    pub relative: PathBuf,

    /// Path to the template on disk.
    pub absolute: PathBuf,
}

impl TemplateSource {
    /// Name of config subdirectory the template belongs to.
    pub fn subdir(&self) -> Option<&str> {
        self.relative
            .components()
            .next()
            .and_then(|component| component.as_os_str().to_str())
    }

    /// Name the template is registered under in the rendering engine.
    pub fn name(&self) -> String {
        self.relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Find every template under the configs directory.
///
/// Hidden files are included, and no ignore rules apply. Files sitting
/// directly in the configs directory belong to no subdirectory, so they are
/// skipped with a warning. Results are sorted by relative path.
///
/// # Errors
///
/// - Return [`TemplateError::MissingConfigDir`] if the configs directory does
///   not exist.
/// - Return [`TemplateError::Walk`] if the directory tree cannot be walked.
#[instrument(skip(config_dir), level = "debug")]
pub fn discover(config_dir: impl AsRef<Path>) -> Result<Vec<TemplateSource>> {
    let config_dir = config_dir.as_ref();
    if !config_dir.is_dir() {
        return Err(TemplateError::MissingConfigDir {
            path: config_dir.to_path_buf(),
        });
    }

    let mut sources = Vec::new();
    let walker = WalkBuilder::new(config_dir)
        .standard_filters(false)
        .follow_links(true)
        .build();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|kind| kind.is_file()) {
            continue;
        }

        let absolute = entry.into_path();
        let relative = absolute
            .strip_prefix(config_dir)
            .map_err(|_| TemplateError::OutsideConfigDir {
                path: absolute.clone(),
            })?
            .to_path_buf();

        if relative.components().count() < 2 {
            warn!(
                "skip {:?}: templates must live in a config subdirectory",
                absolute.display()
            );
            continue;
        }

        sources.push(TemplateSource { relative, absolute });
    }

    sources.sort();
    debug!("found {} templates", sources.len());
    Ok(sources)
}

/// Template renderer bound to one variable mapping.
#[derive(Debug)]
pub struct Renderer {
    tera: Tera,
    context: Context,
    output_dir: PathBuf,
}

impl Renderer {
    /// Construct new renderer that installs into target output directory.
    pub fn new(variables: &Variables, output_dir: impl Into<PathBuf>) -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());

        let mut context = Context::new();
        for (name, value) in variables {
            context.insert(name.as_str(), value);
        }

        Self {
            tera,
            context,
            output_dir: output_dir.into(),
        }
    }

    /// Register templates with the rendering engine.
    ///
    /// Templates must be registered before any of them is rendered, so that
    /// they can include or extend one another. Only registered templates are
    /// ever read from disk.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::ReadTemplate`] if a template cannot be read.
    /// - Return [`TemplateError::Parse`] if a template is malformed.
    /// - Return [`TemplateError::Register`] if the templates fail to load
    ///   together, but none of them on its own.
    pub fn register<'a>(
        &mut self,
        sources: impl IntoIterator<Item = &'a TemplateSource>,
    ) -> Result<()> {
        let mut templates = Vec::new();
        for source in sources {
            templates.push((source, read_template(source)?));
        }

        let result = self.tera.add_raw_templates(
            templates
                .iter()
                .map(|(source, body)| (source.name(), body.as_str())),
        );
        result.map_err(|err| match culprit(&err, &templates) {
            Some(source) => TemplateError::Parse {
                source: err,
                path: source.absolute.clone(),
            },
            None => TemplateError::Register(err),
        })
    }

    /// Re-read one template from disk, picking up edits.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::ReadTemplate`] if the template cannot be read.
    /// - Return [`TemplateError::Parse`] if the template is malformed.
    pub fn reload(&mut self, source: &TemplateSource) -> Result<()> {
        let body = read_template(source)?;
        self.tera
            .add_raw_template(&source.name(), &body)
            .map_err(|err| TemplateError::Parse {
                source: err,
                path: source.absolute.clone(),
            })
    }

    /// Render registered template into a file ready for installation.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::NoInstallPath`] if the template path does not
    ///   map onto the output directory.
    /// - Return [`TemplateError::Render`] if rendering fails, e.g., the
    ///   template refers to an undefined variable.
    #[instrument(skip(self, source), fields(template = %source.name()), level = "debug")]
    pub fn render(&self, source: &TemplateSource) -> Result<TemplateFile> {
        let output_path = install_path(&self.output_dir, &source.relative).ok_or_else(|| {
            TemplateError::NoInstallPath {
                path: source.relative.clone(),
            }
        })?;

        let mut contents = self
            .tera
            .render(&source.name(), &self.context)
            .map_err(|err| TemplateError::Render {
                source: err,
                path: source.absolute.clone(),
            })?;

        // INVARIANT: Rendered files always end with a newline.
        if !contents.ends_with('\n') {
            contents.push('\n');
        }

        Ok(TemplateFile {
            source: source.clone(),
            output_path,
            contents,
        })
    }
}

// INVARIANT: Tera only names the failing template inside its message, so
// find it by loading each template on its own.
fn culprit<'a>(
    err: &tera::Error,
    templates: &'a [(&'a TemplateSource, String)],
) -> Option<&'a TemplateSource> {
    if let ErrorKind::MissingParent { current, .. } = &err.kind {
        return templates
            .iter()
            .map(|(source, _)| *source)
            .find(|source| source.name() == *current);
    }

    templates
        .iter()
        .find(|(source, body)| {
            Tera::default()
                .add_raw_template(&source.name(), body)
                .is_err_and(|err| !matches!(err.kind, ErrorKind::MissingParent { .. }))
        })
        .map(|(source, _)| *source)
}

fn read_template(source: &TemplateSource) -> Result<String> {
    read_to_string(&source.absolute).map_err(|err| TemplateError::ReadTemplate {
        source: err,
        path: source.absolute.clone(),
    })
}

/// Rendered template paired with its install location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    source: TemplateSource,
    output_path: PathBuf,
    contents: String,
}

impl TemplateFile {
    /// Template the file was rendered from.
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Path the file gets installed to.
    pub fn output_path(&self) -> &Path {
        self.output_path.as_path()
    }

    /// Rendered contents.
    pub fn contents(&self) -> &str {
        self.contents.as_str()
    }

    /// Read currently installed contents, if any.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::ReadInstalled`] if the installed file exists
    ///   but cannot be read.
    pub fn read_installed(&self) -> Result<Option<String>> {
        match read_to_string(&self.output_path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(TemplateError::ReadInstalled {
                source: err,
                path: self.output_path.clone(),
            }),
        }
    }

    /// Check if installing the file would change anything.
    ///
    /// A file that renders blank is not worth creating, which lets a template
    /// opt out of installation by rendering nothing.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::ReadInstalled`] if the installed file exists
    ///   but cannot be read.
    pub fn has_diff(&self) -> Result<bool> {
        match self.read_installed()? {
            None => Ok(!self.contents.trim().is_empty()),
            Some(installed) => Ok(installed != self.contents),
        }
    }

    /// Write rendered contents to install location.
    ///
    /// Creates missing parent directories.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::WriteInstalled`] if the file or its parent
    ///   directories cannot be written.
    pub fn install(&self) -> Result<()> {
        let write_error = |err| TemplateError::WriteInstalled {
            source: err,
            path: self.output_path.clone(),
        };

        if let Some(parent) = self.output_path.parent() {
            mkdirp::mkdirp(parent).map_err(write_error)?;
        }
        write(&self.output_path, self.contents.as_bytes()).map_err(write_error)?;
        info!("install {:?}", self.output_path.display());

        Ok(())
    }
}

/// Template discovery and rendering error types.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Configs directory does not exist.
    #[error("config directory {:?} does not exist", path.display())]
    MissingConfigDir { path: PathBuf },

    /// Configs directory cannot be walked.
    #[error(transparent)]
    Walk(#[from] ignore::Error),

    /// Walked path does not live under the configs directory.
    #[error("template {:?} is outside of config directory", path.display())]
    OutsideConfigDir { path: PathBuf },

    /// Template path has no install location.
    #[error("template {:?} does not map onto an install path", path.display())]
    NoInstallPath { path: PathBuf },

    /// Template cannot be read.
    #[error("failed to read template {:?}", path.display())]
    ReadTemplate {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Template is malformed.
    #[error("failed to load template {:?}", path.display())]
    Parse {
        #[source]
        source: tera::Error,
        path: PathBuf,
    },

    /// Templates fail to load together.
    #[error("failed to load templates")]
    Register(#[source] tera::Error),

    /// Template fails to render.
    #[error("failed to render template {:?}", path.display())]
    Render {
        #[source]
        source: tera::Error,
        path: PathBuf,
    },

    /// Installed file exists but cannot be read.
    #[error("failed to read installed file {:?}", path.display())]
    ReadInstalled {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Rendered file cannot be written.
    #[error("failed to write {:?}", path.display())]
    WriteInstalled {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::create_dir_all;

    fn write_template(path: &str, body: &str) -> anyhow::Result<()> {
        let path = Path::new("configs").join(path);
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        write(path, body)?;
        Ok(())
    }

    fn variables() -> Variables {
        [
            ("SHELL".to_string(), Value::from("zsh")),
            ("WORK".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect::<Variables>()
        .with_path_binaries(["nvim".to_string(), "vim".to_string()].into())
    }

    #[sealed_test]
    fn discover_templates_sorted_with_hidden_files() -> anyhow::Result<()> {
        write_template("vim/.vimrc", "set number")?;
        write_template("i3/.config/i3/config", "")?;
        write_template("README.md", "not a template")?;

        let result = discover("configs")?
            .into_iter()
            .map(|source| source.name())
            .collect::<Vec<_>>();
        assert_eq!(result, vec!["i3/.config/i3/config", "vim/.vimrc"]);

        Ok(())
    }

    #[sealed_test]
    fn discover_missing_config_dir() {
        let result = discover("configs");
        assert!(matches!(result, Err(TemplateError::MissingConfigDir { .. })));
    }

    #[sealed_test]
    fn render_with_variables() -> anyhow::Result<()> {
        write_template(
            "zsh/.zshrc",
            indoc! {r#"
                export SHELL_NAME={{ SHELL }}
                {% if WORK %}source ~/.work_profile{% endif %}
                {% if "nvim" in PATH_BINARIES %}alias vim=nvim{% endif %}
                # {{ PATH_BINARIES | join(sep=",") }}"#},
        )?;

        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");
        renderer.register(&sources)?;
        let file = renderer.render(&sources[0])?;

        let expect = indoc! {r#"
            export SHELL_NAME=zsh
            source ~/.work_profile
            alias vim=nvim
            # nvim,vim
        "#};
        assert_eq!(file.contents(), expect);
        assert_eq!(file.output_path(), Path::new("home/.zshrc"));

        Ok(())
    }

    #[sealed_test]
    fn render_is_idempotent() -> anyhow::Result<()> {
        write_template("vim/.vimrc", "{% for bin in PATH_BINARIES %}{{ bin }}\n{% endfor %}")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");
        renderer.register(&sources)?;

        let first = renderer.render(&sources[0])?;
        let second = renderer.render(&sources[0])?;
        assert_eq!(first, second);
        assert_eq!(first.contents(), "nvim\nvim\n");

        Ok(())
    }

    #[sealed_test]
    fn render_undefined_variable_fails() -> anyhow::Result<()> {
        write_template("vim/.vimrc", "colorscheme {{ THEME }}")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");
        renderer.register(&sources)?;

        let result = renderer.render(&sources[0]);
        assert!(matches!(result, Err(TemplateError::Render { .. })));

        Ok(())
    }

    #[sealed_test]
    fn install_creates_parent_directories() -> anyhow::Result<()> {
        write_template("i3/.config/i3/config", "bar {}")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");
        renderer.register(&sources)?;
        let file = renderer.render(&sources[0])?;

        assert!(file.has_diff()?);
        file.install()?;
        assert_eq!(read_to_string("home/.config/i3/config")?, "bar {}\n");
        assert!(!file.has_diff()?);

        Ok(())
    }

    #[sealed_test]
    fn blank_render_is_not_created() -> anyhow::Result<()> {
        write_template("bashrc/.bashrc", "{% if SHELL == \"bash\" %}set -o vi{% endif %}")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");
        renderer.register(&sources)?;
        let file = renderer.render(&sources[0])?;

        assert_eq!(file.contents(), "\n");
        assert!(!file.has_diff()?);

        // An existing file still gets blanked out.
        create_dir_all("home")?;
        write("home/.bashrc", "set -o vi\n")?;
        assert!(file.has_diff()?);

        Ok(())
    }

    #[sealed_test]
    fn register_names_malformed_template() -> anyhow::Result<()> {
        write_template("vim/.vimrc", "set number")?;
        write_template("zsh/.zshrc", "{% if %}")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");

        match renderer.register(&sources) {
            Err(TemplateError::Parse { path, .. }) => {
                assert_eq!(path, PathBuf::from("configs/zsh/.zshrc"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        Ok(())
    }

    #[sealed_test]
    fn register_names_template_with_missing_parent() -> anyhow::Result<()> {
        write_template("vim/.vimrc", "{% extends \"vim/base\" %}")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");

        match renderer.register(&sources) {
            Err(TemplateError::Parse { path, .. }) => {
                assert_eq!(path, PathBuf::from("configs/vim/.vimrc"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        Ok(())
    }

    #[sealed_test]
    fn reload_picks_up_edits() -> anyhow::Result<()> {
        write_template("vim/.vimrc", "set number")?;
        let sources = discover("configs")?;
        let mut renderer = Renderer::new(&variables(), "home");
        renderer.register(&sources)?;

        write_template("vim/.vimrc", "set relativenumber")?;
        renderer.reload(&sources[0])?;
        assert_eq!(renderer.render(&sources[0])?.contents(), "set relativenumber\n");

        Ok(())
    }
}
