mod commonmark;
mod minimal;
mod pandoc;

use std::{fmt, time::Duration};

use anyhow::bail;
use log::{debug, info};
use maud::html;
use serde::Deserialize;
use thiserror::Error;

pub(crate) use commonmark::CommonMarkRenderer;
pub(crate) use minimal::MinimalRenderer;
pub(crate) use pandoc::PandocRenderer;

use crate::config::PandocConfig;

pub(crate) trait Renderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError>;
}

#[derive(Error, Debug)]
pub(crate) enum RenderError {
    #[error("could not start {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error while talking to {program:?}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program:?} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("{program:?} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
    #[error("{program:?} produced invalid UTF-8")]
    Utf8 {
        program: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RendererChoice {
    /// pandoc when it answers `--version`, the minimal renderer otherwise
    #[default]
    Auto,
    Pandoc,
    CommonMark,
    Minimal,
}

impl RendererChoice {
    pub const NAMES: [&'static str; 4] = ["auto", "pandoc", "commonmark", "minimal"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "pandoc" => Some(Self::Pandoc),
            "commonmark" => Some(Self::CommonMark),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }
}

/// The renderer decided on for a whole run. Probed once, never re-checked per post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RendererStrategy {
    External,
    CommonMark,
    Fallback { pandoc_missing: bool },
}

impl RendererStrategy {
    pub fn select(choice: RendererChoice, pandoc: &PandocConfig) -> anyhow::Result<Self> {
        let strategy = match choice {
            RendererChoice::Auto if pandoc::probe(&pandoc.program) => Self::External,
            RendererChoice::Auto => Self::Fallback {
                pandoc_missing: true,
            },
            RendererChoice::Pandoc => {
                if !pandoc::probe(&pandoc.program) {
                    bail!("{:?} is not available (`--version` failed)", pandoc.program);
                }
                Self::External
            }
            RendererChoice::CommonMark => Self::CommonMark,
            RendererChoice::Minimal => Self::Fallback {
                pandoc_missing: false,
            },
        };
        info!("Renderer: {strategy}");

        Ok(strategy)
    }

    pub fn build(self, pandoc: &PandocConfig) -> Box<dyn Renderer> {
        debug!("building renderer for {self:?}");
        match self {
            Self::External => Box::new(PandocRenderer::new(
                pandoc.program.clone(),
                pandoc.args.clone(),
                pandoc.timeout(),
            )),
            Self::CommonMark => Box::new(CommonMarkRenderer::default()),
            Self::Fallback { .. } => Box::new(MinimalRenderer),
        }
    }
}

impl fmt::Display for RendererStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => f.write_str("pandoc"),
            Self::CommonMark => f.write_str("commonmark (built-in)"),
            Self::Fallback {
                pandoc_missing: true,
            } => f.write_str("minimal fallback (no pandoc found)"),
            Self::Fallback {
                pandoc_missing: false,
            } => f.write_str("minimal fallback"),
        }
    }
}

/// Escapes `&`, `<`, `>` and `"`.
pub(crate) fn escape_html(text: &str) -> String {
    html! { (text) }.into_string()
}

// trailing whitespace collapses to a single newline
fn normalize(markdown: &str) -> String {
    let mut md = markdown.trim_end().to_string();
    md.push('\n');
    md
}
