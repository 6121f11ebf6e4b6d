use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use log::info;
use serde::Deserialize;

use crate::renderer::RendererChoice;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "notefeed.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub notes_dir: PathBuf,
    pub page_path: PathBuf,
    pub feed_path: PathBuf,

    pub site_title: String,
    pub feed_title: Option<String>,
    pub site_url: String,
    pub blog_url: String,
    pub feed_url: String,
    pub description: String,
    pub max_feed_items: usize,

    /// Literal marker that must appear on the first line of a note.
    pub tag: String,
    pub extension: String,
    pub start_marker: String,
    pub end_marker: String,

    pub renderer: RendererChoice,
    pub pandoc: PandocConfig,

    /// Abort the run on `YYYY-MM-DD` strings that are not real dates instead of skipping the note.
    pub strict_dates: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PandocConfig {
    pub program: String,
    pub args: Vec<String>,
    /// `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notes_dir: PathBuf::from("~/wiki/diary"),
            page_path: PathBuf::from("~/sites/personal/blog.html"),
            feed_path: PathBuf::from("~/sites/personal/feed.xml"),
            site_title: "Blog".to_string(),
            feed_title: None,
            site_url: "https://example.com/".to_string(),
            blog_url: "https://example.com/blog.html".to_string(),
            feed_url: "https://example.com/feed.xml".to_string(),
            description: "Updates from the diary.".to_string(),
            max_feed_items: 50,
            tag: "#blog".to_string(),
            extension: "md".to_string(),
            start_marker: "<!-- Blog entries start here -->".to_string(),
            end_marker: "<!-- Blog entries end here -->".to_string(),
            renderer: RendererChoice::Auto,
            pandoc: PandocConfig::default(),
            strict_dates: false,
        }
    }
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_string(),
            args: ["-f", "markdown", "-t", "html"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            timeout_secs: 30,
        }
    }
}

impl PandocConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Config {
    // an explicitly requested file must exist; the default one is optional
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            info!("Config file({path:?}) does not exist. using defaults...");
            return Ok(Self::default().expanded());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("while reading config {:?}", path))?;
        let config = Self::from_toml(&text).with_context(|| format!("in config {:?}", path))?;
        Ok(config.expanded())
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn feed_title(&self) -> &str {
        self.feed_title.as_deref().unwrap_or(&self.site_title)
    }

    /// Expands a leading `~` in every path setting.
    pub fn expanded(mut self) -> Self {
        self.notes_dir = expand_path(&self.notes_dir);
        self.page_path = expand_path(&self.page_path);
        self.feed_path = expand_path(&self.feed_path);
        self
    }
}

pub(crate) fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}
