use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{bail, Context as _};
use chrono::NaiveDate;
use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{4}-[0-9]{2}-[0-9]{2})\b").unwrap());
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*##\s+(.+?)\s*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Post {
    pub date: NaiveDate,
    pub title: Option<String>,
    pub body: String,
    pub path: PathBuf,
}

impl Post {
    /// `YYYY-MM-DD`, also used as the anchor of the entry.
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn title_or_date(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.date_str())
    }
}

#[derive(Error, Debug)]
#[error("{path:?}: {date:?} is not a valid date")]
pub(crate) struct InvalidDateError {
    pub path: PathBuf,
    pub date: String,
    #[source]
    pub source: chrono::ParseError,
}

#[derive(Debug)]
pub(crate) enum Scanned {
    Post(Post),
    Unreadable(std::io::Error),
    Empty,
    Untagged,
    /// The tag is present but line 1 carries no `YYYY-MM-DD`.
    MissingDate { first_line: String },
    InvalidDate(InvalidDateError),
}

/// Lists the notes of `dir` ending in `.{extension}`, ordered by file name.
pub(crate) fn list_notes(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("notes directory {:?} does not exist", dir);
    }

    let mut notes = vec![];
    for entry in std::fs::read_dir(dir).with_context(|| format!("while listing {:?}", dir))? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                debug!("unreadable entry in {dir:?}: {e}");
                continue;
            }
        };
        // follows symlinks; dangling links and directories drop out here
        if !path.is_file() {
            debug!("{path:?} is not a file; skipped");
            continue;
        }
        if path.extension().is_some_and(|ext| ext == extension) {
            notes.push(path);
        }
    }
    notes.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(notes)
}

pub(crate) fn scan_note(path: &Path, tag: &str) -> Scanned {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_note(path, &content, tag),
        Err(e) => Scanned::Unreadable(e),
    }
}

pub(crate) fn parse_note(path: &Path, content: &str, tag: &str) -> Scanned {
    let mut lines = content.lines();
    let Some(first) = lines.next() else {
        return Scanned::Empty;
    };

    let first = first.trim();
    if !first.contains(tag) {
        return Scanned::Untagged;
    }

    let Some(caps) = DATE_PATTERN.captures(first) else {
        return Scanned::MissingDate {
            first_line: first.to_string(),
        };
    };
    let date_text = &caps[1];
    let date = match NaiveDate::parse_from_str(date_text, "%Y-%m-%d") {
        Ok(date) => date,
        Err(source) => {
            return Scanned::InvalidDate(InvalidDateError {
                path: path.to_path_buf(),
                date: date_text.to_string(),
                source,
            })
        }
    };

    let mut title = None;
    let mut body_lines = vec![];
    for line in lines {
        if title.is_none() {
            if let Some(caps) = TITLE_PATTERN.captures(line) {
                title = Some(caps[1].to_string());
                continue;
            }
        }
        body_lines.push(line);
    }

    Scanned::Post(Post {
        date,
        title,
        body: body_lines.join("\n").trim_start_matches('\n').to_string(),
        path: path.to_path_buf(),
    })
}

/// newest first. `sort_by` is stable, so posts of the same day keep file name order.
pub(crate) fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Collects every post under `dir`, newest first. Impossible dates fail the whole
/// extraction when `strict_dates` is set and are skipped with a warning otherwise.
pub(crate) fn extract_posts(
    dir: &Path,
    extension: &str,
    tag: &str,
    strict_dates: bool,
) -> anyhow::Result<Vec<Post>> {
    let mut posts = vec![];
    for path in list_notes(dir, extension)? {
        match scan_note(&path, tag) {
            Scanned::Post(post) => posts.push(post),
            Scanned::InvalidDate(e) if strict_dates => return Err(e.into()),
            Scanned::InvalidDate(e) => warn!("{e}; skipped"),
            Scanned::Unreadable(e) => debug!("Could not read {path:?}: {e}"),
            Scanned::MissingDate { .. } => debug!("{path:?}: tag found but no date; skipped"),
            Scanned::Empty | Scanned::Untagged => {}
        }
    }
    sort_posts(&mut posts);

    Ok(posts)
}
