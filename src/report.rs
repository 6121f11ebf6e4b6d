use std::io::Write;

use log::warn;
use serde::Serialize;

use crate::{
    config::Config,
    generator::{collect_posts, item_link, render_posts},
    post::{list_notes, parse_note, Scanned},
    renderer::Renderer,
};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub date: String,
    pub file: String,
    pub first_line: String,
}

// stdout carries nothing but the array in json mode
fn skipped(out: &mut impl Write, json: bool, line: String) -> std::io::Result<()> {
    if json {
        warn!("{line}");
        Ok(())
    } else {
        writeln!(out, "{line}")
    }
}

/// Lists blog candidates newest first, explaining every tagged note that is skipped.
pub(crate) fn check(config: &Config, out: &mut impl Write, json: bool) -> anyhow::Result<()> {
    let notes = list_notes(&config.notes_dir, &config.extension)?;
    if notes.is_empty() && !json {
        writeln!(
            out,
            "No .{} files found in {}",
            config.extension,
            config.notes_dir.display()
        )?;
        return Ok(());
    }

    let mut candidates = vec![];
    for path in notes {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                skipped(out, json, format!("Could not read {}: {e}", path.display()))?;
                continue;
            }
        };
        let first_line = content.lines().next().unwrap_or_default().trim().to_string();

        match parse_note(&path, &content, &config.tag) {
            Scanned::Post(post) => candidates.push((
                post.date,
                Candidate {
                    date: post.date_str(),
                    file,
                    first_line,
                },
            )),
            Scanned::MissingDate { first_line } => skipped(
                out,
                json,
                format!("tag found but no date — skipped: {file} :: {first_line}"),
            )?,
            Scanned::InvalidDate(e) => skipped(
                out,
                json,
                format!("invalid date {} — skipped: {file} :: {first_line}", e.date),
            )?,
            Scanned::Unreadable(e) => {
                skipped(out, json, format!("Could not read {}: {e}", path.display()))?
            }
            Scanned::Empty | Scanned::Untagged => {}
        }
    }
    // stable, so equal dates stay in file name order
    candidates.sort_by(|(a, _), (b, _)| b.cmp(a));
    let candidates: Vec<Candidate> = candidates.into_iter().map(|(_, c)| c).collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &candidates)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Blog candidates (newest first):")?;
    if candidates.is_empty() {
        writeln!(out, "  (none found)")?;
    }
    for c in &candidates {
        writeln!(out, "  {}  {}  ::  {}", c.date, c.file, c.first_line)?;
    }

    Ok(())
}

/// Prints each post as it would appear in the feed.
pub(crate) fn preview(
    config: &Config,
    renderer: &dyn Renderer,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let posts = collect_posts(config)?;
    if posts.is_empty() {
        writeln!(out, "No RSS entries found.")?;
        return Ok(());
    }

    for entry in render_posts(&posts, renderer)? {
        let date = entry.post.date_str();
        writeln!(out, "{}", "=".repeat(72))?;
        writeln!(out, "DATE : {date}")?;
        writeln!(out, "TITLE: {}", entry.post.title_or_date())?;
        writeln!(out, "LINK : {}", item_link(&config.blog_url, &date))?;
        writeln!(out, "{}", "-".repeat(72))?;
        writeln!(out, "{}", entry.html.trim())?;
        writeln!(out)?;
    }

    Ok(())
}
