use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    config::Config,
    post::{extract_posts, Post},
    renderer::RendererStrategy,
};

mod data;
mod feed;
mod inject;
mod page;

pub(crate) use data::{BuildSummary, RenderedPost, Targets};
pub(crate) use feed::item_link;
use inject::Markers;
pub(crate) use page::render_posts;

pub(crate) fn collect_posts(config: &Config) -> anyhow::Result<Vec<Post>> {
    extract_posts(
        &config.notes_dir,
        &config.extension,
        &config.tag,
        config.strict_dates,
    )
}

// both documents are assembled and every output directory exists before the first write
pub(crate) fn generate(
    config: &Config,
    strategy: RendererStrategy,
    targets: Targets,
    built_at: DateTime<Utc>,
) -> anyhow::Result<BuildSummary> {
    if targets.page && !config.page_path.is_file() {
        bail!("Missing: {}", config.page_path.display());
    }

    let posts = collect_posts(config)?;
    info!("{} post(s) found in {:?}", posts.len(), config.notes_dir);

    let renderer = strategy.build(&config.pandoc);
    // without the page only the newest posts end up anywhere
    let wanted = if targets.page {
        posts.len()
    } else {
        posts.len().min(config.max_feed_items)
    };
    let entries = render_posts(&posts[..wanted], renderer.as_ref())?;

    let page = if targets.page {
        Some(updated_page(config, &entries)?)
    } else {
        None
    };
    let feed = if targets.feed {
        Some(feed::feed_xml(config, &entries, built_at)?)
    } else {
        None
    };

    let outputs: Vec<_> = [(&config.page_path, page), (&config.feed_path, feed)]
        .into_iter()
        .filter_map(|(path, text)| Some((path.as_path(), text?)))
        .collect();
    for (path, _) in &outputs {
        create_parent(path)?;
    }
    for (path, text) in &outputs {
        debug!("writing {path:?}");
        std::fs::write(path, text).with_context(|| format!("while writing {:?}", path))?;
    }

    Ok(BuildSummary {
        strategy,
        page: targets
            .page
            .then(|| (config.page_path.clone(), entries.len())),
        feed: targets.feed.then(|| {
            let items = entries.len().min(config.max_feed_items);
            (config.feed_path.clone(), items)
        }),
    })
}

/// Returns the page text with the generated region replaced by `entries`.
fn updated_page(config: &Config, entries: &[RenderedPost]) -> anyhow::Result<String> {
    let original = std::fs::read_to_string(&config.page_path)
        .with_context(|| format!("while reading {:?}", config.page_path))?;
    let markers = Markers {
        start: &config.start_marker,
        end: &config.end_marker,
    };

    markers
        .inject(&original, &page::entries_html(entries))
        .with_context(|| format!("in {:?}", config.page_path))
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent)
            .with_context(|| format!("while creating {:?}", parent)),
        None => Ok(()),
    }
}
