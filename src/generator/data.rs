use std::path::PathBuf;

use crate::{post::Post, renderer::RendererStrategy};

#[derive(Debug)]
pub(crate) struct RenderedPost<'a> {
    pub post: &'a Post,
    pub html: String,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Targets {
    pub page: bool,
    pub feed: bool,
}

#[derive(Debug)]
pub(crate) struct BuildSummary {
    pub strategy: RendererStrategy,
    /// Articles injected into the page, when the page was written.
    pub page: Option<(PathBuf, usize)>,
    /// Items in the feed, when the feed was written.
    pub feed: Option<(PathBuf, usize)>,
}
