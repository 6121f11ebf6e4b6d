use pulldown_cmark::{html, Options, Parser};

use super::{normalize, RenderError, Renderer};

/// Built-in CommonMark renderer. Never fails, needs no external program.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommonMarkRenderer {
    options: Options,
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_TABLES);

        Self { options }
    }
}

impl Renderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let md = normalize(markdown);
        let parser = Parser::new_ext(&md, self.options);

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        Ok(html_output.trim_end().to_string())
    }
}
