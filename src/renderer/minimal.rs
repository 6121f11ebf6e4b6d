use super::{escape_html, normalize, RenderError, Renderer};

/// Paragraphs and line breaks only. Inline markdown is left as typed.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct MinimalRenderer;

impl Renderer for MinimalRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let md = normalize(markdown);
        let paragraphs: Vec<String> = md
            .split("\n\n")
            .map(str::trim)
            .filter(|para| !para.is_empty())
            .map(|para| format!("<p>{}</p>", escape_html(para).replace('\n', "<br>\n")))
            .collect();

        Ok(paragraphs.join("\n"))
    }
}
