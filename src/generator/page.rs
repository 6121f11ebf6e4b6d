use maud::{html, Markup, PreEscaped};

use crate::{post::Post, renderer::Renderer};

use super::RenderedPost;

pub(crate) fn render_posts<'a>(
    posts: &'a [Post],
    renderer: &dyn Renderer,
) -> anyhow::Result<Vec<RenderedPost<'a>>> {
    posts
        .iter()
        .map(|post| {
            let html = renderer.render(&post.body).map_err(|e| {
                anyhow::Error::new(e).context(format!("while rendering {:?}", post.path))
            })?;
            Ok(RenderedPost { post, html })
        })
        .collect()
}

fn article(entry: &RenderedPost) -> Markup {
    let date = entry.post.date_str();
    // the literal newlines keep the page readable when someone opens it in an editor
    html! {
        article class="blog-entry" id=(date) {
            "\n  "
            h2.blog-date { (date) }
            @if let Some(title) = &entry.post.title {
                "\n  "
                h3.blog-title { (title) }
            }
            "\n  "
            div.blog-body {
                "\n" (PreEscaped(&entry.html)) "\n  "
            }
            "\n"
        }
    }
}

/// One `<article>` per post, separated by a blank line.
pub(super) fn entries_html(entries: &[RenderedPost]) -> String {
    entries
        .iter()
        .map(|entry| article(entry).into_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::renderer::MinimalRenderer;

    fn post(date: &str, title: Option<&str>, body: &str) -> Post {
        Post {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            title: title.map(str::to_string),
            body: body.to_string(),
            path: PathBuf::from(format!("{date}.md")),
        }
    }

    #[test]
    fn article_layout() {
        let posts = vec![post("2024-03-01", Some("My Title"), "Hello **world**.")];
        let entries = render_posts(&posts, &MinimalRenderer).unwrap();
        assert_eq!(
            entries_html(&entries),
            concat!(
                "<article class=\"blog-entry\" id=\"2024-03-01\">\n",
                "  <h2 class=\"blog-date\">2024-03-01</h2>\n",
                "  <h3 class=\"blog-title\">My Title</h3>\n",
                "  <div class=\"blog-body\">\n",
                "<p>Hello **world**.</p>\n",
                "  </div>\n",
                "</article>",
            )
        );
    }

    #[test]
    fn untitled_post_has_no_title_heading() {
        let posts = vec![post("2024-03-01", None, "text")];
        let html = entries_html(&render_posts(&posts, &MinimalRenderer).unwrap());
        assert!(!html.contains("blog-title"));
        assert!(html.contains("<h2 class=\"blog-date\">2024-03-01</h2>"));
    }

    #[test]
    fn titles_are_escaped_and_articles_separated() {
        let posts = vec![
            post("2024-03-02", Some("<b>Tom & \"Jerry\"</b>"), "a"),
            post("2024-03-01", None, "b"),
        ];
        let html = entries_html(&render_posts(&posts, &MinimalRenderer).unwrap());
        assert!(html.contains("&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"));
        assert!(html.contains("</article>\n\n<article"));
        assert!(html.find("2024-03-02").unwrap() < html.find("2024-03-01").unwrap());
    }

    #[test]
    fn no_posts_no_html() {
        assert_eq!(entries_html(&[]), "");
    }
}
