use chrono::{DateTime, NaiveTime, Utc};
use quick_xml::{
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::config::Config;

use super::RenderedPost;

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Splits every `]]>` across two CDATA sections so `text` can sit inside `<![CDATA[...]]>`.
pub(super) fn cdata_safe(text: &str) -> String {
    text.replace("]]>", "]]]]><![CDATA[>")
}

pub(crate) fn item_link(blog_url: &str, date: &str) -> String {
    format!("{blog_url}#{date}")
}

// `entries` are newest first
pub(super) fn feed_xml(
    config: &Config,
    entries: &[RenderedPost],
    built_at: DateTime<Utc>,
) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("rss").with_attributes([
        ("version", "2.0"),
        ("xmlns:content", CONTENT_NS),
        ("xmlns:atom", ATOM_NS),
    ])))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    writer
        .create_element("title")
        .write_text_content(BytesText::new(config.feed_title()))?;
    writer
        .create_element("link")
        .write_text_content(BytesText::new(&config.site_url))?;
    writer
        .create_element("description")
        .write_text_content(BytesText::new(&config.description))?;
    writer
        .create_element("lastBuildDate")
        .write_text_content(BytesText::new(&built_at.to_rfc2822()))?;
    writer.write_event(Event::Empty(BytesStart::new("atom:link").with_attributes([
        ("href", config.feed_url.as_str()),
        ("rel", "self"),
        ("type", "application/rss+xml"),
    ])))?;

    for entry in entries.iter().take(config.max_feed_items) {
        let date = entry.post.date_str();
        let title = entry.post.title_or_date();
        let link = item_link(&config.blog_url, &date);
        let pub_date = entry.post.date.and_time(NaiveTime::MIN).and_utc();

        writer.write_event(Event::Start(BytesStart::new("item")))?;
        writer
            .create_element("title")
            .write_text_content(BytesText::new(&title))?;
        writer
            .create_element("link")
            .write_text_content(BytesText::new(&link))?;
        writer
            .create_element("guid")
            .with_attribute(("isPermaLink", "true"))
            .write_text_content(BytesText::new(&link))?;
        writer
            .create_element("pubDate")
            .write_text_content(BytesText::new(&pub_date.to_rfc2822()))?;
        writer
            .create_element("description")
            .write_text_content(BytesText::new(&title))?;
        writer
            .create_element("content:encoded")
            .write_cdata_content(BytesCData::new(cdata_safe(&entry.html)))?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut xml = String::from_utf8(writer.into_inner())?;
    xml.push('\n');
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::post::Post;

    fn post(date: &str, title: Option<&str>) -> Post {
        Post {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            title: title.map(str::to_string),
            body: String::new(),
            path: PathBuf::from(format!("{date}.md")),
        }
    }

    fn config() -> Config {
        Config {
            site_title: "Site".to_string(),
            feed_title: Some("Site & Blog".to_string()),
            site_url: "https://example.com/".to_string(),
            blog_url: "https://example.com/blog.html".to_string(),
            feed_url: "https://example.com/feed.xml".to_string(),
            description: "Updates <weekly>.".to_string(),
            max_feed_items: 50,
            ..Config::default()
        }
    }

    fn built_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap()
    }

    fn xml(config: &Config, posts: &[Post], html: &str) -> String {
        let entries: Vec<_> = posts
            .iter()
            .map(|post| RenderedPost {
                post,
                html: html.to_string(),
            })
            .collect();
        feed_xml(config, &entries, built_at()).unwrap()
    }

    #[test]
    fn feed_parses_as_rss() {
        let posts = vec![post("2024-03-01", Some("My <Title>")), post("2024-02-01", None)];
        let xml = xml(&config(), &posts, "<p>Hello <strong>world</strong>.</p>");

        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        assert_eq!(channel.title(), "Site & Blog");
        assert_eq!(channel.link(), "https://example.com/");
        assert_eq!(channel.description(), "Updates <weekly>.");
        assert_eq!(
            DateTime::parse_from_rfc2822(channel.last_build_date().unwrap()).unwrap(),
            built_at()
        );

        let items = channel.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title(), Some("My <Title>"));
        assert_eq!(items[0].description(), Some("My <Title>"));
        assert_eq!(
            items[0].link(),
            Some("https://example.com/blog.html#2024-03-01")
        );
        let guid = items[0].guid().unwrap();
        assert!(guid.is_permalink());
        assert_eq!(guid.value(), "https://example.com/blog.html#2024-03-01");
        assert_eq!(
            DateTime::parse_from_rfc2822(items[0].pub_date().unwrap()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(items[0]
            .content()
            .unwrap()
            .contains("<p>Hello <strong>world</strong>.</p>"));

        assert_eq!(items[1].title(), Some("2024-02-01"));
    }

    #[test]
    fn text_is_escaped_and_html_is_cdata() {
        let xml = xml(&config(), &[post("2024-03-01", Some("A & B"))], "<p>x & y</p>");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<title>A &amp; B</title>"));
        assert!(xml.contains("<![CDATA[<p>x & y</p>]]>"));
        assert!(xml.contains("<guid isPermaLink=\"true\">"));
        assert!(xml.contains(
            "<atom:link href=\"https://example.com/feed.xml\" rel=\"self\" type=\"application/rss+xml\"/>"
        ));
    }

    #[test]
    fn items_are_capped_to_the_newest() {
        let config = Config {
            max_feed_items: 2,
            ..config()
        };
        let posts = vec![
            post("2024-03-03", None),
            post("2024-03-02", None),
            post("2024-03-01", None),
        ];
        let channel = rss::Channel::read_from(xml(&config, &posts, "").as_bytes()).unwrap();
        let titles: Vec<_> = channel.items().iter().filter_map(|i| i.title()).collect();
        assert_eq!(titles, vec!["2024-03-03", "2024-03-02"]);
    }

    #[test]
    fn cdata_terminator_is_split() {
        assert_eq!(cdata_safe("a]]>b"), "a]]]]><![CDATA[>b");

        let xml = xml(&config(), &[post("2024-03-01", None)], "<code>x]]>y</code>");
        assert!(xml.contains("<![CDATA[<code>x]]]]><![CDATA[>y</code>]]>"));
        assert!(rss::Channel::read_from(xml.as_bytes()).is_ok());
    }

    #[test]
    fn empty_feed_is_still_a_channel() {
        let channel = rss::Channel::read_from(xml(&config(), &[], "").as_bytes()).unwrap();
        assert!(channel.items().is_empty());
    }
}
