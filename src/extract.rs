//! HTML text extraction for crawled pages.
//!
//! Streams page markup with a lenient `quick-xml` reader and produces the
//! visible text, the `<title>`, and the raw `href` targets of anchor tags.
//! Real-world HTML is not well-formed XML, so the reader runs with end-name
//! checking off and unmatched ends allowed, and any reader error simply ends
//! extraction with whatever was collected so far.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Elements whose subtrees carry no prose.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "header", "footer"];

/// Extracted content of one HTML page.
#[derive(Debug, Default)]
pub struct PageContent {
    /// `<title>` text, when present and non-empty.
    pub title: Option<String>,
    /// Visible text with whitespace collapsed to single spaces.
    pub text: String,
    /// Raw (possibly relative) `href` values of `<a>` tags, in document order.
    pub links: Vec<String>,
}

/// Extract text, title, and links from an HTML page. Never fails; malformed
/// markup truncates extraction instead of erroring.
pub fn extract_page(html: &str) -> PageContent {
    let mut reader = Reader::from_reader(html.as_bytes());
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut text = String::new();
    let mut title = String::new();
    let mut links = Vec::new();
    let mut skip_depth: usize = 0;
    let mut in_title = false;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                if SKIP_TAGS.contains(&name.as_str()) {
                    skip_depth += 1;
                } else if name == "title" {
                    in_title = true;
                } else if name == "a" {
                    if let Some(href) = attribute_value(&e, b"href") {
                        links.push(href);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if tag_name(&e) == "a" {
                    if let Some(href) = attribute_value(&e, b"href") {
                        links.push(href);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if SKIP_TAGS.contains(&name.as_str()) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if name == "title" {
                    in_title = false;
                }
            }
            Ok(Event::Text(e)) => {
                if skip_depth == 0 {
                    let piece = e
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(e.as_ref()).into_owned());
                    if in_title {
                        title.push_str(&piece);
                    }
                    text.push_str(&piece);
                    text.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            // malformed markup: keep what we have
            Err(_) => break,
            Ok(_) => {}
        }
        buf.clear();
    }

    let title = collapse_whitespace(&title);
    PageContent {
        title: (!title.is_empty()).then_some(title),
        text: collapse_whitespace(&text),
        links,
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

fn attribute_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_text_and_title() {
        let html = "<html><head><title>My Page</title></head>\
                    <body><h1>Welcome</h1><p>Hello   world.</p></body></html>";
        let page = extract_page(html);
        assert_eq!(page.title.as_deref(), Some("My Page"));
        assert!(page.text.contains("Welcome"));
        assert!(page.text.contains("Hello world."));
    }

    #[test]
    fn test_skips_script_and_style() {
        let html = "<body><script>var x = 1;</script><style>p{}</style>\
                    <p>Visible</p><footer>Fine print</footer></body>";
        let page = extract_page(html);
        assert!(page.text.contains("Visible"));
        assert!(!page.text.contains("var x"));
        assert!(!page.text.contains("p{}"));
        assert!(!page.text.contains("Fine print"));
    }

    #[test]
    fn test_collects_links() {
        let html = r#"<body><a href="/docs">Docs</a><a href="https://example.com/x">X</a></body>"#;
        let page = extract_page(html);
        assert_eq!(page.links, vec!["/docs", "https://example.com/x"]);
    }

    #[test]
    fn test_empty_page() {
        let page = extract_page("");
        assert!(page.title.is_none());
        assert!(page.text.is_empty());
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_unclosed_tags_do_not_panic() {
        let html = "<body><p>One<br><p>Two";
        let page = extract_page(html);
        assert!(page.text.contains("One"));
        assert!(page.text.contains("Two"));
    }
}
