use crate::url::LinkResolver;
use pulldown_cmark::escape::{escape_href, escape_html};
use pulldown_cmark::*;

/// The minimum number of paragraphs an article needs before it is split for
/// a mid-article widget.
const SPLIT_MIN_PARAGRAPHS: usize = 6;

/// Converts markdown to HTML. Raw HTML (iframes, audio players, ...) is
/// passed through as authored, and links to other content files are
/// rewritten by `links`.
pub fn to_html(markdown: &str, links: &LinkResolver) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter { links };
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(
        &mut out,
        Parser::new_ext(markdown, options).map(|ev| event_converter.convert(ev)),
    );
    out
}

struct EventConverter<'a> {
    links: &'a LinkResolver,
}

impl<'a> EventConverter<'a> {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Tag<'b> {
        match tag {
            // Internal links (links from posts and pages *to* posts and
            // pages) need to be converted from their source file names to
            // the URLs of the rendered pages.
            Tag::Link(link @ (LinkType::Inline
            | LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Shortcut
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown), url, title) => {
                match self.links.resolve(&url) {
                    Some(resolved) => Tag::Link(link, CowStr::from(resolved), title),
                    None => Tag::Link(link, url, title),
                }
            }
            _ => tag,
        }
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Event<'b> {
        match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)),
            _ => ev,
        }
    }
}

/// Splits rendered HTML into two parts so a widget can be placed mid-article.
/// Articles with fewer than six paragraphs are returned whole as the first
/// part. Otherwise the cut falls after paragraph `max(2, n / 3)`.
pub fn split_middle(html: &str) -> (&str, &str) {
    const CLOSE: &str = "</p>";

    // ASCII lowercasing keeps byte offsets intact.
    let lower = html.to_ascii_lowercase();
    let ends: Vec<usize> = lower
        .match_indices(CLOSE)
        .map(|(i, _)| i + CLOSE.len())
        .collect();
    if ends.len() < SPLIT_MIN_PARAGRAPHS {
        return (html, "");
    }
    let cut_para = std::cmp::max(2, ends.len() / 3);
    html.split_at(ends[cut_para - 1])
}

/// HTML-escapes plain text.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Writing to a `String` cannot fail.
    let _ = escape_html(&mut out, s);
    out
}

/// Escapes a URL for use in an `href` attribute.
pub fn escape_url(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let _ = escape_href(&mut out, s);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    fn resolver() -> LinkResolver {
        let mut links = LinkResolver::default();
        links.insert(Path::new("posts/penny.md"), "/lincoln-penny/".to_owned());
        links
    }

    #[test]
    fn test_basic_markdown() {
        let html = to_html("# Values\n\n- one\n- `two`\n", &resolver());
        assert_eq!(
            "<h1>Values</h1>\n<ul>\n<li>one</li>\n<li><code>two</code></li>\n</ul>\n",
            html
        );
    }

    #[test]
    fn test_raw_html_passthrough() {
        let source = "Listen:\n\n<audio controls src=\"/static/a.mp3\"></audio>\n\n\
                      <iframe src=\"https://www.youtube.com/embed/x\"></iframe>\n";
        let html = to_html(source, &resolver());
        assert!(html.contains("<audio controls src=\"/static/a.mp3\"></audio>"));
        assert!(html.contains("<iframe src=\"https://www.youtube.com/embed/x\"></iframe>"));
    }

    #[test]
    fn test_internal_links_rewritten() {
        let html = to_html(
            "See [the penny](penny.md#value) and [elsewhere](https://example.org/x.md).",
            &resolver(),
        );
        assert!(html.contains(r#"<a href="/lincoln-penny/#value">the penny</a>"#));
        assert!(html.contains(r#"<a href="https://example.org/x.md">elsewhere</a>"#));
    }

    #[test]
    fn test_split_middle_short_article() {
        let html = "<p>1</p><p>2</p><p>3</p><p>4</p><p>5</p>";
        assert_eq!((html, ""), split_middle(html));
    }

    #[test]
    fn test_split_middle() {
        let html = "<p>1</p><p>2</p><P>3</P><p>4</p><p>5</p><p>6</p><p>7</p><p>8</p><p>9</p>";
        // nine paragraphs: cut after the third
        assert_eq!(
            ("<p>1</p><p>2</p><P>3</P>", "<p>4</p><p>5</p><p>6</p><p>7</p><p>8</p><p>9</p>"),
            split_middle(html)
        );

        let six = "<p>1</p><p>2</p><p>3</p><p>4</p><p>5</p><p>6</p>";
        assert_eq!(("<p>1</p><p>2</p>", "<p>3</p><p>4</p><p>5</p><p>6</p>"), split_middle(six));
    }

    #[test]
    fn test_escape_text() {
        assert_eq!("&lt;script&gt;alert(1)&lt;/script&gt;", escape_text("<script>alert(1)</script>"));
        assert_eq!("Tom &amp; Jerry", escape_text("Tom & Jerry"));
    }
}
