//! Sitemap and `robots.txt` generation.
//!
//! The sitemap lists the canonical URL of every page search engines should
//! see: the home page, standalone pages other than the 404 page, posts, and
//! every category listing page. URLs are sorted and de-duplicated, and posts
//! carry their date as `<lastmod>`:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://bestcoinsever.com/</loc>
//!   </url>
//! </urlset>
//! ```

use crate::category::Category;
use crate::config::Site;
use crate::pages::paginate;
use crate::parser::Content;
use crate::post::Post;
use crate::url::canonical;
use std::collections::BTreeMap;

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// The sitemap's location, relative to the output root.
pub const SITEMAP_PATH: &str = "sitemap.xml";

/// The robots file's location, relative to the output root.
pub const ROBOTS_PATH: &str = "robots.txt";

/// The URLs of a site, keyed (and thereby sorted and de-duplicated) by
/// canonical URL. The value is the optional `YYYY-MM-DD` modification date.
pub struct Sitemap {
    urls: BTreeMap<String, Option<String>>,
}

impl Sitemap {
    /// Collects the sitemap URLs. `categories` are the categories that get
    /// listing pages.
    pub fn from_content(site: &Site, content: &Content, categories: &[Category]) -> Sitemap {
        let mut sitemap = Sitemap {
            urls: BTreeMap::new(),
        };
        let loc = |rel: &str| canonical(&site.base_url, rel);

        sitemap.insert(loc("/"), None);
        for page in content.pages.iter().filter(|p| !p.not_found) {
            sitemap.insert(loc(&page.url()), None);
        }
        for post in &content.posts {
            sitemap.insert(loc(&post.url()), Some(post.date.format("%Y-%m-%d").to_string()));
        }
        for category in categories {
            let posts: Vec<&Post> = content
                .posts
                .iter()
                .filter(|p| p.category == category.slug)
                .collect();
            let pages = paginate(&posts, site.posts_per_page).len();
            for page in 1..=pages {
                sitemap.insert(loc(&category.page_url(page)), None);
            }
        }
        sitemap
    }

    fn insert(&mut self, loc: String, lastmod: Option<String>) {
        let entry = self.urls.entry(loc).or_insert(None);
        if lastmod > *entry {
            *entry = lastmod;
        }
    }

    /// Generate sitemap XML string.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{}">"#, SITEMAP_NS));
        xml.push('\n');

        for (loc, lastmod) in &self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(loc)));
            if let Some(lastmod) = lastmod {
                xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Allows all crawlers and points them at the sitemap.
pub fn robots_txt(site: &Site) -> String {
    format!(
        "User-agent: *\nAllow: /\n\nSitemap: {}\n",
        canonical(&site.base_url, SITEMAP_PATH)
    )
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
