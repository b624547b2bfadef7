//! Slug normalization and the mapping from slugs to site URLs and output
//! paths. Also defines [`LinkResolver`], which rewrites links between content
//! files (e.g., `other-post.md`) into the URLs of the rendered pages.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

const MARKDOWN_EXTENSION: &str = ".md";

/// Normalizes a single slug segment: lowercases it, transliterates it to
/// ASCII, and replaces runs of anything outside `[a-z0-9]` (underscores and
/// whitespace included) with a single dash, trimming dashes at either end.
pub fn slugify_segment(s: &str) -> String {
    slug::slugify(s)
}

/// Normalizes a slug which may contain `/`-separated segments. Empty
/// segments are dropped, so the result never begins or ends with `/`.
pub fn normalize_slug(raw: &str) -> String {
    raw.split('/')
        .map(slugify_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// The site-relative URL for a slug, e.g. `foo/bar` becomes `/foo/bar/`. The
/// empty slug is the site root.
pub fn rel_url_from_slug(slug: &str) -> String {
    let slug = normalize_slug(slug);
    match slug.is_empty() {
        true => String::from("/"),
        false => format!("/{}/", slug),
    }
}

/// The output file for a slug, relative to the output root.
pub fn output_path_for_slug(slug: &str) -> PathBuf {
    let slug = normalize_slug(slug);
    let mut path = PathBuf::new();
    for segment in slug.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.join("index.html")
}

/// Joins the site's base URL and a site-relative URL.
pub fn canonical(base_url: &url::Url, rel: &str) -> String {
    format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        rel.trim_start_matches('/')
    )
}

/// Rewrites internal links. Content files link to each other by file name
/// (`[see also](other-post.md#prices)`), and those links need to point at the
/// rendered page (`/other-post/#prices`). Links that don't name a known
/// content file are left untouched.
#[derive(Default)]
pub struct LinkResolver {
    urls: HashMap<String, String>,
}

impl LinkResolver {
    /// Registers the content file at `source_path` as being rendered at `url`.
    pub fn insert(&mut self, source_path: &Path, url: String) {
        if let Some(file_name) = source_path.file_name() {
            self.urls
                .insert(file_name.to_string_lossy().into_owned(), url);
        }
    }

    /// Resolves a link destination. Returns `None` when the link should be
    /// kept as authored.
    pub fn resolve(&self, dest: &str) -> Option<String> {
        if dest.contains("://") || dest.starts_with('/') || dest.starts_with('#')
        {
            return None;
        }

        let (path, fragment) = match dest.find('#') {
            Some(i) => (&dest[..i], &dest[i..]),
            None => (dest, ""),
        };
        if !path.ends_with(MARKDOWN_EXTENSION) {
            return None;
        }

        // Content directories are flat, so `./foo.md` and `../posts/foo.md`
        // both name `foo.md`.
        let file_name = path.rsplit('/').next().unwrap_or(path);
        self.urls
            .get(file_name)
            .map(|url| format!("{}{}", url, fragment))
    }
}
