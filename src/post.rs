//! Defines the [`Post`] and [`StaticPage`] types and the [`Frontmatter`]
//! record they are parsed from. See [`crate::parser`] for the logic that
//! reads them from disk.

use crate::url::{output_path_for_slug, rel_url_from_slug};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// The number of related posts offered on each post page.
pub const RELATED_POSTS: usize = 5;

/// A blog post, parsed from one file in the posts directory. Posts are
/// immutable after loading.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The file the post was parsed from. Used in error messages and to
    /// resolve links between posts.
    pub source_path: PathBuf,

    pub title: String,

    /// The normalized slug. Unique across all posts and standalone pages.
    pub slug: String,

    pub description: String,
    pub date: NaiveDate,

    /// The normalized slug of the post's category, or empty.
    pub category: String,

    /// The post's tags in authored order, without duplicates.
    pub tags: Vec<String>,

    pub cover_image: Option<String>,
    pub cover_alt: Option<String>,

    /// Promotional posts are rendered but left out of the search index.
    pub promo: bool,

    /// The Markdown source of the post body.
    pub body: String,
}

impl Post {
    /// The site-relative URL of the post page, e.g. `/1976-quarter/`.
    pub fn url(&self) -> String {
        rel_url_from_slug(&self.slug)
    }

    /// The post page's output file, relative to the output root.
    pub fn output_path(&self) -> PathBuf {
        output_path_for_slug(&self.slug)
    }

    /// The site-relative URL of the post's category listing, or empty when
    /// the post has no category.
    pub fn category_url(&self) -> String {
        match self.category.is_empty() {
            true => String::new(),
            false => format!("/category/{}/", self.category),
        }
    }
}

/// A non-post page (about, contact, 404, ...) from the pages directory.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticPage {
    pub source_path: PathBuf,
    pub title: String,
    pub description: String,
    pub slug: String,

    /// The Markdown source of the page body.
    pub body: String,

    /// Set for `404.md`, which is rendered to `/404.html` rather than under
    /// its slug and is left out of the sitemap.
    pub not_found: bool,
}

impl StaticPage {
    pub fn url(&self) -> String {
        match self.not_found {
            true => String::from("/404.html"),
            false => rel_url_from_slug(&self.slug),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        match self.not_found {
            true => PathBuf::from("404.html"),
            false => output_path_for_slug(&self.slug),
        }
    }
}

/// The YAML frontmatter of a content file. `title`, `slug` and `date` are
/// required for posts; the loader checks that, since standalone pages and
/// categories share this record but may omit them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_tags",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_alt: Option<String>,

    #[serde(default)]
    pub promo: bool,
}

impl Frontmatter {
    /// Serializes the recognized fields back into YAML suitable for a
    /// frontmatter block.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Tags may be authored as a YAML sequence or as a single string separated
/// by commas and/or whitespace. Either way the result is trimmed and
/// de-duplicated, preserving the first occurrence.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    // Unquoted YAML scalars like `1976` are numbers, but are still tags.
    fn scalar<E: Error>(value: Value) -> Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(E::custom("tags must be strings")),
        }
    }

    let tags: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items
            .into_iter()
            .map(scalar)
            .collect::<Result<_, D::Error>>()?,
        other => scalar::<D::Error>(other)?
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_owned)
            .collect(),
    };

    let mut seen = HashSet::new();
    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect())
}

/// Picks up to `limit` posts related to `current`. Each tag shared with
/// `current` (compared case-insensitively) scores one point and sharing its
/// category scores two. Posts scoring zero are excluded; ties are broken by
/// title.
pub fn related_posts<'a>(
    posts: &'a [Post],
    current: &Post,
    limit: usize,
) -> Vec<&'a Post> {
    let current_tags: HashSet<String> =
        current.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut scored: Vec<(usize, &Post)> = posts
        .iter()
        .filter(|p| p.slug != current.slug)
        .filter_map(|p| {
            let shared = p
                .tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect::<HashSet<_>>()
                .intersection(&current_tags)
                .count();
            let same_category = !current.category.is_empty()
                && p.category == current.category;
            let score = shared + if same_category { 2 } else { 0 };
            match score {
                0 => None,
                _ => Some((score, p)),
            }
        })
        .collect();

    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score.cmp(a_score).then_with(|| a.title.cmp(&b.title))
    });
    scored.into_iter().take(limit).map(|(_, p)| p).collect()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) fn post(slug: &str, date: &str, category: &str, tags: &[&str]) -> Post {
        Post {
            source_path: PathBuf::from(format!("{}.md", slug)),
            title: slug.replace('-', " "),
            slug: slug.to_owned(),
            description: format!("About {}", slug),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category: category.to_owned(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            cover_image: None,
            cover_alt: None,
            promo: false,
            body: String::new(),
        }
    }

    #[test]
    fn test_tags_from_sequence_or_string() {
        let fm: Frontmatter = serde_yaml::from_str("tags: [quarters, 1976, quarters]").unwrap();
        assert_eq!(vec!["quarters", "1976"], fm.tags);

        let fm: Frontmatter = serde_yaml::from_str("tags: 'quarters, 1976 errors'").unwrap();
        assert_eq!(vec!["quarters", "1976", "errors"], fm.tags);

        let fm: Frontmatter = serde_yaml::from_str("title: No tags").unwrap();
        assert!(fm.tags.is_empty());
    }

    #[test]
    fn test_frontmatter_roundtrip() {
        let source = "title: 1976 Bicentennial Quarter Value
slug: 1976-bicentennial-quarter-value
description: What your quarter is worth
date: 2024-03-09
category: quarters
tags: [quarters, '1976']
cover_image: /static/img/quarter.jpg
cover_alt: A 1976 quarter
promo: true
unknown_key: ignored
";
        let parsed: Frontmatter = serde_yaml::from_str(source).unwrap();
        let reparsed: Frontmatter =
            serde_yaml::from_str(&parsed.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, reparsed);
        assert_eq!(
            Some(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
            reparsed.date
        );
        assert!(reparsed.promo);
    }

    #[test]
    fn test_related_posts() {
        let posts = vec![
            post("current", "2024-01-05", "quarters", &["silver", "1976"]),
            post("same-category", "2024-01-04", "quarters", &[]),
            post("one-tag", "2024-01-03", "pennies", &["SILVER"]),
            post("two-tags", "2024-01-02", "", &["silver", "1976"]),
            post("unrelated", "2024-01-01", "dimes", &["gold"]),
        ];

        let related: Vec<&str> = related_posts(&posts, &posts[0], RELATED_POSTS)
            .iter()
            .map(|p| p.slug.as_str())
            .collect();
        // "same category" and "two tags" both score 2 and are ordered by title.
        assert_eq!(vec!["same-category", "two-tags", "one-tag"], related);

        assert_eq!(1, related_posts(&posts, &posts[0], 1).len());
    }
}
