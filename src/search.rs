//! The search index and the query logic that runs against it.
//!
//! The index is built from the posts at build time and written to
//! `static/search-index.json`. The browser widget (see [`crate::widget`])
//! fetches it once and scores every entry against the user's query:
//!
//! * the whole query appearing in `title description tags` scores 3;
//! * otherwise each whitespace-separated query token found there scores 1;
//! * entries scoring 0 are dropped, the rest are ranked by descending score
//!   (ties keep index order) and the top [`MAX_RESULTS`] are shown.
//!
//! Matching is case-insensitive. Queries shorter than [`MIN_QUERY_LENGTH`]
//! characters are not scored at all.

use crate::markdown::{escape_text, escape_url};
use crate::post::Post;
use serde::{Deserialize, Serialize};

/// Queries shorter than this yield no results.
pub const MIN_QUERY_LENGTH: usize = 2;

/// The maximum number of results shown.
pub const MAX_RESULTS: usize = 10;

/// The score of an entry containing the whole query.
const EXACT_MATCH_SCORE: usize = 3;

/// The separator used to join an entry's tags.
pub const TAG_SEPARATOR: &str = ",";

/// One post in the search index. Fields hold plain, unescaped text; it is up
/// to the consumer to escape them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SearchEntry {
    pub title: String,
    pub description: String,

    /// The post's tags joined with [`TAG_SEPARATOR`].
    pub tags: String,

    /// The site-relative URL of the post.
    pub url: String,
}

impl From<&Post> for SearchEntry {
    fn from(post: &Post) -> SearchEntry {
        SearchEntry {
            title: post.title.clone(),
            description: post.description.clone(),
            tags: post.tags.join(TAG_SEPARATOR),
            url: post.url(),
        }
    }
}

/// Builds the index from posts in listing order (most recent first).
/// Promotional posts are left out.
pub fn build_index(posts: &[Post]) -> Vec<SearchEntry> {
    posts
        .iter()
        .filter(|p| !p.promo)
        .map(SearchEntry::from)
        .collect()
}

/// Serializes the index as a compact JSON array.
pub fn to_json(index: &[SearchEntry]) -> serde_json::Result<String> {
    serde_json::to_string(index)
}

/// Scores `entry` against an already-lowercased, trimmed query.
fn score_normalized(entry: &SearchEntry, query: &str) -> usize {
    let haystack = format!("{} {} {}", entry.title, entry.description, entry.tags)
        .to_lowercase();
    if haystack.contains(query) {
        return EXACT_MATCH_SCORE;
    }
    query
        .split_whitespace()
        .filter(|token| haystack.contains(token))
        .count()
}

/// Scores `entry` against `query`. Zero means no match.
pub fn score(entry: &SearchEntry, query: &str) -> usize {
    score_normalized(entry, &query.trim().to_lowercase())
}

/// Runs `query` against the index, returning the matching entries in ranked
/// order.
pub fn search<'a>(index: &'a [SearchEntry], query: &str) -> Vec<&'a SearchEntry> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < MIN_QUERY_LENGTH {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &SearchEntry)> = index
        .iter()
        .map(|entry| (score_normalized(entry, &query), entry))
        .filter(|(score, _)| *score > 0)
        .collect();
    // `sort_by` is stable, so equal scores keep their index order.
    scored.sort_by(|(a, _), (b, _)| b.cmp(a));
    scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, entry)| entry)
        .collect()
}

/// Renders results as the HTML the widget places into the results
/// container. Every field is escaped.
pub fn render_results(results: &[&SearchEntry]) -> String {
    let mut out = String::new();
    for entry in results {
        out.push_str(&format!(
            r#"<a class="search-result" href="{}"><strong>{}</strong><span>{}</span></a>"#,
            escape_url(&entry.url),
            escape_text(&entry.title),
            escape_text(&entry.description),
        ));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;

    fn entry(title: &str, description: &str, tags: &str, url: &str) -> SearchEntry {
        SearchEntry {
            title: title.to_owned(),
            description: description.to_owned(),
            tags: tags.to_owned(),
            url: url.to_owned(),
        }
    }

    fn quarter() -> SearchEntry {
        entry(
            "1976 Bicentennial Quarter Value",
            "What your drummer boy quarter is worth",
            "quarters,1976",
            "/posts/1976-bicentennial-quarter-value",
        )
    }

    #[test]
    fn test_build_index_skips_promo() {
        let mut promo = post("sponsored", "2024-02-01", "", &["ads"]);
        promo.promo = true;
        let posts = vec![
            post("newer", "2024-03-01", "", &["quarters", "1976"]),
            promo,
            post("older", "2024-01-01", "", &[]),
        ];

        let index = build_index(&posts);
        let urls: Vec<&str> = index.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(vec!["/newer/", "/older/"], urls);
        assert_eq!("quarters,1976", index[0].tags);
    }

    #[test]
    fn test_to_json() -> serde_json::Result<()> {
        let json = to_json(&[entry("Café <b>", "d", "t", "/u/")])?;
        assert_eq!(
            r#"[{"title":"Café <b>","description":"d","tags":"t","url":"/u/"}]"#,
            json
        );
        Ok(())
    }

    #[test]
    fn test_token_scoring() {
        let index = vec![quarter()];
        assert!(score(&index[0], "1976 quarter") >= 2);
        assert_eq!(1, search(&index, "1976 quarter").len());
        assert!(search(&index, "xyz").is_empty());
    }

    #[test]
    fn test_exact_match_outranks_partial() {
        let exact = quarter();
        let haystack = format!("{} {} {}", exact.title, exact.description, exact.tags);
        let partial = entry("Quarter errors", "", "", "/quarter-errors/");
        let index = vec![partial, exact];

        assert_eq!(3, score(&index[1], &haystack));
        assert_eq!(1, score(&index[0], "quarter"));
        let ranked = search(&index, &haystack.to_uppercase());
        assert_eq!("/posts/1976-bicentennial-quarter-value", ranked[0].url);
    }

    #[test]
    fn test_short_queries_never_score() {
        let index = vec![quarter(), entry("a", "a", "a", "/a/")];
        assert!(search(&index, "a").is_empty());
        assert!(search(&index, " 1 ").is_empty());
        assert!(search(&index, "").is_empty());
    }

    #[test]
    fn test_query_length_counts_characters() {
        let mut coin = quarter();
        coin.title = "Café 🪙 Quarter".to_owned();
        let index = vec![coin];
        // One character each, though two bytes and two UTF-16 units.
        assert!(search(&index, "é").is_empty());
        assert!(search(&index, "🪙").is_empty());
        assert_eq!(1, search(&index, "fé").len());
        assert_eq!(1, search(&index, "🪙 q").len());
    }

    #[test]
    fn test_ranking_is_stable_and_truncated() {
        let index: Vec<SearchEntry> = (0..15)
            .map(|i| entry(&format!("Penny {}", i), "", "", &format!("/penny-{}/", i)))
            .collect();
        let results = search(&index, "penny");
        assert_eq!(MAX_RESULTS, results.len());
        let urls: Vec<&str> = results.iter().map(|e| e.url.as_str()).collect();
        assert_eq!("/penny-0/", urls[0]);
        assert_eq!("/penny-9/", urls[9]);
    }

    #[test]
    fn test_render_escapes() {
        let evil = entry("<script>alert(1)</script>", "a & b", "", "/x/\"onmouseover=\"");
        let html = render_results(&[&evil]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("\"onmouseover=\""));
    }
}
