//! Defines the [`Category`] type, which groups [`crate::post::Post`]s into
//! paginated listing pages.

use crate::url::normalize_slug;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// Represents a category, parsed from a descriptor file in the categories
/// directory. Posts refer to a category by its slug.
#[derive(Clone, Debug)]
pub struct Category {
    pub title: String,
    pub description: String,

    /// The normalized slug, so e.g. `Error Coins` and `error_coins` resolve
    /// to the same category.
    pub slug: String,
}

impl Category {
    pub fn new(title: &str, description: &str, slug: &str) -> Category {
        Category {
            title: title.trim().to_owned(),
            description: description.trim().to_owned(),
            slug: normalize_slug(slug),
        }
    }

    /// The site-relative URL of the category's first listing page.
    pub fn url(&self) -> String {
        format!("/category/{}/", self.slug)
    }

    /// The site-relative URL of listing page `page` (1-based).
    pub fn page_url(&self, page: usize) -> String {
        match page {
            0 | 1 => self.url(),
            _ => format!("/category/{}/page/{}/", self.slug, page),
        }
    }

    /// The output file of listing page `page` (1-based), relative to the
    /// output root.
    pub fn page_output_path(&self, page: usize) -> PathBuf {
        let dir = PathBuf::from("category").join(&self.slug);
        match page {
            0 | 1 => dir.join("index.html"),
            _ => dir.join("page").join(page.to_string()).join("index.html"),
        }
    }
}

impl Hash for Category {
    /// Implements [`Hash`] for [`Category`] by delegating directly to the
    /// `slug` field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slug.hash(state)
    }
}

impl PartialEq for Category {
    /// Implements [`PartialEq`] and [`Eq`] for [`Category`] by delegating
    /// directly to the `slug` field.
    fn eq(&self, other: &Self) -> bool {
        self.slug == other.slug
    }
}
impl Eq for Category {}
