//! The library code for the `pressroom` static site generator. A build runs
//! in three steps:
//!
//! 1. Loading posts, standalone pages and categories from Markdown files
//!    with YAML frontmatter ([`crate::parser`])
//! 2. Rendering every page through the site's templates ([`crate::pages`])
//!    and deriving the search index, Atom feed and sitemap from the posts
//! 3. Writing the results to the output directory ([`crate::emit`])
//!
//! Each post gets its own page, and the posts are also listed on the home
//! page and on paginated per-category listing pages. The search index feeds
//! a small client-side widget; [`crate::widget`] models its behaviour along
//! with the cookie consent banner shipped with every site.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod category;
pub mod config;
pub mod emit;
pub mod feed;
pub mod markdown;
pub mod pages;
pub mod parser;
pub mod post;
pub mod search;
pub mod sitemap;
pub mod template;
pub mod url;
pub mod value;
pub mod widget;
