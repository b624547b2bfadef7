//! Conversions from site types into template [`Value`]s. Plain-text fields
//! are HTML-escaped here, on their way into the template; fields that already
//! hold HTML (rendered bodies) are passed through.

use crate::category::Category;
use crate::config::{NavItem, Site};
use crate::markdown::escape_text;
use crate::post::Post;
use crate::url::canonical;
use gtmpl::Value;
use std::collections::HashMap;

/// Builds a [`Value::Object`] from `(key, value)` pairs.
pub fn object<I>(fields: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    Value::Object(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<HashMap<String, Value>>(),
    )
}

/// Plain text, escaped for HTML.
pub fn text(s: &str) -> Value {
    Value::String(escape_text(s))
}

/// Markup that is already HTML.
pub fn html(s: &str) -> Value {
    Value::String(s.to_owned())
}

/// An optional piece of plain text; `None` becomes nil so templates can
/// test it with `{{if}}`.
pub fn optional_text(s: Option<&str>) -> Value {
    match s {
        Some(s) => text(s),
        None => Value::Nil,
    }
}

pub fn number(n: usize) -> Value {
    Value::from(n as i64)
}

impl From<&NavItem> for Value {
    fn from(item: &NavItem) -> Value {
        object(vec![("label", text(&item.label)), ("url", text(&item.url))])
    }
}

impl From<&Site> for Value {
    /// Converts the site settings into the `site` template value.
    fn from(site: &Site) -> Value {
        object(vec![
            ("name", text(&site.name)),
            ("base_url", text(site.base_url.as_str().trim_end_matches('/'))),
            ("language", text(&site.language)),
            ("description", text(&site.description)),
            ("nav", Value::Array(site.nav.iter().map(Value::from).collect())),
        ])
    }
}

impl From<&Category> for Value {
    /// Converts [`Category`]s into [`Value`]s for templating.
    fn from(c: &Category) -> Value {
        object(vec![
            ("title", text(&c.title)),
            ("description", text(&c.description)),
            ("slug", text(&c.slug)),
            ("url", text(&c.url())),
        ])
    }
}

/// Converts a [`Post`] into the value templates see for it, in listings and
/// as the `post` of its own page.
pub fn post(post: &Post, site: &Site) -> Value {
    let url = post.url();
    object(vec![
        ("title", text(&post.title)),
        ("description", text(&post.description)),
        ("slug", text(&post.slug)),
        ("canonical", text(&canonical(&site.base_url, &url))),
        ("url", text(&url)),
        ("date", text(&post.date.format("%Y-%m-%d").to_string())),
        ("category", text(&post.category)),
        ("category_url", text(&post.category_url())),
        ("tags", Value::Array(post.tags.iter().map(|t| text(t)).collect())),
        ("cover_image", optional_text(post.cover_image.as_deref())),
        ("cover_alt", optional_text(post.cover_alt.as_deref())),
        ("promo", Value::Bool(post.promo)),
    ])
}
