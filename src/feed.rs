//! Support for creating the Atom feed from the list of posts.

use crate::config::{Author, Site};
use crate::post::Post;
use crate::url::canonical;
use atom_syndication::{Entry, Error as AtomError, Feed, FixedDateTime, Link, Person, Text};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use std::fmt;

/// The feed's location, relative to the output root.
pub const FEED_PATH: &str = "feed.atom";

/// Builds the Atom feed for `posts` (in listing order) and serializes it.
///
/// The feed's `updated` stamp is the date of the newest post rather than
/// the build time, so rebuilding unchanged content yields the same bytes.
pub fn feed_xml(site: &Site, posts: &[Post]) -> Result<Vec<u8>> {
    Ok(feed(site, posts).write_to(Vec::new())?)
}

fn feed(site: &Site, posts: &[Post]) -> Feed {
    let home = canonical(&site.base_url, "/");
    let updated = posts
        .iter()
        .map(|p| p.date)
        .max()
        // 1970-01-01
        .unwrap_or_default();

    let mut feed = Feed::default();
    feed.set_title(site.name.as_str());
    feed.set_id(home.as_str());
    feed.set_updated(midnight_utc(updated));
    feed.set_authors(author_to_people(site.author.as_ref()));
    feed.set_links(vec![
        link(&home, "alternate"),
        link(&canonical(&site.base_url, FEED_PATH), "self"),
    ]);
    feed.set_entries(
        posts
            .iter()
            .map(|post| feed_entry(site, post))
            .collect::<Vec<Entry>>(),
    );
    feed
}

fn feed_entry(site: &Site, post: &Post) -> Entry {
    let url = canonical(&site.base_url, &post.url());
    let date = midnight_utc(post.date);

    let mut entry = Entry::default();
    entry.set_id(url.as_str());
    entry.set_title(post.title.as_str());
    entry.set_updated(date);
    entry.set_published(Some(date));
    entry.set_authors(author_to_people(site.author.as_ref()));
    entry.set_links(vec![link(&url, "alternate")]);
    if !post.description.is_empty() {
        entry.set_summary(Some(Text::from(post.description.as_str())));
    }
    entry
}

// Post dates carry no time or zone; they are published at midnight UTC.
fn midnight_utc(date: NaiveDate) -> FixedDateTime {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default())).into()
}

fn link(href: &str, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating the feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error, including I/O errors
    /// while serializing.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => write!(f, "Writing Atom feed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}
