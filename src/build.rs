//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the content
//! ([`crate::parser`]), rendering post, page and listing pages
//! ([`crate::pages`]), building the search index ([`crate::search`]), the
//! Atom feed and the sitemap, and writing all of it to the output directory
//! ([`crate::emit`]).

use crate::config::Config;
use crate::emit::{list_files, Emitter, Error as EmitError, RenderedPage};
use crate::feed::{feed_xml, Error as FeedError, FEED_PATH};
use crate::pages::Renderer;
use crate::parser::{Error as ParseError, Parser};
use crate::search::{build_index, to_json};
use crate::sitemap::{robots_txt, Sitemap, ROBOTS_PATH, SITEMAP_PATH};
use crate::template::{Error as TemplateError, Templates};
use crate::widget::{CONSENT_SCRIPT, CONSENT_SCRIPT_PATH, SEARCH_SCRIPT, SEARCH_SCRIPT_PATH};
use log::{debug, info};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The output directory for static assets, relative to the output root.
pub const STATIC_OUTPUT_DIRECTORY: &str = "static";

/// The search index's location, relative to the output root.
pub const SEARCH_INDEX_PATH: &str = "static/search-index.json";

/// Builds the site from a [`Config`] object. Everything that can fail before
/// touching the output directory (content, templates, rendering) runs first,
/// so a broken project leaves the previous build in place.
pub fn build_site(config: &Config) -> Result<()> {
    let content = Parser::new(
        &config.posts_source_directory,
        &config.pages_source_directory,
        &config.categories_source_directory,
    )
    .parse_content()?;
    info!(
        "loaded {} posts, {} pages and {} categories",
        content.posts.len(),
        content.pages.len(),
        content.categories.len()
    );

    let templates = Templates::load(&config.templates_directory, &config.includes_directory)?;
    let renderer = Renderer::new(&config.site, &templates, &content);
    let pages = renderer.render_site(&content)?;

    let index = build_index(&content.posts);
    let index_json = to_json(&index).map_err(Error::Json)?;
    let feed = feed_xml(&config.site, &content.posts)?;
    let sitemap = Sitemap::from_content(&config.site, &content, renderer.categories()).to_xml();
    check_outputs(&list_files(&config.static_source_directory)?, &pages)?;

    // Blow away the old output so files for deleted content don't linger.
    let emitter = Emitter::new(&config.output_directory);
    emitter.clean()?;
    emitter.copy_dir(
        &config.static_source_directory,
        Path::new(STATIC_OUTPUT_DIRECTORY),
    )?;
    emitter.write_pages(&pages)?;
    emitter.write(Path::new(SEARCH_INDEX_PATH), index_json.as_bytes())?;
    debug!("indexed {} of {} posts", index.len(), content.posts.len());
    emitter.write(Path::new(FEED_PATH), &feed)?;
    emitter.write(Path::new(SITEMAP_PATH), sitemap.as_bytes())?;
    emitter.write(Path::new(ROBOTS_PATH), robots_txt(&config.site).as_bytes())?;

    // Sites may ship their own widget scripts in the static directory.
    for (path, script) in &[
        (SEARCH_SCRIPT_PATH, SEARCH_SCRIPT),
        (CONSENT_SCRIPT_PATH, CONSENT_SCRIPT),
    ] {
        let path = Path::new(STATIC_OUTPUT_DIRECTORY).join(path);
        match emitter.exists(&path) {
            true => debug!("keeping {} from the static directory", path.display()),
            false => emitter.write(&path, script.as_bytes())?,
        }
    }

    info!(
        "wrote {} pages to {}",
        pages.len(),
        config.output_directory.display()
    );
    Ok(())
}

/// Fails if two sources would write the same output file, e.g. a page whose
/// slug is `category/quarters` and the first listing page of that category.
/// The widget scripts are left out since a static copy replaces them.
fn check_outputs(static_files: &[PathBuf], pages: &[RenderedPage]) -> Result<()> {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    let mut claim = |path: PathBuf, source: String| match claimed.entry(path) {
        Entry::Occupied(entry) => Err(Error::DuplicateOutput {
            path: entry.key().clone(),
            first: entry.get().clone(),
            second: source,
        }),
        Entry::Vacant(entry) => {
            entry.insert(source);
            Ok(())
        }
    };

    for file in static_files {
        claim(
            Path::new(STATIC_OUTPUT_DIRECTORY).join(file),
            format!("static file `{}`", file.display()),
        )?;
    }
    for (path, source) in &[
        (SEARCH_INDEX_PATH, "the search index"),
        (FEED_PATH, "the Atom feed"),
        (SITEMAP_PATH, "the sitemap"),
        (ROBOTS_PATH, "robots.txt"),
    ] {
        claim(PathBuf::from(path), source.to_string())?;
    }
    for page in pages {
        claim(page.output_path.clone(), page.source.clone())?;
    }
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing,
/// templating, serializing the search index or feed, and writing output.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing, including duplicate slugs.
    Parse(ParseError),

    /// Returned for errors loading or executing templates.
    Template(TemplateError),

    /// Returned for errors writing the output directory.
    Emit(EmitError),

    /// Returned for errors serializing the search index.
    Json(serde_json::Error),

    /// Returned for errors building the feed.
    Feed(FeedError),

    /// Returned when two sources map to the same output file.
    DuplicateOutput {
        path: PathBuf,
        first: String,
        second: String,
    },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::Emit(err) => err.fmt(f),
            Error::Json(err) => write!(f, "Serializing search index: {}", err),
            Error::Feed(err) => err.fmt(f),
            Error::DuplicateOutput {
                path,
                first,
                second,
            } => write!(
                f,
                "Output file '{}' is produced by both {} and {}",
                path.display(),
                first,
                second
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Emit(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::DuplicateOutput { .. } => None,
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: TemplateError) -> Error {
        Error::Template(err)
    }
}

impl From<EmitError> for Error {
    /// Converts [`EmitError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: EmitError) -> Error {
        Error::Emit(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}
