//! Defines the [`Parser`], [`Content`], and [`Error`] types. Also defines the
//! logic for loading posts, standalone pages and categories from the content
//! directories into memory.

use std::{
    collections::HashMap,
    fmt,
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use walkdir::WalkDir;

use crate::{
    category::Category,
    post::{Frontmatter, Post, StaticPage},
    url::{normalize_slug, LinkResolver},
};

const MARKDOWN_EXTENSION: &str = "md";
const NOT_FOUND_PAGE: &str = "404.md";

/// Everything the content directories hold.
pub struct Content {
    /// Posts, most recent first (ties broken by slug).
    pub posts: Vec<Post>,
    pub pages: Vec<StaticPage>,
    pub categories: Vec<Category>,
}

impl Content {
    /// Builds a [`LinkResolver`] that knows the URL of every post and page.
    pub fn link_resolver(&self) -> LinkResolver {
        let mut resolver = LinkResolver::default();
        for page in &self.pages {
            resolver.insert(&page.source_path, page.url());
        }
        for post in &self.posts {
            resolver.insert(&post.source_path, post.url());
        }
        resolver
    }
}

/// Parses content files from the content directories. A directory that
/// doesn't exist is treated as empty.
pub struct Parser<'a> {
    posts_directory: &'a Path,
    pages_directory: &'a Path,
    categories_directory: &'a Path,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser over the three content directories.
    pub fn new(
        posts_directory: &'a Path,
        pages_directory: &'a Path,
        categories_directory: &'a Path,
    ) -> Parser<'a> {
        Parser {
            posts_directory,
            pages_directory,
            categories_directory,
        }
    }

    /// Loads all content. Fails if any file is malformed or if a slug is
    /// claimed by more than one post or standalone page.
    pub fn parse_content(&self) -> Result<Content> {
        let posts = self.parse_posts()?;
        let pages = self.parse_pages()?;
        let categories = self.parse_categories()?;

        // Posts were already checked against each other.
        let mut claimed: HashMap<&str, &Path> = posts
            .iter()
            .map(|p| (p.slug.as_str(), p.source_path.as_path()))
            .collect();
        for page in pages.iter().filter(|p| !p.not_found) {
            if let Some(first) = claimed.insert(&page.slug, &page.source_path) {
                return Err(Error::DuplicateSlug {
                    slug: page.slug.clone(),
                    first: first.to_owned(),
                    second: page.source_path.clone(),
                });
            }
        }

        Ok(Content {
            posts,
            pages,
            categories,
        })
    }

    /// Returns a lazy sequence of the posts in the posts directory, in
    /// file-name order. Each file is only read when the iterator reaches it.
    pub fn posts(&self) -> Result<Posts> {
        Ok(Posts {
            files: markdown_files(self.posts_directory)?.into_iter(),
        })
    }

    /// Searches the posts directory for post files (extension = `.md`) and
    /// returns a list of [`Post`] objects sorted by date (most recent first).
    /// Each post file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title`, `slug`, `date` and
    ///    optionally `description`, `category`, `tags`, `cover_image`,
    ///    `cover_alt` and `promo`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: 1976 Bicentennial Quarter Value
    /// slug: 1976-bicentennial-quarter-value
    /// date: 2024-03-09
    /// tags: [quarters, 1976]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = Vec::new();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        for result in self.posts()? {
            let post = result?;
            if let Some(first) = claimed.get(&post.slug) {
                return Err(Error::DuplicateSlug {
                    slug: post.slug.clone(),
                    first: first.clone(),
                    second: post.source_path.clone(),
                });
            }
            claimed.insert(post.slug.clone(), post.source_path.clone());
            posts.push(post);
        }

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        debug!("parsed {} posts from {}", posts.len(), self.posts_directory.display());
        Ok(posts)
    }

    /// Parses the standalone pages. `title` defaults to the title-cased file
    /// stem and `slug` to the file stem.
    pub fn parse_pages(&self) -> Result<Vec<StaticPage>> {
        markdown_files(self.pages_directory)?
            .into_iter()
            .map(|path| annotate(&path, parse_page(&path)))
            .collect()
    }

    /// Parses the category descriptors. Only the frontmatter is used; `title`
    /// defaults to the title-cased file stem and `slug` to the file stem.
    pub fn parse_categories(&self) -> Result<Vec<Category>> {
        markdown_files(self.categories_directory)?
            .into_iter()
            .map(|path| {
                annotate(&path, {
                    read_frontmatter(&path).map(|(fm, _)| {
                        let stem = file_stem(&path);
                        Category::new(
                            &fm.title.unwrap_or_else(|| title_case(&stem)),
                            &fm.description.unwrap_or_default(),
                            &fm.slug.unwrap_or(stem),
                        )
                    })
                })
            })
            .collect()
    }
}

/// The lazy sequence returned by [`Parser::posts`].
pub struct Posts {
    files: std::vec::IntoIter<PathBuf>,
}

impl Iterator for Posts {
    type Item = Result<Post>;

    fn next(&mut self) -> Option<Result<Post>> {
        self.files
            .next()
            .map(|path| annotate(&path, parse_post(&path)))
    }
}

fn parse_post(path: &Path) -> Result<Post> {
    let (fm, body) = read_frontmatter(path)?;

    let title = match fm.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_owned(),
        _ => return Err(Error::MissingField("title")),
    };
    let slug = match fm.slug {
        Some(slug) => normalize_slug(&slug),
        None => return Err(Error::MissingField("slug")),
    };
    if slug.is_empty() {
        return Err(Error::EmptySlug);
    }
    let date = fm.date.ok_or(Error::MissingField("date"))?;

    Ok(Post {
        source_path: path.to_owned(),
        title,
        slug,
        description: fm.description.unwrap_or_default().trim().to_owned(),
        date,
        category: normalize_slug(&fm.category.unwrap_or_default()),
        tags: fm.tags,
        cover_image: fm.cover_image,
        cover_alt: fm.cover_alt,
        promo: fm.promo,
        body,
    })
}

fn parse_page(path: &Path) -> Result<StaticPage> {
    let (fm, body) = read_frontmatter(path)?;
    let stem = file_stem(path);
    let slug = normalize_slug(fm.slug.as_deref().unwrap_or(&stem));
    let not_found = path.file_name().map_or(false, |n| n == NOT_FOUND_PAGE);
    if slug.is_empty() && !not_found {
        return Err(Error::EmptySlug);
    }

    Ok(StaticPage {
        source_path: path.to_owned(),
        title: fm
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_case(&stem)),
        description: fm.description.unwrap_or_default().trim().to_owned(),
        slug,
        body,
        not_found,
    })
}

/// Reads a content file and splits it into its parsed frontmatter and its
/// Markdown body.
fn read_frontmatter(path: &Path) -> Result<(Frontmatter, String)> {
    let contents = fs::read_to_string(path)?;
    let (yaml, body) = split_frontmatter(&contents)?;
    let frontmatter = match yaml.trim().is_empty() {
        true => Frontmatter::default(),
        false => serde_yaml::from_str(yaml)?,
    };
    Ok((frontmatter, body.to_owned()))
}

/// Splits `input` into the YAML between the opening and closing `---` lines
/// and the body that follows.
fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    const FENCE: &str = "---";
    let input = input.trim_start_matches('\u{feff}');
    let mut lines = input.split_inclusive('\n');

    let yaml_start = match lines.next() {
        Some(line) if line.trim_end() == FENCE => line.len(),
        _ => return Err(Error::FrontmatterMissingStartFence),
    };

    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Ok((&input[yaml_start..offset], &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

/// Lists the Markdown files directly inside `dir`, sorted by file name.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("skipping missing content directory {}", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for result in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result?;
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |e| e == MARKDOWN_EXTENSION)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `about-us` becomes `About Us`.
pub(crate) fn title_case(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn annotate<T>(path: &Path, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        Error::Annotated(format!("parsing `{}`", path.display()), Box::new(e))
    })
}

/// Represents the result of a content-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing content files.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a post lacks one of `title`, `slug` or `date`.
    MissingField(&'static str),

    /// Returned when a slug has no characters left after normalization.
    EmptySlug,

    /// Returned when two content files claim the same slug.
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    /// Strips annotations, returning the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Annotated(_, err) => err.root(),
            _ => self,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "content file must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::MissingField(field) => {
                write!(f, "missing required field `{}`", field)
            }
            Error::EmptySlug => write!(f, "slug is empty after normalization"),
            Error::DuplicateSlug {
                slug,
                first,
                second,
            } => write!(
                f,
                "duplicate slug `{}` in `{}` (already used by `{}`)",
                slug,
                second.display(),
                first.display()
            ),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::MissingField(_) => None,
            Error::EmptySlug => None,
            Error::DuplicateSlug { .. } => None,
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
