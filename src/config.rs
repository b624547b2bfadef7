use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file. The directory containing it is the project
/// root.
pub const PROJECT_FILE: &str = "site.yaml";

const DEFAULT_SITE_NAME: &str = "Best Coins Ever";
const DEFAULT_BASE_URL: &str = "https://bestcoinsever.com";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_DESCRIPTION: &str = "Coin values, errors, and guides.";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(12)
    }
}

#[derive(Deserialize)]
struct HomePostsCount(usize);
impl Default for HomePostsCount {
    fn default() -> Self {
        HomePostsCount(24)
    }
}

/// The raw contents of `site.yaml`.
#[derive(Deserialize, Default)]
struct Project {
    #[serde(default, alias = "name")]
    site_name: Option<String>,

    #[serde(default)]
    base_url: Option<Url>,

    #[serde(default)]
    language: Option<String>,

    #[serde(default, alias = "description")]
    default_description: Option<String>,

    #[serde(default)]
    posts_per_page: PageSize,

    #[serde(default)]
    home_posts_count: HomePostsCount,

    #[serde(default)]
    nav: Vec<NavItem>,

    #[serde(default)]
    author: Option<Author>,
}

/// A link in the site navigation menu.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct NavItem {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

/// The site author, credited in the Atom feed.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Site-wide settings made available to every template.
#[derive(Clone, Debug)]
pub struct Site {
    pub name: String,
    pub base_url: Url,
    pub language: String,

    /// Used for pages that don't have a description of their own.
    pub description: String,

    /// The number of posts per category listing page. Zero puts every post
    /// on a single page.
    pub posts_per_page: usize,

    /// The number of posts listed on the home page.
    pub home_posts_count: usize,

    pub nav: Vec<NavItem>,
    pub author: Option<Author>,
}

impl Default for Site {
    fn default() -> Self {
        Site::from(Project::default())
    }
}

impl From<Project> for Site {
    fn from(project: Project) -> Site {
        fn non_empty(s: Option<String>, default: &str) -> String {
            s.map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_owned())
        }

        Site {
            name: non_empty(project.site_name, DEFAULT_SITE_NAME),
            base_url: project.base_url.unwrap_or_else(default_base_url),
            language: non_empty(project.language, DEFAULT_LANGUAGE),
            description: non_empty(project.default_description, DEFAULT_DESCRIPTION),
            posts_per_page: project.posts_per_page.0,
            home_posts_count: project.home_posts_count.0,
            nav: project
                .nav
                .into_iter()
                .map(|item| NavItem {
                    label: item.label.trim().to_owned(),
                    url: item.url.trim().to_owned(),
                })
                .filter(|item| !item.label.is_empty() && !item.url.is_empty())
                .collect(),
            author: project.author,
        }
    }
}

fn default_base_url() -> Url {
    // A constant, known-good URL.
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

/// The full build configuration: site settings plus the project layout.
pub struct Config {
    pub site: Site,
    pub project_root: PathBuf,
    pub posts_source_directory: PathBuf,
    pub pages_source_directory: PathBuf,
    pub categories_source_directory: PathBuf,
    pub templates_directory: PathBuf,
    pub includes_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and its ancestors for [`PROJECT_FILE`]. If none is
    /// found, `dir` is used as the project root with default settings.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = candidate.parent();
        }

        warn!(
            "no `{}` found in `{}` or any parent directory; using defaults",
            PROJECT_FILE,
            dir.display()
        );
        Ok(Config::with_site(dir, Site::default()))
    }

    /// Loads the configuration from a project file. The project root is the
    /// file's parent directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = match contents.trim().is_empty() {
            true => Project::default(),
            false => serde_yaml::from_str(&contents).with_context(|| {
                format!("Loading configuration from `{}`", path.display())
            })?,
        };

        debug!("loaded configuration from {}", path.display());
        Ok(Config::with_site(project_root, Site::from(project)))
    }

    /// Lays out the fixed project structure under `project_root`.
    pub fn with_site(project_root: &Path, site: Site) -> Config {
        let content = project_root.join("content");
        Config {
            site,
            project_root: project_root.to_owned(),
            posts_source_directory: content.join("posts"),
            pages_source_directory: content.join("pages"),
            categories_source_directory: content.join("categories"),
            templates_directory: project_root.join("templates"),
            includes_directory: project_root.join("includes"),
            static_source_directory: project_root.join("static"),
            output_directory: project_root.join("dist"),
        }
    }
}
