//! Templates posts, standalone pages, the home page and category listings
//! into [`RenderedPage`]s. Nothing is written to disk here; see
//! [`crate::emit`].

use crate::category::Category;
use crate::config::Site;
use crate::emit::RenderedPage;
use crate::markdown::{split_middle, to_html};
use crate::parser::{title_case, Content};
use crate::post::{related_posts, Post, StaticPage, RELATED_POSTS};
use crate::template::{NamedTemplate, Result, Templates};
use crate::url::{canonical, LinkResolver};
use crate::value::{self, html, number, object, text};
use gtmpl::Value;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// The site-relative URL of the static assets.
pub const STATIC_URL: &str = "/static/";

/// The site-relative URL of the search index.
pub const SEARCH_INDEX_URL: &str = "/static/search-index.json";

/// Renders every page of the site.
pub struct Renderer<'a> {
    site: &'a Site,
    templates: &'a Templates,
    links: LinkResolver,

    /// Every category with a listing, sorted by slug.
    categories: Vec<Category>,
}

impl<'a> Renderer<'a> {
    pub fn new(site: &'a Site, templates: &'a Templates, content: &Content) -> Renderer<'a> {
        Renderer {
            site,
            templates,
            links: content.link_resolver(),
            categories: listing_categories(content),
        }
    }

    /// The categories that get listing pages: every category descriptor,
    /// plus any category that posts name without a descriptor.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Renders all pages: posts, standalone pages, the home page and the
    /// category listings, in that order.
    pub fn render_site(&self, content: &Content) -> Result<Vec<RenderedPage>> {
        let mut pages = Vec::new();
        for i in 0..content.posts.len() {
            pages.push(self.render_post(&content.posts, i)?);
        }
        for page in &content.pages {
            pages.push(self.render_page(page)?);
        }
        pages.push(self.render_home(&content.posts)?);
        for category in &self.categories {
            let posts: Vec<&Post> = content
                .posts
                .iter()
                .filter(|p| p.category == category.slug)
                .collect();
            pages.extend(self.render_category(category, &posts)?);
        }
        debug!("rendered {} pages", pages.len());
        Ok(pages)
    }

    /// Renders the post at `posts[i]`. `posts` is in listing order and
    /// provides the `prev`, `next` and `related` posts.
    pub fn render_post(&self, posts: &[Post], i: usize) -> Result<RenderedPage> {
        let post = &posts[i];
        let body = to_html(&post.body, &self.links);
        let (content_top, content_bottom) = split_middle(&body);
        let category_title = match self.category(&post.category) {
            Some(category) => category.title.clone(),
            None => String::new(),
        };

        let neighbour = |j: Option<usize>| match j.and_then(|j| posts.get(j)) {
            Some(p) => value::post(p, self.site),
            None => Value::Nil,
        };

        let mut context = self.context(&post.title, &post.description, &post.url());
        context.insert("post", value::post(post, self.site));
        context.insert(
            "page",
            object(vec![
                ("title", text(&post.title)),
                ("description", text(&post.description)),
                ("content_top", html(content_top)),
                ("content_bottom", html(content_bottom)),
                ("body", html(&body)),
                ("category_title", text(&category_title)),
                ("category_url", text(&post.category_url())),
            ]),
        );
        context.insert(
            "related",
            Value::Array(
                related_posts(posts, post, RELATED_POSTS)
                    .into_iter()
                    .map(|p| value::post(p, self.site))
                    .collect(),
            ),
        );
        context.insert("prev", neighbour(i.checked_sub(1)));
        context.insert("next", neighbour(Some(i + 1)));

        let source = post.source_path.display().to_string();
        self.render(&self.templates.post, post.output_path(), source, context)
    }

    /// Renders a standalone page with the post template. There is no `post`
    /// in its context.
    pub fn render_page(&self, page: &StaticPage) -> Result<RenderedPage> {
        let body = to_html(&page.body, &self.links);
        let (content_top, content_bottom) = split_middle(&body);

        let mut context = self.context(&page.title, &page.description, &page.url());
        context.insert("post", Value::Nil);
        context.insert(
            "page",
            object(vec![
                ("title", text(&page.title)),
                ("description", text(&page.description)),
                ("content_top", html(content_top)),
                ("content_bottom", html(content_bottom)),
                ("body", html(&body)),
                ("category_title", text("")),
                ("category_url", text("")),
            ]),
        );
        context.insert("related", Value::Array(Vec::new()));
        context.insert("prev", Value::Nil);
        context.insert("next", Value::Nil);

        let source = page.source_path.display().to_string();
        self.render(&self.templates.post, page.output_path(), source, context)
    }

    /// Renders the home page, listing the first `home_posts_count` posts.
    pub fn render_home(&self, posts: &[Post]) -> Result<RenderedPage> {
        let shown = &posts[..posts.len().min(self.site.home_posts_count)];
        let mut context = self.context(&self.site.name, &self.site.description, "/");
        context.insert("posts", self.post_values(shown.iter()));
        context.insert("pagination", Value::Nil);
        context.insert("category", Value::Nil);
        let source = "home page".to_owned();
        self.render(&self.templates.list, PathBuf::from("index.html"), source, context)
    }

    /// Renders the listing pages of one category. `posts` are the
    /// category's posts in listing order.
    pub fn render_category(
        &self,
        category: &Category,
        posts: &[&Post],
    ) -> Result<Vec<RenderedPage>> {
        let chunks = paginate(posts, self.site.posts_per_page);
        let total_pages = chunks.len();
        let title = format!("{} - {}", category.title, self.site.name);

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let page = i + 1;
                let url = category.page_url(page);
                let mut context = self.context(&title, &category.description, &url);
                context.insert("posts", self.post_values(chunk.iter().copied()));
                context.insert(
                    "pagination",
                    object(vec![
                        ("page", number(page)),
                        ("total_pages", number(total_pages)),
                        (
                            "prev_url",
                            match page > 1 {
                                true => text(&category.page_url(page - 1)),
                                false => Value::Nil,
                            },
                        ),
                        (
                            "next_url",
                            match page < total_pages {
                                true => text(&category.page_url(page + 1)),
                                false => Value::Nil,
                            },
                        ),
                    ]),
                );
                context.insert("category", Value::from(category));
                let source = format!("category \"{}\" page {}", category.slug, page);
                self.render(&self.templates.list, category.page_output_path(page), source, context)
            })
            .collect()
    }

    fn category(&self, slug: &str) -> Option<&Category> {
        match slug.is_empty() {
            true => None,
            false => self.categories.iter().find(|c| c.slug == slug),
        }
    }

    fn post_values<'p, I>(&self, posts: I) -> Value
    where
        I: Iterator<Item = &'p Post>,
    {
        Value::Array(posts.map(|p| value::post(p, self.site)).collect())
    }

    /// The context keys shared by every page. `title` doubles as
    /// `page_title`, the document's `<title>`.
    fn context(&self, title: &str, description: &str, url: &str) -> HashMap<&'static str, Value> {
        let description = match description.trim().is_empty() {
            true => self.site.description.as_str(),
            false => description,
        };
        let canonical_url = canonical(&self.site.base_url, url);

        let mut m = HashMap::new();
        m.insert("site", Value::from(self.site));
        m.insert(
            "categories",
            Value::Array(self.categories.iter().map(Value::from).collect()),
        );
        m.insert("title", text(title));
        m.insert("page_title", text(title));
        m.insert("description", text(description));
        m.insert("meta_description", text(description));
        m.insert("canonical", text(&canonical_url));
        m.insert("canonical_url", text(&canonical_url));
        m.insert("static_url", text(STATIC_URL));
        m.insert("search_index_url", text(SEARCH_INDEX_URL));
        m
    }

    fn render(
        &self,
        template: &NamedTemplate,
        output_path: PathBuf,
        source: String,
        context: HashMap<&'static str, Value>,
    ) -> Result<RenderedPage> {
        Ok(RenderedPage {
            contents: template.render(object(context))?,
            output_path,
            source,
        })
    }
}

/// Splits `items` into listing pages of `per_page` items. Zero puts
/// everything on one page, and an empty list still gets one (empty) page.
pub fn paginate<T>(items: &[T], per_page: usize) -> Vec<&[T]> {
    if per_page == 0 || items.is_empty() {
        return vec![items];
    }
    items.chunks(per_page).collect()
}

fn listing_categories(content: &Content) -> Vec<Category> {
    let mut categories: BTreeMap<String, Category> = content
        .categories
        .iter()
        .map(|c| (c.slug.clone(), c.clone()))
        .collect();
    for post in content.posts.iter().filter(|p| !p.category.is_empty()) {
        categories
            .entry(post.category.clone())
            .or_insert_with(|| Category::new(&title_case(&post.category), "", &post.category));
    }
    categories.into_values().collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;
    use crate::template::{LIST_TEMPLATE, POST_TEMPLATE};
    use std::fs;
    use tempfile::TempDir;

    fn templates(post_template: &str, list_template: &str) -> (TempDir, Templates) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("templates");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(POST_TEMPLATE), post_template).unwrap();
        fs::write(dir.join(LIST_TEMPLATE), list_template).unwrap();
        let templates = Templates::load(&dir, &root.path().join("includes")).unwrap();
        (root, templates)
    }

    fn content(posts: Vec<Post>, categories: Vec<Category>) -> Content {
        Content {
            posts,
            pages: Vec::new(),
            categories,
        }
    }

    #[test]
    fn test_paginate() {
        let items: Vec<usize> = (0..5).collect();
        assert_eq!(vec![&items[0..2], &items[2..4], &items[4..5]], paginate(&items, 2));
        assert_eq!(vec![&items[..]], paginate(&items, 0));
        let empty: Vec<usize> = Vec::new();
        assert_eq!(1, paginate(&empty, 12).len());
    }

    #[test]
    fn test_post_page_context() -> Result<()> {
        let (_root, templates) = templates(
            "{{.page_title}}|{{.post.url}}|{{.page.category_title}}|{{if .prev}}{{.prev.slug}}{{end}}|{{if .next}}{{.next.slug}}{{end}}|{{range .related}}{{.slug}}{{end}}|{{.page.content_top}}",
            "",
        );
        let mut first = post("newest", "2024-03-01", "quarters", &["silver"]);
        first.title = "<Newest>".to_owned();
        first.body = "Hello *world*".to_owned();
        let content = content(
            vec![
                first,
                post("middle", "2024-02-01", "quarters", &[]),
                post("oldest", "2024-01-01", "", &["silver"]),
            ],
            vec![Category::new("Quarter Dollars", "", "quarters")],
        );
        let site = Site::default();
        let renderer = Renderer::new(&site, &templates, &content);

        let page = renderer.render_post(&content.posts, 0)?;
        assert_eq!(PathBuf::from("newest/index.html"), page.output_path);
        assert_eq!("newest.md", page.source);
        assert_eq!(
            "&lt;Newest&gt;|/newest/|Quarter Dollars||middle|middleoldest|<p>Hello <em>world</em></p>\n",
            page.contents
        );

        let page = renderer.render_post(&content.posts, 2)?;
        assert!(page.contents.contains("|middle||"));
        Ok(())
    }

    #[test]
    fn test_home_page_is_truncated() -> Result<()> {
        let (_root, templates) =
            templates("", "{{.title}}|{{.page_title}}:{{range .posts}}{{.slug}},{{end}}{{if .pagination}}paged{{end}}");
        let content = content(
            vec![
                post("c", "2024-03-01", "", &[]),
                post("b", "2024-02-01", "", &[]),
                post("a", "2024-01-01", "", &[]),
            ],
            Vec::new(),
        );
        let mut site = Site::default();
        site.home_posts_count = 2;
        let renderer = Renderer::new(&site, &templates, &content);
        let page = renderer.render_home(&content.posts)?;
        assert_eq!(PathBuf::from("index.html"), page.output_path);
        assert_eq!("Best Coins Ever|Best Coins Ever:c,b,", page.contents);
        Ok(())
    }

    #[test]
    fn test_category_pagination() -> Result<()> {
        let (_root, templates) = templates(
            "",
            "{{.page_title}} {{.pagination.page}}/{{.pagination.total_pages}} {{if .pagination.prev_url}}{{.pagination.prev_url}}{{end}} {{if .pagination.next_url}}{{.pagination.next_url}}{{end}} {{range .posts}}{{.slug}}{{end}}",
        );
        let posts = vec![
            post("d", "2024-04-01", "pennies", &[]),
            post("c", "2024-03-01", "pennies", &[]),
            post("b", "2024-02-01", "pennies", &[]),
            post("x", "2024-01-15", "dimes", &[]),
            post("a", "2024-01-01", "pennies", &[]),
        ];
        let content = content(posts, Vec::new());
        let mut site = Site::default();
        site.posts_per_page = 2;
        let renderer = Renderer::new(&site, &templates, &content);

        // "dimes" and "pennies" have no descriptor files but still get listings.
        let slugs: Vec<&str> = renderer.categories().iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(vec!["dimes", "pennies"], slugs);

        let pages = renderer.render_site(&content)?;
        let pennies: Vec<&RenderedPage> = pages
            .iter()
            .filter(|p| p.output_path.starts_with("category/pennies"))
            .collect();
        assert_eq!(2, pennies.len());
        assert_eq!(PathBuf::from("category/pennies/index.html"), pennies[0].output_path);
        assert_eq!(
            "Pennies - Best Coins Ever 1/2  /category/pennies/page/2/ dc",
            pennies[0].contents
        );
        assert_eq!(
            PathBuf::from("category/pennies/page/2/index.html"),
            pennies[1].output_path
        );
        assert_eq!("Pennies - Best Coins Ever 2/2 /category/pennies/  ba", pennies[1].contents);
        assert_eq!("category \"pennies\" page 2", pennies[1].source);
        Ok(())
    }

    #[test]
    fn test_static_page_defaults_description() -> Result<()> {
        let (_root, templates) =
            templates("{{.page_title}}|{{.meta_description}}|{{.canonical}}|{{if .post}}post{{end}}", "");
        let mut content = content(Vec::new(), Vec::new());
        content.pages.push(StaticPage {
            source_path: PathBuf::from("404.md"),
            title: "Not Found".to_owned(),
            description: String::new(),
            slug: "404".to_owned(),
            body: String::new(),
            not_found: true,
        });
        let site = Site::default();
        let renderer = Renderer::new(&site, &templates, &content);
        let page = renderer.render_page(&content.pages[0])?;
        assert_eq!(PathBuf::from("404.html"), page.output_path);
        assert_eq!(
            "Not Found|Coin values, errors, and guides.|https://bestcoinsever.com/404.html|",
            page.contents
        );
        Ok(())
    }
}
