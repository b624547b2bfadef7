//! Loads the named page templates. Every template is parsed together with
//! the include fragments, so `{{define "header"}}...{{end}}` blocks in the
//! includes directory can be used from any page template via
//! `{{template "header" .}}`.

use gtmpl::{Context, Template, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The template for post pages and standalone pages.
pub const POST_TEMPLATE: &str = "post.html";

/// The template for the home page and category listing pages.
pub const LIST_TEMPLATE: &str = "list.html";

/// A parsed template, remembering its name for error messages.
pub struct NamedTemplate {
    pub name: String,
    template: Template,
}

impl NamedTemplate {
    /// Renders the template against `value`, returning the resulting HTML.
    pub fn render(&self, value: Value) -> Result<String> {
        let context = Context::from(value).map_err(|err| self.error(err))?;
        let mut out: Vec<u8> = Vec::new();
        self.template
            .execute(&mut out, &context)
            .map_err(|err| self.error(err))?;
        String::from_utf8(out).map_err(|err| self.error(err.to_string()))
    }

    fn error(&self, message: String) -> Error {
        Error::Render {
            name: self.name.clone(),
            message,
        }
    }
}

/// The templates a site build needs.
pub struct Templates {
    pub post: NamedTemplate,
    pub list: NamedTemplate,
}

impl Templates {
    /// Loads [`POST_TEMPLATE`] and [`LIST_TEMPLATE`] from
    /// `templates_directory`, each with the fragments in
    /// `includes_directory`.
    pub fn load(templates_directory: &Path, includes_directory: &Path) -> Result<Templates> {
        let includes = load_includes(includes_directory)?;
        Ok(Templates {
            post: parse_template(templates_directory, POST_TEMPLATE, &includes)?,
            list: parse_template(templates_directory, LIST_TEMPLATE, &includes)?,
        })
    }
}

/// Concatenates every `.html` file in the includes directory in file-name
/// order. A missing directory means there are no includes.
fn load_includes(dir: &Path) -> Result<String> {
    let mut contents = String::new();
    if !dir.is_dir() {
        return Ok(contents);
    }

    for result in WalkDir::new(dir)
        .min_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result.map_err(|err| Error::Include {
            path: dir.to_owned(),
            err: err.into(),
        })?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |e| e == "html") {
            let include = fs::read_to_string(entry.path()).map_err(|err| Error::Include {
                path: entry.path().to_owned(),
                err,
            })?;
            contents.push_str(&include);
            contents.push('\n');
        }
    }
    Ok(contents)
}

// Appends the template file contents to the includes and parses the result
// into a template.
fn parse_template(dir: &Path, name: &str, includes: &str) -> Result<NamedTemplate> {
    let path = dir.join(name);
    let body = fs::read_to_string(&path).map_err(|err| Error::Missing { path, err })?;

    let mut contents = String::with_capacity(includes.len() + body.len());
    contents.push_str(includes);
    contents.push_str(&body);

    let mut template = Template::default();
    template.parse(&contents).map_err(|message| Error::Parse {
        name: name.to_owned(),
        message,
    })?;
    Ok(NamedTemplate {
        name: name.to_owned(),
        template,
    })
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or executing a template.
#[derive(Debug)]
pub enum Error {
    /// Returned when a template file can't be read.
    Missing { path: PathBuf, err: std::io::Error },

    /// Returned when an include fragment can't be read.
    Include { path: PathBuf, err: std::io::Error },

    /// Returned when a template (or one of the includes parsed with it) is
    /// malformed.
    Parse { name: String, message: String },

    /// Returned when executing a template fails, e.g. because it references
    /// an include that was never defined.
    Render { name: String, message: String },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Missing { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Include { path, err } => {
                write!(f, "Opening include file '{}': {}", path.display(), err)
            }
            Error::Parse { name, message } => {
                write!(f, "Parsing template '{}': {}", name, message)
            }
            Error::Render { name, message } => {
                write!(f, "Rendering template '{}': {}", name, message)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Missing { err, .. } => Some(err),
            Error::Include { err, .. } => Some(err),
            Error::Parse { .. } => None,
            Error::Render { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn context(title: &str) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(title.to_owned()));
        Value::Object(m)
    }

    fn project(post: &str, include: Option<&str>) -> TempDir {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("templates")).unwrap();
        fs::write(root.path().join("templates").join(POST_TEMPLATE), post).unwrap();
        fs::write(root.path().join("templates").join(LIST_TEMPLATE), "list").unwrap();
        if let Some(include) = include {
            fs::create_dir_all(root.path().join("includes")).unwrap();
            fs::write(root.path().join("includes").join("head.html"), include).unwrap();
        }
        root
    }

    #[test]
    fn test_render_with_include() -> Result<()> {
        let root = project(
            r#"{{template "head" .}}<main>{{.title}}</main>"#,
            Some(r#"{{define "head"}}<title>{{.title}}</title>{{end}}"#),
        );
        let templates = Templates::load(&root.path().join("templates"), &root.path().join("includes"))?;
        assert_eq!(
            "<title>Quarters</title><main>Quarters</main>",
            templates.post.render(context("Quarters"))?
        );
        Ok(())
    }

    #[test]
    fn test_missing_template() {
        let root = TempDir::new().unwrap();
        let result = Templates::load(&root.path().join("templates"), &root.path().join("includes"));
        assert!(matches!(result, Err(Error::Missing { .. })));
    }

    #[test]
    fn test_missing_include() {
        let root = project(r#"{{template "footer" .}}"#, None);
        let result = Templates::load(&root.path().join("templates"), &root.path().join("includes"))
            .and_then(|templates| templates.post.render(context("x")));
        assert!(matches!(
            result,
            Err(Error::Parse { .. }) | Err(Error::Render { .. })
        ));
    }
}
