//! Writes the built site to disk. Every file is first written to a temporary
//! file next to its destination and then renamed into place, so a failed
//! build never leaves a half-written file behind.

use log::debug;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// The mode of generated files: world-readable, so a web server running as
/// another user can serve them.
#[cfg(unix)]
const GENERATED_FILE_MODE: u32 = 0o644;

/// A page or other generated file, ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedPage {
    /// The destination, relative to the output root.
    pub output_path: PathBuf,
    pub contents: String,

    /// What the page was rendered from, e.g. a content file or
    /// `category "quarters" page 2`. Used in error messages.
    pub source: String,
}

/// Writes files under an output root.
pub struct Emitter<'a> {
    root: &'a Path,
}

impl<'a> Emitter<'a> {
    pub fn new(root: &'a Path) -> Emitter<'a> {
        Emitter { root }
    }

    /// Deletes the output root and everything in it, then recreates it
    /// empty, so files from a previous build can't linger.
    pub fn clean(&self) -> Result<()> {
        match fs::remove_dir_all(self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(Error::Clean {
                    path: self.root.to_owned(),
                    err,
                })
            }
        }
        fs::create_dir_all(self.root).map_err(|err| Error::Clean {
            path: self.root.to_owned(),
            err,
        })
    }

    /// Writes one file, creating parent directories as needed.
    pub fn write(&self, relative: &Path, contents: &[u8]) -> Result<()> {
        let path = self.root.join(relative);
        write_atomic(&path, contents, generated_permissions())
            .map_err(|err| Error::Write { path, err })
    }

    /// Writes a batch of pages.
    pub fn write_pages(&self, pages: &[RenderedPage]) -> Result<()> {
        for page in pages {
            self.write(&page.output_path, page.contents.as_bytes())?;
        }
        debug!("wrote {} pages under {}", pages.len(), self.root.display());
        Ok(())
    }

    /// Whether a file already exists at `relative`.
    pub fn exists(&self, relative: &Path) -> bool {
        self.root.join(relative).exists()
    }

    /// Copies the directory tree `src` verbatim to `relative` under the
    /// output root. A missing `src` copies nothing.
    pub fn copy_dir(&self, src: &Path, relative: &Path) -> Result<()> {
        let dst = self.root.join(relative);
        if !src.is_dir() {
            debug!("no static directory at {}", src.display());
            return Ok(());
        }

        for result in WalkDir::new(src).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
            let entry = result.map_err(|err| Error::Copy {
                path: src.to_owned(),
                err: err.into(),
            })?;
            // strip_prefix shouldn't fail since `src` is always an ancestor
            // of the entry path
            let target = match entry.path().strip_prefix(src) {
                Ok(rel) => dst.join(rel),
                Err(_) => continue,
            };
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|err| Error::Write {
                    path: target.clone(),
                    err,
                })?;
            } else {
                let read = |path: &Path| -> io::Result<(Vec<u8>, fs::Permissions)> {
                    Ok((fs::read(path)?, fs::metadata(path)?.permissions()))
                };
                let (contents, permissions) = read(entry.path()).map_err(|err| Error::Copy {
                    path: entry.path().to_owned(),
                    err,
                })?;
                write_atomic(&target, &contents, Some(permissions)).map_err(|err| Error::Write {
                    path: target.clone(),
                    err,
                })?;
            }
        }
        Ok(())
    }
}

/// Lists the files under `dir`, relative to it, in sorted order. A missing
/// directory has no files.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for result in WalkDir::new(dir).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result.map_err(|err| Error::Copy {
            path: dir.to_owned(),
            err: err.into(),
        })?;
        if !entry.file_type().is_dir() {
            if let Ok(rel) = entry.path().strip_prefix(dir) {
                files.push(rel.to_owned());
            }
        }
    }
    Ok(files)
}

// Temporary files are created owner-only, so the final permissions are set
// before the rename.
fn write_atomic(
    path: &Path,
    contents: &[u8],
    permissions: Option<fs::Permissions>,
) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    if let Some(permissions) = permissions {
        file.as_file().set_permissions(permissions)?;
    }
    file.persist(path)?;
    Ok(())
}

#[cfg(unix)]
fn generated_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(GENERATED_FILE_MODE))
}

#[cfg(not(unix))]
fn generated_permissions() -> Option<fs::Permissions> {
    None
}

/// The result of a fallible emit operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing the output tree.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: io::Error },

    /// Returned when an output file can't be written.
    Write { path: PathBuf, err: io::Error },

    /// Returned when a static asset can't be read.
    Copy { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
            Error::Copy { path, err } => {
                write!(f, "Copying '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Clean { err, .. } => Some(err),
            Error::Write { err, .. } => Some(err),
            Error::Copy { err, .. } => Some(err),
        }
    }
}
