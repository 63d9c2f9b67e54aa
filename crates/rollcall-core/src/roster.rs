//! The roster folder: one subdirectory of face images per registered person.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("invalid person name: {0:?}")]
    InvalidName(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("roster io: {0}")]
    Io(#[from] io::Error),
}

/// Handle on the roster directory tree `{root}/{person}/{index}.jpg`.
#[derive(Debug, Clone)]
pub struct Roster {
    root: PathBuf,
}

impl Roster {
    /// Open the roster at `root`, creating the directory if it is missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RosterError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Last path component of the root; prefixes names in attendance listings.
    pub fn folder_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Registered persons (subdirectories), sorted. Plain files are ignored.
    pub fn person_names(&self) -> Result<Vec<String>, RosterError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Directory for `name`; the name must be a single plain path component.
    pub fn person_dir(&self, name: &str) -> Result<PathBuf, RosterError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn ensure_person_dir(&self, name: &str) -> Result<PathBuf, RosterError> {
        let dir = self.person_dir(name)?;
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Regular files in the person's directory, sorted by file name.
    pub fn image_files(&self, name: &str) -> Result<Vec<PathBuf>, RosterError> {
        let dir = self.person_dir(name)?;
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Write image bytes as `{index}.jpg` in the person's directory.
    pub fn write_image(&self, name: &str, index: usize, bytes: &[u8]) -> Result<PathBuf, RosterError> {
        let path = self.ensure_person_dir(name)?.join(format!("{index}.jpg"));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Resolve a client-supplied relative path to a file inside the roster.
    ///
    /// Absolute paths, `..` components, and anything whose canonical form
    /// escapes the roster root (e.g. via symlinks) resolve to `NotFound`.
    pub fn resolve_asset(&self, relative: &str) -> Result<PathBuf, RosterError> {
        let not_found = || RosterError::NotFound(relative.to_string());

        let rel = Path::new(relative);
        if relative.is_empty()
            || !rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(not_found());
        }

        let root = self.root.canonicalize()?;
        let candidate = root.join(rel).canonicalize().map_err(|_| not_found())?;
        if !candidate.starts_with(&root) || !candidate.is_file() {
            return Err(not_found());
        }
        Ok(candidate)
    }
}

fn validate_name(name: &str) -> Result<(), RosterError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if name.is_empty() || !single_normal || name.contains(['/', '\\', '\0']) {
        return Err(RosterError::InvalidName(name.to_string()));
    }
    Ok(())
}
