//! Maps photo file locations to logical folders and public references.

use std::path::{Component, Path, PathBuf};

use crate::types::UNCATEGORIZED_FOLDER;

/// Resolves folders and public references relative to the configured storage roots.
///
/// Roots are matched in configuration order and component-wise, so `/data/ab/x.jpg`
/// does not belong to the root `/data/a`.
#[derive(Debug, Clone)]
pub struct PathResolver {
    roots: Vec<PathBuf>,
    public_prefix: String,
}

impl PathResolver {
    pub fn new(roots: Vec<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let public_prefix = public_prefix.into().trim_end_matches('/').to_string();
        Self { roots, public_prefix }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Folder of `path` relative to the first storage root that contains it.
    ///
    /// Nested directories are joined with `/`. Files directly below a root, and
    /// files outside every root, are [`UNCATEGORIZED_FOLDER`].
    pub fn folder_for(&self, path: &Path) -> String {
        let Some(dir) = path.parent() else {
            return UNCATEGORIZED_FOLDER.to_string();
        };
        match self.strip_root(dir) {
            Some(rel) => {
                let folder = join_components(rel);
                if folder.is_empty() {
                    UNCATEGORIZED_FOLDER.to_string()
                } else {
                    folder
                }
            }
            None => UNCATEGORIZED_FOLDER.to_string(),
        }
    }

    /// Public reference for `path`, e.g. `/external/trip/x.jpg`.
    ///
    /// Returns an empty string when no storage root contains `path`.
    pub fn reference_for(&self, path: &Path) -> String {
        match self.strip_root(path) {
            Some(rel) => {
                let rel = join_components(rel);
                if rel.is_empty() {
                    self.public_prefix.clone()
                } else {
                    format!("{}/{}", self.public_prefix, rel)
                }
            }
            None => String::new(),
        }
    }

    fn strip_root<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        self.roots.iter().find_map(|root| path.strip_prefix(root).ok())
    }
}

fn join_components(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().replace('\\', "/")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
