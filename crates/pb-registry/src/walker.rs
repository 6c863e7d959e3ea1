//! Directory traversal for definition files.
//!
//! [`FileWalker`] wraps `ignore::WalkBuilder`, so `.gitignore`/`.ignore`
//! patterns are honored and hidden entries are skipped. Results are UTF-8
//! paths sorted lexicographically, which fixes the parse order of a batch
//! regardless of how the filesystem enumerates entries.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use pb_registry::FileWalker;
//!
//! let walker = FileWalker::new(Utf8Path::new("app/models"))?;
//! for path in walker.collect_paths()? {
//!     println!("Found: {path}");
//! }
//! # Ok::<(), pb_registry::RegistryError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use pb_core::config::DEFAULT_FILE_EXTENSION;

use crate::error::RegistryError;

/// Directories never descended into.
const SKIP_DIRECTORIES: &[&str] = &["node_modules", ".git", "target"];

/// Recursively discovers definition files below a folder.
#[derive(Debug)]
pub struct FileWalker {
    /// The directory to walk.
    root: Utf8PathBuf,
    /// File extension to keep, without the dot.
    extension: String,
}

impl FileWalker {
    /// Creates a walker for `.proto` files below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if `root` doesn't exist or isn't a
    /// directory.
    pub fn new(root: &Utf8Path) -> Result<Self, RegistryError> {
        if !root.exists() {
            return Err(RegistryError::config(format!(
                "folder does not exist: {root}"
            )));
        }
        if !root.is_dir() {
            return Err(RegistryError::config(format!(
                "folder is not a directory: {root}"
            )));
        }

        Ok(Self {
            root: root.to_owned(),
            extension: DEFAULT_FILE_EXTENSION.to_owned(),
        })
    }

    /// Sets the file extension to collect (without the leading dot).
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        extension.clone_into(&mut self.extension);
        self
    }

    /// Collects every matching file, sorted lexicographically.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Walk`] if traversal fails and
    /// [`RegistryError::NonUtf8Path`] for a path that isn't UTF-8.
    pub fn collect_paths(&self) -> Result<Vec<Utf8PathBuf>, RegistryError> {
        let mut paths = Vec::new();

        for result in self.build_walker() {
            let entry = result?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let utf8_path = Utf8Path::from_path(path)
                .ok_or_else(|| RegistryError::NonUtf8Path(path.to_owned()))?;

            if self.is_definition_file(utf8_path) && !self.should_skip_path(utf8_path) {
                paths.push(utf8_path.to_owned());
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn build_walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            .standard_filters(true)
            .follow_links(false)
            .require_git(false)
            .build()
    }

    fn is_definition_file(&self, path: &Utf8Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension)
    }

    fn should_skip_path(&self, path: &Utf8Path) -> bool {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .any(|component| SKIP_DIRECTORIES.contains(&component.as_str()))
    }

    /// Returns the directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn utf8(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_collects_sorted_proto_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("user.proto"), "").unwrap();
        fs::write(root.join("nested/order.proto"), "").unwrap();
        fs::write(root.join("auth.proto"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let paths = FileWalker::new(&root).unwrap().collect_paths().unwrap();
        let relative: Vec<&str> = paths
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().as_str())
            .collect();
        assert_eq!(relative, vec!["auth.proto", "nested/order.proto", "user.proto"]);
    }

    #[test]
    fn test_skips_hidden_and_vendor_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join(".cache/a.proto"), "").unwrap();
        fs::write(root.join("node_modules/pkg/b.proto"), "").unwrap();
        fs::write(root.join("c.proto"), "").unwrap();

        let paths = FileWalker::new(&root).unwrap().collect_paths().unwrap();
        assert_eq!(paths, vec![root.join("c.proto")]);
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8(&dir);
        fs::write(root.join("a.proto"), "").unwrap();
        fs::write(root.join("b.pb"), "").unwrap();

        let paths = FileWalker::new(&root)
            .unwrap()
            .with_extension("pb")
            .collect_paths()
            .unwrap();
        assert_eq!(paths, vec![root.join("b.pb")]);
    }

    #[test]
    fn test_rejects_missing_root() {
        let err = FileWalker::new(Utf8Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));

        let file = tempfile::NamedTempFile::new().unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();
        assert!(matches!(
            FileWalker::new(path),
            Err(RegistryError::Config(_))
        ));
    }
}
