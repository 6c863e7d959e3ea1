//! Batch loading of definition files into the tree.
//!
//! A folder is walked recursively, its files are sorted, read with
//! `tokio::fs`, and merged one at a time. A file that fails to read, parse
//! or merge is logged and recorded in the [`LoadReport`]; the rest of the
//! batch still loads.

use camino::{Utf8Path, Utf8PathBuf};
use pb_schema::{SchemaError, SchemaTree};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::walker::FileWalker;

/// Outcome of loading one folder.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// The folder that was loaded, as resolved.
    pub folder: Utf8PathBuf,
    /// Files merged successfully, in load order.
    pub loaded: Vec<Utf8PathBuf>,
    /// Files that were skipped, with the reason.
    pub failures: Vec<RegistryError>,
}

impl LoadReport {
    /// Whether every discovered file loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files discovered.
    #[must_use]
    pub fn total(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }
}

/// Loads every definition file below `folder` into `tree`.
///
/// `project_root` is only used to shorten paths in log messages.
///
/// # Errors
///
/// Returns [`RegistryError::Config`] if `folder` isn't a directory, and
/// walker errors. Per-file errors are reported in [`LoadReport::failures`].
pub async fn load_folder(
    tree: &mut SchemaTree,
    folder: &Utf8Path,
    extension: &str,
    project_root: &Utf8Path,
) -> Result<LoadReport, RegistryError> {
    let paths = FileWalker::new(folder)?
        .with_extension(extension)
        .collect_paths()?;
    debug!(folder = %folder, count = paths.len(), "Discovered definition files");

    let mut report = LoadReport {
        folder: folder.to_owned(),
        ..LoadReport::default()
    };

    for path in paths {
        match load_file(tree, &path).await {
            Ok(count) => {
                debug!(file = %relative(&path, project_root), declarations = count, "Loaded file");
                report.loaded.push(path);
            }
            Err(err) => {
                warn!(
                    file = %relative(&path, project_root),
                    error = %err,
                    "Failed to load definition file"
                );
                report.failures.push(RegistryError::Schema(err));
            }
        }
    }

    if report.is_clean() {
        info!(
            folder = %relative(folder, project_root),
            loaded = report.loaded.len(),
            "Loaded definitions"
        );
    } else {
        warn!(
            folder = %relative(folder, project_root),
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "Loaded definitions with failures"
        );
    }
    Ok(report)
}

async fn load_file(tree: &mut SchemaTree, path: &Utf8Path) -> Result<usize, SchemaError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SchemaError::Read {
            path: path.to_owned(),
            source,
        })?;
    tree.merge_source(&text, path).map(|added| added.len())
}

fn relative<'a>(path: &'a Utf8Path, root: &Utf8Path) -> &'a Utf8Path {
    path.strip_prefix(root).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_fixture(files: &[(&str, &str)]) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for (name, text) in files {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, text).unwrap();
        }
        (dir, root)
    }

    #[tokio::test]
    async fn test_partial_failure_is_contained() {
        let (_dir, root) = write_fixture(&[
            ("a.proto", "package app; message A {}"),
            ("b.proto", "package app; message B {"),
            ("c.proto", "package app; message C {}"),
            ("nested/d.proto", "package app; enum D { X = 0; }"),
        ]);

        let mut tree = SchemaTree::default();
        let report = load_folder(&mut tree, &root, "proto", &root).await.unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.total(), 4);
        assert_eq!(report.loaded.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].is_recoverable());
        assert_eq!(
            report.failures[0].path().map(|p| p.file_name()),
            Some(Some("b.proto"))
        );

        let app = tree.child(SchemaTree::ROOT, "app").unwrap();
        assert_eq!(tree.children(app).len(), 3);
        assert!(tree.child(app, "B").is_none());
    }

    #[tokio::test]
    async fn test_files_load_in_sorted_order() {
        let (_dir, root) = write_fixture(&[
            ("z.proto", "package app; message Z {}"),
            ("m.proto", "package app; message M {}"),
            ("a.proto", "package app; message A {}"),
        ]);

        let mut tree = SchemaTree::default();
        let report = load_folder(&mut tree, &root, "proto", &root).await.unwrap();
        assert!(report.is_clean());
        let names: Vec<&str> = report
            .loaded
            .iter()
            .filter_map(|p| p.file_name())
            .collect();
        assert_eq!(names, vec!["a.proto", "m.proto", "z.proto"]);

        let app = tree.child(SchemaTree::ROOT, "app").unwrap();
        let inserted: Vec<&str> = tree
            .children(app)
            .iter()
            .map(|ix| tree.node(*ix).name())
            .collect();
        assert_eq!(inserted, vec!["A", "M", "Z"]);
    }

    #[tokio::test]
    async fn test_duplicate_across_files_is_a_file_failure() {
        let (_dir, root) = write_fixture(&[
            ("a.proto", "package app; message User {}"),
            ("b.proto", "package app; message User {}"),
        ]);

        let mut tree = SchemaTree::default();
        let report = load_folder(&mut tree, &root, "proto", &root).await.unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert!(matches!(
            &report.failures[..],
            [RegistryError::Schema(SchemaError::Duplicate { .. })]
        ));
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let mut tree = SchemaTree::default();
        let err = load_folder(
            &mut tree,
            Utf8Path::new("/no/such/models"),
            "proto",
            Utf8Path::new("/"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RegistryError::Config(_)));
    }
}
