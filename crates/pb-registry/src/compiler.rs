//! Bridge to the external code generator.
//!
//! The generator is invoked as
//! `program <format_flag> <format> <flags...> <files...>` in the configured
//! working directory, and its standard output is returned as text.

use camino::{Utf8Path, Utf8PathBuf};
use pb_core::{CompilerConfig, fx_hash_set};
use pb_schema::SchemaTree;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::CompileError;
use crate::indexer::IdIndex;
use crate::lookup::{LookupKey, resolve};

/// Collects the distinct backing files of the subtrees named by `keys`.
///
/// An empty `keys` slice means the whole tree. Keys that don't resolve are
/// logged and skipped. Files come back in first-seen order.
#[must_use]
pub fn collect_sources(tree: &SchemaTree, index: &IdIndex, keys: &[LookupKey]) -> Vec<Utf8PathBuf> {
    if keys.is_empty() {
        return tree.source_files(SchemaTree::ROOT);
    }

    let mut seen = fx_hash_set();
    let mut files = Vec::new();
    for key in keys {
        let Some(ix) = resolve(tree, index, key) else {
            warn!("Namespace [{key}] does not exist");
            continue;
        };
        for file in tree.source_files(ix) {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }
    files
}

/// Runs the configured generator.
#[derive(Debug, Clone)]
pub struct Compiler {
    program: String,
    format_flag: String,
    working_dir: Utf8PathBuf,
}

impl Compiler {
    /// Creates a compiler running in `working_dir`.
    #[must_use]
    pub fn new(config: &CompilerConfig, working_dir: &Utf8Path) -> Self {
        Self {
            program: config.program.clone(),
            format_flag: config.format_flag.clone(),
            working_dir: working_dir.to_owned(),
        }
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the argument list for one invocation.
    #[must_use]
    pub fn args(&self, format: &str, flags: &[String], files: &[Utf8PathBuf]) -> Vec<String> {
        let mut args = Vec::with_capacity(2 + flags.len() + files.len());
        args.push(self.format_flag.clone());
        args.push(format.to_owned());
        args.extend(flags.iter().cloned());
        args.extend(files.iter().map(|file| file.as_str().to_owned()));
        args
    }

    /// Invokes the generator on `files` and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::NoSources`] for an empty file list,
    /// [`CompileError::Spawn`] if the program can't be started and
    /// [`CompileError::Failed`] on a non-zero exit.
    pub async fn compile(
        &self,
        format: &str,
        flags: &[String],
        files: &[Utf8PathBuf],
    ) -> Result<String, CompileError> {
        if files.is_empty() {
            return Err(CompileError::NoSources);
        }

        let args = self.args(format, flags, files);
        debug!(program = %self.program, ?args, dir = %self.working_dir, "Spawning compiler");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
            });
        }

        info!(program = %self.program, format, files = files.len(), "Compiled definitions");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use pb_core::IdPolicy;

    use super::*;
    use crate::indexer::IdIndexer;

    fn fixture() -> (SchemaTree, IdIndexer) {
        let mut tree = SchemaTree::default();
        tree.merge_source(
            "package app.User; message Profile {} message Settings {}",
            Utf8Path::new("user.proto"),
        )
        .unwrap();
        tree.merge_source("package app.User; enum Role { ADMIN = 0; }", Utf8Path::new("role.proto"))
            .unwrap();
        tree.merge_source("package app.Order; message Line {}", Utf8Path::new("order.proto"))
            .unwrap();
        let mut indexer = IdIndexer::new(IdPolicy::Auto);
        indexer.assign(&mut tree);
        (tree, indexer)
    }

    /// `sh -c <script> <files...>`: the format slot carries the script and
    /// the files become `$0..$n`.
    fn shell() -> Compiler {
        let config = CompilerConfig {
            program: "sh".to_owned(),
            format_flag: "-c".to_owned(),
            working_dir: None,
        };
        Compiler::new(&config, Utf8Path::new("."))
    }

    #[test]
    fn test_collect_sources_dedups_in_first_seen_order() {
        let (tree, indexer) = fixture();
        let index = indexer.index();

        let files = collect_sources(&tree, index, &["app.User".into(), "app".into()]);
        let names: Vec<&str> = files.iter().map(|file| file.as_str()).collect();
        assert_eq!(names, vec!["user.proto", "role.proto", "order.proto"]);
    }

    #[test]
    fn test_collect_sources_skips_unknown_keys() {
        let (tree, indexer) = fixture();
        let files = collect_sources(
            &tree,
            indexer.index(),
            &["app.Nope".into(), LookupKey::from(999u32), "app.Order".into()],
        );
        assert_eq!(files, vec![Utf8PathBuf::from("order.proto")]);
    }

    #[test]
    fn test_collect_sources_empty_keys_is_whole_tree() {
        let (tree, indexer) = fixture();
        assert_eq!(collect_sources(&tree, indexer.index(), &[]).len(), 3);
    }

    #[test]
    fn test_args_layout() {
        let compiler = Compiler::new(&CompilerConfig::default(), Utf8Path::new("."));
        assert_eq!(compiler.program(), "pbjs");
        let args = compiler.args(
            "static-module",
            &["-w".to_owned(), "commonjs".to_owned()],
            &[Utf8PathBuf::from("a.proto"), Utf8PathBuf::from("b.proto")],
        );
        assert_eq!(args, vec!["-t", "static-module", "-w", "commonjs", "a.proto", "b.proto"]);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let compiler = Compiler::new(&CompilerConfig::default(), Utf8Path::new("."));
        let err = compiler.compile("json", &[], &[]).await.unwrap_err();
        assert!(matches!(err, CompileError::NoSources));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let config = CompilerConfig {
            program: "definitely-not-a-real-program-pbreg".to_owned(),
            ..CompilerConfig::default()
        };
        let compiler = Compiler::new(&config, Utf8Path::new("."));
        let err = compiler
            .compile("json", &[], &[Utf8PathBuf::from("a.proto")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_and_failure() {
        let compiler = shell();
        let out = compiler
            .compile("echo \"$0 $1\"", &[], &[Utf8PathBuf::from("a.proto"), Utf8PathBuf::from("b.proto")])
            .await
            .unwrap();
        assert_eq!(out, "a.proto b.proto\n");

        let err = compiler
            .compile("echo oops >&2; exit 3", &[], &[Utf8PathBuf::from("a.proto")])
            .await
            .unwrap_err();
        match err {
            CompileError::Failed { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
