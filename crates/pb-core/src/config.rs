//! Configuration structures for the schema registry.
//!
//! This module provides:
//!
//! - [`IdPolicy`] - How integer ids are derived for namespace nodes
//! - [`CompilerConfig`] - External code generator settings
//! - [`RegistryConfig`] - Root configuration combining all settings
//!
//! All types implement [`Default`] and deserialize with `#[serde(default)]`,
//! so a configuration file only needs the keys it wants to override.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Default directory scanned for `.proto` files, relative to the project root.
pub const DEFAULT_MODEL_PATH: &str = "app/models";

/// Default extension of definition files.
pub const DEFAULT_FILE_EXTENSION: &str = "proto";

/// Policy used to derive the integer id of every namespace node.
///
/// # Examples
///
/// ```
/// use pb_core::IdPolicy;
///
/// assert_eq!(IdPolicy::default(), IdPolicy::Auto);
/// let policy: IdPolicy = serde_json::from_str(r#""file""#).unwrap();
/// assert_eq!(policy, IdPolicy::File);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Sequential counter over a lexicographic pre-order walk (`0..N`).
    #[default]
    Auto,
    /// Parsed from the `{id}-{name}.proto` prefix of the backing file.
    File,
}

impl IdPolicy {
    /// Returns the configuration spelling of this policy.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::File => "file",
        }
    }
}

/// Settings for the external code generation tool.
///
/// The tool is invoked as `program <format_flag> <format> <flags...> <files...>`.
///
/// # Examples
///
/// ```
/// use pb_core::CompilerConfig;
///
/// let config = CompilerConfig::default();
/// assert_eq!(config.program, "pbjs");
/// assert_eq!(config.format_flag, "-t");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Executable name or path of the generator.
    pub program: String,

    /// Flag that introduces the target format argument.
    pub format_flag: String,

    /// Working directory for the generator.
    /// `None` means the registry's project root.
    pub working_dir: Option<Utf8PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "pbjs".to_owned(),
            format_flag: "-t".to_owned(),
            working_dir: None,
        }
    }
}

/// Root configuration for a schema registry instance.
///
/// `path` and `extend` accept either a single string or a list in JSON.
///
/// # Examples
///
/// ```
/// use pb_core::{IdPolicy, RegistryConfig};
///
/// let config = RegistryConfig::from_json_str(r#"{"path": "protos", "ids": "file"}"#)?;
/// assert_eq!(config.path.len(), 1);
/// assert_eq!(config.ids, IdPolicy::File);
/// assert_eq!(config.file_extension, "proto");
/// # Ok::<(), pb_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Project root that relative paths are resolved against.
    pub root: Utf8PathBuf,

    /// Directories scanned for definition files during startup.
    #[serde(deserialize_with = "one_or_many")]
    pub path: Vec<Utf8PathBuf>,

    /// Id assignment policy.
    pub ids: IdPolicy,

    /// Extension files or directories resolved at startup.
    #[serde(deserialize_with = "one_or_many")]
    pub extend: Vec<Utf8PathBuf>,

    /// Opaque options forwarded to the schema tree constructor.
    pub options: serde_json::Map<String, serde_json::Value>,

    /// Extension (without the dot) of definition files.
    pub file_extension: String,

    /// Enables verbose diagnostics.
    pub debug: bool,

    /// External code generator settings.
    pub compiler: CompilerConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            path: vec![Utf8PathBuf::from(DEFAULT_MODEL_PATH)],
            ids: IdPolicy::Auto,
            extend: Vec::new(),
            options: serde_json::Map::new(),
            file_extension: DEFAULT_FILE_EXTENSION.to_owned(),
            debug: false,
            compiler: CompilerConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration rooted at `root` with default settings.
    #[must_use]
    pub fn with_root(root: &Utf8Path) -> Self {
        Self {
            root: root.to_owned(),
            ..Self::default()
        }
    }

    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::InvalidOption`] for values that fail validation.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file can't be read, otherwise the
    /// errors of [`RegistryConfig::from_json_str`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_std_path()).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        Self::from_json_str(&contents)
    }

    /// Checks that the project root is an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRoot`] or [`ConfigError::RootNotDirectory`].
    pub fn check_root(&self) -> Result<(), ConfigError> {
        if !self.root.exists() {
            return Err(ConfigError::MissingRoot(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotDirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Checks option values that serde can't express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_extension.is_empty() || self.file_extension.starts_with('.') {
            return Err(ConfigError::invalid_option(
                "file_extension",
                "must be a non-empty extension without a leading dot",
            ));
        }
        if self.compiler.program.trim().is_empty() {
            return Err(ConfigError::invalid_option(
                "compiler.program",
                "must not be empty",
            ));
        }
        if self.path.iter().any(|p| p.as_str().is_empty()) {
            return Err(ConfigError::invalid_option("path", "contains an empty entry"));
        }
        if let Some(keep_case) = self.options.get("keepCase") {
            if !keep_case.is_boolean() {
                return Err(ConfigError::invalid_option("options.keepCase", "must be a boolean"));
            }
        }
        Ok(())
    }

    /// Resolves `path` against the project root unless it is already absolute.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::{Utf8Path, Utf8PathBuf};
    /// use pb_core::RegistryConfig;
    ///
    /// let config = RegistryConfig::with_root(Utf8Path::new("/srv/app"));
    /// assert_eq!(config.resolve(Utf8Path::new("models")), Utf8PathBuf::from("/srv/app/models"));
    /// assert_eq!(config.resolve(Utf8Path::new("/etc/protos")), Utf8PathBuf::from("/etc/protos"));
    /// ```
    #[must_use]
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }

    /// Returns the directory the compiler runs in.
    #[must_use]
    pub fn compiler_dir(&self) -> Utf8PathBuf {
        self.compiler
            .working_dir
            .as_deref()
            .map_or_else(|| self.root.clone(), |dir| self.resolve(dir))
    }
}

/// Accepts either a single path or a list of paths.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Utf8PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Utf8PathBuf),
        Many(Vec<Utf8PathBuf>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.root, Utf8PathBuf::from("."));
        assert_eq!(config.path, vec![Utf8PathBuf::from("app/models")]);
        assert_eq!(config.ids, IdPolicy::Auto);
        assert!(config.extend.is_empty());
        assert!(config.options.is_empty());
        assert!(!config.debug);
    }

    #[test]
    fn test_path_accepts_single_string() {
        let config = RegistryConfig::from_json_str(r#"{"path": "protos"}"#).unwrap();
        assert_eq!(config.path, vec![Utf8PathBuf::from("protos")]);
    }

    #[test]
    fn test_path_accepts_list() {
        let config =
            RegistryConfig::from_json_str(r#"{"path": ["a", "b"], "extend": "ext"}"#).unwrap();
        assert_eq!(
            config.path,
            vec![Utf8PathBuf::from("a"), Utf8PathBuf::from("b")]
        );
        assert_eq!(config.extend, vec![Utf8PathBuf::from("ext")]);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = RegistryConfig::from_json_str(r#"{"ids": "file"}"#).unwrap();
        assert_eq!(config.ids, IdPolicy::File);
        assert_eq!(config.path, vec![Utf8PathBuf::from("app/models")]);
        assert_eq!(config.compiler.program, "pbjs");
    }

    #[test]
    fn test_options_passthrough() {
        let config =
            RegistryConfig::from_json_str(r#"{"options": {"keepCase": true, "other": 1}}"#)
                .unwrap();
        assert_eq!(config.options.get("keepCase"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(config.options.len(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            RegistryConfig::from_json_str(r#"{"file_extension": ".proto"}"#),
            Err(ConfigError::InvalidOption { .. })
        ));
        assert!(matches!(
            RegistryConfig::from_json_str(r#"{"compiler": {"program": " "}}"#),
            Err(ConfigError::InvalidOption { .. })
        ));
        assert!(matches!(
            RegistryConfig::from_json_str(r#"{"options": {"keepCase": "yes"}}"#),
            Err(ConfigError::InvalidOption { .. })
        ));
        assert!(matches!(
            RegistryConfig::from_json_str(r#"{"ids": "random"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_compiler_dir_defaults_to_root() {
        let mut config = RegistryConfig::with_root(Utf8Path::new("/srv/app"));
        assert_eq!(config.compiler_dir(), Utf8PathBuf::from("/srv/app"));

        config.compiler.working_dir = Some(Utf8PathBuf::from("gen"));
        assert_eq!(config.compiler_dir(), Utf8PathBuf::from("/srv/app/gen"));
    }

    #[test]
    fn test_id_policy_labels() {
        assert_eq!(IdPolicy::Auto.label(), "auto");
        assert_eq!(IdPolicy::File.label(), "file");
        assert_eq!(serde_json::to_string(&IdPolicy::File).unwrap(), r#""file""#);
    }

    #[test]
    fn test_config_snapshot() {
        insta::assert_json_snapshot!(RegistryConfig::default(), @r#"
        {
          "root": ".",
          "path": [
            "app/models"
          ],
          "ids": "auto",
          "extend": [],
          "options": {},
          "file_extension": "proto",
          "debug": false,
          "compiler": {
            "program": "pbjs",
            "format_flag": "-t",
            "working_dir": null
          }
        }
        "#);
    }

    #[test]
    fn test_check_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(RegistryConfig::with_root(&root).check_root().is_ok());

        let file = root.join("pbreg.json");
        std::fs::write(&file, "{}").unwrap();
        assert!(matches!(
            RegistryConfig::with_root(&file).check_root(),
            Err(ConfigError::RootNotDirectory(path)) if path == file
        ));
        assert!(matches!(
            RegistryConfig::with_root(&root.join("missing")).check_root(),
            Err(ConfigError::MissingRoot(_))
        ));
    }

    #[test]
    fn test_from_file_reports_path() {
        let err = RegistryConfig::from_file(Utf8Path::new("/no/such/pbreg.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { ref path, .. } if path == "/no/such/pbreg.json"));
    }
}
