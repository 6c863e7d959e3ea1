//! Configuration errors.
//!
//! Everything here is raised before a registry exists: while reading the
//! settings file, validating option values, or checking the project root.

use camino::Utf8PathBuf;

/// Why a [`RegistryConfig`](crate::RegistryConfig) could not be built or used.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use pb_core::{ConfigError, RegistryConfig};
///
/// let config = RegistryConfig::with_root(Utf8Path::new("/no/such/project"));
/// let err = config.check_root().unwrap_err();
/// assert!(matches!(err, ConfigError::MissingRoot(_)));
/// assert_eq!(err.to_string(), "project root does not exist: /no/such/project");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The project root does not exist.
    #[error("project root does not exist: {0}")]
    MissingRoot(Utf8PathBuf),

    /// The project root exists but is not a directory.
    #[error("project root is not a directory: {0}")]
    RootNotDirectory(Utf8PathBuf),

    /// An option has a value the registry can't work with.
    #[error("invalid option '{option}': {reason}")]
    InvalidOption {
        /// Dotted option name, e.g. `compiler.program`.
        option: &'static str,
        /// What the value must look like.
        reason: &'static str,
    },

    /// The settings file could not be read.
    #[error("cannot read settings file {path}: {source}")]
    Read {
        /// The settings file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings are not valid JSON, or don't fit the settings shape.
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidOption`].
    #[inline]
    #[must_use]
    pub const fn invalid_option(option: &'static str, reason: &'static str) -> Self {
        Self::InvalidOption { option, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_errors_name_the_root() {
        let missing = ConfigError::MissingRoot(Utf8PathBuf::from("/srv/app"));
        assert_eq!(missing.to_string(), "project root does not exist: /srv/app");

        let file = ConfigError::RootNotDirectory(Utf8PathBuf::from("/srv/app/pbreg.json"));
        assert_eq!(
            file.to_string(),
            "project root is not a directory: /srv/app/pbreg.json"
        );
    }

    #[test]
    fn test_invalid_option_names_the_option() {
        let error = ConfigError::invalid_option("file_extension", "must not start with a dot");
        assert_eq!(
            error.to_string(),
            "invalid option 'file_extension': must not start with a dot"
        );
    }

    #[test]
    fn test_read_error_keeps_source() {
        let error = ConfigError::Read {
            path: Utf8PathBuf::from("pbreg.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error.to_string(), "cannot read settings file pbreg.json: gone");
        assert!(std::error::Error::source(&error).is_some());
    }
}
