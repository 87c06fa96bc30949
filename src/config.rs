//! Repository configuration (`.palimpsest.toml`).
//!
//! Supplies the authoring identity used when minting new change ids — the
//! import generator and any session that appends records stamp their
//! changes with it. Missing fields use sensible defaults; a missing file is
//! all defaults, not an error.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".palimpsest.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level Palimpsest configuration.
///
/// ```toml
/// [author]
/// name = "sjd"
/// subseq = 0
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PalimpsestConfig {
    /// Authoring identity settings.
    #[serde(default)]
    pub author: AuthorConfig,
}

// ---------------------------------------------------------------------------
// AuthorConfig
// ---------------------------------------------------------------------------

/// The identity stamped on changes created in this session.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorConfig {
    /// The authoring principal (default: `$USER`, else `"anonymous"`).
    ///
    /// Must be usable as a change-id component: no `_`, commas, quotes,
    /// or whitespace.
    #[serde(default = "default_author")]
    pub name: String,

    /// Sub-sequence discriminator for disconnected authors minting ids
    /// without coordination (default: 0).
    #[serde(default)]
    pub subseq: u64,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: default_author(),
            subseq: 0,
        }
    }
}

fn default_author() -> String {
    std::env::var("USER").unwrap_or_else(|_| "anonymous".to_owned())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a Palimpsest configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl PalimpsestConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse
    /// errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                // Calculate line number from byte offset.
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let cfg = PalimpsestConfig::parse("[author]\nname = \"sjd\"\nsubseq = 2\n").unwrap();
        assert_eq!(cfg.author.name, "sjd");
        assert_eq!(cfg.author.subseq, 2);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = PalimpsestConfig::parse("").unwrap();
        assert_eq!(cfg.author.subseq, 0);
        assert!(!cfg.author.name.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(PalimpsestConfig::parse("[author]\nnom = \"x\"\n").is_err());
    }

    #[test]
    fn invalid_toml_reports_a_message() {
        let err = PalimpsestConfig::parse("[author\nname = \"x\"\n").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn missing_file_is_defaults() {
        let cfg = PalimpsestConfig::load(Path::new("/nonexistent/.palimpsest.toml")).unwrap();
        assert_eq!(cfg, PalimpsestConfig::default());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[author]\nname = \"kc\"\n").unwrap();
        let cfg = PalimpsestConfig::load(&path).unwrap();
        assert_eq!(cfg.author.name, "kc");
    }

    #[test]
    fn load_error_display_includes_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "not [valid toml").unwrap();
        let err = PalimpsestConfig::load(&path).unwrap_err();
        assert!(format!("{err}").contains(".palimpsest.toml"));
    }
}
