//! Configuration
//!
//! Settings come from three layers, highest precedence first:
//!
//! 1. Command-line options ([`ConfigOverrides`])
//! 2. A JSON configuration file
//! 3. Built-in defaults
//!
//! ## File Format
//!
//! ```json
//! {
//!   "Interval": 5,
//!   "Interface": "any",
//!   "Port": 11211,
//!   "NumItemsToReport": 20,
//!   "Quiet": false,
//!   "OutputFile": "/var/run/keyheat.out",
//!   "ShowErrors": true,
//!   "ShowUnmatched": false,
//!   "Namespace": "keyheat",
//!   "Regexps": [
//!     { "Re": "^user_[0-9]+$", "Name": "user" },
//!     { "Re": "^session:", "Name": "session" }
//!   ]
//! }
//! ```
//!
//! Every field is optional. An empty file is the same as no file.

use crate::{
    DEFAULT_INTERFACE, DEFAULT_INTERVAL_SECS, DEFAULT_NAMESPACE, DEFAULT_NUM_ITEMS, DEFAULT_PORT,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting has an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A named key pattern as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegexpConfig {
    /// Regular expression matched against raw keys
    pub re: String,
    /// Name reported for matching keys
    pub name: String,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    /// Reporting interval in seconds
    pub interval: u64,
    /// Capture interface
    pub interface: String,
    /// memcached port to watch
    pub port: u16,
    /// Keys per report when no patterns are configured
    pub num_items_to_report: usize,
    /// Suppress report output on stdout
    pub quiet: bool,
    /// File overwritten with every report
    #[serde(with = "optional_path")]
    pub output_file: Option<PathBuf>,
    /// Report parse and classification errors
    pub show_errors: bool,
    /// Report keys no pattern matched under their raw name
    pub show_unmatched: bool,
    /// Prefix of every reported metric
    pub namespace: String,
    /// Key patterns in priority order
    pub regexps: Vec<RegexpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            interface: DEFAULT_INTERFACE.to_string(),
            port: DEFAULT_PORT,
            num_items_to_report: DEFAULT_NUM_ITEMS,
            quiet: false,
            output_file: None,
            show_errors: true,
            show_unmatched: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
            regexps: Vec::new(),
        }
    }
}

/// Command-line values; `None` leaves the lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub interval: Option<u64>,
    pub interface: Option<String>,
    pub port: Option<u16>,
    pub num_items_to_report: Option<usize>,
    pub quiet: Option<bool>,
    pub output_file: Option<PathBuf>,
    pub show_errors: Option<bool>,
    pub show_unmatched: Option<bool>,
    pub namespace: Option<String>,
}

impl Config {
    /// Parses a JSON document. Blank input yields the defaults.
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(data)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Builds the effective configuration from an optional file and overrides.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line values on top of this configuration.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(interface) = overrides.interface {
            self.interface = interface;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(n) = overrides.num_items_to_report {
            self.num_items_to_report = n;
        }
        if let Some(quiet) = overrides.quiet {
            self.quiet = quiet;
        }
        if let Some(path) = overrides.output_file {
            self.output_file = Some(path);
        }
        if let Some(show) = overrides.show_errors {
            self.show_errors = show;
        }
        if let Some(show) = overrides.show_unmatched {
            self.show_unmatched = show;
        }
        if let Some(namespace) = overrides.namespace {
            self.namespace = namespace;
        }
    }

    /// Rejects settings the loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Invalid("Interval must be at least 1 second".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("Port must be non-zero".into()));
        }
        if self.num_items_to_report == 0 {
            return Err(ConfigError::Invalid(
                "NumItemsToReport must be at least 1".into(),
            ));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid("Namespace must not be empty".into()));
        }
        Ok(())
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// True when keys are reported by pattern name.
    pub fn has_patterns(&self) -> bool {
        !self.regexps.is_empty()
    }
}

/// `"OutputFile": ""` means no output file.
mod optional_path {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(path: &Option<PathBuf>, s: S) -> Result<S::Ok, S::Error> {
        match path {
            Some(path) => s.serialize_str(&path.to_string_lossy()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PathBuf>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()).map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interval, 5);
        assert_eq!(config.interface, "any");
        assert_eq!(config.port, 11211);
        assert_eq!(config.num_items_to_report, 20);
        assert!(!config.quiet);
        assert!(config.show_errors);
        assert!(!config.show_unmatched);
        assert_eq!(config.output_file, None);
        assert!(!config.has_patterns());
        assert_ok!(config.validate());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(assert_ok!(Config::from_json(b"")), Config::default());
        assert_eq!(assert_ok!(Config::from_json(b" \n")), Config::default());
        assert_eq!(assert_ok!(Config::from_json(b"{}")), Config::default());
    }

    #[test]
    fn test_parse_full_document() {
        let json = br#"{
            "Interval": 10,
            "Interface": "eth0",
            "Port": 11311,
            "NumItemsToReport": 5,
            "Quiet": true,
            "OutputFile": "/tmp/keyheat.out",
            "ShowErrors": false,
            "ShowUnmatched": true,
            "Namespace": "cache",
            "Regexps": [
                {"Re": "^user_.*", "Name": "user"},
                {"Re": "^user_42$", "Name": "exact"}
            ]
        }"#;

        let config = assert_ok!(Config::from_json(json));
        assert_eq!(config.interval, 10);
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.port, 11311);
        assert_eq!(config.num_items_to_report, 5);
        assert!(config.quiet);
        assert_eq!(config.output_file, Some(PathBuf::from("/tmp/keyheat.out")));
        assert!(!config.show_errors);
        assert!(config.show_unmatched);
        assert_eq!(config.namespace, "cache");
        assert_eq!(
            config.regexps,
            vec![
                RegexpConfig {
                    re: "^user_.*".into(),
                    name: "user".into()
                },
                RegexpConfig {
                    re: "^user_42$".into(),
                    name: "exact".into()
                },
            ]
        );
    }

    #[test]
    fn test_empty_output_file_means_none() {
        let config = assert_ok!(Config::from_json(br#"{"OutputFile": ""}"#));
        assert_eq!(config.output_file, None);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            Config::from_json(b"{\"Port\": \"eleven\"}"),
            Err(ConfigError::Parse(_))
        ));
        assert_err!(Config::from_json(b"not json"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = assert_ok!(Config::from_json(br#"{"Port": 11311, "Interval": 10}"#));
        config.apply(ConfigOverrides {
            port: Some(22122),
            quiet: Some(true),
            show_errors: Some(false),
            ..Default::default()
        });

        assert_eq!(config.port, 22122);
        assert_eq!(config.interval, 10);
        assert!(config.quiet);
        assert!(!config.show_errors);
        assert_eq!(config.num_items_to_report, 20);
    }

    #[test]
    fn test_resolve_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"NumItemsToReport": 3, "Namespace": "mc"}}"#).unwrap();

        let config = assert_ok!(Config::resolve(
            Some(file.path()),
            ConfigOverrides {
                interval: Some(1),
                ..Default::default()
            }
        ));
        assert_eq!(config.num_items_to_report, 3);
        assert_eq!(config.namespace, "mc");
        assert_eq!(config.interval_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_resolve_missing_file() {
        let err = Config::resolve(
            Some(Path::new("/nonexistent/keyheat.json")),
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validation() {
        for overrides in [
            ConfigOverrides {
                interval: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                port: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                num_items_to_report: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                namespace: Some(String::new()),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                Config::resolve(None, overrides),
                Err(ConfigError::Invalid(_))
            ));
        }
    }

    #[test]
    fn test_serialize_round_trips_output_file() {
        let config = Config {
            output_file: Some(PathBuf::from("/tmp/out")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""OutputFile":"/tmp/out""#));
        assert_eq!(assert_ok!(Config::from_json(json.as_bytes())), config);
    }
}
