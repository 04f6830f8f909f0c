use std::path::PathBuf;
use thiserror::Error;

/// Startup-time configuration failures. These are fatal: the caller is
/// expected to report them and exit before any supervision begins.
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("{key} should be 1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False (got {value:?})")]
	InvalidBool { key: String, value: String },

	#[error("failed to read {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
}
