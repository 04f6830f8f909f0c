use crate::error::ConfigError;
use crate::types::StopSignal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const RUN: &str = "run";
pub const INTERRUPT_SIGNAL: &str = "interrupt-signal";
pub const AWAIT_EXIT: &str = "await-exit";
pub const KEEP_ARTIFACT: &str = "keep-artifact";

/// Raw parameter bag handed over by whoever parsed flags and config files.
/// Values stay strings until [`RunnerConfig::from_params`] validates them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
	values: HashMap<String, String>,
	pub args: Vec<String>,
}

impl Params {
	pub fn new() -> Self {
		Self::default()
	}

	/// Missing keys read as the empty string.
	pub fn get(&self, key: &str) -> &str {
		self.values.get(key).map(|s| s.as_str()).unwrap_or("")
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.values.insert(key.into(), value.into());
	}

	/// Layers `other` on top of `self`. Argument lists are replaced, not
	/// appended, and only when `other` carries one.
	pub fn merge(&mut self, other: Params) {
		self.values.extend(other.values);
		if !other.args.is_empty() {
			self.args = other.args;
		}
	}

	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml(path, &content)
	}

	pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
		let file: FileConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		Ok(file.into_params())
	}
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct FileConfig {
	run: Option<String>,
	interrupt_signal: Option<BoolLike>,
	await_exit: Option<BoolLike>,
	keep_artifact: Option<BoolLike>,
	#[serde(default)]
	args: Vec<String>,
}

/// Boolean keys accept real TOML booleans as well as the string spellings
/// flags use, so `interrupt-signal = "T"` and `interrupt-signal = true`
/// both work.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoolLike {
	Bool(bool),
	Text(String),
}

impl BoolLike {
	fn into_string(self) -> String {
		match self {
			BoolLike::Bool(b) => b.to_string(),
			BoolLike::Text(s) => s,
		}
	}
}

impl FileConfig {
	fn into_params(self) -> Params {
		let mut params = Params::new();
		if let Some(run) = self.run {
			params.set(RUN, run);
		}
		let flags = [
			(INTERRUPT_SIGNAL, self.interrupt_signal),
			(AWAIT_EXIT, self.await_exit),
			(KEEP_ARTIFACT, self.keep_artifact),
		];
		for (key, value) in flags {
			if let Some(value) = value {
				params.set(key, value.into_string());
			}
		}
		params.args = self.args;
		params
	}
}

/// Frozen supervisor settings. Built once at startup and never changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunnerConfig {
	/// Name shown in the `Running ...` status line. Falls back to the
	/// artifact's file name.
	pub run: Option<String>,
	/// Arguments passed to every launched child.
	pub args: Vec<String>,
	pub stop_signal: StopSignal,
	/// Hold further launches until a torn-down child has actually exited.
	pub await_exit: bool,
	/// Leave the artifact on disk after launching it.
	pub keep_artifact: bool,
}

impl RunnerConfig {
	pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
		let run = match params.get(RUN) {
			"" => None,
			name => Some(name.to_string()),
		};
		Ok(Self {
			run,
			args: params.args.clone(),
			stop_signal: StopSignal::from_interrupt(flag(params, INTERRUPT_SIGNAL)?),
			await_exit: flag(params, AWAIT_EXIT)?,
			keep_artifact: flag(params, KEEP_ARTIFACT)?,
		})
	}

	pub fn display_name(&self, artifact: &Path) -> String {
		if let Some(name) = &self.run {
			return name.clone();
		}
		artifact
			.file_name()
			.map(|n| n.to_string_lossy().to_string())
			.unwrap_or_else(|| artifact.display().to_string())
	}
}

fn flag(params: &Params, key: &str) -> Result<bool, ConfigError> {
	let value = params.get(key);
	if value.is_empty() {
		return Ok(false);
	}
	parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
		key: key.to_string(),
		value: value.to_string(),
	})
}

/// Accepts exactly `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
	match value {
		"1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
		"0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
		_ => None,
	}
}

/// Project-local config file name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "respawn.toml";

/// First existing file among `candidates`, if any.
pub fn find_config(candidates: &[PathBuf]) -> Option<PathBuf> {
	candidates.iter().find(|p| p.is_file()).cloned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_bool_spellings() {
		for s in ["1", "t", "T", "TRUE", "true", "True"] {
			assert_eq!(parse_bool(s), Some(true), "{}", s);
		}
		for s in ["0", "f", "F", "FALSE", "false", "False"] {
			assert_eq!(parse_bool(s), Some(false), "{}", s);
		}
		for s in ["yes", "no", "tRUE", "on", " true", "2"] {
			assert_eq!(parse_bool(s), None, "{}", s);
		}
	}

	#[test]
	fn test_empty_params_use_defaults() {
		let config = RunnerConfig::from_params(&Params::new()).unwrap();
		assert_eq!(config, RunnerConfig::default());
		assert_eq!(config.stop_signal, StopSignal::Kill);
	}

	#[test]
	fn test_interrupt_signal_enabled() {
		let mut params = Params::new();
		params.set(INTERRUPT_SIGNAL, "T");
		let config = RunnerConfig::from_params(&params).unwrap();
		assert_eq!(config.stop_signal, StopSignal::Interrupt);
	}

	#[test]
	fn test_invalid_interrupt_signal_is_error() {
		let mut params = Params::new();
		params.set(INTERRUPT_SIGNAL, "yes");
		let err = RunnerConfig::from_params(&params).unwrap_err();
		match err {
			ConfigError::InvalidBool { key, value } => {
				assert_eq!(key, INTERRUPT_SIGNAL);
				assert_eq!(value, "yes");
			}
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn test_toml_accepts_bools_and_strings() {
		let content = r#"
run = "api"
interrupt-signal = true
await-exit = "1"
args = ["-p", "7000"]
"#;
		let params = Params::from_toml(Path::new("respawn.toml"), content).unwrap();
		assert_eq!(params.get(RUN), "api");
		assert_eq!(params.get(INTERRUPT_SIGNAL), "true");
		assert_eq!(params.get(AWAIT_EXIT), "1");
		assert_eq!(params.get(KEEP_ARTIFACT), "");

		let config = RunnerConfig::from_params(&params).unwrap();
		assert_eq!(config.run.as_deref(), Some("api"));
		assert_eq!(config.args, vec!["-p", "7000"]);
		assert_eq!(config.stop_signal, StopSignal::Interrupt);
		assert!(config.await_exit);
		assert!(!config.keep_artifact);
	}

	#[test]
	fn test_toml_parse_error_names_file() {
		let err = Params::from_toml(Path::new("bad.toml"), "args = 3").unwrap_err();
		assert!(matches!(err, ConfigError::Parse { .. }));
		assert!(err.to_string().contains("bad.toml"));
	}

	#[test]
	fn test_merge_overrides_values_and_args() {
		let mut base = Params::new();
		base.set(RUN, "api");
		base.set(INTERRUPT_SIGNAL, "false");
		base.args = vec!["-p".into(), "7000".into()];

		let mut flags = Params::new();
		flags.set(INTERRUPT_SIGNAL, "true");
		base.merge(flags);
		assert_eq!(base.get(RUN), "api");
		assert_eq!(base.get(INTERRUPT_SIGNAL), "true");
		assert_eq!(base.args, vec!["-p", "7000"]);

		let mut more = Params::new();
		more.args = vec!["--verbose".into()];
		base.merge(more);
		assert_eq!(base.args, vec!["--verbose"]);
	}

	#[test]
	fn test_display_name() {
		let mut config = RunnerConfig::default();
		assert_eq!(config.display_name(Path::new("/tmp/build/server-3")), "server-3");
		config.run = Some("server".into());
		assert_eq!(config.display_name(Path::new("/tmp/build/server-3")), "server");
	}
}
