use std::path::PathBuf;

/// Where respawn looks for its user config and stages builds.
#[derive(Debug, Clone)]
pub struct AppPaths {
	app_name: String,
}

impl AppPaths {
	pub fn new(app_name: impl Into<String>) -> Self {
		Self {
			app_name: app_name.into(),
		}
	}

	/// `$XDG_CONFIG_HOME/<app>/config.toml`, falling back to `~/.config`.
	pub fn config_path(&self) -> PathBuf {
		self.xdg_dir("XDG_CONFIG_HOME", ".config").join("config.toml")
	}

	/// Per-invocation staging area under the state dir, keyed by our pid so
	/// concurrent runs never share artifacts.
	pub fn build_dir(&self) -> PathBuf {
		self.xdg_dir("XDG_STATE_HOME", ".local/state")
			.join(format!("build-{}", std::process::id()))
	}

	fn xdg_dir(&self, var: &str, fallback: &str) -> PathBuf {
		let base = match std::env::var_os(var) {
			Some(dir) if !dir.is_empty() => PathBuf::from(dir),
			_ => match std::env::var_os("HOME") {
				Some(home) => PathBuf::from(home).join(fallback),
				None => std::env::temp_dir(),
			},
		};
		base.join(&self.app_name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_and_build_paths() {
		let paths = AppPaths::new("respawn-test");

		let config = paths.config_path();
		assert!(config.ends_with("respawn-test/config.toml"));

		let build = paths.build_dir();
		assert_eq!(
			build.file_name().unwrap().to_string_lossy(),
			format!("build-{}", std::process::id())
		);
		assert_eq!(build.parent().unwrap().file_name().unwrap(), "respawn-test");
	}
}
