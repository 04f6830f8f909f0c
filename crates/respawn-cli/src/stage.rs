use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Copies the user's binary into a private build directory before each
/// submission. The supervisor deletes what it launches, so it must only
/// ever see these copies.
pub struct Stager {
	source: PathBuf,
	dir: PathBuf,
	builds: AtomicU64,
}

impl Stager {
	pub fn new(source: PathBuf, dir: PathBuf) -> Self {
		Self {
			source,
			dir,
			builds: AtomicU64::new(0),
		}
	}

	pub fn source(&self) -> &Path {
		&self.source
	}

	/// Returns the path of a fresh copy. The file name is preserved so
	/// programs that look at argv[0] behave the same as the original.
	pub fn stage(&self) -> Result<PathBuf, String> {
		let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
		let file_name = self
			.source
			.file_name()
			.ok_or_else(|| format!("{}: not a file", self.source.display()))?;

		let build_dir = self.dir.join(n.to_string());
		std::fs::create_dir_all(&build_dir)
			.map_err(|e| format!("failed to create {}: {}", build_dir.display(), e))?;

		let dest = build_dir.join(file_name);
		std::fs::copy(&self.source, &dest)
			.map_err(|e| format!("failed to copy {}: {}", self.source.display(), e))?;
		Ok(dest)
	}

	pub fn cleanup(&self) {
		let _ = std::fs::remove_dir_all(&self.dir);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_dir(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("respawn-stage-{}-{}", std::process::id(), name));
		let _ = std::fs::create_dir_all(&dir);
		dir
	}

	#[test]
	fn test_stage_makes_numbered_copies() {
		let root = temp_dir("copies");
		let source = root.join("server");
		std::fs::write(&source, b"binary").unwrap();

		let stager = Stager::new(source.clone(), root.join("builds"));
		let first = stager.stage().unwrap();
		let second = stager.stage().unwrap();

		assert_eq!(first, root.join("builds").join("1").join("server"));
		assert_eq!(second, root.join("builds").join("2").join("server"));
		assert_eq!(std::fs::read(&second).unwrap(), b"binary");

		stager.cleanup();
		assert!(!root.join("builds").exists());
		assert!(source.exists());
		let _ = std::fs::remove_dir_all(&root);
	}

	#[test]
	fn test_stage_missing_source() {
		let root = temp_dir("missing");
		let stager = Stager::new(root.join("nope"), root.join("builds"));
		let err = stager.stage().unwrap_err();
		assert!(err.contains("failed to copy"), "{}", err);
		let _ = std::fs::remove_dir_all(&root);
	}
}
