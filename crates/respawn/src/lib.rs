//! # respawn
//!
//! Rebuild-driven process supervisor.
//!
//! Hand it freshly built executables and it keeps exactly one of them
//! running: each submission tears down the current child and launches the
//! new artifact in its place. Pairs with a file watcher or build tool that
//! produces the binaries.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use respawn::{RunnerConfig, Supervisor};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sup = Supervisor::new(RunnerConfig {
//!     run: Some("server".into()),
//!     args: vec!["-p".into(), "7000".into()],
//!     ..RunnerConfig::default()
//! });
//!
//! sup.submit("/tmp/build/server-1");
//! // ...later, after a rebuild
//! sup.restart("/tmp/build/server-2");
//!
//! sup.close();
//! sup.wait().await;
//! # }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod process;
pub mod supervisor;
pub mod types;

pub use config::{parse_bool, Params, RunnerConfig};
pub use error::ConfigError;
pub use process::{Launched, Launcher, OsLauncher, ProcessHandle};
pub use supervisor::Supervisor;
pub use types::*;
