mod paths;
mod signals;
mod stage;

use std::path::PathBuf;
use std::sync::Arc;

use owo_colors::OwoColorize;
use respawn::config::{self, Params};
use respawn::{RunnerConfig, Supervisor};

use paths::AppPaths;
use stage::Stager;

const APP_NAME: &str = "respawn";

#[derive(Debug, PartialEq)]
enum Action {
	Help,
	Version,
	Run(Invocation),
}

#[derive(Debug, PartialEq)]
struct Invocation {
	config: Option<PathBuf>,
	flags: Params,
	binary: PathBuf,
}

#[tokio::main]
async fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	let invocation = match parse_args(&args) {
		Ok(Action::Help) => {
			print_usage();
			return;
		}
		Ok(Action::Version) => {
			println!("respawn {}", env!("CARGO_PKG_VERSION"));
			return;
		}
		Ok(Action::Run(invocation)) => invocation,
		Err(e) => {
			eprintln!("{} {}", "error:".red().bold(), e);
			eprintln!("run 'respawn --help' for usage");
			std::process::exit(1);
		}
	};

	tracing_subscriber::fmt().with_writer(std::io::stderr).init();

	let paths = AppPaths::new(APP_NAME);
	let params = load_params(&invocation, &paths).unwrap_or_else(|e| fatal(e));
	let config = RunnerConfig::from_params(&params).unwrap_or_else(|e| fatal(e));

	run(config, invocation.binary, &paths).await;
}

async fn run(config: RunnerConfig, binary: PathBuf, paths: &AppPaths) {
	// Install handlers before the first child starts so an early signal
	// never hits the default action.
	let mut hangups = signals::reload().unwrap_or_else(|e| fatal(format!("failed to listen for SIGHUP: {}", e)));
	let mut shutdown =
		signals::Shutdown::listen().unwrap_or_else(|e| fatal(format!("failed to listen for shutdown signals: {}", e)));

	let stager = Arc::new(Stager::new(binary, paths.build_dir()));
	let sup = Supervisor::new(config);

	match stager.stage() {
		Ok(artifact) => sup.submit(artifact),
		Err(e) => {
			stager.cleanup();
			fatal(e);
		}
	}

	{
		let sup = sup.clone();
		let stager = Arc::clone(&stager);
		tokio::spawn(async move {
			while hangups.recv().await.is_some() {
				tracing::info!("SIGHUP received, restarting {}", stager.source().display());
				match stager.stage() {
					Ok(artifact) => sup.restart(artifact),
					Err(e) => tracing::error!("{}", e),
				}
			}
		});
	}

	{
		let sup = sup.clone();
		tokio::spawn(async move {
			shutdown.recv().await;
			tracing::info!("shutting down");
			sup.close();
		});
	}

	sup.wait().await;
	stager.cleanup();
}

fn parse_args(args: &[String]) -> Result<Action, String> {
	let mut config_path = None;
	let mut flags = Params::new();
	let mut binary = None;
	let mut extra: Option<Vec<String>> = None;

	let mut iter = args.iter();
	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-h" | "--help" => return Ok(Action::Help),
			"-V" | "--version" => return Ok(Action::Version),
			"-c" | "--config" => config_path = Some(PathBuf::from(value(&mut iter, arg)?)),
			"-i" | "--interrupt-signal" => flags.set(config::INTERRUPT_SIGNAL, value(&mut iter, arg)?),
			"-r" | "--run" => flags.set(config::RUN, value(&mut iter, arg)?),
			"--await-exit" => flags.set(config::AWAIT_EXIT, "true"),
			"--keep-artifact" => flags.set(config::KEEP_ARTIFACT, "true"),
			"--" => {
				extra = Some(iter.by_ref().cloned().collect());
			}
			other if other.starts_with('-') && other.len() > 1 => {
				return Err(format!("unknown option: {}", other));
			}
			other => {
				if binary.is_some() {
					return Err(format!("unexpected argument: {} (pass program arguments after --)", other));
				}
				binary = Some(PathBuf::from(other));
			}
		}
	}

	let binary = binary.ok_or_else(|| "missing binary to run".to_string())?;
	if let Some(extra) = extra {
		flags.args = extra;
	}
	Ok(Action::Run(Invocation {
		config: config_path,
		flags,
		binary,
	}))
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<String, String> {
	iter.next()
		.cloned()
		.ok_or_else(|| format!("{} requires a value", flag))
}

/// File values first, command-line flags on top. An explicit `--config`
/// must exist; the implicit locations are optional.
fn load_params(invocation: &Invocation, paths: &AppPaths) -> Result<Params, respawn::ConfigError> {
	let file = match &invocation.config {
		Some(path) => Some(path.clone()),
		None => config::find_config(&[PathBuf::from(config::LOCAL_CONFIG), paths.config_path()]),
	};

	let mut params = match file {
		Some(path) => {
			tracing::debug!("loading config from {}", path.display());
			Params::from_file(&path)?
		}
		None => Params::new(),
	};
	params.merge(invocation.flags.clone());
	Ok(params)
}

fn fatal(e: impl std::fmt::Display) -> ! {
	eprintln!("{} {}", "error:".red().bold(), e);
	std::process::exit(1);
}

fn print_usage() {
	eprintln!("{} {} — run a binary, swap it for fresh builds", "respawn".bold(), env!("CARGO_PKG_VERSION"));
	eprintln!();
	eprintln!("usage: {} [options] <binary> [-- args...]", "respawn".bold());
	eprintln!();

	eprintln!("{}", "options".cyan().bold());
	eprintln!("  {} <path>            Config file (default ./respawn.toml, then ~/.config/respawn/config.toml)", "-c, --config".bold());
	eprintln!("  {} <bool>  Stop children with SIGINT instead of SIGKILL", "-i, --interrupt-signal".bold());
	eprintln!("  {} <name>               Name shown in the Running line", "-r, --run".bold());
	eprintln!("  {}               Wait for the old child to exit before starting the next", "--await-exit".bold());
	eprintln!("  {}            Do not delete launched artifacts", "--keep-artifact".bold());
	eprintln!();

	eprintln!("{}", "signals".cyan().bold());
	eprintln!("  {}                       Re-copy <binary> and restart it", "SIGHUP".bold());
	eprintln!("  {}       Stop the child and exit", "Ctrl-C, SIGTERM".bold());
	eprintln!();
}
