use owo_colors::OwoColorize;

/// User-facing progress line printed before each launch. Goes to stdout,
/// separate from the `tracing` stream.
pub fn running(name: &str) {
	println!("{}", format!("Running {}...", name).green());
}
