// Entrypoint for the `canvas` CLI.
// - Keeps `main` small: set up logging, parse arguments, dispatch.
// - Returns `anyhow::Result` so any failure is printed and exits non-zero.

use canvas_cli::{cli::Cli, commands};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable.
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    commands::run(cli)
}
