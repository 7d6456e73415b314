use clap::Parser;
use moho::cli::{Cli, run};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
