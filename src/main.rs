use std::{io, process::ExitCode};

use clap::Parser;
use textmail::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "tracing")]
    init_tracing(cli.verbose);

    let mut out = io::stdout().lock();
    let result = cli::run(&cli, &mut out);
    cli::report(result, &mut out)
}

/// Protocol logs go to stderr so they never mix with the status lines
#[cfg(feature = "tracing")]
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
