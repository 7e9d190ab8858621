use std::process::ExitCode;

use clap::Parser;

use retouch::cli::{self, CliArgs};
use retouch::logger::{self, LogLevel};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Session log (overwrites the previous one); --verbose keeps info lines
    logger::init(if args.verbose { LogLevel::Info } else { LogLevel::Warn });

    cli::run(args)
}
