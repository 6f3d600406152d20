use clap::Parser;
use colored::Colorize;
use tidyren::cli::{Cli, run_cli_with_config};
use tidyren::init_tracing;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run_cli_with_config(&cli.command, cli.config.as_deref()) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
