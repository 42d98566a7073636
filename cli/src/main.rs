mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    use clap::Parser;

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match &cli.command {
        Commands::Vectorize(args) => commands::vectorize::run(args),
        Commands::Clean(args) => commands::clean::run(args),
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(e.exit_code());
    }
}
