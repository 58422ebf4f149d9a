use anyhow::Result;
use clap::Parser;

use stroop_locker::cli::{Args, Commands, SettingsCommands};
use stroop_locker::commands::{self, init_logging};
use stroop_locker::platform::DataPaths;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let paths = DataPaths::resolve(args.data_dir.as_deref())?;

    match args.command {
        Commands::Lock { package } => commands::apps::lock(&paths, &package),
        Commands::Unlock { package } => commands::apps::unlock(&paths, &package),
        Commands::List => commands::apps::list(&paths),
        Commands::Settings { command } => match command {
            SettingsCommands::Show => commands::settings::show(&paths),
            SettingsCommands::Set { key, value } => commands::settings::set(&paths, &key, &value),
        },
        Commands::Stats { reset } => commands::stats::show(&paths, reset),
        Commands::Challenge { seed, json } => commands::challenge::generate(seed, json),
        Commands::Simulate { seed } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::simulate::run_stdin(&paths, seed, args.verbose))
        }
    }
}
