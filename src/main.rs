mod aggregate;
mod cli;
mod config;
mod driver;
mod filter;
mod source;
mod stats;
mod store;
mod window;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{command, Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(command::default_db_path);

    let result = match &cli.command {
        Commands::Collect(args) => command::collect(&db_path, args).await,
        Commands::Export { out, complete_only } => command::export(&db_path, out, *complete_only),
        Commands::Report { out } => command::report(&db_path, out.as_deref()),
        Commands::Status {} => command::status(&db_path),
        Commands::Reset { yes } => command::reset(&db_path, *yes),
    };

    finish(result)
}

fn finish(result: Result<String>) -> ExitCode {
    match result {
        Ok(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
