mod config;
mod integrations;
mod models;
mod sync;
mod vault;

use clap::{Parser, Subcommand};
use config::Config;
use sync::{ImportScope, SyncStatus};

#[derive(Parser)]
#[command(
    name = "flipsync",
    version,
    about = "Sync TimeFlip time-tracking reports into daily note properties."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exchange the configured email/password for a session token
    SignIn,
    /// Import today's report into today's daily note
    Today,
    /// Import every day the service has data for
    All,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load();

    let exit_code = match cli.command {
        Command::SignIn => match sync::run_sign_in(&config) {
            Ok(message) => {
                println!("{message}");
                0
            }
            Err(err) => {
                eprintln!("{}", err.message());
                1
            }
        },
        Command::Today => run_import(config, ImportScope::Today),
        Command::All => run_import(config, ImportScope::All),
    };
    std::process::exit(exit_code);
}

fn run_import(config: Config, scope: ImportScope) -> i32 {
    let receiver = sync::spawn_import(config, scope);
    let mut exit_code = 0;
    for status in receiver {
        match status {
            SyncStatus::Started(message) => println!("{message}"),
            SyncStatus::Finished(message) => println!("{message}"),
            SyncStatus::Failed(message) => {
                eprintln!("{message}");
                exit_code = 1;
            }
        }
    }
    exit_code
}
