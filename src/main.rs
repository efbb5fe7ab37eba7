//! catatkeu - command-line companion for Catatan Keuangan

use clap::Parser;

mod cli;
mod client;
mod config;
mod error;
mod intake;
mod output;
mod session;
mod token;

use cli::intake::IntakeOptions;
use cli::{Cli, Commands, GlobalOptions, RecordsCommands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `--debug` forces debug output; otherwise `RUST_LOG` applies, defaulting to warnings.
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Login {
            username,
            password,
            remember,
        } => cli::auth::login(&opts, username, password, remember).await,
        Commands::Logout => cli::auth::logout(&opts).await,
        Commands::Status => cli::status::run(&opts),
        Commands::Records(cmd) => match cmd {
            RecordsCommands::List(args) => cli::records::list(&opts, &args).await,
            RecordsCommands::Get { id } => cli::records::get(&opts, &id).await,
            RecordsCommands::Total => cli::records::total(&opts).await,
            RecordsCommands::Revenue => cli::records::revenue(&opts).await,
            RecordsCommands::Summary => cli::records::summary(&opts).await,
        },
        Commands::Upload {
            file,
            folder,
            amount,
            submit,
        } => cli::upload::run(&opts, &file, folder.as_deref(), amount, submit).await,
        Commands::Intake {
            files,
            profile_id,
            folder,
            store_dir,
        } => {
            let options = IntakeOptions {
                profile_id,
                folder,
                store_dir,
            };
            cli::intake::run(&opts, &files, &options)
        }
        Commands::Watch => cli::watch::run(&opts).await,
        Commands::Completions { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
        Commands::Version => {
            println!("catatkeu version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
