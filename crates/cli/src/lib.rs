pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cotiza",
    about = "Cotiza operator CLI",
    long_about = "Operate the quotation engine: database migrations, demo fixtures, configuration inspection, and offline pricing checks.",
    after_help = "Examples:\n  cotiza migrate\n  cotiza seed\n  cotiza doctor --json\n  cotiza quote --service web_development --answers answers.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo questionnaire and quotations")]
    Seed,
    #[command(about = "Validate config, database connectivity, and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Price an answers file against a stored questionnaire without persisting")]
    Quote {
        #[arg(long, help = "Service offering slug, e.g. web_development")]
        service: String,
        #[arg(long, help = "Path to a JSON file of answers keyed by question id")]
        answers: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Quote { service, answers } => commands::quote::run(&service, &answers),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
