pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "wapprove",
    about = "WApprove operator CLI",
    long_about = "Operate WApprove migrations, demo seed data, configuration inspection, and readiness checks.",
    after_help = "Examples:\n  wapprove doctor --json\n  wapprove migrate\n  wapprove chain FIN"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset (departments, users, chains)")]
    Seed,
    #[command(about = "Validate config, WhatsApp channel readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Show a department's approval chain as currently configured")]
    Chain {
        #[arg(help = "Department code, e.g. FIN")]
        department_code: String,
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
        Command::Chain { department_code } => commands::chain::run(&department_code),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
