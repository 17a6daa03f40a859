mod commands;
mod input;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;
use std::process;

use commands::message::MessageArgs;
use commands::model::ModelArgs;
use commands::prompt::PromptArgs;
use commands::workbook::WorkbookArgs;

/// Solar project financial modelling
#[derive(Parser)]
#[command(
    name = "sfa",
    version,
    about = "Levered cash-flow, IRR and NPV modelling for solar projects",
    long_about = "Builds a levered cash-flow projection for a utility-scale solar project \
                  and reports the sponsor's IRR, NPV and sensitivities with decimal \
                  precision. Inputs come from JSON files, key=value messages, stdin or \
                  interactive prompts."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// YAML or JSON file with IRR, sensitivity and advisory settings
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log more to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate inputs, project cash flows and compute returns
    Model(ModelArgs),
    /// Check inputs without running the model
    Validate(ModelArgs),
    /// Handle a key=value message the way the webhooks do
    Message(MessageArgs),
    /// Gather inputs interactively, review gaps, then run the model
    Prompt(PromptArgs),
    /// Write the Assumptions, Cash Flow and IRR_NPV tabs as CSV files
    Workbook(WorkbookArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match input::file::read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Model(args) => commands::model::run_model(args, &config),
        Commands::Validate(args) => commands::model::run_validate(args, &config),
        Commands::Message(args) => commands::message::run_message(args, &config),
        Commands::Prompt(args) => commands::prompt::run_prompt(args, &config),
        Commands::Workbook(args) => commands::workbook::run_workbook(args, &config),
        Commands::Version => {
            println!("sfa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        // Already written by the command
        Ok(Value::Null) => process::exit(0),
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
