use clap::Args;
use serde_json::Value;
use std::path::Path;

use solar_finance_core::messaging::{
    default_sheet_title, format_failure, format_success, handle_message, parse_structured_message,
    Channel,
};
use solar_finance_core::solar::model::run_model_from_fields;
use solar_finance_core::workbook::build_workbook;
use solar_finance_core::ModelConfig;

use super::today;
use super::workbook::write_workbook;
use crate::input;

/// Arguments for handling an inbound message
#[derive(Args)]
pub struct MessageArgs {
    /// Channel the message arrived on (sms, whatsapp, email, cli)
    #[arg(long, default_value = "sms")]
    pub channel: Channel,

    /// File holding the message body; stdin is read when omitted
    #[arg(long)]
    pub body_file: Option<String>,

    /// Also write the workbook tabs as CSV files into this directory
    #[arg(long)]
    pub workbook_dir: Option<String>,

    /// Print the plain-text reply instead of the structured response
    #[arg(long)]
    pub reply: bool,
}

pub fn run_message(args: MessageArgs, config: &ModelConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let body = match args.body_file {
        Some(ref path) => input::file::read_text(path)?,
        None => input::stdin::read_stdin()?.ok_or("--body-file <file> or a piped message body required")?,
    };

    let response = match args.workbook_dir {
        None => handle_message(args.channel, &body, config),
        Some(ref dir) => {
            let fields = parse_structured_message(&body);
            let title = fields
                .get("sheet_title")
                .filter(|t| !t.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| default_sheet_title(args.channel));

            match run_model_from_fields(&fields, config) {
                Ok(result) => {
                    let workbook = build_workbook(&title, today(), &result);
                    write_workbook(Path::new(dir), &workbook)?;
                    format_success(args.channel, &title, &result).with_workbook(dir.as_str())
                }
                Err(e) => format_failure(args.channel, &fields, &e),
            }
        }
    };

    if args.reply {
        println!("{}", response.reply_text());
        return Ok(Value::Null);
    }
    Ok(serde_json::to_value(response)?)
}
