use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use solar_finance_core::solar::model::run_model_from_fields;
use solar_finance_core::workbook::{build_workbook, Workbook};
use solar_finance_core::ModelConfig;

use super::{into_cli_error, today, SourceArgs};

const DEFAULT_TITLE: &str = "Solar Financial Model";

/// Arguments for writing the model workbook
#[derive(Args)]
pub struct WorkbookArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory that receives one CSV file per tab
    #[arg(long)]
    pub dir: String,

    /// Workbook title (defaults to the input's sheet_title)
    #[arg(long)]
    pub title: Option<String>,

    /// Preparation date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

pub fn run_workbook(args: WorkbookArgs, config: &ModelConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let fields = args.source.load_fields()?;
    let result = run_model_from_fields(&fields, config).map_err(into_cli_error)?;

    let title = args
        .title
        .or_else(|| fields.get("sheet_title").cloned())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let workbook = build_workbook(&title, args.date.unwrap_or_else(today), &result);
    let files = write_workbook(Path::new(&args.dir), &workbook)?;

    Ok(json!({
        "title": workbook.title,
        "prepared_on": workbook.prepared_on.to_string(),
        "files": files,
        "irr": result.irr,
        "npv": result.npv,
    }))
}

/// Write each tab to `<dir>/<tab>.csv`, returning the paths written.
pub fn write_workbook(dir: &Path, workbook: &Workbook) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create '{}': {}", dir.display(), e))?;

    let mut written = Vec::with_capacity(workbook.sheets.len());
    for sheet in &workbook.sheets {
        let path = dir.join(format!("{}.csv", file_stem(&sheet.title)));
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(&path)?;
        for row in &sheet.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        written.push(path.display().to_string());
    }
    tracing::info!(files = written.len(), dir = %dir.display(), "workbook written");
    Ok(written)
}

/// `Cash Flow` -> `cash_flow`
fn file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stems() {
        assert_eq!(file_stem("Cash Flow"), "cash_flow");
        assert_eq!(file_stem("IRR_NPV"), "irr_npv");
        assert_eq!(file_stem("Assumptions"), "assumptions");
    }
}
