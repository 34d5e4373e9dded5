use ledgerboard_loader::{columns, days_to_date};

use crate::error::{PipelineError, Result};
use crate::types::JoinedRecords;

/// Header order for the exported joined table. The derived `year`/`month`
/// columns are omitted so the file round-trips through the loaders.
const EXPORT_HEADERS: &[&str] = &[
    columns::TRANSACTION_ID,
    columns::EMPLOYEE_ID,
    columns::DATE,
    columns::CATEGORY,
    columns::AMOUNT,
    columns::EMPLOYEE_NAME,
    columns::POSITION,
    columns::RATING,
    columns::BRANCH_ID,
    columns::BRANCH_NAME,
];

/// Serializes the joined table back to CSV. Dates render as `%Y-%m-%d`,
/// nulls as empty fields.
pub fn export_joined_csv(joined: &JoinedRecords) -> Result<String> {
    let df = &joined.df;
    let transaction_ids = df.column(columns::TRANSACTION_ID)?.str()?;
    let employee_ids = df.column(columns::EMPLOYEE_ID)?.str()?;
    let dates = df.column(columns::DATE)?.date()?;
    let categories = df.column(columns::CATEGORY)?.str()?;
    let amounts = df.column(columns::AMOUNT)?.f64()?;
    let employee_names = df.column(columns::EMPLOYEE_NAME)?.str()?;
    let positions = df.column(columns::POSITION)?.str()?;
    let ratings = df.column(columns::RATING)?.f64()?;
    let branch_ids = df.column(columns::BRANCH_ID)?.str()?;
    let branch_names = df.column(columns::BRANCH_NAME)?.str()?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADERS)
        .map_err(|err| PipelineError::Export(err.to_string()))?;

    for idx in 0..df.height() {
        let date = dates
            .get(idx)
            .and_then(days_to_date)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let amount = format_float(amounts.get(idx));
        let rating = format_float(ratings.get(idx));

        writer
            .write_record([
                transaction_ids.get(idx).unwrap_or_default(),
                employee_ids.get(idx).unwrap_or_default(),
                date.as_str(),
                categories.get(idx).unwrap_or_default(),
                amount.as_str(),
                employee_names.get(idx).unwrap_or_default(),
                positions.get(idx).unwrap_or_default(),
                rating.as_str(),
                branch_ids.get(idx).unwrap_or_default(),
                branch_names.get(idx).unwrap_or_default(),
            ])
            .map_err(|err| PipelineError::Export(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| PipelineError::Export(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| PipelineError::Export(err.to_string()))
}

fn format_float(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => String::new(),
    }
}
