use chrono::NaiveDate;
use csv::StringRecord;
use polars::prelude::*;

use crate::errors::LoaderError;
use crate::model::{
    columns, date_to_days, BranchTable, DatePolicy, EmployeeTable, TransactionTable,
};

const EMPLOYEES: &str = "employees";
const BRANCHES: &str = "branches";
const TRANSACTIONS: &str = "transactions";

/// Accepted spellings for each canonical column, checked against headers
/// normalized to lowercase alphanumerics ("EmployeeID" and "employee_id"
/// both become "employeeid"). First match wins; later aliases only apply
/// when no earlier one claimed a header.
struct ColumnSpec {
    canonical: &'static str,
    aliases: &'static [&'static str],
    required: bool,
}

const EMPLOYEE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        canonical: columns::EMPLOYEE_ID,
        aliases: &["employeeid", "empid", "id"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::EMPLOYEE_NAME,
        aliases: &["employeename", "name"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::BRANCH_ID,
        aliases: &["branchid", "branch"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::POSITION,
        aliases: &["position", "role", "title"],
        required: false,
    },
    ColumnSpec {
        canonical: columns::RATING,
        aliases: &["rating", "customerrating"],
        required: false,
    },
];

const BRANCH_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        canonical: columns::BRANCH_ID,
        aliases: &["branchid", "id"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::BRANCH_NAME,
        aliases: &["branchname", "name"],
        required: true,
    },
];

const TRANSACTION_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec {
        canonical: columns::TRANSACTION_ID,
        aliases: &["transactionid", "txnid", "id"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::EMPLOYEE_ID,
        aliases: &["employeeid", "empid"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::DATE,
        aliases: &["date", "transactiondate", "txndate"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::CATEGORY,
        aliases: &["type", "category", "transactiontype"],
        required: true,
    },
    ColumnSpec {
        canonical: columns::AMOUNT,
        aliases: &["amount", "value"],
        required: true,
    },
];

struct ColumnIndex {
    employee_id: Option<usize>,
    employee_name: Option<usize>,
    branch_id: Option<usize>,
    branch_name: Option<usize>,
    position: Option<usize>,
    rating: Option<usize>,
    transaction_id: Option<usize>,
    date: Option<usize>,
    category: Option<usize>,
    amount: Option<usize>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn resolve_columns(
    table: &'static str,
    specs: &[ColumnSpec],
    headers: &StringRecord,
) -> Result<ColumnIndex, LoaderError> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    let mut claimed = vec![false; normalized.len()];

    let mut index = ColumnIndex {
        employee_id: None,
        employee_name: None,
        branch_id: None,
        branch_name: None,
        position: None,
        rating: None,
        transaction_id: None,
        date: None,
        category: None,
        amount: None,
    };

    for spec in specs {
        let mut found = None;
        'alias: for alias in spec.aliases {
            for (pos, header) in normalized.iter().enumerate() {
                if !claimed[pos] && header == alias {
                    found = Some(pos);
                    claimed[pos] = true;
                    break 'alias;
                }
            }
        }

        if found.is_none() && spec.required {
            return Err(LoaderError::MissingColumn {
                table,
                column: spec.canonical,
            });
        }

        let slot = match spec.canonical {
            columns::EMPLOYEE_ID => &mut index.employee_id,
            columns::EMPLOYEE_NAME => &mut index.employee_name,
            columns::BRANCH_ID => &mut index.branch_id,
            columns::BRANCH_NAME => &mut index.branch_name,
            columns::POSITION => &mut index.position,
            columns::RATING => &mut index.rating,
            columns::TRANSACTION_ID => &mut index.transaction_id,
            columns::DATE => &mut index.date,
            columns::CATEGORY => &mut index.category,
            _ => &mut index.amount,
        };
        *slot = found;
    }

    Ok(index)
}

fn read_rows(table: &'static str, text: &str) -> Result<(StringRecord, Vec<StringRecord>), LoaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| LoaderError::Csv { table, source })?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record.map_err(|source| LoaderError::Csv { table, source })?);
    }

    Ok((headers, rows))
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or_default().trim()
}

fn optional_field(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.map(|pos| field(record, pos))
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

fn parse_optional_f64(
    table: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, LoaderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|err| LoaderError::DataRow {
            table,
            line_index,
            message: format!("failed to parse column '{column}' as number: {err}"),
        })
}

fn parse_required_f64(
    table: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<f64, LoaderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LoaderError::DataRow {
            table,
            line_index,
            message: format!("column '{column}' is empty"),
        });
    }
    trimmed
        .parse::<f64>()
        .map_err(|err| LoaderError::DataRow {
            table,
            line_index,
            message: format!("failed to parse column '{column}' as number: {err}"),
        })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    static FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    let trimmed = value.trim();
    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }
    None
}

fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Parses the employees table. `position` and `rating` are optional source
/// columns; when absent the output columns are present but fully null.
pub fn parse_employees_csv(text: &str) -> Result<EmployeeTable, LoaderError> {
    let (headers, rows) = read_rows(EMPLOYEES, text)?;
    let index = resolve_columns(EMPLOYEES, EMPLOYEE_COLUMNS, &headers)?;

    let id_idx = index.employee_id.unwrap_or_default();
    let name_idx = index.employee_name.unwrap_or_default();
    let branch_idx = index.branch_id.unwrap_or_default();

    let mut ids = Vec::with_capacity(rows.len());
    let mut names = Vec::with_capacity(rows.len());
    let mut branch_ids: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut positions: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut ratings: Vec<Option<f64>> = Vec::with_capacity(rows.len());

    for (row_pos, record) in rows.iter().enumerate() {
        let line_index = row_pos + 2;
        ids.push(field(record, id_idx).to_string());
        names.push(field(record, name_idx).to_string());
        branch_ids.push(optional_field(record, Some(branch_idx)));
        positions.push(optional_field(record, index.position));

        let rating = match index.rating {
            Some(pos) => parse_optional_f64(
                EMPLOYEES,
                field(record, pos),
                line_index,
                columns::RATING,
            )?,
            None => None,
        };
        ratings.push(rating);
    }

    let df = DataFrame::new(vec![
        Series::new(columns::EMPLOYEE_ID.into(), ids).into(),
        Series::new(columns::EMPLOYEE_NAME.into(), names).into(),
        Series::new(columns::BRANCH_ID.into(), branch_ids).into(),
        Series::new(columns::POSITION.into(), positions).into(),
        Series::new(columns::RATING.into(), ratings).into(),
    ])
    .map_err(|source| LoaderError::Frame {
        table: EMPLOYEES,
        source,
    })?;

    Ok(EmployeeTable {
        df,
        content_hash: content_hash(text),
    })
}

pub fn parse_branches_csv(text: &str) -> Result<BranchTable, LoaderError> {
    let (headers, rows) = read_rows(BRANCHES, text)?;
    let index = resolve_columns(BRANCHES, BRANCH_COLUMNS, &headers)?;

    let id_idx = index.branch_id.unwrap_or_default();
    let name_idx = index.branch_name.unwrap_or_default();

    let mut ids = Vec::with_capacity(rows.len());
    let mut names = Vec::with_capacity(rows.len());

    for record in &rows {
        ids.push(field(record, id_idx).to_string());
        names.push(field(record, name_idx).to_string());
    }

    let df = DataFrame::new(vec![
        Series::new(columns::BRANCH_ID.into(), ids).into(),
        Series::new(columns::BRANCH_NAME.into(), names).into(),
    ])
    .map_err(|source| LoaderError::Frame {
        table: BRANCHES,
        source,
    })?;

    Ok(BranchTable {
        df,
        content_hash: content_hash(text),
    })
}

/// Parses the transactions table. Amounts must parse; dates follow the
/// supplied [`DatePolicy`].
pub fn parse_transactions_csv(
    text: &str,
    date_policy: DatePolicy,
) -> Result<TransactionTable, LoaderError> {
    let (headers, rows) = read_rows(TRANSACTIONS, text)?;
    let index = resolve_columns(TRANSACTIONS, TRANSACTION_COLUMNS, &headers)?;

    let id_idx = index.transaction_id.unwrap_or_default();
    let employee_idx = index.employee_id.unwrap_or_default();
    let date_idx = index.date.unwrap_or_default();
    let category_idx = index.category.unwrap_or_default();
    let amount_idx = index.amount.unwrap_or_default();

    let mut ids = Vec::with_capacity(rows.len());
    let mut employee_ids = Vec::with_capacity(rows.len());
    let mut dates: Vec<Option<i32>> = Vec::with_capacity(rows.len());
    let mut categories = Vec::with_capacity(rows.len());
    let mut amounts = Vec::with_capacity(rows.len());

    for (row_pos, record) in rows.iter().enumerate() {
        let line_index = row_pos + 2;

        ids.push(field(record, id_idx).to_string());
        employee_ids.push(field(record, employee_idx).to_string());
        categories.push(field(record, category_idx).to_string());
        amounts.push(parse_required_f64(
            TRANSACTIONS,
            field(record, amount_idx),
            line_index,
            columns::AMOUNT,
        )?);

        let raw_date = field(record, date_idx);
        match parse_date(raw_date) {
            Some(date) => dates.push(Some(date_to_days(date))),
            None => match date_policy {
                DatePolicy::CoerceMissing => dates.push(None),
                DatePolicy::Reject => {
                    return Err(LoaderError::DataRow {
                        table: TRANSACTIONS,
                        line_index,
                        message: format!("invalid date '{raw_date}'"),
                    })
                }
            },
        }
    }

    let date_series = Series::new(columns::DATE.into(), dates)
        .cast(&DataType::Date)
        .map_err(|source| LoaderError::Frame {
            table: TRANSACTIONS,
            source,
        })?;

    let df = DataFrame::new(vec![
        Series::new(columns::TRANSACTION_ID.into(), ids).into(),
        Series::new(columns::EMPLOYEE_ID.into(), employee_ids).into(),
        date_series.into(),
        Series::new(columns::CATEGORY.into(), categories).into(),
        Series::new(columns::AMOUNT.into(), amounts).into(),
    ])
    .map_err(|source| LoaderError::Frame {
        table: TRANSACTIONS,
        source,
    })?;

    Ok(TransactionTable {
        df,
        content_hash: content_hash(text),
    })
}
