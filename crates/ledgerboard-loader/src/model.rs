use chrono::{Duration, NaiveDate};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Canonical column names shared by the loader and the pipeline. Source
/// headers are normalized to these regardless of how the CSV spells them.
pub mod columns {
    pub const EMPLOYEE_ID: &str = "employee_id";
    pub const EMPLOYEE_NAME: &str = "employee_name";
    pub const POSITION: &str = "position";
    pub const RATING: &str = "rating";
    pub const BRANCH_ID: &str = "branch_id";
    pub const BRANCH_NAME: &str = "branch_name";
    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const DATE: &str = "date";
    pub const CATEGORY: &str = "category";
    pub const AMOUNT: &str = "amount";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const NET_INCOME: &str = "net_income";
}

/// What to do with a transaction whose date field does not parse.
///
/// `CoerceMissing` keeps the row with a null date, which later excludes it
/// from period-based aggregation. `Reject` fails the whole load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    #[default]
    CoerceMissing,
    Reject,
}

#[derive(Debug, Clone)]
pub struct EmployeeTable {
    pub df: DataFrame,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct BranchTable {
    pub df: DataFrame,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct TransactionTable {
    pub df: DataFrame,
    pub content_hash: String,
}

impl EmployeeTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}

impl BranchTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}

impl TransactionTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}

/// Days-since-epoch encoding used by the polars `Date` dtype.
pub fn date_to_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() as i32
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    epoch.checked_add_signed(Duration::days(i64::from(days)))
}
