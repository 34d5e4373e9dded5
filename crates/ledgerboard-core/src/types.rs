use polars::prelude::DataFrame;

/// One row per input transaction, enriched with the referenced employee and
/// branch fields plus derived `year`/`month` columns. Rows whose employee
/// reference does not resolve keep null employee/branch fields.
#[derive(Debug, Clone)]
pub struct JoinedRecords {
    pub df: DataFrame,
}

impl JoinedRecords {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}

/// One row per (employee, branch, period) group, with one zero-filled f64
/// column per category observed anywhere in the joined input and a derived
/// `net_income` column. Rows are ordered by (employee, branch, year, month);
/// category columns are sorted by name.
#[derive(Debug, Clone)]
pub struct AggregatedRecords {
    pub df: DataFrame,
    pub category_columns: Vec<String>,
}

impl AggregatedRecords {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}
