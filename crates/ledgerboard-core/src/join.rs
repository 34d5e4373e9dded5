use std::collections::HashMap;

use chrono::Datelike;
use ledgerboard_loader::{columns, days_to_date, BranchTable, EmployeeTable, TransactionTable};
use polars::prelude::*;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::types::JoinedRecords;

struct EmployeeRow {
    name: String,
    branch_id: Option<String>,
    position: Option<String>,
    rating: Option<f64>,
}

/// Left-joins transactions against employees and branches. Pure function of
/// its inputs; output height always equals the transaction count.
pub fn join_records(
    employees: &EmployeeTable,
    branches: &BranchTable,
    transactions: &TransactionTable,
) -> Result<JoinedRecords> {
    let branch_ids = branches.df.column(columns::BRANCH_ID)?.str()?;
    let branch_names = branches.df.column(columns::BRANCH_NAME)?.str()?;

    let mut branch_map: HashMap<String, String> = HashMap::with_capacity(branches.height());
    for idx in 0..branches.height() {
        let Some(id) = branch_ids.get(idx) else {
            continue;
        };
        let name = branch_names.get(idx).unwrap_or_default().to_string();
        if branch_map.insert(id.to_string(), name).is_some() {
            return Err(PipelineError::DuplicateKey {
                table: "branches",
                key: id.to_string(),
            });
        }
    }

    let employee_ids = employees.df.column(columns::EMPLOYEE_ID)?.str()?;
    let employee_names = employees.df.column(columns::EMPLOYEE_NAME)?.str()?;
    let employee_branches = employees.df.column(columns::BRANCH_ID)?.str()?;
    let positions = employees.df.column(columns::POSITION)?.str()?;
    let ratings = employees.df.column(columns::RATING)?.f64()?;

    let mut employee_map: HashMap<String, EmployeeRow> =
        HashMap::with_capacity(employees.height());
    for idx in 0..employees.height() {
        let Some(id) = employee_ids.get(idx) else {
            continue;
        };
        let row = EmployeeRow {
            name: employee_names.get(idx).unwrap_or_default().to_string(),
            branch_id: employee_branches.get(idx).map(|v| v.to_string()),
            position: positions.get(idx).map(|v| v.to_string()),
            rating: ratings.get(idx),
        };
        if employee_map.insert(id.to_string(), row).is_some() {
            return Err(PipelineError::DuplicateKey {
                table: "employees",
                key: id.to_string(),
            });
        }
    }

    let len = transactions.height();
    let transaction_ids = transactions.df.column(columns::TRANSACTION_ID)?.str()?;
    let txn_employee_ids = transactions.df.column(columns::EMPLOYEE_ID)?.str()?;
    let dates = transactions.df.column(columns::DATE)?.date()?;
    let categories = transactions.df.column(columns::CATEGORY)?.str()?;
    let amounts = transactions.df.column(columns::AMOUNT)?.f64()?;

    let mut out_transaction_ids: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_employee_ids: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_dates: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut out_years: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut out_months: Vec<Option<i32>> = Vec::with_capacity(len);
    let mut out_categories: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_amounts: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut out_employee_names: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_positions: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_ratings: Vec<Option<f64>> = Vec::with_capacity(len);
    let mut out_branch_ids: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_branch_names: Vec<Option<String>> = Vec::with_capacity(len);

    let mut unmatched = 0usize;

    for idx in 0..len {
        out_transaction_ids.push(transaction_ids.get(idx).map(|v| v.to_string()));
        out_categories.push(categories.get(idx).map(|v| v.to_string()));
        out_amounts.push(amounts.get(idx));

        let days = dates.get(idx);
        out_dates.push(days);
        match days.and_then(days_to_date) {
            Some(date) => {
                out_years.push(Some(date.year()));
                out_months.push(Some(date.month() as i32));
            }
            None => {
                out_years.push(None);
                out_months.push(None);
            }
        }

        let employee_id = txn_employee_ids.get(idx);
        out_employee_ids.push(employee_id.map(|v| v.to_string()));

        match employee_id.and_then(|id| employee_map.get(id)) {
            Some(employee) => {
                out_employee_names.push(Some(employee.name.clone()));
                out_positions.push(employee.position.clone());
                out_ratings.push(employee.rating);
                out_branch_ids.push(employee.branch_id.clone());
                out_branch_names.push(
                    employee
                        .branch_id
                        .as_deref()
                        .and_then(|id| branch_map.get(id))
                        .cloned(),
                );
            }
            None => {
                unmatched += 1;
                out_employee_names.push(None);
                out_positions.push(None);
                out_ratings.push(None);
                out_branch_ids.push(None);
                out_branch_names.push(None);
            }
        }
    }

    if unmatched > 0 {
        warn!(
            count = unmatched,
            "transactions reference employee ids absent from the employees table"
        );
    }

    let date_series = Series::new(columns::DATE.into(), out_dates).cast(&DataType::Date)?;

    let df = DataFrame::new(vec![
        Series::new(columns::TRANSACTION_ID.into(), out_transaction_ids).into(),
        Series::new(columns::EMPLOYEE_ID.into(), out_employee_ids).into(),
        date_series.into(),
        Series::new(columns::YEAR.into(), out_years).into(),
        Series::new(columns::MONTH.into(), out_months).into(),
        Series::new(columns::CATEGORY.into(), out_categories).into(),
        Series::new(columns::AMOUNT.into(), out_amounts).into(),
        Series::new(columns::EMPLOYEE_NAME.into(), out_employee_names).into(),
        Series::new(columns::POSITION.into(), out_positions).into(),
        Series::new(columns::RATING.into(), out_ratings).into(),
        Series::new(columns::BRANCH_ID.into(), out_branch_ids).into(),
        Series::new(columns::BRANCH_NAME.into(), out_branch_names).into(),
    ])?;

    Ok(JoinedRecords { df })
}
