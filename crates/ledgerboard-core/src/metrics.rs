use std::collections::HashSet;

use ledgerboard_loader::columns;
use serde::Serialize;

use crate::category::{classify, CategoryClass};
use crate::config::{ReportConfig, UnmatchedPolicy};
use crate::error::Result;
use crate::types::{AggregatedRecords, JoinedRecords};

/// Scalar company-level metrics derived from one pipeline run.
///
/// `performance_ratio` uses plain f64 division, so a zero cost base yields
/// the infinity sentinel (and NaN for the degenerate 0/0 case, which no
/// finite threshold accepts). Infinite trivially satisfies any finite
/// `ratio >= t` comparison downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_sales: f64,
    pub total_cost: f64,
    pub net_income: f64,
    pub performance_ratio: f64,
    pub branch_count: usize,
    pub employee_count: usize,
    pub group_count: usize,
    pub well_performing_groups: usize,
}

pub fn summarize(
    joined: &JoinedRecords,
    aggregated: &AggregatedRecords,
    config: &ReportConfig,
) -> Result<ReportSummary> {
    let df = &joined.df;
    let employee_ids = df.column(columns::EMPLOYEE_ID)?.str()?;
    let employee_names = df.column(columns::EMPLOYEE_NAME)?.str()?;
    let branch_ids = df.column(columns::BRANCH_ID)?.str()?;
    let categories = df.column(columns::CATEGORY)?.str()?;
    let amounts = df.column(columns::AMOUNT)?.f64()?;

    let mut total_sales = 0.0;
    let mut total_cost = 0.0;
    let mut branches: HashSet<&str> = HashSet::new();
    let mut employees: HashSet<&str> = HashSet::new();

    for idx in 0..df.height() {
        let matched = employee_names.get(idx).is_some();
        if !matched && config.unmatched_policy == UnmatchedPolicy::Drop {
            continue;
        }

        if matched {
            if let Some(id) = employee_ids.get(idx) {
                employees.insert(id);
            }
            if let Some(id) = branch_ids.get(idx) {
                branches.insert(id);
            }
        }

        let (Some(category), Some(amount)) = (categories.get(idx), amounts.get(idx)) else {
            continue;
        };
        match classify(category) {
            CategoryClass::Revenue => total_sales += amount,
            CategoryClass::Expense | CategoryClass::Compensation => total_cost += amount,
            CategoryClass::Other => {}
        }
    }

    let mut well_performing_groups = 0usize;
    let group_count = aggregated.height();

    if group_count > 0 {
        let mut class_by_column = Vec::with_capacity(aggregated.category_columns.len());
        for name in &aggregated.category_columns {
            class_by_column.push((name.clone(), classify(name)));
        }

        for idx in 0..group_count {
            let mut sales = 0.0;
            let mut cost = 0.0;
            for (name, class) in &class_by_column {
                let value = aggregated
                    .df
                    .column(name)?
                    .f64()?
                    .get(idx)
                    .unwrap_or(0.0);
                match class {
                    CategoryClass::Revenue => sales += value,
                    CategoryClass::Expense | CategoryClass::Compensation => cost += value,
                    CategoryClass::Other => {}
                }
            }
            if sales / cost >= config.well_performing_threshold {
                well_performing_groups += 1;
            }
        }
    }

    Ok(ReportSummary {
        total_sales,
        total_cost,
        net_income: total_sales - total_cost,
        performance_ratio: total_sales / total_cost,
        branch_count: branches.len(),
        employee_count: employees.len(),
        group_count,
        well_performing_groups,
    })
}
