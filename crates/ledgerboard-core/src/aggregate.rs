use std::collections::{BTreeMap, BTreeSet, HashMap};

use ledgerboard_loader::columns;
use polars::prelude::*;

use crate::error::Result;
use crate::types::{AggregatedRecords, JoinedRecords};
use crate::{category, category::CategoryClass};

/// Grouping key. `branch_id` stays optional: an employee without a branch
/// still aggregates, under a null branch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    employee_id: String,
    branch_id: Option<String>,
    year: i32,
    month: i32,
}

struct GroupAcc {
    employee_name: String,
    branch_name: Option<String>,
    sums: HashMap<String, f64>,
}

/// Groups joined records by (employee, branch, period) and pivots amounts by
/// category. Rows with an unresolved employee reference or a null period
/// carry no well-defined group key and are skipped; they remain visible in
/// the joined table and the company-wide totals.
pub fn aggregate_records(joined: &JoinedRecords) -> Result<AggregatedRecords> {
    let df = &joined.df;
    let employee_ids = df.column(columns::EMPLOYEE_ID)?.str()?;
    let employee_names = df.column(columns::EMPLOYEE_NAME)?.str()?;
    let branch_ids = df.column(columns::BRANCH_ID)?.str()?;
    let branch_names = df.column(columns::BRANCH_NAME)?.str()?;
    let years = df.column(columns::YEAR)?.i32()?;
    let months = df.column(columns::MONTH)?.i32()?;
    let categories = df.column(columns::CATEGORY)?.str()?;
    let amounts = df.column(columns::AMOUNT)?.f64()?;

    // Category columns cover every category observed anywhere in the input,
    // not just the ones that survive grouping.
    let mut category_set: BTreeSet<String> = BTreeSet::new();
    for idx in 0..df.height() {
        if let Some(value) = categories.get(idx) {
            category_set.insert(value.to_string());
        }
    }
    let category_columns: Vec<String> = category_set.into_iter().collect();

    let mut groups: BTreeMap<GroupKey, GroupAcc> = BTreeMap::new();

    for idx in 0..df.height() {
        // A null employee_name marks an unresolved employee reference.
        let (Some(employee_id), Some(employee_name)) =
            (employee_ids.get(idx), employee_names.get(idx))
        else {
            continue;
        };
        let (Some(year), Some(month)) = (years.get(idx), months.get(idx)) else {
            continue;
        };
        let (Some(category), Some(amount)) = (categories.get(idx), amounts.get(idx)) else {
            continue;
        };

        let key = GroupKey {
            employee_id: employee_id.to_string(),
            branch_id: branch_ids.get(idx).map(|v| v.to_string()),
            year,
            month,
        };

        let acc = groups.entry(key).or_insert_with(|| GroupAcc {
            employee_name: employee_name.to_string(),
            branch_name: branch_names.get(idx).map(|v| v.to_string()),
            sums: HashMap::new(),
        });
        *acc.sums.entry(category.to_string()).or_insert(0.0) += amount;
    }

    let len = groups.len();
    let mut out_employee_ids = Vec::with_capacity(len);
    let mut out_employee_names = Vec::with_capacity(len);
    let mut out_branch_ids: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_branch_names: Vec<Option<String>> = Vec::with_capacity(len);
    let mut out_years = Vec::with_capacity(len);
    let mut out_months = Vec::with_capacity(len);
    let mut out_category_sums: Vec<Vec<f64>> = vec![Vec::with_capacity(len); category_columns.len()];
    let mut out_net_income = Vec::with_capacity(len);

    for (key, acc) in groups {
        out_employee_ids.push(key.employee_id);
        out_employee_names.push(acc.employee_name.clone());
        out_branch_ids.push(key.branch_id);
        out_branch_names.push(acc.branch_name.clone());
        out_years.push(key.year);
        out_months.push(key.month);

        let mut net = 0.0;
        for (pos, name) in category_columns.iter().enumerate() {
            let sum = acc.sums.get(name).copied().unwrap_or(0.0);
            out_category_sums[pos].push(sum);
            match category::classify(name) {
                CategoryClass::Revenue => net += sum,
                CategoryClass::Expense | CategoryClass::Compensation => net -= sum,
                CategoryClass::Other => {}
            }
        }
        out_net_income.push(net);
    }

    let mut cols: Vec<Column> = vec![
        Series::new(columns::EMPLOYEE_ID.into(), out_employee_ids).into(),
        Series::new(columns::EMPLOYEE_NAME.into(), out_employee_names).into(),
        Series::new(columns::BRANCH_ID.into(), out_branch_ids).into(),
        Series::new(columns::BRANCH_NAME.into(), out_branch_names).into(),
        Series::new(columns::YEAR.into(), out_years).into(),
        Series::new(columns::MONTH.into(), out_months).into(),
    ];
    for (name, values) in category_columns.iter().zip(out_category_sums) {
        cols.push(Series::new(name.as_str().into(), values).into());
    }
    cols.push(Series::new(columns::NET_INCOME.into(), out_net_income).into());

    let df = DataFrame::new(cols)?;

    Ok(AggregatedRecords {
        df,
        category_columns,
    })
}
