use ledgerboard_core::{
    export::export_joined_csv, FilterState, PipelineError, ReportConfig, ReportInputs,
    ReportPipeline, UnmatchedPolicy,
};
use ledgerboard_loader::{
    columns, parse_branches_csv, parse_employees_csv, parse_transactions_csv, DatePolicy,
};

const EMPLOYEES: &str = "\
EmployeeID,Name,BranchID,Position,Rating
E1,Alice,B1,Manager,4.5
E2,Bob,B2,Teller,
";

const BRANCHES: &str = "\
BranchID,BranchName
B1,North
B2,South
";

const TRANSACTIONS: &str = "\
TransactionID,EmployeeID,Date,Type,Amount
T1,E1,2024-01-15,Revenue,100
T2,E1,2024-01-20,Expense,40
T3,E2,2024-02-01,Salary,25
T4,E9,2024-02-03,Revenue,10
T5,E2,bad-date,Expense,5
";

fn inputs_from(employees: &str, branches: &str, transactions: &str) -> ReportInputs {
    ReportInputs {
        employees: Some(parse_employees_csv(employees).expect("employees")),
        branches: Some(parse_branches_csv(branches).expect("branches")),
        transactions: Some(
            parse_transactions_csv(transactions, DatePolicy::CoerceMissing).expect("transactions"),
        ),
    }
}

fn standard_inputs() -> ReportInputs {
    inputs_from(EMPLOYEES, BRANCHES, TRANSACTIONS)
}

fn f64_at(
    df: &polars::prelude::DataFrame,
    column: &str,
    idx: usize,
) -> f64 {
    df.column(column)
        .unwrap()
        .f64()
        .unwrap()
        .get(idx)
        .unwrap_or_else(|| panic!("null value in column '{column}' at row {idx}"))
}

/// Finds the aggregated row index for (employee, year, month).
fn group_row(df: &polars::prelude::DataFrame, employee_id: &str, year: i32, month: i32) -> usize {
    let ids = df.column(columns::EMPLOYEE_ID).unwrap().str().unwrap();
    let years = df.column(columns::YEAR).unwrap().i32().unwrap();
    let months = df.column(columns::MONTH).unwrap().i32().unwrap();
    (0..df.height())
        .find(|&idx| {
            ids.get(idx) == Some(employee_id)
                && years.get(idx) == Some(year)
                && months.get(idx) == Some(month)
        })
        .unwrap_or_else(|| panic!("no aggregated row for ({employee_id}, {year}-{month:02})"))
}

#[test]
fn join_cardinality_matches_transaction_count() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    assert_eq!(output.joined.height(), 5);
}

#[test]
fn worked_example_from_the_dashboard() {
    let inputs = inputs_from(
        "EmployeeID,Name,BranchID\nE1,Alice,B1\n",
        "BranchID,BranchName\nB1,North\n",
        "TransactionID,EmployeeID,Date,Type,Amount\n\
         T1,E1,2024-01-15,Revenue,100\n\
         T2,E1,2024-01-20,Expense,40\n",
    );
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    let agg = &output.aggregated.df;
    assert_eq!(output.aggregated.height(), 1);
    let row = group_row(agg, "E1", 2024, 1);
    assert_eq!(f64_at(agg, "Revenue", row), 100.0);
    assert_eq!(f64_at(agg, "Expense", row), 40.0);
    assert_eq!(f64_at(agg, columns::NET_INCOME, row), 60.0);

    let summary = &output.summary;
    assert_eq!(summary.total_sales, 100.0);
    assert_eq!(summary.total_cost, 40.0);
    assert_eq!(summary.net_income, 60.0);
    assert_eq!(summary.performance_ratio, 2.5);
    assert_eq!(summary.branch_count, 1);
    assert_eq!(summary.employee_count, 1);
}

#[test]
fn every_category_column_is_zero_filled() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    let agg = &output.aggregated.df;
    assert_eq!(
        output.aggregated.category_columns,
        vec!["Expense", "Revenue", "Salary"]
    );
    for name in &output.aggregated.category_columns {
        let column = agg.column(name).unwrap();
        assert_eq!(column.null_count(), 0, "column '{name}' has nulls");
    }

    // Bob's February group saw only a Salary transaction; the other two
    // categories must still be present as zeros.
    let row = group_row(agg, "E2", 2024, 2);
    assert_eq!(f64_at(agg, "Revenue", row), 0.0);
    assert_eq!(f64_at(agg, "Expense", row), 0.0);
    assert_eq!(f64_at(agg, "Salary", row), 25.0);
}

#[test]
fn net_income_identity_holds_for_every_group() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    let agg = &output.aggregated.df;
    for idx in 0..output.aggregated.height() {
        let revenue = f64_at(agg, "Revenue", idx);
        let expense = f64_at(agg, "Expense", idx);
        let salary = f64_at(agg, "Salary", idx);
        let net = f64_at(agg, columns::NET_INCOME, idx);
        assert_eq!(net, revenue - expense - salary);
    }
}

#[test]
fn zero_cost_ratio_clears_any_finite_threshold() {
    let inputs = inputs_from(
        "EmployeeID,Name,BranchID\nE1,Alice,B1\n",
        "BranchID,BranchName\nB1,North\n",
        "TransactionID,EmployeeID,Date,Type,Amount\nT1,E1,2024-01-15,Revenue,100\n",
    );
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    let summary = &output.summary;
    assert_eq!(summary.total_cost, 0.0);
    assert!(summary.performance_ratio.is_infinite());
    assert!(summary.performance_ratio >= 3.0);
    assert_eq!(summary.well_performing_groups, 1);
}

#[test]
fn joined_export_round_trips_through_the_loader() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    let exported = export_joined_csv(&output.joined).unwrap();
    let reloaded =
        parse_transactions_csv(&exported, DatePolicy::CoerceMissing).expect("reimport failed");

    let tuples = |df: &polars::prelude::DataFrame| {
        let ids = df.column(columns::TRANSACTION_ID).unwrap().str().unwrap();
        let employees = df.column(columns::EMPLOYEE_ID).unwrap().str().unwrap();
        let dates = df.column(columns::DATE).unwrap().date().unwrap();
        let categories = df.column(columns::CATEGORY).unwrap().str().unwrap();
        let amounts = df.column(columns::AMOUNT).unwrap().f64().unwrap();
        let mut rows: Vec<(String, String, Option<i32>, String, String)> = (0..df.height())
            .map(|idx| {
                (
                    ids.get(idx).unwrap_or_default().to_string(),
                    employees.get(idx).unwrap_or_default().to_string(),
                    dates.get(idx),
                    categories.get(idx).unwrap_or_default().to_string(),
                    format!("{}", amounts.get(idx).unwrap_or_default()),
                )
            })
            .collect();
        rows.sort();
        rows
    };

    assert_eq!(tuples(&output.joined.df), tuples(&reloaded.df));
}

#[test]
fn unknown_employee_reference_stays_in_joined_but_not_in_groups() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    let joined = &output.joined.df;
    let ids = joined.column(columns::TRANSACTION_ID).unwrap().str().unwrap();
    let names = joined.column(columns::EMPLOYEE_NAME).unwrap().str().unwrap();
    let branch_names = joined.column(columns::BRANCH_NAME).unwrap().str().unwrap();

    let t4 = (0..joined.height())
        .find(|&idx| ids.get(idx) == Some("T4"))
        .expect("T4 missing from joined output");
    assert_eq!(names.get(t4), None);
    assert_eq!(branch_names.get(t4), None);

    let agg_ids = output
        .aggregated
        .df
        .column(columns::EMPLOYEE_ID)
        .unwrap()
        .str()
        .unwrap();
    assert!((0..output.aggregated.height()).all(|idx| agg_ids.get(idx) != Some("E9")));

    // KeepInTotals (default): T4's revenue counts toward company totals.
    assert_eq!(output.summary.total_sales, 110.0);
    assert_eq!(output.summary.total_cost, 70.0);
}

#[test]
fn drop_policy_excludes_unmatched_rows_from_totals() {
    let inputs = standard_inputs();
    let config = ReportConfig {
        unmatched_policy: UnmatchedPolicy::Drop,
        ..ReportConfig::default()
    };
    let mut pipeline = ReportPipeline::new(config);
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    assert_eq!(output.joined.height(), 5);
    assert_eq!(output.summary.total_sales, 100.0);
    assert_eq!(output.summary.total_cost, 70.0);
}

#[test]
fn null_period_rows_are_excluded_from_aggregation() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    // T5 has an unparseable date: Bob's only group is February, and its
    // Expense column must not have picked up the orphaned amount.
    let agg = &output.aggregated.df;
    let row = group_row(agg, "E2", 2024, 2);
    assert_eq!(f64_at(agg, "Expense", row), 0.0);
    assert_eq!(output.aggregated.height(), 2);
}

#[test]
fn filters_restrict_the_joined_table_before_aggregation() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());

    let january = FilterState {
        year: Some(2024),
        month: Some(1),
        ..FilterState::default()
    };
    let output = pipeline.run(&inputs, &january).unwrap();
    assert_eq!(output.joined.height(), 2);
    assert_eq!(output.aggregated.height(), 1);
    assert_eq!(output.summary.total_sales, 100.0);
    assert_eq!(output.summary.total_cost, 40.0);

    let north_only = FilterState {
        branch_ids: vec!["B1".to_string()],
        ..FilterState::default()
    };
    let output = pipeline.run(&inputs, &north_only).unwrap();
    assert_eq!(output.joined.height(), 2);
    assert_eq!(output.summary.branch_count, 1);
}

#[test]
fn identical_runs_hit_the_memo() {
    let inputs = standard_inputs();
    let mut pipeline = ReportPipeline::new(ReportConfig::default());

    let first = pipeline.run(&inputs, &FilterState::default()).unwrap();
    let second = pipeline.run(&inputs, &FilterState::default()).unwrap();
    assert_eq!(pipeline.recompute_count(), 1);
    assert_eq!(first.summary, second.summary);

    let filtered = FilterState {
        year: Some(2024),
        ..FilterState::default()
    };
    pipeline.run(&inputs, &filtered).unwrap();
    assert_eq!(pipeline.recompute_count(), 2);
}

#[test]
fn missing_inputs_are_a_precondition_error() {
    let inputs = ReportInputs {
        employees: Some(parse_employees_csv(EMPLOYEES).unwrap()),
        branches: None,
        transactions: None,
    };
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let err = pipeline
        .run(&inputs, &FilterState::default())
        .expect_err("missing inputs should not run");

    match err {
        PipelineError::MissingInput { missing } => {
            assert_eq!(missing, vec!["branches", "transactions"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_employee_ids_are_rejected() {
    let inputs = inputs_from(
        "EmployeeID,Name,BranchID\nE1,Alice,B1\nE1,Alan,B1\n",
        BRANCHES,
        "TransactionID,EmployeeID,Date,Type,Amount\nT1,E1,2024-01-15,Revenue,100\n",
    );
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let err = pipeline
        .run(&inputs, &FilterState::default())
        .expect_err("duplicate key should fail");

    match err {
        PipelineError::DuplicateKey { table, key } => {
            assert_eq!(table, "employees");
            assert_eq!(key, "E1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn employee_without_branch_aggregates_under_null_branch() {
    let inputs = inputs_from(
        "EmployeeID,Name,BranchID\nE3,Cara,\n",
        BRANCHES,
        "TransactionID,EmployeeID,Date,Type,Amount\nT1,E3,2024-03-05,Revenue,50\n",
    );
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    assert_eq!(output.aggregated.height(), 1);
    let branch_ids = output
        .aggregated
        .df
        .column(columns::BRANCH_ID)
        .unwrap()
        .str()
        .unwrap();
    assert_eq!(branch_ids.get(0), None);
    assert_eq!(output.summary.branch_count, 0);
}

#[test]
fn empty_transactions_produce_empty_output() {
    let inputs = inputs_from(
        EMPLOYEES,
        BRANCHES,
        "TransactionID,EmployeeID,Date,Type,Amount\n",
    );
    let mut pipeline = ReportPipeline::new(ReportConfig::default());
    let output = pipeline.run(&inputs, &FilterState::default()).unwrap();

    assert_eq!(output.joined.height(), 0);
    assert_eq!(output.aggregated.height(), 0);
    assert_eq!(output.summary.total_sales, 0.0);
    assert_eq!(output.summary.group_count, 0);
}
