use std::fs;
use std::path::PathBuf;

use crate::errors::LoaderError;
use crate::model::{columns, DatePolicy};
use crate::tables::{parse_branches_csv, parse_employees_csv, parse_transactions_csv};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_employees_with_dashboard_headers() {
    let table = parse_employees_csv(&fixture("employees.csv")).expect("employees parse failed");

    assert_eq!(table.height(), 3);
    assert_eq!(
        table.df.get_column_names(),
        vec![
            columns::EMPLOYEE_ID,
            columns::EMPLOYEE_NAME,
            columns::BRANCH_ID,
            columns::POSITION,
            columns::RATING,
        ]
    );

    let branch_ids = table.df.column(columns::BRANCH_ID).unwrap().str().unwrap();
    assert_eq!(branch_ids.get(0), Some("B1"));
    assert_eq!(branch_ids.get(2), None);

    let ratings = table.df.column(columns::RATING).unwrap().f64().unwrap();
    assert_eq!(ratings.get(0), Some(4.5));
    assert_eq!(ratings.get(1), None);
}

#[test]
fn parses_branches() {
    let table = parse_branches_csv(&fixture("branches.csv")).expect("branches parse failed");

    assert_eq!(table.height(), 2);
    let names = table.df.column(columns::BRANCH_NAME).unwrap().str().unwrap();
    assert_eq!(names.get(0), Some("North"));
    assert_eq!(names.get(1), Some("South"));
}

#[test]
fn coerce_policy_keeps_row_with_null_date() {
    let table = parse_transactions_csv(&fixture("transactions.csv"), DatePolicy::CoerceMissing)
        .expect("transactions parse failed");

    assert_eq!(table.height(), 5);
    let dates = table.df.column(columns::DATE).unwrap();
    assert_eq!(dates.null_count(), 1);
    assert_eq!(dates.date().unwrap().get(4), None);

    let amounts = table.df.column(columns::AMOUNT).unwrap().f64().unwrap();
    assert_eq!(amounts.get(0), Some(100.0));
    assert_eq!(amounts.get(2), Some(25.5));
}

#[test]
fn reject_policy_fails_on_bad_date() {
    let err = parse_transactions_csv(&fixture("transactions.csv"), DatePolicy::Reject)
        .expect_err("bad date should be rejected");

    match err {
        LoaderError::DataRow { line_index, .. } => assert_eq!(line_index, 6),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_required_column_is_reported() {
    let text = "EmployeeID,Position\nE1,Manager\n";
    let err = parse_employees_csv(text).expect_err("missing Name column should fail");

    match err {
        LoaderError::MissingColumn { table, column } => {
            assert_eq!(table, "employees");
            assert_eq!(column, columns::EMPLOYEE_NAME);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unparseable_amount_is_reported() {
    let text = "TransactionID,EmployeeID,Date,Type,Amount\nT1,E1,2024-01-15,Revenue,lots\n";
    let err = parse_transactions_csv(text, DatePolicy::CoerceMissing)
        .expect_err("bad amount should fail");

    match err {
        LoaderError::DataRow {
            table, line_index, ..
        } => {
            assert_eq!(table, "transactions");
            assert_eq!(line_index, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn snake_case_headers_are_accepted() {
    let text = "transaction_id,employee_id,date,category,amount\nT1,E1,2024-03-01,Revenue,9.5\n";
    let table =
        parse_transactions_csv(text, DatePolicy::CoerceMissing).expect("snake_case parse failed");

    assert_eq!(table.height(), 1);
    let categories = table.df.column(columns::CATEGORY).unwrap().str().unwrap();
    assert_eq!(categories.get(0), Some("Revenue"));
}

#[test]
fn negative_amounts_are_preserved() {
    let text = "TransactionID,EmployeeID,Date,Type,Amount\nT1,E1,2024-03-01,Expense,-12.25\n";
    let table = parse_transactions_csv(text, DatePolicy::CoerceMissing).expect("parse failed");

    let amounts = table.df.column(columns::AMOUNT).unwrap().f64().unwrap();
    assert_eq!(amounts.get(0), Some(-12.25));
}

#[test]
fn content_hash_tracks_input_text() {
    let a = parse_branches_csv("BranchID,BranchName\nB1,North\n").unwrap();
    let b = parse_branches_csv("BranchID,BranchName\nB1,North\n").unwrap();
    let c = parse_branches_csv("BranchID,BranchName\nB1,East\n").unwrap();

    assert_eq!(a.content_hash, b.content_hash);
    assert_ne!(a.content_hash, c.content_hash);
}
