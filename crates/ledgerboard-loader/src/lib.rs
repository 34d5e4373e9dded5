pub mod errors;
pub mod model;
mod tables;

pub use errors::LoaderError;
pub use model::{
    columns, date_to_days, days_to_date, BranchTable, DatePolicy, EmployeeTable, TransactionTable,
};
pub use tables::{parse_branches_csv, parse_employees_csv, parse_transactions_csv};

#[cfg(test)]
mod tests;
