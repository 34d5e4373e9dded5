use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use ledgerboard_core::category::classify;
use ledgerboard_core::export::export_joined_csv;
use ledgerboard_core::{
    FilterState, ReportConfig, ReportInputs, ReportOutput, ReportPipeline, ReportSummary,
};
use ledgerboard_loader::{
    columns, days_to_date, parse_branches_csv, parse_employees_csv, parse_transactions_csv,
    DatePolicy,
};
use polars::prelude::{AnyValue, DataFrame};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_ROWS: usize = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Employee transaction reporting pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join the three input tables, aggregate, and print the report
    Report(ReportArgs),
    /// List observed transaction categories with their class and totals
    Categories(CategoriesArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Employees CSV path
    #[arg(long)]
    employees: PathBuf,
    /// Branches CSV path
    #[arg(long)]
    branches: PathBuf,
    /// Transactions CSV path
    #[arg(long)]
    transactions: PathBuf,
    /// Restrict to one calendar year
    #[arg(long)]
    year: Option<i32>,
    /// Restrict to one month (1-12)
    #[arg(long)]
    month: Option<i32>,
    /// Restrict to these branch ids (repeatable)
    #[arg(long = "branch")]
    branch: Vec<String>,
    /// Restrict to these employee ids (repeatable)
    #[arg(long = "employee")]
    employee: Vec<String>,
    /// Override the well-performing ratio threshold
    #[arg(long)]
    threshold: Option<f64>,
    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    /// Write the joined table as CSV to this path
    #[arg(long)]
    export_joined: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CategoriesArgs {
    /// Transactions CSV path
    #[arg(long)]
    transactions: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Categories(args) => handle_categories(args),
    }
}

fn handle_report(args: ReportArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            ReportConfig::from_toml_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => ReportConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.well_performing_threshold = threshold;
    }

    let inputs = load_inputs(&args, config.date_policy)?;
    let filter = FilterState {
        year: args.year,
        month: args.month,
        branch_ids: args.branch.clone(),
        employee_ids: args.employee.clone(),
    };

    let mut pipeline = ReportPipeline::new(config);
    let output = pipeline.run(&inputs, &filter)?;

    if let Some(path) = &args.export_joined {
        let csv = export_joined_csv(&output.joined)?;
        fs::write(path, csv)
            .with_context(|| format!("failed to write joined export {}", path.display()))?;
        info!(path = %path.display(), "joined table exported");
    }

    match args.format {
        OutputFormat::Table => print_report_tables(&output),
        OutputFormat::Json => print_report_json(&output)?,
    }

    Ok(())
}

fn load_inputs(args: &ReportArgs, date_policy: DatePolicy) -> Result<ReportInputs> {
    let employees = fs::read_to_string(&args.employees)
        .with_context(|| format!("failed to read {}", args.employees.display()))?;
    let branches = fs::read_to_string(&args.branches)
        .with_context(|| format!("failed to read {}", args.branches.display()))?;
    let transactions = fs::read_to_string(&args.transactions)
        .with_context(|| format!("failed to read {}", args.transactions.display()))?;

    Ok(ReportInputs {
        employees: Some(parse_employees_csv(&employees)?),
        branches: Some(parse_branches_csv(&branches)?),
        transactions: Some(parse_transactions_csv(&transactions, date_policy)?),
    })
}

fn print_report_tables(output: &ReportOutput) {
    println!("{}", summary_table(&output.summary));

    let aggregated = &output.aggregated.df;
    println!("{}", dataframe_table(aggregated, PREVIEW_ROWS));
    if aggregated.height() > PREVIEW_ROWS {
        println!(
            "... {} more groups (use --format json for the full set)",
            aggregated.height() - PREVIEW_ROWS
        );
    }
}

fn summary_table(summary: &ReportSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["metric", "value"]);
    table.add_row(vec!["total_sales".to_string(), format!("{}", summary.total_sales)]);
    table.add_row(vec!["total_cost".to_string(), format!("{}", summary.total_cost)]);
    table.add_row(vec!["net_income".to_string(), format!("{}", summary.net_income)]);
    table.add_row(vec![
        "performance_ratio".to_string(),
        format!("{}", summary.performance_ratio),
    ]);
    table.add_row(vec!["branches".to_string(), summary.branch_count.to_string()]);
    table.add_row(vec!["employees".to_string(), summary.employee_count.to_string()]);
    table.add_row(vec!["groups".to_string(), summary.group_count.to_string()]);
    table.add_row(vec![
        "well_performing_groups".to_string(),
        summary.well_performing_groups.to_string(),
    ]);
    table
}

fn dataframe_table(df: &DataFrame, limit: usize) -> Table {
    let mut table = Table::new();
    table.set_header(
        df.get_columns()
            .iter()
            .map(|col| col.name().to_string())
            .collect::<Vec<_>>(),
    );

    for idx in 0..df.height().min(limit) {
        let row: Vec<String> = df
            .get_columns()
            .iter()
            .map(|col| col.get(idx).map(render_value).unwrap_or_default())
            .collect();
        table.add_row(row);
    }
    table
}

fn render_value(value: AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Float64(v) => format!("{v}"),
        AnyValue::Date(days) => days_to_date(days)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

fn json_value(value: AnyValue) -> serde_json::Value {
    match value {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::String(s) => serde_json::Value::from(s),
        AnyValue::StringOwned(s) => serde_json::Value::from(s.as_str()),
        AnyValue::Int32(v) => serde_json::Value::from(v),
        AnyValue::Float64(v) if v.is_finite() => serde_json::Value::from(v),
        AnyValue::Float64(_) => serde_json::Value::Null,
        AnyValue::Date(days) => days_to_date(days)
            .map(|d| serde_json::Value::from(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::from(other.to_string()),
    }
}

fn print_report_json(output: &ReportOutput) -> Result<()> {
    let df = &output.aggregated.df;
    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut row = serde_json::Map::new();
        for col in df.get_columns() {
            let value = col
                .get(idx)
                .map(json_value)
                .unwrap_or(serde_json::Value::Null);
            row.insert(col.name().to_string(), value);
        }
        rows.push(serde_json::Value::Object(row));
    }

    let body = serde_json::json!({
        "summary": output.summary,
        "aggregated": rows,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn handle_categories(args: CategoriesArgs) -> Result<()> {
    let text = fs::read_to_string(&args.transactions)
        .with_context(|| format!("failed to read {}", args.transactions.display()))?;
    let table = parse_transactions_csv(&text, DatePolicy::CoerceMissing)?;

    let categories = table.df.column(columns::CATEGORY)?.str()?;
    let amounts = table.df.column(columns::AMOUNT)?.f64()?;

    let mut totals: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for idx in 0..table.height() {
        let Some(category) = categories.get(idx) else {
            continue;
        };
        let entry = totals.entry(category.to_string()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += amounts.get(idx).unwrap_or_default();
    }

    let mut out = Table::new();
    out.set_header(vec!["category", "class", "rows", "total"]);
    for (category, (rows, total)) in totals {
        let class = classify(&category);
        out.add_row(vec![
            category,
            class.to_string(),
            rows.to_string(),
            format!("{total}"),
        ]);
    }
    println!("{out}");

    Ok(())
}
