use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("{table} is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{table} CSV error: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table} data row {line_index} invalid: {message}")]
    DataRow {
        table: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("failed to build {table} dataframe: {source}")]
    Frame {
        table: &'static str,
        #[source]
        source: polars::error::PolarsError,
    },
}
