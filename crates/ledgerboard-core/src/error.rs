use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing input tables: {}", missing.join(", "))]
    MissingInput { missing: Vec<&'static str> },

    #[error("{table} contains duplicate identifier '{key}'")]
    DuplicateKey { table: &'static str, key: String },

    #[error("loader error: {0}")]
    Loader(#[from] ledgerboard_loader::LoaderError),

    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV export failed: {0}")]
    Export(String),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
