use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Input file '{path}' not found")]
    MissingInput { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Customer ID '{input}' not found in DPD transition customers list")]
    LoanNotFound { input: String },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidConfig { key: String, value: String },
}

pub type ReportResult<T> = Result<T, ReportError>;
