/// Every way building an extraction plan can fail. All variants abort the
/// whole assembly; nothing here is retried by the planner.
#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("there is no {column} field in the {table} table")]
    IncrementalColumnNotFound { column: String, table: String },
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),
    #[error("metadata lookup failed: {0}")]
    MetadataLookup(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;

impl PlanError {
    pub fn config(msg: impl Into<String>) -> Self {
        PlanError::Configuration(msg.into())
    }
}

impl From<sqlx::Error> for PlanError {
    fn from(e: sqlx::Error) -> Self {
        PlanError::MetadataLookup(e.to_string())
    }
}

impl From<tiberius::error::Error> for PlanError {
    fn from(e: tiberius::error::Error) -> Self {
        PlanError::MetadataLookup(e.to_string())
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(e: serde_json::Error) -> Self {
        PlanError::Configuration(format!("invalid job description: {}", e))
    }
}
