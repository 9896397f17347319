use thiserror::Error;

/// Reasons a Name is refused before it reaches the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name string can't be blank")]
    BlankName,

    #[error("Italicized form can't be blank for name '{0}'")]
    BlankItalicized(String),

    // Returned by the registry insert itself, so two racing inserts can't both win.
    #[error("Name string must be unique (clean name '{clean_name}' already used by name {existing_id})")]
    DuplicateCleanName { clean_name: String, existing_id: u64 },
}

#[derive(Error, Debug)]
pub enum CrateError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Missing required CSV header: {0}")]
    MissingHeader(String),

    #[error("Missing required value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No name with id {0}")]
    UnknownName(u64),

    #[error("Search backend request failed: {0}")]
    SearchRequestError(reqwest::Error),

    #[error("Search backend returned an error status: {status} for query '{query}'")]
    SearchStatusError {
        status: reqwest::StatusCode,
        query: String,
    },

    #[error("Failed to decode search backend JSON response: {0}")]
    SearchJsonDecodeError(reqwest::Error),

    #[error("Unexpected search backend response format: {0}")]
    SearchResponseFormatError(String),

    #[error("Notification delivery failed for user {recipient}: {reason}")]
    NotificationDelivery { recipient: u64, reason: String },

    #[error("Notification queue is closed")]
    NotificationQueueClosed,
}

pub type Result<T> = std::result::Result<T, CrateError>;
