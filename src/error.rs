use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Fatal failures. Any of these stops the run before or after the network
/// phase; none of them is raised by an individual lookup.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the configuration file is not valid YAML.
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// The configuration file did not exist; a template was written in its place.
    #[error("config file not found, wrote a template to {0}; fill in the values and run again")]
    ConfigTemplateCreated(PathBuf),

    /// A required configuration key is absent, empty or still the placeholder.
    #[error("config key '{0}' is empty")]
    MissingConfigKey(&'static str),

    /// The library link lacks one of the query parameters we need.
    #[error("library link is missing the '{0}' query parameter")]
    InvalidLibraryLink(&'static str),

    /// The input workbook did not exist; a template was written in its place.
    #[error(
        "input file not found, wrote a template to {0}; put ISBN13 in column A, the sheet in B and an optional memo in C"
    )]
    InputTemplateCreated(PathBuf),

    /// Raised when a workbook does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// A row names a book but no target sheet.
    #[error("row {row}: book '{identifier}' has no sheet assigned")]
    MissingSheetName { row: usize, identifier: String },

    /// A row carries a sheet name Excel will not accept.
    #[error("row {row}: '{name}' is not a valid sheet name")]
    InvalidSheetName { row: usize, name: String },

    /// Two rows name sheets that Excel treats as the same name.
    #[error("row {row}: sheet '{name}' clashes with '{existing}'; sheet names ignore letter case")]
    DuplicateSheetName {
        row: usize,
        name: String,
        existing: String,
    },

    /// A row carries an identifier we cannot interpret.
    #[error("row {row}: cannot read identifier '{value}': {reason}")]
    InvalidIdentifier {
        row: usize,
        value: String,
        reason: String,
    },

    /// The input produced no records at all.
    #[error("no books to process")]
    NoRecords,

    /// Every catalog lookup failed, so there is nothing worth writing.
    #[error("none of the {0} books were found in the catalog; check aladinKey and the identifiers")]
    NothingFound(usize),

    /// Raised when the async runtime cannot be started.
    #[error("failed to start worker pool: {0}")]
    Runtime(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Per-record lookup failure. Recovered locally by the orchestrator and only
/// ever surfaced through logs.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Connection, TLS, timeout or body transfer failure.
    #[error("network error: {0}")]
    Transport(String),

    /// The body was not the JSON shape we expect.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The catalog API reported an error in its payload.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// The catalog returned an empty result set.
    #[error("no matching item")]
    NotFound,

    /// The worker running the lookup panicked or was cancelled.
    #[error("worker failure: {0}")]
    Worker(String),
}

impl From<ureq::Error> for LookupError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(code) => LookupError::Status(code),
            ureq::Error::Json(inner) => LookupError::Malformed(inner.to_string()),
            other => LookupError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(error: serde_json::Error) -> Self {
        LookupError::Malformed(error.to_string())
    }
}
