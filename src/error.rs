use thiserror::Error;

/// Errors raised anywhere in the dashboard.
///
/// The first four variants are the ones a user is expected to run into; the
/// rest wrap lower-level failures. Handlers never let these escape to the
/// browser, they turn them into an inline notice via [`DashboardError::user_message`].
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with email {0} already exists")]
    DuplicateAccount(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("external service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    #[error("{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table format error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Workbook(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    /// Text shown inline on the page that triggered the failure.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::InvalidCredentials => "Invalid email or password.".to_string(),
            DashboardError::DuplicateAccount(_) => {
                "An account with this email already exists.".to_string()
            }
            DashboardError::NotFound(what) => what.clone(),
            DashboardError::ExternalServiceUnavailable(service) => {
                format!("{} is currently unavailable. Please try again.", service)
            }
            DashboardError::Validation(msg) => msg.clone(),
            DashboardError::Workbook(_) | DashboardError::Csv(_) => {
                "The uploaded file could not be read as a table.".to_string()
            }
            DashboardError::Image(_) => "The uploaded image could not be read.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<calamine::Error> for DashboardError {
    fn from(e: calamine::Error) -> Self {
        DashboardError::Workbook(e.to_string())
    }
}

impl From<argon2::password_hash::Error> for DashboardError {
    fn from(e: argon2::password_hash::Error) -> Self {
        DashboardError::PasswordHash(e.to_string())
    }
}
