//! Defines the crate level error type and the local validation errors.

/// Problems with user input that are caught before anything is sent to the
/// backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    /// The password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The password is shorter than the minimum length.
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    /// An amount was negative.
    ///
    /// Amounts are magnitudes, whether a transaction is money in or out is
    /// decided by its type.
    #[error("amount cannot be negative, got {0}")]
    InvalidAmount(f64),

    /// A new monthly budget is larger than the money the user has left.
    #[error("a budget of {amount} exceeds the remaining balance of {remaining_balance}")]
    ExceedsBalance {
        /// The requested budget.
        amount: f64,
        /// The balance the budget was checked against.
        remaining_balance: f64,
    },

    /// A month string was not in the `YYYY-MM` or `YYYY-MM-DD` format.
    #[error("\"{0}\" is not a valid month, expected YYYY-MM")]
    InvalidMonth(String),

    /// A date string was not in the `YYYY-MM-DD` format.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A transaction type other than "Income" or "Expense" was given.
    #[error("\"{0}\" is not a transaction type, expected Income or Expense")]
    InvalidTransactionType(String),

    /// A required text field was left empty.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
}

/// The errors that may occur in the client.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The input was rejected locally and no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend answered 401, or there is no session to use.
    ///
    /// Requests that hit this have already been through the single silent
    /// refresh, so the user has to log in again.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The request never got a response, e.g. the connection was refused or
    /// the request timed out.
    #[error("could not reach the server: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status other than 401.
    ///
    /// `message` is the backend's own error text.
    #[error("the server responded with {status}: {message}")]
    Server {
        /// The HTTP status code.
        status: u16,
        /// The error text sent by the backend.
        message: String,
    },

    /// A response body could not be decoded into the expected shape.
    #[error("could not decode the server response: {0}")]
    InvalidResponse(String),

    /// An amount that is negative or not a finite number reached the
    /// aggregation code.
    #[error("invalid transaction amount {0}")]
    InvalidAmount(f64),

    /// The configured timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The configured API URL could not be parsed or joined.
    #[error("invalid URL \"{0}\"")]
    InvalidUrl(String),

    /// Writing CSV data failed.
    #[error("could not write CSV: {0}")]
    Csv(String),

    /// A file system operation failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Error::InvalidResponse(error.to_string())
        } else if error.is_timeout() {
            Error::Network(format!("request timed out: {error}"))
        } else {
            Error::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::InvalidResponse(error.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Error::Csv(error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

impl Error {
    /// Whether retrying the same action later could succeed.
    ///
    /// Network failures and 5xx responses are transient, everything else
    /// needs the user to change something first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
