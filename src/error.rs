//! Error types for the `nse-chain` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, NseError>`.
//!
//! [`NseError`] covers:
//! - **Transport errors**: network, TLS and timeout failures from `reqwest`
//! - **Session errors**: 401/403 responses that outlived the retry policy
//! - **Server errors**: other non-2xx statuses after the failure budget
//! - **Payload errors**: JSON or CSV that does not match the expected shape
//! - **Expiry errors**: an expiry the exchange does not advertise

/// All possible errors produced by the `nse-chain` client.
#[derive(Debug, thiserror::Error)]
pub enum NseError {
    /// A network or transport-level error from `reqwest`.
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The exchange kept answering 401 after the cookie was refreshed.
    #[error("authorization required: cookie refresh did not satisfy {url}")]
    AuthRequired {
        /// The URL being fetched.
        url: String,
    },

    /// The exchange answered 403 and the cooldown was interrupted.
    #[error("rate limited by exchange while fetching {url}")]
    RateLimited {
        /// The URL being fetched.
        url: String,
    },

    /// A non-2xx status persisted for the whole failure budget.
    #[error("HTTP {status} after {attempts} attempts")]
    ServerError {
        /// The last HTTP status code seen.
        status: reqwest::StatusCode,
        /// Number of failed attempts made.
        attempts: u32,
    },

    /// The payload did not have the expected shape.
    #[error("malformed payload: field `{field}` {reason}")]
    MalformedPayload {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The requested expiry is not one the exchange advertises.
    #[error("no option chain for expiry {expiry} (available: {available:?})")]
    UnknownExpiry {
        /// The requested expiry date.
        expiry: String,
        /// The expiry dates present in the payload.
        available: Vec<String>,
    },

    /// Decompressing the response body failed.
    #[error("response decode failed: {0}")]
    Decode(#[from] std::io::Error),

    /// Reading the participant archive CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The caller provided an invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl NseError {
    /// Shorthand for a [`NseError::MalformedPayload`].
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NseError>;
