//! Constants for the NSE web endpoints.
//!
//! Contains endpoint URLs, the browser header set the exchange expects, and
//! the retry timings used by [`SessionClient`](crate::client::SessionClient).
//! They seed [`SessionConfig::default`](crate::client::SessionConfig) but are
//! exported for callers that build their own configuration.

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// HTML landing page fetched to obtain the anti-bot cookies.
pub const LANDING_URL: &str = "https://www.nseindia.com/option-chain";

/// Option chain JSON endpoint for indices. The symbol is appended.
pub const OPTION_CHAIN_URL: &str = "https://www.nseindia.com/api/option-chain-indices";

/// Prefix of the daily F&O participant open interest archive.
pub const PARTICIPANT_OI_URL_PREFIX: &str =
    "https://archives.nseindia.com/content/nsccl/fao_participant_oi_";

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Browser user agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/80.0.3987.149 Safari/537.36";

/// Accept-Language header value.
pub const ACCEPT_LANGUAGE: &str = "en,gu;q=0.9,hi;q=0.8";

/// Accept-Encoding header value. Only gzip is decoded.
pub const ACCEPT_ENCODING: &str = "gzip";

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Retry timings for the session state machine.
pub mod retry {
    /// Cooldown after a 403 before the cookie is refreshed (seconds).
    pub const RATE_LIMIT_COOLDOWN_SECS: u64 = 300;
    /// Backoff between attempts after any other non-200 status (seconds).
    pub const SERVER_ERROR_BACKOFF_SECS: u64 = 1;
    /// Consecutive non-200 responses tolerated before giving up.
    pub const MAX_SERVER_FAILURES: u32 = 5;
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Default weights of the composite strike rank.
pub mod weights {
    /// Weight of the open interest rank.
    pub const OI: f64 = 0.4;
    /// Weight of the traded volume rank.
    pub const VOLUME: f64 = 0.4;
    /// Weight of the change-in-OI rank.
    pub const CHANGE_OI: f64 = 0.2;
}

/// Divisor of the window length below which a weighted rank is highlighted.
pub const TOP_RANK_DIVISOR: f64 = 2.8;
