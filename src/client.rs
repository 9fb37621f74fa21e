//! Cookie-session HTTP client for the NSE web endpoints.
//!
//! The [`SessionClient`] struct is the main entry point for talking to the
//! exchange. It wraps [`reqwest::Client`] with a [`ChainSession`] (cookie jar,
//! browser headers and the "needs cookie" flag) and runs every GET through a
//! retry state machine that survives the exchange's anti-bot challenges:
//!
//! | Status | Action |
//! |---|---|
//! | 200 | decode body (gzip or raw), done |
//! | 401 | refresh cookie, retry immediately |
//! | 403 | refresh cookie after a cooldown, retry |
//! | other | back off, retry until the failure budget runs out |
//!
//! Endpoint methods are added to `SessionClient` via `impl` blocks in the
//! [`crate::api`] module.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::constants::{self, retry};
use crate::error::{NseError, Result};

// ---------------------------------------------------------------------------
// Fetch state
// ---------------------------------------------------------------------------

/// State of the retrieval state machine, as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    /// The cookie jar must be (re)primed before the next request.
    NeedCookie,
    /// Cookies are in place and a request is about to go out.
    Ready,
    /// Sleeping through a rate-limit cooldown or a server-error backoff.
    CoolingDown,
    /// The last fetch gave up.
    Failed,
    /// The last fetch returned a body.
    Success,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the [`SessionClient`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HTML page primed for cookies.
    pub landing_url: String,
    /// Option chain JSON endpoint (without the `symbol` query).
    pub option_chain_url: String,
    /// Prefix of the participant OI archive; `DDMMYYYY.csv` is appended.
    pub participant_oi_url_prefix: String,
    /// `user-agent` header value.
    pub user_agent: String,
    /// `accept-language` header value.
    pub accept_language: String,
    /// Sleep after a 403 before retrying.
    pub cooldown: Duration,
    /// Sleep after any other non-200 before retrying.
    pub backoff: Duration,
    /// Non-200 responses (other than 401/403) tolerated per fetch.
    pub max_server_failures: u32,
    /// Cap on 401 retries per fetch. `None` retries until a cookie works.
    pub max_auth_retries: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            landing_url: constants::LANDING_URL.to_owned(),
            option_chain_url: constants::OPTION_CHAIN_URL.to_owned(),
            participant_oi_url_prefix: constants::PARTICIPANT_OI_URL_PREFIX.to_owned(),
            user_agent: constants::USER_AGENT.to_owned(),
            accept_language: constants::ACCEPT_LANGUAGE.to_owned(),
            cooldown: Duration::from_secs(retry::RATE_LIMIT_COOLDOWN_SECS),
            backoff: Duration::from_secs(retry::SERVER_ERROR_BACKOFF_SECS),
            max_server_failures: retry::MAX_SERVER_FAILURES,
            max_auth_retries: None,
        }
    }
}

impl SessionConfig {
    /// Point every endpoint at a single host, keeping the exchange's paths.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.landing_url = format!("{base}/option-chain");
        self.option_chain_url = format!("{base}/api/option-chain-indices");
        self.participant_oi_url_prefix = format!("{base}/content/nsccl/fao_participant_oi_");
        self
    }

    /// Set the 403 cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the server-error backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the number of non-200 responses tolerated per fetch.
    pub fn with_max_server_failures(mut self, max: u32) -> Self {
        self.max_server_failures = max;
        self
    }

    /// Cap the number of 401 retries per fetch.
    pub fn with_max_auth_retries(mut self, max: u32) -> Self {
        self.max_auth_retries = Some(max);
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Cookie jar, fixed header set and the "needs cookie" flag.
///
/// Owned by exactly one [`SessionClient`]; every mutation goes through a
/// `&mut self` method on the client.
#[derive(Debug, Clone)]
pub struct ChainSession {
    cookies: BTreeMap<String, String>,
    headers: HeaderMap,
    need_cookie: bool,
}

impl ChainSession {
    /// Build a fresh session that will prime its cookies on first use.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(header::USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header_value(&config.accept_language)?,
        );
        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_static(constants::ACCEPT_ENCODING),
        );
        Ok(Self {
            cookies: BTreeMap::new(),
            headers,
            need_cookie: true,
        })
    }

    /// Cookies stored from the landing page, by name.
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Whether the next fetch will prime the cookie jar first.
    pub fn needs_cookie(&self) -> bool {
        self.need_cookie
    }

    /// Fixed headers plus the `cookie` header built from the jar.
    fn request_headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if self.cookies.is_empty() {
            return headers;
        }
        let joined = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&joined) {
            Ok(value) => {
                headers.insert(header::COOKIE, value);
            }
            Err(err) => tracing::warn!(%err, "stored cookies are not a valid header; sending none"),
        }
        headers
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| NseError::InvalidArgument(format!("invalid header value: {value:?}")))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Session-managed HTTP client for the NSE web endpoints.
///
/// Holds the only [`ChainSession`] it uses, so cookie state is never shared.
/// To poll several symbols in parallel, create one client per task.
///
/// # Example
///
/// ```no_run
/// use nse_chain::client::SessionClient;
///
/// # #[tokio::main]
/// # async fn main() -> nse_chain::error::Result<()> {
/// let mut client = SessionClient::new()?;
/// let chain = client.fetch_option_chain("BANKNIFTY", "01-Jun-2023").await?;
/// println!("PCR {:.2}", chain.pcr());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionClient {
    http: reqwest::Client,
    config: SessionConfig,
    session: ChainSession,
    state: FetchState,
    cancel: CancellationToken,
}

impl SessionClient {
    /// Create a client with the default exchange endpoints and retry policy.
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Create a client from a custom configuration.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Create a client whose cooldown and backoff sleeps end early when
    /// `cancel` is triggered.
    pub fn with_cancellation(config: SessionConfig, cancel: CancellationToken) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        let session = ChainSession::new(&config)?;
        Ok(Self {
            http,
            config,
            session,
            state: FetchState::NeedCookie,
            cancel,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the cookie session.
    pub fn session(&self) -> &ChainSession {
        &self.session
    }

    /// Returns the last state reached by the retrieval state machine.
    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Returns the token that interrupts cooldown and backoff sleeps.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Prime the cookie jar from the landing page.
    ///
    /// Transport failures are logged, not returned: the "needs cookie" flag
    /// stays set so the next fetch tries again. Returns whether the landing
    /// page answered.
    pub async fn acquire_session(&mut self) -> bool {
        let url = self.config.landing_url.clone();
        tracing::info!(%url, "acquiring session cookies");

        let resp = match self
            .http
            .get(&url)
            .headers(self.session.headers.clone())
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(%url, %err, "cookie acquisition failed");
                self.session.need_cookie = true;
                return false;
            }
        };

        let mut stored = 0usize;
        for cookie in resp.cookies() {
            self.session
                .cookies
                .insert(cookie.name().to_owned(), cookie.value().to_owned());
            stored += 1;
        }
        tracing::debug!(status = %resp.status(), stored, "session cookies stored");
        true
    }

    /// GET `url` through the retry state machine and return the decoded body.
    pub async fn fetch(&mut self, url: &str) -> Result<Bytes> {
        let mut server_failures = 0u32;
        let mut auth_retries = 0u32;

        loop {
            if self.session.need_cookie {
                self.state = FetchState::NeedCookie;
                if self.acquire_session().await {
                    self.session.need_cookie = false;
                }
            }

            self.state = FetchState::Ready;
            tracing::info!(%url, "GET");
            let resp = match self
                .http
                .get(url)
                .headers(self.session.request_headers())
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    tracing::error!(%url, %err, "fetch failed");
                    self.state = FetchState::Failed;
                    return Err(NseError::Network(err));
                }
            };

            let status = resp.status();
            match status {
                StatusCode::OK => {
                    let body = match read_body(resp).await {
                        Ok(body) => body,
                        Err(err) => {
                            self.state = FetchState::Failed;
                            return Err(err);
                        }
                    };
                    tracing::info!(%url, bytes = body.len(), "fetched");
                    self.state = FetchState::Success;
                    return Ok(body);
                }
                StatusCode::UNAUTHORIZED => {
                    self.session.need_cookie = true;
                    auth_retries += 1;
                    if self
                        .config
                        .max_auth_retries
                        .is_some_and(|max| auth_retries > max)
                    {
                        self.state = FetchState::Failed;
                        return Err(NseError::AuthRequired {
                            url: url.to_owned(),
                        });
                    }
                    tracing::warn!(%url, %status, "unauthorized; refreshing cookie");
                }
                StatusCode::FORBIDDEN => {
                    self.session.need_cookie = true;
                    tracing::warn!(
                        %url,
                        %status,
                        cooldown_secs = self.config.cooldown.as_secs(),
                        "forbidden; cooling down"
                    );
                    let cooldown = self.config.cooldown;
                    if !self.pause(cooldown).await {
                        self.state = FetchState::Failed;
                        return Err(NseError::RateLimited {
                            url: url.to_owned(),
                        });
                    }
                }
                _ => {
                    server_failures += 1;
                    if server_failures >= self.config.max_server_failures {
                        tracing::error!(%url, %status, attempts = server_failures, "giving up");
                        self.state = FetchState::Failed;
                        return Err(NseError::ServerError {
                            status,
                            attempts: server_failures,
                        });
                    }
                    tracing::warn!(%url, %status, attempt = server_failures, "retrying");
                    let backoff = self.config.backoff;
                    if !self.pause(backoff).await {
                        self.state = FetchState::Failed;
                        return Err(NseError::ServerError {
                            status,
                            attempts: server_failures,
                        });
                    }
                }
            }
        }
    }

    /// Sleep for `delay` unless cancelled first. Returns `false` on cancel.
    async fn pause(&mut self, delay: Duration) -> bool {
        self.state = FetchState::CoolingDown;
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::info!("sleep interrupted by shutdown");
                false
            }
            () = tokio::time::sleep(delay) => true,
        }
    }
}

/// Read the body, inflating it when the server says it is gzip.
async fn read_body(resp: reqwest::Response) -> Result<Bytes> {
    let gzip = resp
        .headers()
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));
    let raw = resp.bytes().await?;
    if gzip { decode_gzip(&raw) } else { Ok(raw) }
}

fn decode_gzip(raw: &[u8]) -> Result<Bytes> {
    let mut out = Vec::with_capacity(raw.len() * 4);
    MultiGzDecoder::new(raw).read_to_end(&mut out)?;
    Ok(Bytes::from(out))
}
