//! # nse-chain
//!
//! A Rust client for the NSE option chain and F&O participant archives, with
//! an analytical model on top.
//!
//! - [`client`] — cookie-session HTTP client with the 401/403/backoff state machine
//! - [`types`] — response validation, enums and the participant archive
//! - [`chain`] — strike-indexed [`OptionChain`] with OI/PCR aggregates and ATM windows
//! - [`ranking`] — per-strike OI/volume/change-OI ranks and the weighted composite
//!
//! ## Quick Start
//!
//! ```no_run
//! use nse_chain::{RankingEngine, SessionClient};
//!
//! #[tokio::main]
//! async fn main() -> nse_chain::Result<()> {
//!     let mut client = SessionClient::new()?;
//!     let chain = client.fetch_option_chain("BANKNIFTY", "01-Jun-2023").await?;
//!     let window = chain.atm_strikes(16);
//!     let view = RankingEngine::default().ranked_view(&chain.derive_sub_chain(&window), &window);
//!     println!("ATM {} PCR {:.2} rows {}", view.atm_strike, chain.pcr(), view.rows.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chain;
pub mod client;
pub mod constants;
pub mod error;
pub mod ranking;
pub mod types;

/// Re-export the main client type at crate root for convenience.
pub use client::SessionClient;
/// Re-export the chain model.
pub use chain::OptionChain;
/// Re-export the ranking engine.
pub use ranking::RankingEngine;
/// Re-export the error type and Result alias.
pub use error::{NseError, Result};
