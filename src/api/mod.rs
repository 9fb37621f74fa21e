//! Exchange endpoint implementations.
//!
//! Each sub-module adds high-level `async` methods to
//! [`SessionClient`](crate::client::SessionClient) via `impl` blocks. All
//! methods go through the session's retry state machine and map the body
//! into typed values.
//!
//! ## Usage
//!
//! ```no_run
//! use nse_chain::SessionClient;
//! use nse_chain::types::Underlying;
//!
//! # #[tokio::main]
//! # async fn main() -> nse_chain::Result<()> {
//! let mut client = SessionClient::new()?;
//! let chain = client.fetch_index_chain(Underlying::Nifty, "01-Jun-2023").await?;
//! let participants = client
//!     .fetch_participant_oi(chrono::NaiveDate::from_ymd_opt(2023, 6, 1).unwrap())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Endpoint | Description |
//! |---|---|---|
//! | [`option_chain`] | `/api/option-chain-indices` | Option chain by symbol and expiry |
//! | [`participants`] | `fao_participant_oi_DDMMYYYY.csv` | Daily participant-wise OI |

pub mod option_chain;
pub mod participants;
