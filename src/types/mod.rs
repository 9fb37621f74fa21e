//! Wire-facing types for the NSE endpoints.
//!
//! ## Organization
//!
//! - [`enums`] — Option legs, known index underlyings, participant categories
//! - [`response`] — Option chain JSON validation and typed extraction
//! - [`participants`] — F&O participant open interest archive (CSV)
//!
//! All enums are re-exported at the module root via `pub use enums::*`.

pub mod enums;
pub mod participants;
pub mod response;

pub use enums::*;
