//! Shared enum types: option legs, known index underlyings and F&O
//! participant categories.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Leg
// ---------------------------------------------------------------------------

/// Call or put side of a strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    Call,
    Put,
}

impl Leg {
    /// Both legs, calls first.
    pub const BOTH: [Leg; 2] = [Leg::Call, Leg::Put];
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Call => "CE",
            Self::Put => "PE",
        })
    }
}

// ---------------------------------------------------------------------------
// Underlying
// ---------------------------------------------------------------------------

/// Index underlyings with a fixed strike spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Underlying {
    Nifty,
    BankNifty,
    FinNifty,
}

impl Underlying {
    /// Symbol as used in the option chain query.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Nifty => "NIFTY",
            Self::BankNifty => "BANKNIFTY",
            Self::FinNifty => "FINNIFTY",
        }
    }

    /// Spacing between tradable strikes.
    pub fn strike_step(self) -> i64 {
        match self {
            Self::Nifty => 50,
            Self::BankNifty => 100,
            Self::FinNifty => 50,
        }
    }

    /// Look up a symbol, ignoring case.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        [Self::Nifty, Self::BankNifty, Self::FinNifty]
            .into_iter()
            .find(|u| u.symbol().eq_ignore_ascii_case(symbol.trim()))
    }
}

impl fmt::Display for Underlying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Client type
// ---------------------------------------------------------------------------

/// Participant category in the F&O open interest archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientType {
    Client,
    Dii,
    Fii,
    Pro,
    Total,
}

impl ClientType {
    /// Label used in the archive's `Client Type` column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::Dii => "DII",
            Self::Fii => "FII",
            Self::Pro => "Pro",
            Self::Total => "TOTAL",
        }
    }

    /// Whether an archive label names this category.
    pub fn matches(self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underlying_lookup() {
        assert_eq!(Underlying::from_symbol("banknifty"), Some(Underlying::BankNifty));
        assert_eq!(Underlying::from_symbol("NIFTY").map(Underlying::strike_step), Some(50));
        assert_eq!(Underlying::from_symbol("RELIANCE"), None);
    }

    #[test]
    fn client_type_labels() {
        assert!(ClientType::Fii.matches("FII"));
        assert!(ClientType::Total.matches(" Total "));
        assert!(!ClientType::Pro.matches("Client"));
    }
}
