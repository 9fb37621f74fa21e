//! Option chain response parsing.
//!
//! The exchange answers with a loosely typed JSON document. [`ChainResponse`]
//! validates the envelope once at construction (a `records` object must be
//! present) and then offers typed accessors that each fail with
//! [`NseError::MalformedPayload`] naming the field that is missing or has
//! the wrong type.
//!
//! ```text
//! {
//!   "records":  { "expiryDates": [..], "timestamp": "..", "underlyingValue": 43582.3, .. },
//!   "filtered": {
//!     "data": [ { "expiryDate": "..", "strikePrice": 43500, "CE": {..}, "PE": {..} }, .. ]
//!   }
//! }
//! ```

use serde_json::{Map, Value};

use crate::chain::{OptionChain, number};
use crate::error::{NseError, Result};
use crate::types::enums::Leg;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const FIELD_RECORDS: &str = "records";
pub const FIELD_FILTERED: &str = "filtered";
pub const FIELD_DATA: &str = "data";
pub const FIELD_EXPIRY_DATES: &str = "expiryDates";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_UNDERLYING_VALUE: &str = "underlyingValue";
pub const FIELD_STRIKE_PRICES: &str = "strikePrices";
pub const FIELD_EXPIRY_DATE: &str = "expiryDate";
pub const FIELD_STRIKE_PRICE: &str = "strikePrice";
pub const FIELD_CE: &str = "CE";
pub const FIELD_PE: &str = "PE";
pub const FIELD_OPEN_INTEREST: &str = "openInterest";
pub const FIELD_CHANGE_OI: &str = "changeinOpenInterest";
pub const FIELD_LAST_PRICE: &str = "lastPrice";
pub const FIELD_VOLUME: &str = "totalTradedVolume";

const BODY: &str = "<body>";

// ---------------------------------------------------------------------------
// Raw strike row
// ---------------------------------------------------------------------------

/// One per-strike object from `filtered.data`, checked to be an object with
/// a string `expiryDate`. Legs are read lazily by
/// [`OptionChain::ingest`](crate::chain::OptionChain::ingest).
#[derive(Debug, Clone, PartialEq)]
pub struct RawStrikeRow {
    expiry_date: String,
    fields: Map<String, Value>,
}

impl RawStrikeRow {
    /// Validate a raw JSON row.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(NseError::malformed(
                format!("{FIELD_FILTERED}.{FIELD_DATA}[]"),
                "contains a non-object row",
            ));
        };
        let expiry_date = match fields.get(FIELD_EXPIRY_DATE) {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(NseError::malformed(FIELD_EXPIRY_DATE, "is not a string")),
            None => return Err(NseError::malformed(FIELD_EXPIRY_DATE, "is missing")),
        };
        Ok(Self {
            expiry_date,
            fields,
        })
    }

    pub fn expiry_date(&self) -> &str {
        &self.expiry_date
    }

    /// Numeric strike price, if present.
    pub fn strike_price(&self) -> Option<f64> {
        self.fields.get(FIELD_STRIKE_PRICE).and_then(number)
    }

    /// The `CE` or `PE` object. A leg of any other JSON type counts as absent.
    pub fn leg(&self, leg: Leg) -> Option<&Map<String, Value>> {
        let key = match leg {
            Leg::Call => FIELD_CE,
            Leg::Put => FIELD_PE,
        };
        self.fields.get(key).and_then(Value::as_object)
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Validated option chain response for one symbol.
#[derive(Debug, Clone)]
pub struct ChainResponse {
    symbol: String,
    records: Map<String, Value>,
    filtered: Option<Value>,
}

impl ChainResponse {
    /// Parse and validate a raw body.
    pub fn from_slice(symbol: impl Into<String>, body: &[u8]) -> Result<Self> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| NseError::malformed(BODY, format!("is not valid JSON: {e}")))?;
        Self::validate(symbol, payload)
    }

    /// Check the envelope: a top-level `records` object is required.
    /// `filtered` is kept as sent and checked by [`Self::filtered_records`].
    pub fn validate(symbol: impl Into<String>, payload: Value) -> Result<Self> {
        let Value::Object(mut top) = payload else {
            return Err(NseError::malformed(BODY, "is not a JSON object"));
        };
        let records = match top.remove(FIELD_RECORDS) {
            Some(Value::Object(records)) => records,
            Some(_) => return Err(NseError::malformed(FIELD_RECORDS, "is not an object")),
            None => return Err(NseError::malformed(FIELD_RECORDS, "is missing")),
        };
        Ok(Self {
            symbol: symbol.into(),
            records,
            filtered: top.remove(FIELD_FILTERED),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Expiry dates advertised by the exchange, in its order.
    pub fn expiry_dates(&self) -> Result<Vec<String>> {
        let dates = self.records_field(FIELD_EXPIRY_DATES)?;
        let Value::Array(dates) = dates else {
            return Err(NseError::malformed(FIELD_EXPIRY_DATES, "is not an array"));
        };
        dates
            .iter()
            .map(|date| {
                date.as_str().map(str::to_owned).ok_or_else(|| {
                    NseError::malformed(FIELD_EXPIRY_DATES, "contains a non-string entry")
                })
            })
            .collect()
    }

    /// Snapshot timestamp as sent by the exchange.
    pub fn timestamp(&self) -> Result<&str> {
        self.records_field(FIELD_TIMESTAMP)?
            .as_str()
            .ok_or_else(|| NseError::malformed(FIELD_TIMESTAMP, "is not a string"))
    }

    /// Price of the underlying at the snapshot.
    pub fn underlying_value(&self) -> Result<f64> {
        self.records_field(FIELD_UNDERLYING_VALUE)?
            .as_f64()
            .ok_or_else(|| NseError::malformed(FIELD_UNDERLYING_VALUE, "is not a number"))
    }

    /// All listed strikes, when the exchange includes them. Entries that do
    /// not parse as numbers are skipped.
    pub fn strike_prices(&self) -> Vec<i64> {
        self.records
            .get(FIELD_STRIKE_PRICES)
            .and_then(Value::as_array)
            .map(|strikes| {
                strikes
                    .iter()
                    .filter_map(number)
                    .map(|s| s.round() as i64)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Per-strike rows of the `filtered.data` section.
    pub fn filtered_records(&self) -> Result<Vec<RawStrikeRow>> {
        let filtered = match &self.filtered {
            Some(Value::Object(filtered)) => filtered,
            Some(_) => return Err(NseError::malformed(FIELD_FILTERED, "is not an object")),
            None => return Err(NseError::malformed(FIELD_FILTERED, "is missing")),
        };
        let data = match filtered.get(FIELD_DATA) {
            Some(Value::Array(data)) => data,
            Some(_) => {
                return Err(NseError::malformed(
                    format!("{FIELD_FILTERED}.{FIELD_DATA}"),
                    "is not an array",
                ));
            }
            None => {
                return Err(NseError::malformed(
                    format!("{FIELD_FILTERED}.{FIELD_DATA}"),
                    "is missing",
                ));
            }
        };
        data.iter().cloned().map(RawStrikeRow::from_value).collect()
    }

    /// Build the chain of `expiry_date` from the filtered rows.
    ///
    /// The strike step is left at zero for the caller to set.
    pub fn get_expiry_view(&self, symbol: &str, expiry_date: &str) -> Result<OptionChain> {
        let available = self.expiry_dates()?;
        if !available.iter().any(|d| d == expiry_date) {
            tracing::error!(symbol, expiry_date, ?available, "expiry not offered");
            return Err(NseError::UnknownExpiry {
                expiry: expiry_date.to_owned(),
                available,
            });
        }

        let timestamp = self.timestamp()?;
        let underlying_value = self.underlying_value()?;
        let rows = self.filtered_records()?;

        let mut chain = OptionChain::new(symbol, expiry_date, timestamp, underlying_value);
        chain.ingest(rows.iter().filter(|row| row.expiry_date() == expiry_date))?;
        tracing::debug!(symbol, expiry_date, strikes = chain.len(), "built option chain");
        Ok(chain)
    }

    fn records_field(&self, field: &str) -> Result<&Value> {
        self.records
            .get(field)
            .ok_or_else(|| NseError::malformed(field, "is missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "records": {
                "expiryDates": ["01-Jun-2023", "08-Jun-2023"],
                "timestamp": "26-May-2023 15:30:00",
                "underlyingValue": 43582.3,
                "strikePrices": ["43500", 43600, "x"]
            },
            "filtered": {
                "data": [
                    {
                        "expiryDate": "01-Jun-2023", "strikePrice": 43500,
                        "CE": {
                            "openInterest": 100, "changeinOpenInterest": 5,
                            "lastPrice": 210.5, "totalTradedVolume": 900
                        },
                        "PE": {
                            "openInterest": 300, "changeinOpenInterest": -2,
                            "lastPrice": 120.0, "totalTradedVolume": 400
                        }
                    },
                    {
                        "expiryDate": "01-Jun-2023", "strikePrice": 43600,
                        "CE": {
                            "openInterest": 200, "changeinOpenInterest": 1,
                            "lastPrice": 150.0, "totalTradedVolume": 800
                        }
                    },
                    {
                        "expiryDate": "08-Jun-2023", "strikePrice": 43500,
                        "CE": {
                            "openInterest": 9999, "changeinOpenInterest": 0,
                            "lastPrice": 400.0, "totalTradedVolume": 1
                        }
                    }
                ]
            }
        })
    }

    #[test]
    fn typed_fields() {
        let resp = ChainResponse::validate("BANKNIFTY", payload()).unwrap();
        assert_eq!(resp.expiry_dates().unwrap(), vec!["01-Jun-2023", "08-Jun-2023"]);
        assert_eq!(resp.timestamp().unwrap(), "26-May-2023 15:30:00");
        assert_eq!(resp.underlying_value().unwrap(), 43582.3);
        assert_eq!(resp.strike_prices(), vec![43500, 43600]);
        assert_eq!(resp.filtered_records().unwrap().len(), 3);
    }

    #[test]
    fn missing_records_is_malformed() {
        let err = ChainResponse::from_slice("NIFTY", br#"{"filtered":{"data":[]}}"#).unwrap_err();
        assert!(matches!(err, NseError::MalformedPayload { ref field, .. } if field == "records"));
    }

    #[test]
    fn mistyped_records_is_malformed() {
        let err = ChainResponse::from_slice("NIFTY", br#"{"records":[1,2]}"#).unwrap_err();
        assert!(matches!(err, NseError::MalformedPayload { ref field, .. } if field == "records"));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = ChainResponse::from_slice("NIFTY", b"<html>blocked</html>").unwrap_err();
        assert!(matches!(err, NseError::MalformedPayload { .. }));
    }

    #[test]
    fn each_field_fails_on_its_own() {
        let resp = ChainResponse::validate(
            "NIFTY",
            json!({ "records": { "expiryDates": ["01-Jun-2023"], "timestamp": 5 } }),
        )
        .unwrap();
        assert!(resp.expiry_dates().is_ok());
        assert!(matches!(
            resp.timestamp(),
            Err(NseError::MalformedPayload { ref field, .. }) if field == "timestamp"
        ));
        assert!(matches!(
            resp.underlying_value(),
            Err(NseError::MalformedPayload { ref field, .. }) if field == "underlyingValue"
        ));
        assert!(matches!(
            resp.filtered_records(),
            Err(NseError::MalformedPayload { ref field, .. }) if field == "filtered"
        ));
    }

    #[test]
    fn mistyped_filtered_only_fails_filtered_records() {
        let mut body = payload();
        body["filtered"] = json!([]);
        let resp = ChainResponse::validate("BANKNIFTY", body).unwrap();
        assert_eq!(resp.expiry_dates().unwrap().len(), 2);
        assert_eq!(resp.timestamp().unwrap(), "26-May-2023 15:30:00");
        assert_eq!(resp.underlying_value().unwrap(), 43582.3);
        assert!(matches!(
            resp.filtered_records(),
            Err(NseError::MalformedPayload { ref field, ref reason })
                if field == "filtered" && reason == "is not an object"
        ));
    }

    #[test]
    fn expiry_view_filters_rows() {
        let resp = ChainResponse::validate("BANKNIFTY", payload()).unwrap();
        let chain = resp.get_expiry_view("BANKNIFTY", "01-Jun-2023").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.total_call_oi(), 300);
        assert_eq!(chain.total_put_oi(), 300);
        assert_eq!(chain.pcr(), 1.0);
        assert_eq!(chain.timestamp(), "26-May-2023 15:30:00");
        assert!(chain.get(43600).unwrap().put.is_none());
    }

    #[test]
    fn unknown_expiry_is_rejected() {
        let resp = ChainResponse::validate("BANKNIFTY", payload()).unwrap();
        let err = resp.get_expiry_view("BANKNIFTY", "29-Jun-2023").unwrap_err();
        match err {
            NseError::UnknownExpiry { expiry, available } => {
                assert_eq!(expiry, "29-Jun-2023");
                assert_eq!(available.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn row_without_expiry_is_malformed() {
        let err = RawStrikeRow::from_value(json!({ "strikePrice": 100 })).unwrap_err();
        assert!(matches!(
            err,
            NseError::MalformedPayload { ref field, .. } if field == "expiryDate"
        ));
        assert!(RawStrikeRow::from_value(json!(3)).is_err());
    }
}
