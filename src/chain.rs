//! Strike-indexed option chain model.
//!
//! An [`OptionChain`] is built fresh for every fetch cycle from the rows of a
//! [`ChainResponse`](crate::types::response::ChainResponse). It keeps a
//! `strike -> StrikeRecord` map plus aggregates (total call/put open
//! interest and PCR). Every mutating method recomputes the aggregates before
//! returning, so readers never see totals that disagree with the map.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{NseError, Result};
use crate::types::enums::Leg;
use crate::types::response::{
    FIELD_CHANGE_OI, FIELD_LAST_PRICE, FIELD_OPEN_INTEREST, FIELD_STRIKE_PRICE, FIELD_VOLUME,
    RawStrikeRow,
};

/// Put-call ratio with the sentinel rule: `0.0` unless both sides are
/// strictly positive.
pub fn compute_pcr(put: i64, call: i64) -> f64 {
    if put <= 0 || call <= 0 {
        return 0.0;
    }
    put as f64 / call as f64
}

/// Round `value` to the nearest multiple of `step`, ties going down.
///
/// A non-positive step leaves the rounded value unchanged.
pub fn round_to_step(value: f64, step: i64) -> i64 {
    let rounded = value.round() as i64;
    if step <= 0 {
        return rounded;
    }
    let remainder = rounded.rem_euclid(step);
    if remainder <= step / 2 {
        rounded - remainder
    } else {
        rounded + (step - remainder)
    }
}

// ---------------------------------------------------------------------------
// Leg / record
// ---------------------------------------------------------------------------

/// One side (call or put) of a strike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OptionLeg {
    pub open_interest: i64,
    /// May be negative when positions were closed.
    pub change_in_open_interest: i64,
    pub last_price: f64,
    pub traded_volume: i64,
}

impl OptionLeg {
    /// Extract a leg from its raw JSON object.
    ///
    /// Missing or unparsable numbers are logged and read as zero.
    pub fn from_fields(fields: &Map<String, Value>, strike: i64, leg: Leg) -> Self {
        Self {
            open_interest: coerce(fields, FIELD_OPEN_INTEREST, strike, leg) as i64,
            change_in_open_interest: coerce(fields, FIELD_CHANGE_OI, strike, leg) as i64,
            last_price: coerce(fields, FIELD_LAST_PRICE, strike, leg),
            traded_volume: coerce(fields, FIELD_VOLUME, strike, leg) as i64,
        }
    }
}

fn coerce(fields: &Map<String, Value>, key: &str, strike: i64, leg: Leg) -> f64 {
    match fields.get(key).and_then(number) {
        Some(value) => value,
        None => {
            tracing::warn!(strike, %leg, field = key, "unparsable leg field; using 0");
            0.0
        }
    }
}

/// Read a JSON number, or a string holding one (commas allowed).
pub(crate) fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// A strike with its optional call and put legs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeRecord {
    pub strike: i64,
    pub call: Option<OptionLeg>,
    pub put: Option<OptionLeg>,
}

impl StrikeRecord {
    /// The requested leg, if the exchange sent one.
    pub fn leg(&self, leg: Leg) -> Option<&OptionLeg> {
        match leg {
            Leg::Call => self.call.as_ref(),
            Leg::Put => self.put.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Option chain of one symbol and expiry, keyed by strike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionChain {
    symbol: String,
    expiry_date: String,
    timestamp: String,
    underlying_value: f64,
    strike_step: i64,
    records: BTreeMap<i64, StrikeRecord>,
    total_call_oi: i64,
    total_put_oi: i64,
    pcr: f64,
}

impl OptionChain {
    /// Create an empty chain. The strike step starts at zero; set it with
    /// [`set_strike_step`](Self::set_strike_step).
    pub fn new(
        symbol: impl Into<String>,
        expiry_date: impl Into<String>,
        timestamp: impl Into<String>,
        underlying_value: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            expiry_date: expiry_date.into(),
            timestamp: timestamp.into(),
            underlying_value,
            strike_step: 0,
            records: BTreeMap::new(),
            total_call_oi: 0,
            total_put_oi: 0,
            pcr: 0.0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn expiry_date(&self) -> &str {
        &self.expiry_date
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn underlying_value(&self) -> f64 {
        self.underlying_value
    }

    pub fn strike_step(&self) -> i64 {
        self.strike_step
    }

    pub fn set_strike_step(&mut self, step: i64) {
        self.strike_step = step;
    }

    pub fn total_call_oi(&self) -> i64 {
        self.total_call_oi
    }

    pub fn total_put_oi(&self) -> i64 {
        self.total_put_oi
    }

    /// Put-call ratio of total open interest, `0.0` when either side is empty.
    pub fn pcr(&self) -> f64 {
        self.pcr
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, strike: i64) -> Option<&StrikeRecord> {
        self.records.get(&strike)
    }

    /// Records in ascending strike order.
    pub fn records(&self) -> impl Iterator<Item = &StrikeRecord> {
        self.records.values()
    }

    /// Strikes in ascending order.
    pub fn strikes(&self) -> impl Iterator<Item = i64> + '_ {
        self.records.keys().copied()
    }

    /// Insert (or overwrite) a single record.
    pub fn insert(&mut self, record: StrikeRecord) {
        self.records.insert(record.strike, record);
        self.recompute_aggregates();
    }

    /// Write raw rows into the strike map, last write wins per strike.
    ///
    /// A row without a numeric strike stops the ingest with
    /// [`NseError::MalformedPayload`]; rows written before it are kept and
    /// the aggregates reflect them.
    pub fn ingest<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a RawStrikeRow>,
    {
        let result = rows.into_iter().try_for_each(|row| {
            let strike = row.strike_price().ok_or_else(|| {
                NseError::malformed(FIELD_STRIKE_PRICE, "is missing or not numeric")
            })?;
            let strike = strike.round() as i64;
            let call = row.leg(Leg::Call);
            let put = row.leg(Leg::Put);
            if call.is_none() {
                tracing::debug!(strike, "CE leg absent");
            }
            if put.is_none() {
                tracing::debug!(strike, "PE leg absent");
            }
            let record = StrikeRecord {
                strike,
                call: call.map(|fields| OptionLeg::from_fields(fields, strike, Leg::Call)),
                put: put.map(|fields| OptionLeg::from_fields(fields, strike, Leg::Put)),
            };
            self.records.insert(strike, record);
            Ok(())
        });
        self.recompute_aggregates();
        result
    }

    /// Recompute total call/put OI and PCR from the current map.
    ///
    /// Only strictly positive leg OI counts towards a total.
    pub fn recompute_aggregates(&mut self) {
        self.total_call_oi = self.positive_oi(Leg::Call);
        self.total_put_oi = self.positive_oi(Leg::Put);
        self.pcr = compute_pcr(self.total_put_oi, self.total_call_oi);
    }

    fn positive_oi(&self, leg: Leg) -> i64 {
        self.records
            .values()
            .filter_map(|record| record.leg(leg))
            .map(|l| l.open_interest)
            .filter(|&oi| oi > 0)
            .fold(0i64, i64::saturating_add)
    }

    /// Tradable strike nearest the underlying price.
    pub fn atm_strike(&self) -> i64 {
        round_to_step(self.underlying_value, self.strike_step)
    }

    /// `count` strikes spaced by the step, starting `count / 2` steps below
    /// `atm`. Even counts put one more strike below than above.
    pub fn strikes_around(&self, atm: i64, count: usize) -> Vec<i64> {
        let begin = atm - (count / 2) as i64 * self.strike_step;
        self.strikes_from(begin, count)
    }

    /// Window of `count` strikes around the ATM strike.
    pub fn atm_strikes(&self, count: usize) -> Vec<i64> {
        self.strikes_around(self.atm_strike(), count)
    }

    /// `count` strikes spaced by the step, starting at `begin`. Without a
    /// positive step the window is just `begin`.
    pub fn strikes_from(&self, begin: i64, count: usize) -> Vec<i64> {
        if self.strike_step <= 0 {
            return if count == 0 { Vec::new() } else { vec![begin] };
        }
        (0..count as i64)
            .map(|i| begin + i * self.strike_step)
            .collect()
    }

    /// Independent chain holding only the requested strikes that exist here.
    pub fn derive_sub_chain(&self, strikes: &[i64]) -> OptionChain {
        let mut sub = OptionChain::new(
            self.symbol.clone(),
            self.expiry_date.clone(),
            self.timestamp.clone(),
            self.underlying_value,
        );
        sub.strike_step = self.strike_step;
        for strike in strikes {
            if let Some(record) = self.records.get(strike) {
                sub.records.insert(*strike, record.clone());
            }
        }
        sub.recompute_aggregates();
        sub
    }

    /// Smallest positive gap between adjacent strikes.
    pub fn infer_strike_step(&self) -> Option<i64> {
        self.records
            .keys()
            .zip(self.records.keys().skip(1))
            .map(|(lo, hi)| hi - lo)
            .filter(|gap| *gap > 0)
            .min()
    }
}
