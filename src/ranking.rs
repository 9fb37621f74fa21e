//! Per-strike ranking over a strike window.
//!
//! [`RankingEngine::build_view`] turns a window of an [`OptionChain`] into a
//! [`RankedView`]: one [`RankedStrikeRow`] per strike present in the chain,
//! with both legs' metrics, per-row PCRs and window totals. The rank passes
//! then order the rows by open interest, volume and change in OI (per leg,
//! descending, ties kept in row order) and fold the three ranks into a
//! weighted composite.
//!
//! ```no_run
//! # use nse_chain::chain::OptionChain;
//! use nse_chain::ranking::RankingEngine;
//!
//! # fn show(chain: &OptionChain) {
//! let engine = RankingEngine::default();
//! let window = chain.atm_strikes(16);
//! let mut view = engine.build_view(chain, &window);
//! engine.rank(&mut view);
//! for row in &view.rows {
//!     println!("{} {:.1} {:.1}", row.strike, row.call_ranks.weighted, row.put_ranks.weighted);
//! }
//! # }
//! ```

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::chain::{OptionChain, OptionLeg, compute_pcr};
use crate::constants::{TOP_RANK_DIVISOR, weights};
use crate::types::enums::Leg;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Weights of the composite rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub oi: f64,
    pub volume: f64,
    pub change_oi: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            oi: weights::OI,
            volume: weights::VOLUME,
            change_oi: weights::CHANGE_OI,
        }
    }
}

impl RankWeights {
    /// `oi*oi_rank + volume*volume_rank + change_oi*change_oi_rank`.
    pub fn composite(&self, ranks: &LegRanks) -> f64 {
        self.oi * ranks.oi as f64
            + self.volume * ranks.volume as f64
            + self.change_oi * ranks.change_oi as f64
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Oi,
    Volume,
    ChangeOi,
}

/// 1-based ranks of one leg. Zero means the pass has not run yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LegRanks {
    pub oi: usize,
    pub volume: usize,
    pub change_oi: usize,
    pub weighted: f64,
}

impl LegRanks {
    fn slot(&mut self, metric: Metric) -> &mut usize {
        match metric {
            Metric::Oi => &mut self.oi,
            Metric::Volume => &mut self.volume,
            Metric::ChangeOi => &mut self.change_oi,
        }
    }
}

/// One strike of a ranked window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStrikeRow {
    pub strike: i64,
    /// `None` when the exchange sent no call at this strike.
    pub call: Option<OptionLeg>,
    /// `None` when the exchange sent no put at this strike.
    pub put: Option<OptionLeg>,
    pub pcr_oi: f64,
    pub pcr_change_oi: f64,
    pub pcr_volume: f64,
    pub call_ranks: LegRanks,
    pub put_ranks: LegRanks,
}

impl RankedStrikeRow {
    fn new(strike: i64, call: Option<OptionLeg>, put: Option<OptionLeg>) -> Self {
        let c = call.unwrap_or_default();
        let p = put.unwrap_or_default();
        Self {
            strike,
            call,
            put,
            pcr_oi: compute_pcr(p.open_interest, c.open_interest),
            pcr_change_oi: compute_pcr(p.change_in_open_interest, c.change_in_open_interest),
            pcr_volume: compute_pcr(p.traded_volume, c.traded_volume),
            call_ranks: LegRanks::default(),
            put_ranks: LegRanks::default(),
        }
    }

    /// Ranks of the given leg.
    pub fn ranks(&self, leg: Leg) -> &LegRanks {
        match leg {
            Leg::Call => &self.call_ranks,
            Leg::Put => &self.put_ranks,
        }
    }

    fn ranks_mut(&mut self, leg: Leg) -> &mut LegRanks {
        match leg {
            Leg::Call => &mut self.call_ranks,
            Leg::Put => &mut self.put_ranks,
        }
    }

    fn metric(&self, leg: Leg, metric: Metric) -> i64 {
        let data = match leg {
            Leg::Call => self.call,
            Leg::Put => self.put,
        };
        let Some(data) = data else { return 0 };
        match metric {
            Metric::Oi => data.open_interest,
            Metric::Volume => data.traded_volume,
            Metric::ChangeOi => data.change_in_open_interest,
        }
    }
}

/// Summed metrics of one leg over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LegTotals {
    pub oi: i64,
    pub change_oi: i64,
    pub volume: i64,
}

impl LegTotals {
    fn add(&mut self, leg: Option<&OptionLeg>) {
        if let Some(leg) = leg {
            self.oi = self.oi.saturating_add(leg.open_interest);
            self.change_oi = self.change_oi.saturating_add(leg.change_in_open_interest);
            self.volume = self.volume.saturating_add(leg.traded_volume);
        }
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Ranked, presentation-ready window of an option chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedView {
    pub underlying_value: f64,
    pub atm_strike: i64,
    pub rows: Vec<RankedStrikeRow>,
    pub call_totals: LegTotals,
    pub put_totals: LegTotals,
    pub pcr_oi: f64,
    pub pcr_change_oi: f64,
    pub pcr_volume: f64,
}

impl RankedView {
    /// Rank rows by open interest, per leg.
    pub fn rank_oi(&mut self) {
        self.rank_by(Metric::Oi);
    }

    /// Rank rows by traded volume, per leg.
    pub fn rank_volume(&mut self) {
        self.rank_by(Metric::Volume);
    }

    /// Rank rows by change in open interest, per leg.
    pub fn rank_oi_change(&mut self) {
        self.rank_by(Metric::ChangeOi);
    }

    /// Fold the three ranks of each leg into the composite.
    ///
    /// Reads whatever ranks are stored, so run the three rank passes first.
    pub fn weighted_rank(&mut self, weights: &RankWeights) {
        for row in &mut self.rows {
            row.call_ranks.weighted = weights.composite(&row.call_ranks);
            row.put_ranks.weighted = weights.composite(&row.put_ranks);
        }
    }

    /// Order rows by ascending strike.
    pub fn sort_by_strike(&mut self) {
        self.rows.sort_by_key(|row| row.strike);
    }

    /// Whether a composite rank falls in the highlighted top of the window.
    pub fn is_top_ranked(&self, weighted: f64) -> bool {
        weighted <= self.rows.len() as f64 / TOP_RANK_DIVISOR
    }

    fn rank_by(&mut self, metric: Metric) {
        for leg in Leg::BOTH {
            let mut order: Vec<usize> = (0..self.rows.len()).collect();
            // Stable: equal values keep their row order.
            order.sort_by_key(|&i| Reverse(self.rows[i].metric(leg, metric)));
            for (position, index) in order.into_iter().enumerate() {
                *self.rows[index].ranks_mut(leg).slot(metric) = position + 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Builds and ranks strike windows.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    weights: RankWeights,
}

impl RankingEngine {
    pub fn new(weights: RankWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RankWeights {
        &self.weights
    }

    /// One row per strike of `strikes` that exists in `chain`, in window
    /// order. Missing strikes are skipped, so the view may be shorter than
    /// the window.
    pub fn build_view(&self, chain: &OptionChain, strikes: &[i64]) -> RankedView {
        let mut call_totals = LegTotals::default();
        let mut put_totals = LegTotals::default();
        let mut rows = Vec::with_capacity(strikes.len());

        for &strike in strikes {
            let Some(record) = chain.get(strike) else {
                tracing::trace!(strike, "strike not in chain");
                continue;
            };
            call_totals.add(record.call.as_ref());
            put_totals.add(record.put.as_ref());
            rows.push(RankedStrikeRow::new(strike, record.call, record.put));
        }

        RankedView {
            underlying_value: chain.underlying_value(),
            atm_strike: chain.atm_strike(),
            rows,
            call_totals,
            put_totals,
            pcr_oi: compute_pcr(put_totals.oi, call_totals.oi),
            pcr_change_oi: compute_pcr(put_totals.change_oi, call_totals.change_oi),
            pcr_volume: compute_pcr(put_totals.volume, call_totals.volume),
        }
    }

    /// Run every rank pass, the weighted pass, then sort by strike.
    pub fn rank(&self, view: &mut RankedView) {
        view.rank_oi();
        view.rank_oi_change();
        view.rank_volume();
        view.weighted_rank(&self.weights);
        view.sort_by_strike();
    }

    /// [`build_view`](Self::build_view) followed by [`rank`](Self::rank).
    pub fn ranked_view(&self, chain: &OptionChain, strikes: &[i64]) -> RankedView {
        let mut view = self.build_view(chain, strikes);
        self.rank(&mut view);
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::StrikeRecord;

    fn leg(oi: i64, change: i64, volume: i64) -> Option<OptionLeg> {
        Some(OptionLeg {
            open_interest: oi,
            change_in_open_interest: change,
            last_price: 1.0,
            traded_volume: volume,
        })
    }

    fn sample_chain() -> OptionChain {
        let mut chain = OptionChain::new("BANKNIFTY", "01-Jun-2023", "", 43582.0);
        chain.set_strike_step(100);
        chain.insert(StrikeRecord { strike: 43400, call: leg(10, 5, 300), put: leg(90, 1, 10) });
        chain.insert(StrikeRecord { strike: 43500, call: leg(30, -2, 100), put: leg(60, 8, 40) });
        chain.insert(StrikeRecord { strike: 43600, call: leg(30, 9, 200), put: None });
        chain.insert(StrikeRecord { strike: 43700, call: leg(50, 0, 50), put: leg(20, 3, 90) });
        chain
    }

    #[test]
    fn view_skips_missing_strikes() {
        let chain = sample_chain();
        let view = RankingEngine::default().build_view(&chain, &[43300, 43400, 43500, 43600]);
        let strikes: Vec<i64> = view.rows.iter().map(|r| r.strike).collect();
        assert_eq!(strikes, vec![43400, 43500, 43600]);
        assert_eq!(view.atm_strike, 43600);
        assert_eq!(view.call_totals, LegTotals { oi: 70, change_oi: 12, volume: 600 });
        assert_eq!(view.put_totals, LegTotals { oi: 150, change_oi: 9, volume: 50 });
        assert_eq!(view.pcr_oi, 150.0 / 70.0);
    }

    #[test]
    fn row_pcr_uses_sentinel() {
        let chain = sample_chain();
        let view = RankingEngine::default().build_view(&chain, &[43400, 43500, 43600]);
        assert_eq!(view.rows[0].pcr_oi, 9.0);
        assert_eq!(view.rows[1].pcr_change_oi, 0.0);
        assert_eq!(view.rows[2].pcr_oi, 0.0);
        assert!(view.rows[2].put.is_none());
    }

    #[test]
    fn oi_ranks_are_descending_and_stable() {
        let chain = sample_chain();
        let strikes: Vec<i64> = chain.strikes().collect();
        let mut view = RankingEngine::default().build_view(&chain, &strikes);
        view.rank_oi();
        let call: Vec<usize> = view.rows.iter().map(|r| r.call_ranks.oi).collect();
        // 43500 and 43600 tie at 30 and keep row order.
        assert_eq!(call, vec![4, 2, 3, 1]);
        let put: Vec<usize> = view.rows.iter().map(|r| r.put_ranks.oi).collect();
        assert_eq!(put, vec![1, 2, 4, 3]);
    }

    #[test]
    fn rank_oi_is_idempotent() {
        let chain = sample_chain();
        let strikes: Vec<i64> = chain.strikes().collect();
        let mut view = RankingEngine::default().build_view(&chain, &strikes);
        view.rank_oi();
        let first = view.clone();
        view.rank_oi();
        assert_eq!(view, first);
    }

    #[test]
    fn window_totals_saturate() {
        let mut chain = OptionChain::new("NIFTY", "01-Jun-2023", "", 18100.0);
        chain.set_strike_step(50);
        for strike in [18050, 18100] {
            chain.insert(StrikeRecord {
                strike,
                call: leg(i64::MAX, i64::MIN, i64::MAX),
                put: leg(1, 1, 1),
            });
        }
        let view = RankingEngine::default().build_view(&chain, &[18050, 18100]);
        assert_eq!(
            view.call_totals,
            LegTotals { oi: i64::MAX, change_oi: i64::MIN, volume: i64::MAX }
        );
        assert_eq!(view.put_totals, LegTotals { oi: 2, change_oi: 2, volume: 2 });
    }

    #[test]
    fn composite_formula() {
        let ranks = LegRanks { oi: 2, volume: 3, change_oi: 1, weighted: 0.0 };
        let weighted = RankWeights::default().composite(&ranks);
        assert!((weighted - 2.2).abs() < 1e-12);
    }

    #[test]
    fn full_ranking_sorts_by_strike() {
        let chain = sample_chain();
        let window = [43700, 43400, 43600, 43500];
        let view = RankingEngine::default().ranked_view(&chain, &window);
        let strikes: Vec<i64> = view.rows.iter().map(|r| r.strike).collect();
        assert_eq!(strikes, vec![43400, 43500, 43600, 43700]);

        let r43400 = &view.rows[0];
        // Call: oi 10 -> 4th, volume 300 -> 1st, change 5 -> 2nd.
        let ranks = &r43400.call_ranks;
        assert_eq!((ranks.oi, ranks.volume, ranks.change_oi), (4, 1, 2));
        assert!((ranks.weighted - (0.4 * 4.0 + 0.4 * 1.0 + 0.2 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn custom_weights() {
        let chain = sample_chain();
        let engine = RankingEngine::new(RankWeights { oi: 1.0, volume: 0.0, change_oi: 0.0 });
        let view = engine.ranked_view(&chain, &chain.strikes().collect::<Vec<_>>());
        for row in &view.rows {
            assert_eq!(row.call_ranks.weighted, row.call_ranks.oi as f64);
        }
    }

    #[test]
    fn weights_deserialize_with_defaults() {
        let weights: RankWeights = serde_json::from_str(r#"{"oi":0.5}"#).unwrap();
        assert_eq!(weights.oi, 0.5);
        assert_eq!(weights.volume, 0.4);
        assert_eq!(weights.change_oi, 0.2);
    }

    #[test]
    fn top_rank_threshold() {
        let chain = sample_chain();
        let strikes: Vec<i64> = chain.strikes().collect();
        let view = RankingEngine::default().ranked_view(&chain, &strikes);
        // 4 rows / 2.8 ~= 1.43
        assert!(view.is_top_ranked(1.4));
        assert!(!view.is_top_ranked(1.5));
    }
}
