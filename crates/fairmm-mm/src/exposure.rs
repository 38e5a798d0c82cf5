//! Exposure tracking for a single market.
//!
//! Turns the venue position snapshot into a USD notional valued at the
//! current fair price (falling back to the entry price), and classifies it
//! with the shared [`RiskLimits`].

use fairmm_core::{Position, PositionSide, Price, RiskLimits, RiskMode, Size};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// Derived exposure view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposureState {
    pub side: PositionSide,
    /// Absolute size in base units.
    pub size: Size,
    pub entry_price: Price,
    /// Absolute notional in USD.
    pub notional_usd: Decimal,
    pub unrealized_pnl_usd: Decimal,
    pub mode: RiskMode,
}

impl ExposureState {
    fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            size: Size::ZERO,
            entry_price: Price::ZERO,
            notional_usd: Decimal::ZERO,
            unrealized_pnl_usd: Decimal::ZERO,
            mode: RiskMode::Normal,
        }
    }

    /// Notional with sign: positive long, negative short.
    pub fn signed_notional(&self) -> Decimal {
        self.notional_usd * self.side.sign()
    }
}

impl Default for ExposureState {
    fn default() -> Self {
        Self::flat()
    }
}

/// Tracks the latest position and recomputes exposure on demand.
#[derive(Debug, Clone)]
pub struct ExposureTracker {
    limits: RiskLimits,
    position: Option<Position>,
    last_fair: Option<Price>,
    state: ExposureState,
}

impl ExposureTracker {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            position: None,
            last_fair: None,
            state: ExposureState::flat(),
        }
    }

    /// Replace the position snapshot and recompute.
    ///
    /// `None` or a zero-size position means flat. When `fair_price` is
    /// `None` the last known fair price is reused, then the entry price.
    pub fn update_position(&mut self, position: Option<Position>, fair_price: Option<Price>) {
        if let Some(fair) = fair_price.filter(Price::is_positive) {
            self.last_fair = Some(fair);
        }
        self.position = position.filter(|p| p.size.is_positive() && p.side != PositionSide::Flat);
        self.recompute();
    }

    /// Revalue the current position at a new fair price.
    pub fn reprice(&mut self, fair_price: Price) {
        if !fair_price.is_positive() {
            return;
        }
        self.last_fair = Some(fair_price);
        self.recompute();
    }

    fn recompute(&mut self) {
        let prev_mode = self.state.mode;
        self.state = match &self.position {
            None => ExposureState::flat(),
            Some(pos) => {
                let mark = self
                    .last_fair
                    .filter(Price::is_positive)
                    .unwrap_or(pos.entry_price);
                let notional_usd = pos.size.notional(mark).abs();
                let signed = notional_usd * pos.side.sign();
                let unrealized_pnl_usd = pos.unrealized_pnl.unwrap_or_else(|| {
                    (mark.inner() - pos.entry_price.inner()) * pos.signed_size()
                });
                ExposureState {
                    side: pos.side,
                    size: pos.size,
                    entry_price: pos.entry_price,
                    notional_usd,
                    unrealized_pnl_usd,
                    mode: self.limits.classify(signed),
                }
            }
        };
        if self.state.mode != prev_mode {
            debug!(
                from = %prev_mode,
                to = %self.state.mode,
                notional_usd = %self.state.notional_usd,
                "Exposure mode changed"
            );
        }
    }

    pub fn state(&self) -> &ExposureState {
        &self.state
    }

    pub fn signed_notional(&self) -> Decimal {
        self.state.signed_notional()
    }

    pub fn is_at_max(&self) -> bool {
        self.limits.is_at_max(self.signed_notional())
    }

    pub fn is_close_mode(&self) -> bool {
        self.state.mode.is_close()
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tracker() -> ExposureTracker {
        ExposureTracker::new(RiskLimits::new(dec!(500), dec!(2000)).unwrap())
    }

    fn position(side: PositionSide, size: Decimal, entry: Decimal) -> Position {
        Position {
            symbol: "BTC".to_string(),
            side,
            size: Size::new(size),
            entry_price: Price::new(entry),
            unrealized_pnl: None,
        }
    }

    #[test]
    fn test_flat_by_default() {
        let t = tracker();
        assert_eq!(t.state().side, PositionSide::Flat);
        assert_eq!(t.signed_notional(), dec!(0));
        assert!(!t.is_close_mode());
        assert!(!t.is_at_max());
    }

    #[test]
    fn test_long_valued_at_fair_price() {
        let mut t = tracker();
        t.update_position(
            Some(position(PositionSide::Long, dec!(0.012), dec!(49000))),
            Some(Price::new(dec!(50000))),
        );
        let s = t.state();
        assert_eq!(s.notional_usd, dec!(600));
        assert_eq!(s.unrealized_pnl_usd, dec!(12));
        assert_eq!(s.mode, RiskMode::Close);
        assert_eq!(t.signed_notional(), dec!(600));
        assert!(t.is_close_mode());
    }

    #[test]
    fn test_short_falls_back_to_entry_price() {
        let mut t = tracker();
        t.update_position(
            Some(position(PositionSide::Short, dec!(0.05), dec!(50000))),
            None,
        );
        assert_eq!(t.signed_notional(), dec!(-2500));
        assert!(t.is_at_max());
        assert_eq!(t.state().mode, RiskMode::Blocked);
    }

    #[test]
    fn test_reprice_changes_mode() {
        let mut t = tracker();
        t.update_position(
            Some(position(PositionSide::Long, dec!(0.009), dec!(50000))),
            Some(Price::new(dec!(50000))),
        );
        assert_eq!(t.state().mode, RiskMode::Normal);

        // 0.009 * 60000 = 540
        t.reprice(Price::new(dec!(60000)));
        assert_eq!(t.state().mode, RiskMode::Close);
    }

    #[test]
    fn test_zero_size_position_is_flat() {
        let mut t = tracker();
        t.update_position(
            Some(position(PositionSide::Long, dec!(0), dec!(50000))),
            Some(Price::new(dec!(50000))),
        );
        assert_eq!(t.state(), &ExposureState::default());
    }

    #[test]
    fn test_venue_pnl_preferred() {
        let mut t = tracker();
        let mut pos = position(PositionSide::Long, dec!(0.001), dec!(50000));
        pos.unrealized_pnl = Some(dec!(-3.5));
        t.update_position(Some(pos), Some(Price::new(dec!(51000))));
        assert_eq!(t.state().unrealized_pnl_usd, dec!(-3.5));
    }
}
