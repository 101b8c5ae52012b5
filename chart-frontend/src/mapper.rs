//! Price/index to pixel mapping.

use market_core::Candle;
use serde::{Deserialize, Serialize};

/// Vertical position of `price` on a surface `height` pixels tall, with `max`
/// at the top edge and `min` at the bottom. A degenerate range maps every
/// price to the vertical midpoint.
pub fn price_to_y(price: f64, min: f64, max: f64, height: f64) -> f64 {
    let span = max - min;
    if !span.is_finite() || span.abs() <= f64::EPSILON {
        return height / 2.0;
    }
    height - ((price - min) / span) * height
}

/// Inverse of [`price_to_y`]. A degenerate range maps every row to `min`.
pub fn y_to_price(y: f64, min: f64, max: f64, height: f64) -> f64 {
    let span = max - min;
    if !span.is_finite() || span.abs() <= f64::EPSILON || height <= 0.0 {
        return min;
    }
    min + ((height - y) / height) * span
}

/// Width of one candle slot.
pub fn slot_width(len: usize, width: f64) -> f64 {
    if len == 0 {
        0.0
    } else {
        width / len as f64
    }
}

/// Left edge of slot `index`.
pub fn index_to_x(index: usize, len: usize, width: f64) -> f64 {
    index as f64 * slot_width(len, width)
}

pub fn candle_center_x(index: usize, len: usize, width: f64) -> f64 {
    index_to_x(index, len, width) + slot_width(len, width) / 2.0
}

/// Visible price window, padded below the lowest low and above the highest high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub const LOW_PAD: f64 = 0.98;
    pub const HIGH_PAD: f64 = 1.02;

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `None` for an empty series.
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        if candles.is_empty() {
            return None;
        }
        let (lo, hi) = candles
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.low), hi.max(c.high))
            });
        Some(Self::new(lo * Self::LOW_PAD, hi * Self::HIGH_PAD))
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        !self.span().is_finite() || self.span().abs() <= f64::EPSILON
    }

    pub fn y(&self, price: f64, height: f64) -> f64 {
        price_to_y(price, self.min, self.max, height)
    }

    pub fn price_at(&self, y: f64, height: f64) -> f64 {
        y_to_price(y, self.min, self.max, height)
    }

    /// `divisions + 1` evenly spaced prices from `min` up to `max`.
    pub fn price_levels(&self, divisions: usize) -> Vec<f64> {
        if divisions == 0 {
            return vec![self.min];
        }
        let step = self.span() / divisions as f64;
        (0..=divisions)
            .map(|i| if i == divisions { self.max } else { self.min + step * i as f64 })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::TimeFrame;

    fn candle(low: f64, high: f64) -> Candle {
        Candle {
            ts: 0,
            timeframe: TimeFrame::Hours(1),
            open: low,
            high,
            low,
            close: high,
            volume: 1.0,
        }
    }

    #[test]
    fn range_bounds_map_to_edges() {
        assert_eq!(price_to_y(90.0, 90.0, 110.0, 400.0), 400.0);
        assert_eq!(price_to_y(110.0, 90.0, 110.0, 400.0), 0.0);
        assert_eq!(price_to_y(100.0, 90.0, 110.0, 400.0), 200.0);
    }

    #[test]
    fn y_round_trips_to_price() {
        let range = PriceRange::new(93.1, 108.7);
        for price in [93.1, 95.0, 100.25, 108.7] {
            let y = range.y(price, 400.0);
            assert!((range.price_at(y, 400.0) - price).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_range_maps_to_midpoint() {
        assert_eq!(price_to_y(5.0, 100.0, 100.0, 400.0), 200.0);
        assert_eq!(price_to_y(100.0, 100.0, 100.0, 60.0), 30.0);
        assert!(PriceRange::new(100.0, 100.0).is_degenerate());
    }

    #[test]
    fn range_is_padded() {
        let range = PriceRange::from_candles(&[candle(100.0, 110.0), candle(95.0, 105.0)]).unwrap();
        assert!((range.min - 95.0 * 0.98).abs() < 1e-9);
        assert!((range.max - 110.0 * 1.02).abs() < 1e-9);
        assert!(PriceRange::from_candles(&[]).is_none());
    }

    #[test]
    fn fifty_slots_on_800px_are_16px_apart() {
        assert_eq!(slot_width(50, 800.0), 16.0);
        assert_eq!(candle_center_x(0, 50, 800.0), 8.0);
        for i in 1..50 {
            assert_eq!(candle_center_x(i, 50, 800.0) - candle_center_x(i - 1, 50, 800.0), 16.0);
        }
        assert_eq!(index_to_x(3, 0, 800.0), 0.0);
    }

    #[test]
    fn price_levels_span_the_range() {
        let levels = PriceRange::new(100.0, 150.0).price_levels(5);
        assert_eq!(levels, vec![100.0, 110.0, 120.0, 130.0, 140.0, 150.0]);
    }
}
