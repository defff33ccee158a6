//! Cleaned daily price bars and the series the renderer consumes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Cleaned OHLCV bar for a single symbol on a single day.
///
/// Produced only by the normalizer: OHLC are always finite. Volume is optional
/// because providers and exports frequently leave it blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// True when the bar closed at or above its open (drawn with the "up" colour).
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// Basic OHLC consistency: high is the top of the range, low the bottom.
    ///
    /// Inconsistent bars are still rendered; the pipeline only reports them.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Lowest and highest price touched by the bar, tolerant of inverted data.
    pub fn price_range(&self) -> (f64, f64) {
        let lo = self.low.min(self.high).min(self.open).min(self.close);
        let hi = self.high.max(self.low).max(self.open).max(self.close);
        (lo, hi)
    }
}

/// Ordered, validated bars for one symbol. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The most recent `n` bars (all of them when the series is shorter).
    pub fn latest(&self, n: usize) -> &[Bar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

/// Min/max over every bar's price range, or `None` when there are no bars.
pub fn price_bounds(bars: &[Bar]) -> Option<(f64, f64)> {
    bars.iter()
        .map(Bar::price_range)
        .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
}

/// Largest volume, ignoring bars without one.
pub fn max_volume(bars: &[Bar]) -> Option<f64> {
    bars.iter().filter_map(|b| b.volume).reduce(f64::max)
}
