//! Polars frame stage: drop incomplete rows, sort by date, dedupe.

use crate::domain::Bar;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Column-major coerced values, one entry per raw row.
#[derive(Debug, Clone, Default)]
pub struct CoercedColumns {
    /// Days since 0001-01-01 (CE), `None` when the row key was unusable.
    pub date: Vec<Option<i32>>,
    pub open: Vec<Option<f64>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub volume: Vec<Option<f64>>,
}

impl CoercedColumns {
    pub fn into_frame(self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Series::new("date".into(), self.date).into(),
            Series::new("open".into(), self.open).into(),
            Series::new("high".into(), self.high).into(),
            Series::new("low".into(), self.low).into(),
            Series::new("close".into(), self.close).into(),
            Series::new("volume".into(), self.volume).into(),
        ])
    }
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

/// Canonicalizer for coerced bar frames
pub struct Canonicalizer;

impl Canonicalizer {
    /// Keep rows with a date and all four prices (and volume, if required).
    pub fn drop_incomplete(df: LazyFrame, require_volume: bool) -> LazyFrame {
        let mut keep = col("date")
            .is_not_null()
            .and(col("open").is_not_null())
            .and(col("high").is_not_null())
            .and(col("low").is_not_null())
            .and(col("close").is_not_null());
        if require_volume {
            keep = keep.and(col("volume").is_not_null());
        }
        df.filter(keep)
    }

    /// Sort ascending by date; the first row wins for a repeated date.
    pub fn canonicalize(df: LazyFrame) -> LazyFrame {
        df.sort(
            ["date"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .unique_stable(Some(vec!["date".into()]), UniqueKeepStrategy::First)
    }

    pub fn clean(df: DataFrame, require_volume: bool) -> PolarsResult<DataFrame> {
        Self::canonicalize(Self::drop_incomplete(df.lazy(), require_volume)).collect()
    }
}

/// Read bars back out of a cleaned frame.
pub fn to_bars(df: &DataFrame) -> PolarsResult<Vec<Bar>> {
    let date = df.column("date")?.i32()?;
    let open = df.column("open")?.f64()?;
    let high = df.column("high")?.f64()?;
    let low = df.column("low")?.f64()?;
    let close = df.column("close")?.f64()?;
    let volume = df.column("volume")?.f64()?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(days), Some(open), Some(high), Some(low), Some(close)) =
            (date.get(i), open.get(i), high.get(i), low.get(i), close.get(i))
        else {
            continue;
        };
        let Some(date) = NaiveDate::from_num_days_from_ce_opt(days) else {
            continue;
        };
        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume: volume.get(i),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> Option<i32> {
        Some(date_to_days(NaiveDate::from_ymd_opt(2024, 1, d).unwrap()))
    }

    fn columns(rows: &[(Option<i32>, Option<f64>, Option<f64>)]) -> CoercedColumns {
        let mut c = CoercedColumns::default();
        for &(date, close, volume) in rows {
            c.date.push(date);
            c.open.push(Some(100.0));
            c.high.push(Some(105.0));
            c.low.push(Some(99.0));
            c.close.push(close);
            c.volume.push(volume);
        }
        c
    }

    #[test]
    fn canonicalize_sorts_by_date() {
        let df = columns(&[
            (day(4), Some(3.0), Some(1.0)),
            (day(2), Some(1.0), Some(1.0)),
            (day(3), Some(2.0), Some(1.0)),
        ])
        .into_frame()
        .unwrap();

        let bars = to_bars(&Canonicalizer::clean(df, false).unwrap()).unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn duplicate_dates_keep_first_occurrence() {
        let df = columns(&[
            (day(2), Some(1.0), None),
            (day(2), Some(9.0), None),
            (day(3), Some(2.0), None),
        ])
        .into_frame()
        .unwrap();

        let cleaned = Canonicalizer::clean(df, false).unwrap();
        assert_eq!(cleaned.height(), 2);
        let bars = to_bars(&cleaned).unwrap();
        assert_eq!(bars[0].close, 1.0);
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let df = columns(&[
            (None, Some(1.0), Some(1.0)),
            (day(3), None, Some(1.0)),
            (day(4), Some(2.0), None),
        ])
        .into_frame()
        .unwrap();

        let lenient = to_bars(&Canonicalizer::clean(df.clone(), false).unwrap()).unwrap();
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].volume, None);

        let strict = Canonicalizer::clean(df, true).unwrap();
        assert_eq!(strict.height(), 0);
    }

    #[test]
    fn dates_round_trip_through_day_numbers() {
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(
            NaiveDate::from_num_days_from_ce_opt(date_to_days(date)),
            Some(date)
        );
    }
}
