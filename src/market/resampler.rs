use chrono::DateTime;
use std::collections::BTreeMap;

use crate::models::Bar;

const FIFTEEN_MINUTES_SECS: i64 = 900;

/// Aggregates fine-grained bars (usually 1-minute) into wider bars
///
/// Buckets are aligned to multiples of the interval since the Unix epoch, so
/// 15-minute bars start at XX:00, XX:15, XX:30 and XX:45. Per bucket:
/// open = first, high = max, low = min, close = last, volume = sum.
/// Buckets with no source bars are not emitted.
#[derive(Debug, Clone, Copy)]
pub struct BarResampler {
    interval_secs: i64,
}

impl BarResampler {
    /// 15-minute resampler
    pub fn new() -> Self {
        Self {
            interval_secs: FIFTEEN_MINUTES_SECS,
        }
    }

    pub fn with_minutes(minutes: u32) -> Self {
        Self {
            interval_secs: i64::from(minutes.max(1)) * 60,
        }
    }

    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    /// Resample `bars` into interval buckets, oldest first
    ///
    /// Input order does not matter; bars are bucketed by timestamp and kept
    /// in timestamp order inside each bucket.
    pub fn resample(&self, bars: &[Bar]) -> Vec<Bar> {
        let mut buckets: BTreeMap<i64, Vec<&Bar>> = BTreeMap::new();

        for bar in bars {
            let secs = bar.timestamp.timestamp();
            let bucket = secs.div_euclid(self.interval_secs) * self.interval_secs;
            buckets.entry(bucket).or_default().push(bar);
        }

        buckets
            .into_iter()
            .filter_map(|(bucket, mut members)| {
                members.sort_by_key(|b| b.timestamp);
                self.aggregate(bucket, &members)
            })
            .collect()
    }

    fn aggregate(&self, bucket: i64, members: &[&Bar]) -> Option<Bar> {
        let first = members.first()?;
        let last = members.last()?;

        Some(Bar {
            timestamp: DateTime::from_timestamp(bucket, 0)?,
            open: first.open,
            high: members.iter().fold(f64::NEG_INFINITY, |a, b| a.max(b.high)),
            low: members.iter().fold(f64::INFINITY, |a, b| a.min(b.low)),
            close: last.close,
            volume: members.iter().map(|b| b.volume).sum(),
        })
    }
}

impl Default for BarResampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn minute_bar(minute: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(1_700_000_100 + minute * 60, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn test_resample_empty() {
        assert!(BarResampler::new().resample(&[]).is_empty());
    }

    #[test]
    fn test_resample_aggregates_bucket() {
        // 1_700_000_100 is 22:15:00 UTC, a 15-minute boundary
        let bars = vec![
            minute_bar(0, 10.0, 11.0, 9.5, 10.5, 1.0),
            minute_bar(1, 10.5, 12.0, 10.0, 11.0, 2.0),
            minute_bar(2, 11.0, 11.5, 8.0, 9.0, 3.0),
        ];

        let resampled = BarResampler::new().resample(&bars);
        assert_eq!(resampled.len(), 1);

        let bar = &resampled[0];
        assert_eq!(bar.timestamp, bars[0].timestamp);
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.high, 12.0);
        assert_eq!(bar.low, 8.0);
        assert_eq!(bar.close, 9.0);
        assert_eq!(bar.volume, 6.0);
    }

    #[test]
    fn test_resample_splits_on_boundaries() {
        let bars: Vec<Bar> = (0..30)
            .map(|m| minute_bar(m, 100.0 + m as f64, 101.0 + m as f64, 99.0 + m as f64, 100.5 + m as f64, 1.0))
            .collect();

        let resampled = BarResampler::new().resample(&bars);
        assert_eq!(resampled.len(), 2);
        assert_eq!(resampled[0].open, 100.0);
        assert_eq!(resampled[0].close, 114.5);
        assert_eq!(resampled[1].open, 115.0);
        assert_eq!(resampled[1].close, 129.5);
        assert_eq!(resampled[1].volume, 15.0);
        assert_eq!(
            (resampled[1].timestamp - resampled[0].timestamp).num_seconds(),
            900
        );
    }

    #[test]
    fn test_resample_drops_empty_buckets() {
        let bars = vec![
            minute_bar(0, 1.0, 1.0, 1.0, 1.0, 1.0),
            // 45 minutes later, two empty buckets in between
            minute_bar(45, 2.0, 2.0, 2.0, 2.0, 1.0),
        ];

        let resampled = BarResampler::new().resample(&bars);
        assert_eq!(resampled.len(), 2);
        assert_eq!(
            (resampled[1].timestamp - resampled[0].timestamp).num_seconds(),
            2700
        );
    }

    #[test]
    fn test_resample_unsorted_input() {
        let bars = vec![
            minute_bar(2, 3.0, 3.0, 3.0, 3.0, 1.0),
            minute_bar(0, 1.0, 1.0, 1.0, 1.0, 1.0),
            minute_bar(1, 2.0, 2.0, 2.0, 2.0, 1.0),
        ];

        let resampled = BarResampler::new().resample(&bars);
        assert_eq!(resampled[0].open, 1.0);
        assert_eq!(resampled[0].close, 3.0);
    }

    #[test]
    fn test_custom_interval() {
        let resampler = BarResampler::with_minutes(5);
        assert_eq!(resampler.interval_secs(), 300);

        let bars: Vec<Bar> = (0..15)
            .map(|m| minute_bar(m, 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect();
        assert_eq!(resampler.resample(&bars).len(), 3);
    }
}
