use rtq_abstract::{Sample, SampleKey, Series};
use tracing::warn;

/// Upper bound on the length of a bucketed series, about 48 days of
/// one-second buckets.
pub const MAX_BUCKETS: usize = 1 << 22;

/// Sum samples into dense fixed-width buckets.
///
/// Output keys are bucket indexes from `0` through the bucket holding the
/// largest key; buckets without samples hold `0`. Samples with a negative or
/// non-finite key have no bucket and are dropped. A series that would need
/// more than [`MAX_BUCKETS`] buckets, typically nanosecond timestamps read
/// as milliseconds, is skipped and yields an empty series.
pub fn bucket_and_sum<K: SampleKey>(series: &[Sample<K>], width_ms: u64) -> Series<i64> {
    let width = width_ms.max(1) as f64;
    let bucket_of = |key: K| {
        let ms = key.as_millis();
        (ms.is_finite() && ms >= 0.0).then(|| (ms / width).floor() as usize)
    };

    let Some(last) = series.iter().filter_map(|s| bucket_of(s.key)).max() else {
        if !series.is_empty() {
            warn!("no sample of {} has a bucketable key", series.len());
        }
        return Series::new();
    };
    if last >= MAX_BUCKETS {
        warn!(
            "skipping series of {} samples: largest key needs bucket {}, limit is {}",
            series.len(),
            last,
            MAX_BUCKETS
        );
        return Series::new();
    }

    let mut buckets: Series<i64> = (0..=last).map(|i| Sample::new(i as i64, 0.0)).collect();
    let mut dropped = 0usize;
    for sample in series {
        match bucket_of(sample.key) {
            Some(i) => buckets[i].value += sample.value,
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("dropped {} samples with keys outside the time axis", dropped);
    }
    buckets
}

/// Expand change points of a piecewise-constant signal into a stair step.
///
/// Each point is followed by a point at the next point's key carrying the
/// current value. A single point is held from the origin.
pub fn step_expand<K: SampleKey>(series: &[Sample<K>]) -> Series<K> {
    match series {
        [] => Series::new(),
        [only] => vec![Sample::new(K::ZERO, only.value), *only],
        _ => series
            .windows(2)
            .flat_map(|pair| [pair[0], Sample::new(pair[1].key, pair[0].value)])
            .collect(),
    }
}

/// Arithmetic mean rounded to two decimals, `0` for an empty series.
pub fn rounded_mean<K>(series: &[Sample<K>]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mean = series.iter().map(|s| s.value).sum::<f64>() / series.len() as f64;
    (mean * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_time_axis_is_skipped() {
        let input = vec![Sample::new(0_i64, 1.0), Sample::new(1_600_000_000_000_000_000, 2.0)];
        assert!(bucket_and_sum(&input, 1000).is_empty());

        let first_over = MAX_BUCKETS as i64 * 1000;
        assert!(bucket_and_sum(&[Sample::new(first_over, 3.0)], 1000).is_empty());
    }

    #[test]
    fn rows_in_first_second_share_a_bucket() {
        let input = vec![Sample::new(10_i64, 2048.0), Sample::new(20, 4096.0)];
        assert_eq!(bucket_and_sum(&input, 1000), vec![Sample::new(0, 6144.0)]);
    }

    #[test]
    fn buckets_are_dense() {
        let input = vec![
            Sample::new(3100_i64, 5.0),
            Sample::new(3999, 7.0),
            Sample::new(500, 1.0),
        ];
        let out = bucket_and_sum(&input, 1000);
        assert_eq!(
            out,
            vec![
                Sample::new(0, 1.0),
                Sample::new(1, 0.0),
                Sample::new(2, 0.0),
                Sample::new(3, 12.0),
            ]
        );
    }

    #[test]
    fn exact_second_boundary_opens_new_bucket() {
        let input = vec![Sample::new(999_i64, 1.0), Sample::new(2000, 2.0)];
        let out = bucket_and_sum(&input, 1000);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], Sample::new(2, 2.0));
    }

    #[test]
    fn trace_time_buckets_by_millisecond_value() {
        let input = vec![Sample::new(0.25_f64, 100.0), Sample::new(1000.5, 50.0)];
        assert_eq!(
            bucket_and_sum(&input, 1000),
            vec![Sample::new(0, 100.0), Sample::new(1, 50.0)]
        );
    }

    #[test]
    fn negative_keys_are_dropped() {
        let input = vec![Sample::new(-5_i64, 9.0), Sample::new(1500, 1.0)];
        assert_eq!(
            bucket_and_sum(&input, 1000),
            vec![Sample::new(0, 0.0), Sample::new(1, 1.0)]
        );
        assert!(bucket_and_sum(&[Sample::new(-1_i64, 1.0)], 1000).is_empty());
    }

    #[test]
    fn empty_series_has_no_buckets() {
        assert!(bucket_and_sum::<i64>(&[], 1000).is_empty());
    }

    #[test]
    fn step_single_point_starts_at_origin() {
        let out = step_expand(&[Sample::new(42.5_f64, 7.0)]);
        assert_eq!(out, vec![Sample::new(0.0, 7.0), Sample::new(42.5, 7.0)]);
    }

    #[test]
    fn step_holds_value_until_next_point() {
        let input = vec![
            Sample::new(0_i64, 1.0),
            Sample::new(10, 2.0),
            Sample::new(30, 3.0),
        ];
        assert_eq!(
            step_expand(&input),
            vec![
                Sample::new(0, 1.0),
                Sample::new(10, 1.0),
                Sample::new(10, 2.0),
                Sample::new(30, 2.0),
            ]
        );
        assert!(step_expand::<i64>(&[]).is_empty());
    }

    #[test]
    fn mean_rounds_to_two_decimals() {
        let input = vec![Sample::new(0_i64, 0.981), Sample::new(1, 0.9749)];
        assert_eq!(rounded_mean(&input), 0.98);
        assert_eq!(rounded_mean::<i64>(&[]), 0.0);
    }
}
