use crate::error::ExtractError;
use csv::StringRecord;
use rtq_abstract::{Columns, Sample, TimeUnit};

/// Turns one row of a delimited log into a sample.
///
/// `index` counts rows from zero and serves as the frame number for
/// per-frame logs.
pub trait RowExtractor<K> {
    fn extract(&self, index: usize, row: &StringRecord) -> Result<Sample<K>, ExtractError>;
}

impl<K, F> RowExtractor<K> for F
where
    F: Fn(usize, &StringRecord) -> Result<Sample<K>, ExtractError>,
{
    fn extract(&self, index: usize, row: &StringRecord) -> Result<Sample<K>, ExtractError> {
        self(index, row)
    }
}

fn field(row: &StringRecord, column: usize) -> Result<&str, ExtractError> {
    row.get(column).ok_or(ExtractError::MissingColumn {
        column,
        len: row.len(),
    })
}

/// Value half of a `label:value` field.
fn labelled_value(row: &StringRecord, column: usize) -> Result<&str, ExtractError> {
    let raw = field(row, column)?;
    raw.split_once(':')
        .map(|(_, value)| value)
        .ok_or_else(|| ExtractError::MissingLabel {
            field: raw.to_string(),
        })
}

fn parse_f64(raw: &str) -> Result<f64, ExtractError> {
    raw.parse().map_err(|_| ExtractError::InvalidNumber {
        field: raw.to_string(),
    })
}

/// Non-finite values have no JSON encoding.
fn finite(value: f64, raw: &str) -> Result<f64, ExtractError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExtractError::InvalidNumber {
            field: raw.to_string(),
        })
    }
}

fn parse_i64(raw: &str) -> Result<i64, ExtractError> {
    raw.parse().map_err(|_| ExtractError::InvalidNumber {
        field: raw.to_string(),
    })
}

/// Map a decibel-like score onto `[0, 1]`: `x / (1 + x)`, with infinity
/// (identical frames) mapped to exactly `1`. Negative input is not clamped.
pub fn bounded_psnr(x: f64) -> f64 {
    if x.is_infinite() {
        1.0
    } else {
        x / (1.0 + x)
    }
}

/// Per-frame SSIM from a line like `n:1 Y:0.99 U:0.98 V:0.98 All:0.985 (18.3)`.
#[derive(Debug, Clone, Copy)]
pub struct SsimExtractor {
    pub field: usize,
}

impl RowExtractor<i64> for SsimExtractor {
    fn extract(&self, index: usize, row: &StringRecord) -> Result<Sample<i64>, ExtractError> {
        let raw = labelled_value(row, self.field)?;
        let value = finite(parse_f64(raw)?, raw)?;
        Ok(Sample::new(index as i64, value))
    }
}

/// Per-frame PSNR from a line like `n:1 mse_avg:0.52 ... psnr_avg:50.96 ...`,
/// passed through [`bounded_psnr`]. A raw `-1`, the pole of the transform,
/// is rejected like any other unusable value.
#[derive(Debug, Clone, Copy)]
pub struct PsnrExtractor {
    pub field: usize,
}

impl RowExtractor<i64> for PsnrExtractor {
    fn extract(&self, index: usize, row: &StringRecord) -> Result<Sample<i64>, ExtractError> {
        let raw = labelled_value(row, self.field)?;
        let value = finite(bounded_psnr(parse_f64(raw)?), raw)?;
        Ok(Sample::new(index as i64, value))
    }
}

/// `(milliseconds, value)` from an integer timestamp column and a numeric
/// value column.
#[derive(Debug, Clone, Copy)]
pub struct TimeValueExtractor {
    pub columns: Columns,
    pub unit: TimeUnit,
}

impl TimeValueExtractor {
    pub fn new(columns: Columns, unit: TimeUnit) -> Self {
        Self { columns, unit }
    }
}

impl RowExtractor<i64> for TimeValueExtractor {
    fn extract(&self, _index: usize, row: &StringRecord) -> Result<Sample<i64>, ExtractError> {
        let time = parse_i64(field(row, self.columns.time)?)?;
        let raw = field(row, self.columns.value)?;
        let value = finite(parse_f64(raw)?, raw)?;
        Ok(Sample::new(self.unit.to_millis(time), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn ssim_reads_labelled_field() {
        let r = row(&["n:1", "Y:0.99", "U:0.98", "V:0.97", "All:0.985", "(18.3)"]);
        let sample = SsimExtractor { field: 4 }.extract(7, &r).unwrap();
        assert_eq!(sample, Sample::new(7, 0.985));
    }

    #[test]
    fn psnr_infinity_is_one() {
        let r = row(&["n:1", "mse_avg:0.00", "mse_y:0.00", "mse_u:0.00", "mse_v:0.00", "psnr_avg:inf"]);
        let sample = PsnrExtractor { field: 5 }.extract(0, &r).unwrap();
        assert_eq!(sample.value, 1.0);
    }

    #[test]
    fn psnr_finite_uses_rational_transform() {
        assert_eq!(bounded_psnr(1.0), 0.5);
        assert_eq!(bounded_psnr(0.0), 0.0);
        assert_eq!(bounded_psnr(f64::NEG_INFINITY), 1.0);
        assert!((bounded_psnr(40.0) - 40.0 / 41.0).abs() < f64::EPSILON);
    }

    #[test]
    fn time_value_converts_units() {
        let r = row(&["1500000000", "x", "9.5"]);
        let ms = TimeValueExtractor::new(Columns::new(0, 2), TimeUnit::Nanoseconds)
            .extract(0, &r)
            .unwrap();
        assert_eq!(ms, Sample::new(1500, 9.5));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let extractor = TimeValueExtractor::new(Columns::new(0, 1), TimeUnit::Milliseconds);
        assert_eq!(
            extractor.extract(0, &row(&["10", "NaN"])),
            Err(ExtractError::InvalidNumber { field: "NaN".into() })
        );
        assert_eq!(
            extractor.extract(0, &row(&["10", "inf"])),
            Err(ExtractError::InvalidNumber { field: "inf".into() })
        );
        assert_eq!(
            SsimExtractor { field: 0 }.extract(0, &row(&["All:nan"])),
            Err(ExtractError::InvalidNumber { field: "nan".into() })
        );
    }

    #[test]
    fn psnr_pole_is_rejected() {
        let psnr = PsnrExtractor { field: 0 };
        assert_eq!(
            psnr.extract(0, &row(&["psnr_avg:-1"])),
            Err(ExtractError::InvalidNumber { field: "-1".into() })
        );
        assert_eq!(psnr.extract(0, &row(&["psnr_avg:-3"])).unwrap().value, 1.5);
    }

    #[test]
    fn reports_bad_fields() {
        let extractor = TimeValueExtractor::new(Columns::new(0, 3), TimeUnit::Milliseconds);
        assert_eq!(
            extractor.extract(0, &row(&["10", "a"])),
            Err(ExtractError::MissingColumn { column: 3, len: 2 })
        );
        assert_eq!(
            extractor.extract(0, &row(&["1o", "a", "b", "4"])),
            Err(ExtractError::InvalidNumber { field: "1o".into() })
        );
        assert_eq!(
            SsimExtractor { field: 0 }.extract(0, &row(&["0.9"])),
            Err(ExtractError::MissingLabel { field: "0.9".into() })
        );
    }
}
