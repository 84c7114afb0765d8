use crate::error::LogError;
use crate::extract::RowExtractor;
use csv::{ErrorKind, ReaderBuilder, StringRecord, Trim};
use rtq_abstract::Series;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Read a delimited log row by row into a series.
///
/// The producing process may have been killed mid-write, so a broken tail
/// ends the data instead of failing the file. That covers a row with the
/// wrong number of fields, invalid UTF-8, and a value that does not parse,
/// even in the first row. A missing file is [`LogError::NotFound`].
pub fn read_delimited<K, E>(path: &Path, delimiter: u8, extractor: &E) -> Result<Series<K>, LogError>
where
    E: RowExtractor<K> + ?Sized,
{
    let file = File::open(path).map_err(|e| LogError::io(path, e))?;
    let series = read_rows(path, BufReader::new(file), delimiter, extractor)?;
    debug!("read {} samples from {}", series.len(), path.display());
    Ok(series)
}

fn read_rows<K, E, R>(path: &Path, input: R, delimiter: u8, extractor: &E) -> Result<Series<K>, LogError>
where
    E: RowExtractor<K> + ?Sized,
    R: Read,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(input);

    let mut record = StringRecord::new();
    let mut series = Series::new();
    let mut index = 0;
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) if is_truncation(&err) => {
                warn!(
                    "stopping at row {} of {}, assuming the file was cut: {}",
                    index,
                    path.display(),
                    err
                );
                break;
            }
            Err(err) => {
                return Err(LogError::Csv {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        }

        match extractor.extract(index, &record) {
            Ok(sample) => series.push(sample),
            Err(err) => {
                warn!(
                    "failed to read value at row {} of {}, assuming the file was cut: {}",
                    index,
                    path.display(),
                    err
                );
                break;
            }
        }
        index += 1;
    }
    Ok(series)
}

fn is_truncation(err: &csv::Error) -> bool {
    matches!(err.kind(), ErrorKind::UnequalLengths { .. } | ErrorKind::Utf8 { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::extract::{SsimExtractor, TimeValueExtractor};
    use rtq_abstract::{Columns, Sample, TimeUnit};
    use std::io::Write;

    fn rtp() -> TimeValueExtractor {
        TimeValueExtractor::new(Columns::new(0, 3), TimeUnit::Milliseconds)
    }

    fn read(input: &str) -> Result<Series<i64>, LogError> {
        read_rows(Path::new("test.log"), input.as_bytes(), b'\t', &rtp())
    }

    #[test]
    fn reads_all_rows() {
        let series = read("10\ta\tb\t2048\n20\ta\tb\t4096\n").unwrap();
        assert_eq!(series, vec![Sample::new(10, 2048.0), Sample::new(20, 4096.0)]);
    }

    #[test]
    fn short_last_row_is_truncation() {
        let series = read("10\ta\tb\t1\n20\ta\tb\t2\n30\ta\tb\t3\n40\ta").unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn unparsable_tail_value_is_truncation() {
        let series = read("10\ta\tb\t1\n20\ta\tb\t2.5e\n").unwrap();
        assert_eq!(series, vec![Sample::new(10, 1.0)]);
    }

    #[test]
    fn empty_input_is_empty_series() {
        assert!(read("").unwrap().is_empty());
    }

    #[test]
    fn unusable_first_row_ends_data() {
        assert!(read("time\ta\tb\tbytes\n10\ta\tb\t1\n").unwrap().is_empty());
    }

    #[test]
    fn first_row_cut_short_is_empty_series() {
        assert!(read("10\ta").unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_tail_is_truncation() {
        let input: &[u8] = b"10\ta\tb\t1\n20\ta\tb\t2\n30\t\xff\xfe\tb\t3\n";
        let series = read_rows(Path::new("test.log"), input, b'\t', &rtp()).unwrap();
        assert_eq!(series, vec![Sample::new(10, 1.0), Sample::new(20, 2.0)]);
    }

    #[test]
    fn space_delimited_quality_log() {
        let input = "n:1 Y:0.99 U:0.98 V:0.97 All:0.98 (17.0)\nn:2 Y:0.95 U:0.94 V:0.93 All:0.94 (12.2)\n";
        let series: Series<i64> =
            read_rows(Path::new("ssim.log"), input.as_bytes(), b' ', &SsimExtractor { field: 4 })
                .unwrap();
        assert_eq!(series, vec![Sample::new(0, 0.98), Sample::new(1, 0.94)]);
    }

    #[test]
    fn closures_are_extractors() {
        let double = |i: usize, row: &StringRecord| -> Result<Sample<i64>, ExtractError> {
            let v: f64 = row[0].parse().map_err(|_| ExtractError::InvalidNumber {
                field: row[0].to_string(),
            })?;
            Ok(Sample::new(i as i64, v * 2.0))
        };
        let series: Series<i64> =
            read_rows(Path::new("x"), "1\n2\n".as_bytes(), b',', &double).unwrap();
        assert_eq!(series, vec![Sample::new(0, 2.0), Sample::new(1, 4.0)]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_delimited::<i64, _>(&dir.path().join("absent.log"), b'\t', &rtp())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1000,5,0,0,0,12").unwrap();
        writeln!(file, "2000,7,0,0,0,14").unwrap();
        let cc = TimeValueExtractor::new(Columns::new(0, 5), TimeUnit::Milliseconds);
        let series: Series<i64> = read_delimited(file.path(), b',', &cc).unwrap();
        assert_eq!(series, vec![Sample::new(1000, 12.0), Sample::new(2000, 14.0)]);
    }
}
