use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::table::{ColumnValues, Dataset};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Threshold {0} is outside the range 0 to 1")]
    ThresholdOutOfRange(f64),
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct Options {
    #[builder(default = 0.9)]
    pub numeric_threshold: f64,
    #[builder(default = 0.9)]
    pub date_threshold: f64,
}

impl Default for Options {
    fn default() -> Options {
        Options::builder().build()
    }
}

impl Options {
    /// Thresholds are validated once at configuration time, never per row.
    pub fn validate(&self) -> Result<(), ConvertError> {
        for threshold in [self.numeric_threshold, self.date_threshold] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConvertError::ThresholdOutOfRange(threshold));
            }
        }
        Ok(())
    }
}

// Day-first formats come before their month-first counterparts, so an
// all-numeric date that could be read either way resolves as day-month-year.
fn datetime_formats() -> Vec<&'static str> {
    vec![
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S.%f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d/%m/%y %H:%M:%S",
        "%d/%m/%y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%d-%m-%Y %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ]
}

fn date_formats() -> Vec<&'static str> {
    vec![
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%Y.%m.%d",
        "%d.%m.%Y",
        "%d.%m.%y",
        "%d/%m/%Y",
        "%d/%m/%y",
        "%d-%m-%Y",
        "%m/%d/%Y",
        "%m/%d/%y",
        "%d %B %Y",
        "%B %d %Y",
    ]
}

/// Parse a decimal number, accepting a comma as the decimal separator.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.replace(',', ".").parse::<f64>().ok()
}

pub(crate) fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    let timestamp = datetime_formats()
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            date_formats()
                .into_iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        });

    // Timestamps outside the nanosecond-representable range cannot be
    // materialized, so they degrade to missing like any other unparseable
    // cell.
    timestamp.filter(|parsed| parsed.and_utc().timestamp_nanos_opt().is_some())
}

/// Classify one column of raw text cells and return the converted column.
///
/// The success ratio divides by the total column length, absent cells
/// included, so sparse columns are hard to reclassify. Cells that fail to
/// parse under the winning type become absent rather than errors.
pub fn convert_column(values: &[Option<String>], options: &Options) -> ColumnValues {
    let total = values.len();

    let stripped: Vec<Option<String>> = values
        .iter()
        .map(|cell| cell.as_deref().map(|value| value.trim().to_owned()))
        .collect();

    let numeric: Vec<Option<f64>> = stripped
        .iter()
        .map(|cell| cell.as_deref().and_then(parse_number))
        .collect();
    if meets_threshold(&numeric, total, options.numeric_threshold) {
        return ColumnValues::Numeric(numeric);
    }

    let temporal: Vec<Option<NaiveDateTime>> = stripped
        .iter()
        .map(|cell| cell.as_deref().and_then(parse_temporal))
        .collect();
    if meets_threshold(&temporal, total, options.date_threshold) {
        return ColumnValues::Temporal(temporal);
    }

    ColumnValues::Text(stripped)
}

fn meets_threshold<T>(parsed: &[Option<T>], total: usize, threshold: f64) -> bool {
    if total == 0 {
        // A column with no cells at all stays text.
        return false;
    }
    let parsed_count = parsed.iter().filter(|cell| cell.is_some()).count();
    parsed_count as f64 / total as f64 >= threshold
}

/// Apply the classifier to every text column of the dataset, in place.
/// Columns already holding a concrete type are not visited, so running the
/// transform twice is a no-op.
pub fn convert_dataset(dataset: &mut Dataset, options: &Options) -> Result<(), ConvertError> {
    options.validate()?;

    for column in dataset.columns_mut() {
        if let ColumnValues::Text(values) = &column.values {
            column.values = convert_column(values, options);
        }
    }
    Ok(())
}

/// Copying variant of [`convert_dataset`]: the input is left untouched and a
/// fully independent converted dataset is returned.
pub fn convert_dataset_copy(dataset: &Dataset, options: &Options) -> Result<Dataset, ConvertError> {
    let mut converted = dataset.clone();
    convert_dataset(&mut converted, options)?;
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|value| {
                if value.is_empty() {
                    None
                } else {
                    Some((*value).to_owned())
                }
            })
            .collect()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn comma_decimals_become_numeric() {
        let options = Options::builder().numeric_threshold(0.6).build();
        let converted = convert_column(&cells(&["1,5", "2,0", "abc"]), &options);
        assert_eq!(
            converted,
            ColumnValues::Numeric(vec![Some(1.5), Some(2.0), None])
        );
    }

    #[test]
    fn plain_numbers_become_numeric() {
        let options = Options::default();
        let converted = convert_column(&cells(&["1", " 2.5 ", "-3", "4e2"]), &options);
        assert_eq!(
            converted,
            ColumnValues::Numeric(vec![Some(1.0), Some(2.5), Some(-3.0), Some(400.0)])
        );
    }

    #[test]
    fn dates_parse_day_first() {
        let options = Options::builder().date_threshold(0.6).build();
        let converted = convert_column(&cells(&["01.02.2023", "15.03.2023", "x"]), &options);
        assert_eq!(
            converted,
            ColumnValues::Temporal(vec![Some(date(2023, 2, 1)), Some(date(2023, 3, 15)), None])
        );
    }

    #[test]
    fn ambiguous_slash_dates_prefer_day_month_year() {
        let options = Options::default();
        let converted = convert_column(&cells(&["03/04/2021", "05/06/2021"]), &options);
        assert_eq!(
            converted,
            ColumnValues::Temporal(vec![Some(date(2021, 4, 3)), Some(date(2021, 6, 5))])
        );
    }

    #[test]
    fn datetimes_keep_their_time_part() {
        let options = Options::default();
        let converted = convert_column(&cells(&["2023-01-02 10:30:00"]), &options);
        let expected = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(converted, ColumnValues::Temporal(vec![Some(expected)]));
    }

    #[test]
    fn far_future_dates_degrade_to_missing() {
        // 9999-02-01 parses as a date but cannot be represented as a
        // nanosecond timestamp, so it must not survive classification as a
        // present value.
        let options = Options::builder().date_threshold(0.5).build();
        let converted = convert_column(&cells(&["01.02.9999", "15.03.2023"]), &options);
        assert_eq!(
            converted,
            ColumnValues::Temporal(vec![None, Some(date(2023, 3, 15))])
        );

        // Under the default threshold the same cell is just a failed parse.
        let converted = convert_column(&cells(&["01.02.9999"]), &Options::default());
        assert_eq!(
            converted,
            ColumnValues::Text(vec![Some("01.02.9999".into())])
        );
    }

    #[test]
    fn numeric_wins_when_both_thresholds_met() {
        let options = Options::builder()
            .numeric_threshold(0.5)
            .date_threshold(0.5)
            .build();
        let converted = convert_column(&cells(&["1.5", "02.03.2020"]), &options);
        assert_eq!(converted.kind(), crate::table::ValueKind::Numeric);
    }

    #[test]
    fn threshold_comparison_is_inclusive() {
        let options = Options::builder().numeric_threshold(0.5).build();
        let converted = convert_column(&cells(&["1", "2", "x", "y"]), &options);
        assert_eq!(
            converted,
            ColumnValues::Numeric(vec![Some(1.0), Some(2.0), None, None])
        );
    }

    #[test]
    fn fallback_keeps_stripped_strings() {
        let options = Options::default();
        let converted = convert_column(&cells(&["  foo ", "bar", ""]), &options);
        assert_eq!(
            converted,
            ColumnValues::Text(vec![Some("foo".into()), Some("bar".into()), None])
        );
    }

    #[test]
    fn absent_cells_count_in_the_denominator() {
        let column = cells(&["1", "", ""]);

        let strict = Options::default();
        assert_eq!(
            convert_column(&column, &strict).kind(),
            crate::table::ValueKind::Text
        );

        let loose = Options::builder().numeric_threshold(0.3).build();
        assert_eq!(
            convert_column(&column, &loose),
            ColumnValues::Numeric(vec![Some(1.0), None, None])
        );
    }

    #[test]
    fn zero_length_column_stays_text() {
        let options = Options::builder()
            .numeric_threshold(0.0)
            .date_threshold(0.0)
            .build();
        assert_eq!(convert_column(&[], &options), ColumnValues::Text(vec![]));
    }

    #[test]
    fn transform_visits_only_text_columns() {
        let mut dataset = Dataset::new();
        dataset.push_column(Column::new(
            "amount",
            ColumnValues::Text(vec![Some("1,5".into()), Some("2".into())]),
        ));
        dataset.push_column(Column::new(
            "already_numeric",
            ColumnValues::Numeric(vec![Some(9.0), None]),
        ));

        let options = Options::default();
        convert_dataset(&mut dataset, &options).unwrap();

        assert_eq!(
            dataset.column("amount").unwrap().values,
            ColumnValues::Numeric(vec![Some(1.5), Some(2.0)])
        );
        assert_eq!(
            dataset.column("already_numeric").unwrap().values,
            ColumnValues::Numeric(vec![Some(9.0), None])
        );

        // Re-running on a fully converted dataset changes nothing.
        let before = dataset.clone();
        convert_dataset(&mut dataset, &options).unwrap();
        assert_eq!(dataset, before);
    }

    #[test]
    fn copy_mode_leaves_the_input_untouched() {
        let mut dataset = Dataset::new();
        dataset.push_column(Column::new(
            "amount",
            ColumnValues::Text(vec![Some("1".into())]),
        ));

        let converted = convert_dataset_copy(&dataset, &Options::default()).unwrap();

        assert_eq!(
            dataset.column("amount").unwrap().values,
            ColumnValues::Text(vec![Some("1".into())])
        );
        assert_eq!(
            converted.column("amount").unwrap().values,
            ColumnValues::Numeric(vec![Some(1.0)])
        );
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        let options = Options::builder().numeric_threshold(1.5).build();
        assert!(options.validate().is_err());

        let options = Options::builder().date_threshold(-0.1).build();
        let mut dataset = Dataset::new();
        assert!(convert_dataset(&mut dataset, &options).is_err());
    }
}
