use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

/// Epoch milliseconds of midnight UTC on `date`
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// Epoch seconds of midnight UTC on `date`
pub fn date_to_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

pub fn millis_to_date(millis: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .date_naive()
}

pub fn seconds_to_date(seconds: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .unwrap_or_default()
        .date_naive()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Whole months from `from` to `to`, truncated toward zero.
///
/// A month only counts once the day of month has been reached, so
/// 2024-01-31 to 2024-02-29 is zero months.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let packed = |date: NaiveDate| {
        (i64::from(date.year()) * 12 + i64::from(date.month0())) * 32 + i64::from(date.day())
    };
    (packed(to) - packed(from)) / 32
}

/// Format used in calendar descriptions, e.g. `Friday, March 7 2025`
pub fn long_format(date: NaiveDate) -> String {
    date.format("%A, %B %-d %Y").to_string()
}
