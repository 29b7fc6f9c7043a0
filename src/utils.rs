use crate::error::{AnalyticsError, Result};
use chrono::{Datelike, Days, NaiveDate};

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Month bucket key ("YYYY-MM") used for time grouping.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// `part / whole * 100`, or 0 when `whole` is zero.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Parses a period string in the format "YYYY-MM" or "YYYY-MM:YYYY-MM"
/// Returns (start_date, end_date)
pub fn parse_period_string(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = period.split(':').collect();

    match parts.len() {
        1 => {
            let start_date = parse_month_start(parts[0])?;
            let end_date = month_end_of(start_date)?;
            Ok((start_date, end_date))
        }
        2 => {
            let start_date = parse_month_start(parts[0])?;
            let end_date = month_end_of(parse_month_start(parts[1])?)?;
            Ok((start_date, end_date))
        }
        _ => Err(AnalyticsError::DateError(format!(
            "Invalid period format: {}. Expected 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            period
        ))),
    }
}

fn parse_month_start(part: &str) -> Result<NaiveDate> {
    let start_str = format!("{}-01", part.trim());
    NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        AnalyticsError::DateError(format!(
            "Invalid date format in period: {}. Expected YYYY-MM",
            part
        ))
    })
}

fn month_end_of(date: NaiveDate) -> Result<NaiveDate> {
    last_day_of_month(date.year(), date.month()).ok_or_else(|| {
        AnalyticsError::DateError(format!("No month end for {}", date.format("%Y-%m")))
    })
}
