//! Free-text date parsing and duration derivation.
//!
//! Registry dates come as `Month Year` or `Month Day, Year`. Dates without a
//! day are pinned to the 15th of the month.

use chrono::NaiveDate;
use log::debug;

use crate::{error::ScrubError, rows::NULL_SENTINEL};

pub const DEFAULT_DAY: u32 = 15;
const DAYS_PER_MONTH: f64 = 30.0;
const MONTHS_PER_YEAR: f64 = 12.0;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn month_number(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|month| month.eq_ignore_ascii_case(name))
        .map(|idx| idx as u32 + 1)
}

pub fn normalize_date(raw: &str) -> Result<NaiveDate, ScrubError> {
    let cleaned = raw.replace(',', "");
    let tokens = cleaned.split_whitespace().collect::<Vec<_>>();
    let (month, day, year) = match tokens.as_slice() {
        [month, year] => (*month, None, *year),
        [month, day, year] => (*month, Some(*day), *year),
        other => {
            return Err(ScrubError::malformed_date(
                raw,
                format!("expected 2 or 3 tokens, found {}", other.len()),
            ));
        }
    };

    let month = month_number(month)
        .ok_or_else(|| ScrubError::malformed_date(raw, format!("unknown month '{month}'")))?;
    let day = match day {
        Some(day) => day
            .parse::<u32>()
            .map_err(|_| ScrubError::malformed_date(raw, format!("invalid day '{day}'")))?,
        None => DEFAULT_DAY,
    };
    let year = year
        .parse::<i32>()
        .map_err(|_| ScrubError::malformed_date(raw, format!("invalid year '{year}'")))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ScrubError::malformed_date(raw, "not a calendar date"))
}

/// Whole years between two dates using a 360-day year, rounding half to even.
pub fn duration_years(start: NaiveDate, completion: NaiveDate) -> i64 {
    let days = (completion - start).num_days() as f64;
    (days / DAYS_PER_MONTH / MONTHS_PER_YEAR).round_ties_even() as i64
}

pub fn duration_between(start: &str, completion: &str) -> Result<i64, ScrubError> {
    Ok(duration_years(normalize_date(start)?, normalize_date(completion)?))
}

/// Cell text for the duration column; the null sentinel when a date is unusable.
pub fn duration_cell(start: &str, completion: &str) -> String {
    match duration_between(start, completion) {
        Ok(years) => years.to_string(),
        Err(err) => {
            debug!("{err}");
            NULL_SENTINEL.to_string()
        }
    }
}
