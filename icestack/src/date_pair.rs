//! Acquisition periods encoded in mosaic file names.
//!
//! Mosaic file names carry their period as two `DDMonYY` tokens, e.g.
//! `GL_vel_mosaic_Monthly_01Dec14_31Dec14_vx_v04.0.tif`. The canonical
//! rendering of a period is `YYYYMMDD-YYYYMMDD`.

use crate::StackError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::{fmt, str::FromStr};

/// Position of the start-date token among the `_`/`-` separated
/// fields of an identifier; the end-date token follows it.
pub const DATE_TOKEN_OFFSET: usize = 4;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// An inclusive `(start, end)` pair of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatePair {
    start: NaiveDate,
    end: NaiveDate,
}

impl DatePair {
    /// Returns a pair spanning `start` through `end`.
    ///
    /// Fails if `start` falls after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, StackError> {
        if start > end {
            return Err(StackError::ReversedDatePair(format!(
                "{}-{}",
                start.format("%Y%m%d"),
                end.format("%Y%m%d")
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses the period out of a file name or file identifier.
    ///
    /// Two-digit years are taken to be in 2000-2099.
    pub fn parse(identifier: &str) -> Result<Self, StackError> {
        let mut tokens = identifier
            .split(|c| c == '_' || c == '-')
            .skip(DATE_TOKEN_OFFSET);
        let (Some(start), Some(end)) = (tokens.next(), tokens.next()) else {
            return Err(StackError::DateToken(identifier.to_owned()));
        };
        Self::new(parse_token(start)?, parse_token(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Midnight at the start of the period.
    pub fn start_time(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::default())
    }

    /// Midnight at the start of the period's last day.
    pub fn end_time(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::default())
    }
}

/// Parses one `DDMonYY` token.
fn parse_token(token: &str) -> Result<NaiveDate, StackError> {
    let malformed = || StackError::DateToken(token.to_owned());
    if token.len() != 7 || !token.is_ascii() {
        return Err(malformed());
    }
    let (day, month, year) = (&token[..2], &token[2..5], &token[5..]);
    let day: u32 = parse_digits(day).ok_or_else(malformed)?;
    let year: i32 = parse_digits(year).ok_or_else(malformed)?;
    let month = MONTHS
        .iter()
        .position(|name| *name == month)
        .ok_or_else(|| StackError::Month(month.to_owned()))?;
    #[allow(clippy::cast_possible_truncation)]
    let month = month as u32 + 1;
    NaiveDate::from_ymd_opt(2000 + year, month, day)
        .ok_or_else(|| StackError::Date(token.to_owned()))
}

fn parse_digits<T: FromStr>(digits: &str) -> Option<T> {
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

impl fmt::Display for DatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

impl FromStr for DatePair {
    type Err = StackError;

    /// Parses the canonical `YYYYMMDD-YYYYMMDD` form.
    fn from_str(s: &str) -> Result<Self, StackError> {
        let date = |token: &str| {
            if token.len() != 8 {
                return Err(StackError::DateToken(s.to_owned()));
            }
            NaiveDate::parse_from_str(token, "%Y%m%d").map_err(|_| StackError::Date(s.to_owned()))
        };
        let Some((start, end)) = s.split_once('-') else {
            return Err(StackError::DateToken(s.to_owned()));
        };
        Self::new(date(start)?, date(end)?)
    }
}
