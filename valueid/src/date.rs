//! xsd date values packed into the 60 payload bits.
//!
//! Layout from the most significant payload bit downwards:
//!
//! | field | bits |
//! |---|---|
//! | year + 10000 | 15 |
//! | month (0 = absent) | 4 |
//! | day (0 = absent) | 5 |
//! | hour | 5 |
//! | minute | 6 |
//! | milliseconds of the minute | 16 |
//! | time zone (0 = none, 1 = `Z`, else quarter hours + 58) | 7 |
//! | kind | 2 |
//!
//! Comparing payloads therefore orders dates chronologically (ignoring the
//! time zone), which is what sorting relies on.

use std::fmt;

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Result, ValueError};
use crate::xsd::{XSD_DATE, XSD_DATE_TIME, XSD_G_YEAR, XSD_G_YEAR_MONTH};

pub const MIN_YEAR: i32 = -9999;
pub const MAX_YEAR: i32 = 9999;
const YEAR_BIAS: i32 = 10000;

const KIND_BITS: u32 = 2;
const TZ_BITS: u32 = 7;
const MILLIS_BITS: u32 = 16;
const MINUTE_BITS: u32 = 6;
const HOUR_BITS: u32 = 5;
const DAY_BITS: u32 = 5;
const MONTH_BITS: u32 = 4;

const TZ_SHIFT: u32 = KIND_BITS;
const MILLIS_SHIFT: u32 = TZ_SHIFT + TZ_BITS;
const MINUTE_SHIFT: u32 = MILLIS_SHIFT + MILLIS_BITS;
const HOUR_SHIFT: u32 = MINUTE_SHIFT + MINUTE_BITS;
const DAY_SHIFT: u32 = HOUR_SHIFT + HOUR_BITS;
const MONTH_SHIFT: u32 = DAY_SHIFT + DAY_BITS;
const YEAR_SHIFT: u32 = MONTH_SHIFT + MONTH_BITS;

const fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Which xsd type a [`DateValue`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateKind {
    Year = 0,
    YearMonth = 1,
    Date = 2,
    DateTime = 3,
}

impl DateKind {
    fn from_bits(bits: u64) -> Self {
        match bits & mask(KIND_BITS) {
            0 => DateKind::Year,
            1 => DateKind::YearMonth,
            2 => DateKind::Date,
            _ => DateKind::DateTime,
        }
    }

    pub fn xsd_type(self) -> &'static str {
        match self {
            DateKind::Year => XSD_G_YEAR,
            DateKind::YearMonth => XSD_G_YEAR_MONTH,
            DateKind::Date => XSD_DATE,
            DateKind::DateTime => XSD_DATE_TIME,
        }
    }
}

/// Time zone of a date value, with quarter-hour resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeZone {
    None,
    Z,
    /// Offset from UTC in quarter hours, `-56..=56` (±14:00).
    QuarterHours(i8),
}

impl TimeZone {
    /// Build from an offset in seconds; fails unless it is a multiple of 15 minutes.
    pub fn from_offset_seconds(seconds: i32) -> Result<Self> {
        if seconds % 900 != 0 || seconds.abs() > 14 * 3600 {
            return Err(ValueError::InvalidDate(format!(
                "unsupported time zone offset of {} seconds",
                seconds
            )));
        }
        Ok(TimeZone::QuarterHours((seconds / 900) as i8))
    }

    fn to_bits(self) -> u64 {
        match self {
            TimeZone::None => 0,
            TimeZone::Z => 1,
            TimeZone::QuarterHours(q) => (q as i64 + 58) as u64,
        }
    }

    fn from_bits(bits: u64) -> Self {
        match bits {
            0 => TimeZone::None,
            1 => TimeZone::Z,
            b => TimeZone::QuarterHours((b as i64 - 58) as i8),
        }
    }

    /// Parse a trailing time zone (`Z`, `+hh:mm`, `-hh:mm`) and return the rest.
    fn split_suffix(lexical: &str) -> Result<(&str, TimeZone)> {
        if let Some(rest) = lexical.strip_suffix('Z') {
            return Ok((rest, TimeZone::Z));
        }
        let n = lexical.len();
        if n >= 6 && lexical.is_char_boundary(n - 6) {
            let (rest, tz) = lexical.split_at(n - 6);
            let b = tz.as_bytes();
            if (b[0] == b'+' || b[0] == b'-') && b[3] == b':' {
                let hours: i32 = tz[1..3]
                    .parse()
                    .map_err(|_| ValueError::InvalidDate(lexical.to_string()))?;
                let minutes: i32 = tz[4..6]
                    .parse()
                    .map_err(|_| ValueError::InvalidDate(lexical.to_string()))?;
                let sign = if b[0] == b'-' { -1 } else { 1 };
                // a date like 2024-01-01 ends in "-01-01", which is not a zone
                if rest.len() >= 4 {
                    return Ok((
                        rest,
                        TimeZone::from_offset_seconds(sign * (hours * 3600 + minutes * 60))?,
                    ));
                }
            }
        }
        Ok((lexical, TimeZone::None))
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZone::None => Ok(()),
            TimeZone::Z => f.write_str("Z"),
            TimeZone::QuarterHours(q) => {
                let sign = if *q < 0 { '-' } else { '+' };
                let minutes = (*q as i32).abs() * 15;
                write!(f, "{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
            }
        }
    }
}

/// A date, date-time, gYear or gYearMonth with year in `[-9999, 9999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateValue {
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    millis: u16,
    tz: TimeZone,
    kind: DateKind,
}

impl DateValue {
    pub fn year(year: i32, tz: TimeZone) -> Result<Self> {
        check_year(year)?;
        Ok(DateValue {
            year,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            millis: 0,
            tz,
            kind: DateKind::Year,
        })
    }

    pub fn year_month(year: i32, month: u8, tz: TimeZone) -> Result<Self> {
        check_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(ValueError::InvalidDate(format!("month {}", month)));
        }
        Ok(DateValue {
            month,
            kind: DateKind::YearMonth,
            ..DateValue::year(year, tz)?
        })
    }

    pub fn date(year: i32, month: u8, day: u8, tz: TimeZone) -> Result<Self> {
        check_year(year)?;
        if NaiveDate::from_ymd_opt(year, month as u32, day as u32).is_none() {
            return Err(ValueError::InvalidDate(format!(
                "{}-{:02}-{:02}",
                year, month, day
            )));
        }
        Ok(DateValue {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            millis: 0,
            tz,
            kind: DateKind::Date,
        })
    }

    /// Date-time with millisecond precision; `millis` counts from the start of the minute.
    pub fn date_time(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        millis: u16,
        tz: TimeZone,
    ) -> Result<Self> {
        if hour > 23 || minute > 59 || millis >= 60_000 {
            return Err(ValueError::InvalidDate(format!(
                "time {:02}:{:02} +{}ms",
                hour, minute, millis
            )));
        }
        Ok(DateValue {
            hour,
            minute,
            millis,
            kind: DateKind::DateTime,
            ..DateValue::date(year, month, day, tz)?
        })
    }

    pub fn from_naive_date(d: NaiveDate, tz: TimeZone) -> Result<Self> {
        DateValue::date(d.year(), d.month() as u8, d.day() as u8, tz)
    }

    pub fn from_naive_date_time(dt: NaiveDateTime, tz: TimeZone) -> Result<Self> {
        let millis = dt.second() * 1000 + dt.nanosecond() / 1_000_000;
        DateValue::date_time(
            dt.year(),
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            millis.min(59_999) as u16,
            tz,
        )
    }

    pub fn from_fixed_offset(dt: chrono::DateTime<FixedOffset>) -> Result<Self> {
        let tz = TimeZone::from_offset_seconds(dt.offset().local_minus_utc())?;
        DateValue::from_naive_date_time(dt.naive_local(), tz)
    }

    /// Parse the lexical form of an xsd date type given its datatype IRI.
    pub fn parse_xsd(lexical: &str, datatype: &str) -> Result<Self> {
        let invalid = || ValueError::InvalidDate(lexical.to_string());
        let (rest, tz) = TimeZone::split_suffix(lexical.trim())?;
        match datatype {
            XSD_DATE_TIME => {
                let dt = NaiveDateTime::parse_from_str(rest, "%Y-%m-%dT%H:%M:%S%.f")
                    .map_err(|_| invalid())?;
                DateValue::from_naive_date_time(dt, tz)
            }
            XSD_DATE => {
                let d = NaiveDate::parse_from_str(rest, "%Y-%m-%d").map_err(|_| invalid())?;
                DateValue::from_naive_date(d, tz)
            }
            XSD_G_YEAR_MONTH => {
                let (y, m) = rest.rsplit_once('-').ok_or_else(invalid)?;
                let year: i32 = y.parse().map_err(|_| invalid())?;
                let month: u8 = m.parse().map_err(|_| invalid())?;
                DateValue::year_month(year, month, tz)
            }
            XSD_G_YEAR => {
                let year: i32 = rest.parse().map_err(|_| invalid())?;
                DateValue::year(year, tz)
            }
            _ => Err(ValueError::InvalidDate(format!(
                "unsupported date datatype {}",
                datatype
            ))),
        }
    }

    pub fn kind(&self) -> DateKind {
        self.kind
    }

    pub fn get_year(&self) -> i32 {
        self.year
    }

    pub fn time_zone(&self) -> TimeZone {
        self.tz
    }

    /// Calendar date, unless this is a gYear or gYearMonth.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        match self.kind {
            DateKind::Date | DateKind::DateTime => {
                NaiveDate::from_ymd_opt(self.year, self.month as u32, self.day as u32)
            }
            _ => None,
        }
    }

    pub fn to_naive_date_time(&self) -> Option<NaiveDateTime> {
        if self.kind != DateKind::DateTime {
            return None;
        }
        self.to_naive_date()?.and_hms_milli_opt(
            self.hour as u32,
            self.minute as u32,
            (self.millis / 1000) as u32,
            (self.millis % 1000) as u32,
        )
    }

    pub fn to_bits(&self) -> u64 {
        ((self.year + YEAR_BIAS) as u64) << YEAR_SHIFT
            | (self.month as u64) << MONTH_SHIFT
            | (self.day as u64) << DAY_SHIFT
            | (self.hour as u64) << HOUR_SHIFT
            | (self.minute as u64) << MINUTE_SHIFT
            | (self.millis as u64) << MILLIS_SHIFT
            | self.tz.to_bits() << TZ_SHIFT
            | self.kind as u64
    }

    pub fn from_bits(bits: u64) -> Self {
        DateValue {
            year: ((bits >> YEAR_SHIFT) & mask(15)) as i32 - YEAR_BIAS,
            month: ((bits >> MONTH_SHIFT) & mask(MONTH_BITS)) as u8,
            day: ((bits >> DAY_SHIFT) & mask(DAY_BITS)) as u8,
            hour: ((bits >> HOUR_SHIFT) & mask(HOUR_BITS)) as u8,
            minute: ((bits >> MINUTE_SHIFT) & mask(MINUTE_BITS)) as u8,
            millis: ((bits >> MILLIS_SHIFT) & mask(MILLIS_BITS)) as u16,
            tz: TimeZone::from_bits((bits >> TZ_SHIFT) & mask(TZ_BITS)),
            kind: DateKind::from_bits(bits),
        }
    }

    /// Lexical form and xsd datatype IRI.
    pub fn to_string_and_type(&self) -> (String, &'static str) {
        (self.to_string(), self.kind.xsd_type())
    }
}

fn check_year(year: i32) -> Result<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ValueError::InvalidDate(format!(
            "year {} outside [{}, {}]",
            year, MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(())
}

fn write_year(f: &mut fmt::Formatter<'_>, year: i32) -> fmt::Result {
    if year < 0 {
        write!(f, "-{:04}", -year)
    } else {
        write!(f, "{:04}", year)
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_year(f, self.year)?;
        if self.kind >= DateKind::YearMonth {
            write!(f, "-{:02}", self.month)?;
        }
        if self.kind >= DateKind::Date {
            write!(f, "-{:02}", self.day)?;
        }
        if self.kind == DateKind::DateTime {
            write!(
                f,
                "T{:02}:{:02}:{:02}",
                self.hour,
                self.minute,
                self.millis / 1000
            )?;
            let frac = self.millis % 1000;
            if frac != 0 {
                let digits = format!("{:03}", frac);
                write!(f, ".{}", digits.trim_end_matches('0'))?;
            }
        }
        write!(f, "{}", self.tz)
    }
}
