use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{
  Datelike,
  Days,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike
};
use thiserror::Error;

const MAX_YEAR: i32 = 9999;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateTimeError {
  #[error(
    "Invalid date string format given \
     for parsing: {input:?} ({reason})"
  )]
  Format {
    input:  String,
    reason: &'static str
  }
}

impl DateTimeError {
  fn format(
    input: &str,
    reason: &'static str
  ) -> Self {
    Self::Format {
      input: input.to_string(),
      reason
    }
  }
}

/// Backend datetime in the form
/// `YYYY-MM-DD HH:MM:SS[.fraction][ offset]`.
///
/// Months are 1-based. Fractional seconds and the zone offset are accepted
/// but not kept, so milliseconds are always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalDateTime {
  inner: NaiveDateTime
}

impl CalDateTime {
  #[tracing::instrument(
    level = "trace",
    skip(text),
    fields(input = text)
  )]
  pub fn parse(
    text: &str
  ) -> Result<Self, DateTimeError> {
    // single spaces only; tabs or doubled spaces leave an empty segment
    let mut segments = text.split(' ');
    let (Some(date_part), Some(time_part)) =
      (segments.next(), segments.next())
    else {
      return Err(DateTimeError::format(
        text,
        "expected date and time segments"
      ));
    };
    // zone offset, ignored once present
    if segments
      .next()
      .is_some_and(str::is_empty)
    {
      return Err(DateTimeError::format(
        text,
        "empty zone segment"
      ));
    }
    if segments.next().is_some() {
      return Err(DateTimeError::format(
        text,
        "unexpected trailing segment"
      ));
    }

    let [year, month, day] =
      split_numeric::<3>(date_part, '-')
        .ok_or_else(|| {
          DateTimeError::format(
            text,
            "date segment must be \
             year-month-day"
          )
        })?;

    let (clock, fraction) =
      match time_part.split_once('.') {
        | Some((clock, fraction)) => {
          (clock, Some(fraction))
        }
        | None => (time_part, None)
      };
    if let Some(fraction) = fraction
      && !is_numeric(fraction)
    {
      return Err(DateTimeError::format(
        text,
        "fractional seconds must be \
         digits"
      ));
    }

    let [hour, minute, second] =
      split_numeric::<3>(clock, ':')
        .ok_or_else(|| {
          DateTimeError::format(
            text,
            "time segment must be \
             hour:minute:second"
          )
        })?;

    let year = i32::try_from(year)
      .ok()
      .filter(|year| *year <= MAX_YEAR)
      .ok_or_else(|| {
        DateTimeError::format(
          text,
          "year out of range"
        )
      })?;

    let date = u32::try_from(month)
      .ok()
      .zip(u32::try_from(day).ok())
      .and_then(|(month, day)| {
        NaiveDate::from_ymd_opt(
          year, month, day
        )
      })
      .ok_or_else(|| {
        DateTimeError::format(
          text,
          "not a calendar date"
        )
      })?;

    let time = u32::try_from(hour)
      .ok()
      .zip(u32::try_from(minute).ok())
      .zip(u32::try_from(second).ok())
      .and_then(
        |((hour, minute), second)| {
          NaiveTime::from_hms_opt(
            hour, minute, second
          )
        }
      )
      .ok_or_else(|| {
        DateTimeError::format(
          text,
          "not a clock time"
        )
      })?;

    Ok(Self {
      inner: date.and_time(time)
    })
  }

  #[must_use]
  pub fn year(&self) -> i32 {
    self.inner.year()
  }

  #[must_use]
  pub fn month(&self) -> u32 {
    self.inner.month()
  }

  #[must_use]
  pub fn day(&self) -> u32 {
    self.inner.day()
  }

  #[must_use]
  pub fn hour(&self) -> u32 {
    self.inner.hour()
  }

  #[must_use]
  pub fn minute(&self) -> u32 {
    self.inner.minute()
  }

  #[must_use]
  pub fn second(&self) -> u32 {
    self.inner.second()
  }

  #[must_use]
  pub fn millisecond(&self) -> u32 {
    0
  }

  #[must_use]
  pub fn date(&self) -> NaiveDate {
    self.inner.date()
  }

  /// Field-by-field ordering: year, month, day of month, hour, minute,
  /// second, millisecond.
  #[must_use]
  pub fn compare_to(
    &self,
    other: &Self
  ) -> Ordering {
    self.fields().cmp(&other.fields())
  }

  /// The same wall-clock time on the following calendar day.
  #[must_use]
  pub fn next_day(&self) -> Self {
    // years are capped at 9999 on parse, so this cannot leave chrono's range
    let inner = self
      .inner
      .checked_add_days(Days::new(1))
      .unwrap_or(self.inner);
    Self { inner }
  }

  fn fields(
    &self
  ) -> (i32, u32, u32, u32, u32, u32, u32)
  {
    (
      self.year(),
      self.month(),
      self.day(),
      self.hour(),
      self.minute(),
      self.second(),
      self.millisecond()
    )
  }
}

impl PartialOrd for CalDateTime {
  fn partial_cmp(
    &self,
    other: &Self
  ) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for CalDateTime {
  fn cmp(
    &self,
    other: &Self
  ) -> Ordering {
    self.compare_to(other)
  }
}

impl FromStr for CalDateTime {
  type Err = DateTimeError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for CalDateTime {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{}",
      self.inner.format("%Y-%m-%d %H:%M:%S")
    )
  }
}

fn split_numeric<const N: usize>(
  segment: &str,
  separator: char
) -> Option<[u64; N]> {
  let mut out = [0_u64; N];
  let mut parts =
    segment.split(separator);
  for slot in &mut out {
    let part = parts.next()?;
    if !is_numeric(part) {
      return None;
    }
    *slot = part.parse().ok()?;
  }
  if parts.next().is_some() {
    return None;
  }
  Some(out)
}

fn is_numeric(token: &str) -> bool {
  !token.is_empty()
    && token
      .chars()
      .all(|c| c.is_ascii_digit())
}
