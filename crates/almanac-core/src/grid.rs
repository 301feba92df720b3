use std::fmt;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Weekday
};
use regex::Regex;

use crate::span::{
  DayCell,
  DaySpan,
  match_cells_to_span
};

/// A displayed month. Months are 1-based.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord
)]
pub struct YearMonth {
  year:  i32,
  month: u32
}

impl YearMonth {
  pub fn new(
    year: i32,
    month: u32
  ) -> Option<Self> {
    NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .map(|_| Self { year, month })
  }

  pub fn from_date(
    date: NaiveDate
  ) -> Self {
    Self {
      year:  date.year(),
      month: date.month()
    }
  }

  /// Parses `YYYY-MM`.
  pub fn parse(
    input: &str
  ) -> anyhow::Result<Self> {
    let re = Regex::new(
      r"^(?P<year>\d{4})-(?P<month>\d{1,2})$"
    )
    .map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })?;
    let caps = re
      .captures(input.trim())
      .ok_or_else(|| {
        anyhow!(
          "expected YYYY-MM, got: \
           {input}"
        )
      })?;

    let year: i32 = caps["year"]
      .parse()
      .context("invalid year")?;
    let month: u32 = caps["month"]
      .parse()
      .context("invalid month")?;
    Self::new(year, month).ok_or_else(
      || {
        anyhow!(
          "invalid month value: {month}"
        )
      }
    )
  }

  pub fn year(self) -> i32 {
    self.year
  }

  pub fn month(self) -> u32 {
    self.month
  }

  pub fn first_day(self) -> NaiveDate {
    NaiveDate::from_ymd_opt(
      self.year, self.month, 1
    )
    .unwrap_or(NaiveDate::MIN)
  }

  pub fn last_day(self) -> NaiveDate {
    self
      .next()
      .first_day()
      .checked_sub_signed(
        Duration::days(1)
      )
      .unwrap_or(NaiveDate::MAX)
  }

  pub fn days_in_month(self) -> u32 {
    self.last_day().day()
  }

  pub fn date(
    self,
    day: u32
  ) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
      self.year, self.month, day
    )
  }

  pub fn contains(
    self,
    date: NaiveDate
  ) -> bool {
    date.year() == self.year
      && date.month() == self.month
  }

  pub fn next(self) -> Self {
    if self.month >= 12 {
      Self {
        year:  self.year.saturating_add(1),
        month: 1
      }
    } else {
      Self {
        year:  self.year,
        month: self.month + 1
      }
    }
  }

  pub fn prev(self) -> Self {
    if self.month <= 1 {
      Self {
        year:  self.year.saturating_sub(1),
        month: 12
      }
    } else {
      Self {
        year:  self.year,
        month: self.month - 1
      }
    }
  }

  /// Header text such as "October 2024".
  pub fn title(self) -> String {
    self
      .first_day()
      .format("%B %Y")
      .to_string()
  }
}

impl fmt::Display for YearMonth {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-{:02}",
      self.year, self.month
    )
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum GridCell {
  Blank,
  Day { day: u32, in_range: bool }
}

impl GridCell {
  pub fn is_in_range(&self) -> bool {
    matches!(
      self,
      Self::Day { in_range: true, .. }
    )
  }
}

impl DayCell for GridCell {
  fn day_number(&self) -> Option<u32> {
    match self {
      | Self::Blank => None,
      | Self::Day { day, .. } => {
        Some(*day)
      }
    }
  }

  fn set_in_range(
    &mut self,
    value: bool
  ) {
    if let Self::Day {
      in_range, ..
    } = self
    {
      *in_range = value;
    }
  }
}

/// Cells of one month: blanks up to the first weekday, then every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
  month:      YearMonth,
  week_start: Weekday,
  cells:      Vec<GridCell>
}

impl MonthGrid {
  #[tracing::instrument(level = "debug")]
  pub fn new(
    month: YearMonth,
    week_start: Weekday
  ) -> Self {
    let leading = leading_blanks(
      month.first_day(),
      week_start
    );
    let days = month.days_in_month();

    let mut cells = Vec::with_capacity(
      leading + days as usize
    );
    cells.extend(std::iter::repeat_n(
      GridCell::Blank,
      leading
    ));
    cells.extend((1..=days).map(|day| {
      GridCell::Day {
        day,
        in_range: false
      }
    }));

    Self {
      month,
      week_start,
      cells
    }
  }

  pub fn month(&self) -> YearMonth {
    self.month
  }

  pub fn week_start(&self) -> Weekday {
    self.week_start
  }

  pub fn cells(&self) -> &[GridCell] {
    &self.cells
  }

  pub fn leading_blanks(&self) -> usize {
    self
      .cells
      .iter()
      .take_while(|cell| {
        **cell == GridCell::Blank
      })
      .count()
  }

  /// Rows of seven cells; the final row may be shorter.
  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[GridCell]>
  {
    self.cells.chunks(7)
  }

  pub fn highlight(
    &mut self,
    span: &DaySpan
  ) {
    match_cells_to_span(
      &mut self.cells,
      span,
      self.month
    );
  }

  pub fn highlighted_days(
    &self
  ) -> Vec<u32> {
    self
      .cells
      .iter()
      .filter(|cell| cell.is_in_range())
      .filter_map(|cell| {
        cell.day_number()
      })
      .collect()
  }

  pub fn clear_highlights(&mut self) {
    for cell in &mut self.cells {
      cell.set_in_range(false);
    }
  }

  /// Column headers starting at the configured week start.
  pub fn weekday_labels(
    &self
  ) -> Vec<&'static str> {
    let mut day = self.week_start;
    (0..7)
      .map(|_| {
        let label = weekday_label(day);
        day = day.succ();
        label
      })
      .collect()
  }
}

fn leading_blanks(
  first: NaiveDate,
  week_start: Weekday
) -> usize {
  let day_idx = first
    .weekday()
    .num_days_from_monday();
  let start_idx =
    week_start.num_days_from_monday();
  ((7 + day_idx - start_idx) % 7)
    as usize
}

fn weekday_label(
  day: Weekday
) -> &'static str {
  match day {
    | Weekday::Mon => "Mo",
    | Weekday::Tue => "Tu",
    | Weekday::Wed => "We",
    | Weekday::Thu => "Th",
    | Weekday::Fri => "Fr",
    | Weekday::Sat => "Sa",
    | Weekday::Sun => "Su"
  }
}
