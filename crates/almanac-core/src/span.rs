use std::collections::BTreeSet;
use std::str::FromStr;

use almanac_shared::{
  END_DATE_KEY,
  START_DATE_KEY
};
use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate
};
use thiserror::Error;
use tracing::{
  debug,
  warn
};

use crate::datetime::{
  CalDateTime,
  DateTimeError
};
use crate::grid::YearMonth;
use crate::model::{
  Component,
  ComponentType
};

const MAX_DAY_OF_MONTH: usize = 31;

/// The calendar dates a component covers, both endpoints included.
///
/// Only the endpoints are stored, so a span over centuries costs the same
/// as a span over a weekend.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq
)]
pub struct DaySpan {
  bounds: Option<(NaiveDate, NaiveDate)>
}

impl DaySpan {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Inclusive `start..=end`; empty when `end` precedes `start`.
  pub fn between(
    start: NaiveDate,
    end: NaiveDate
  ) -> Self {
    if end < start {
      return Self::empty();
    }
    Self {
      bounds: Some((start, end))
    }
  }

  pub fn is_empty(&self) -> bool {
    self.bounds.is_none()
  }

  pub fn len(&self) -> usize {
    self
      .bounds
      .map(|(start, end)| {
        let days = end
          .signed_duration_since(start)
          .num_days();
        usize::try_from(days)
          .map_or(0, |days| days + 1)
      })
      .unwrap_or(0)
  }

  /// Day-of-month numbers of every covered date.
  ///
  /// Stops walking once every possible day number has been seen, which
  /// happens within two months of the start.
  pub fn days(&self) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    for date in self.dates() {
      out.insert(date.day());
      if out.len() == MAX_DAY_OF_MONTH {
        break;
      }
    }
    out
  }

  pub fn contains_day(
    &self,
    day: u32
  ) -> bool {
    self.days().contains(&day)
  }

  pub fn covers(
    &self,
    date: NaiveDate
  ) -> bool {
    self.bounds.is_some_and(
      |(start, end)| {
        start <= date && date <= end
      }
    )
  }

  /// Day numbers that fall inside the given month.
  pub fn in_month(
    &self,
    month: YearMonth
  ) -> BTreeSet<u32> {
    let Some((start, end)) =
      self.bounds
    else {
      return BTreeSet::new();
    };
    let from =
      start.max(month.first_day());
    let to = end.min(month.last_day());
    if to < from {
      return BTreeSet::new();
    }
    (from.day()..=to.day()).collect()
  }

  pub fn first(
    &self
  ) -> Option<NaiveDate> {
    self.bounds.map(|(start, _)| start)
  }

  pub fn last(
    &self
  ) -> Option<NaiveDate> {
    self.bounds.map(|(_, end)| end)
  }

  /// Lazily walks the covered dates in order.
  pub fn dates(
    &self
  ) -> impl Iterator<Item = NaiveDate> + '_
  {
    self.bounds.into_iter().flat_map(
      |(start, end)| {
        start
          .iter_days()
          .take_while(move |date| {
            *date <= end
          })
      }
    )
  }
}

/// Days covered by a component's `START_DATE`..`END_DATE`.
///
/// A component without both keys, or whose end precedes its start, has an
/// empty span. An unparseable date is returned as an error.
#[tracing::instrument(
  level = "debug",
  skip_all,
  fields(kind = component.kind.as_str())
)]
pub fn span_of(
  component: &Component
) -> Result<DaySpan, DateTimeError> {
  let (Some(start_raw), Some(end_raw)) = (
    component
      .properties
      .get(START_DATE_KEY),
    component
      .properties
      .get(END_DATE_KEY)
  ) else {
    debug!("component has no date span");
    return Ok(DaySpan::empty());
  };

  let start =
    CalDateTime::parse(start_raw)?;
  let end = CalDateTime::parse(end_raw)?;

  if end.compare_to(&start).is_lt() {
    debug!(%start, %end, "end precedes start; empty span");
    return Ok(DaySpan::empty());
  }

  // the end day counts whatever its time of day
  let span = DaySpan::between(
    start.date(),
    end.date()
  );
  debug!(%start, %end, days = span.len(), "computed span");
  Ok(span)
}

pub fn is_in_span(
  day: u32,
  span: &DaySpan
) -> bool {
  span.contains_day(day)
}

/// A rendered cell of the month grid.
pub trait DayCell {
  /// Displayed day of month, `None` for padding cells.
  fn day_number(&self) -> Option<u32>;

  fn set_in_range(
    &mut self,
    in_range: bool
  );
}

/// Marks every cell of `month` whose date the span covers.
///
/// Cells are compared by date rather than bare day number so a span that
/// crosses a month boundary only lights up the days inside `month`.
pub fn match_cells_to_span<
  C: DayCell
>(
  cells: &mut [C],
  span: &DaySpan,
  month: YearMonth
) {
  for cell in cells.iter_mut() {
    let Some(day) = cell.day_number()
    else {
      continue;
    };
    if month
      .date(day)
      .is_some_and(|date| {
        span.covers(date)
      })
    {
      cell.set_in_range(true);
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default
)]
pub enum SpanPolicy {
  /// Log and skip components with malformed dates.
  #[default]
  Skip,
  /// Stop at the first malformed date.
  Abort
}

impl SpanPolicy {
  pub fn as_str(self) -> &'static str {
    match self {
      | Self::Skip => "skip",
      | Self::Abort => "abort"
    }
  }
}

impl FromStr for SpanPolicy {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "skip" | "continue" => {
        Ok(Self::Skip)
      }
      | "abort" | "fail" => {
        Ok(Self::Abort)
      }
      | other => {
        Err(anyhow!(
          "invalid span.on_error \
           setting: {other}"
        ))
      }
    }
  }
}

#[derive(
  Debug, Error, Clone, PartialEq, Eq,
)]
#[error(
  "component #{index} has a malformed \
   date"
)]
pub struct SpanError {
  pub index:  usize,
  #[source]
  pub source: DateTimeError
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpan {
  pub index: usize,
  pub kind:  ComponentType,
  pub span:  DaySpan
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq
)]
pub struct SpanSet {
  pub spans:   Vec<ComponentSpan>,
  pub skipped: Vec<SpanError>
}

impl SpanSet {
  pub fn covers(
    &self,
    date: NaiveDate
  ) -> bool {
    self
      .spans
      .iter()
      .any(|entry| entry.span.covers(date))
  }
}

/// Computes spans for every date-bound component.
///
/// Components without a span are left out. Spans already computed are never
/// touched when a later component fails.
#[tracing::instrument(
  skip(components),
  fields(
    count = components.len(),
    on_error = policy.as_str()
  )
)]
pub fn collect_spans(
  components: &[Component],
  policy: SpanPolicy
) -> Result<SpanSet, SpanError> {
  let mut out = SpanSet::default();

  for (index, component) in
    components.iter().enumerate()
  {
    match span_of(component) {
      | Ok(span) if span.is_empty() => {}
      | Ok(span) => {
        out.spans.push(ComponentSpan {
          index,
          kind: component.kind,
          span
        })
      }
      | Err(source) => {
        let error =
          SpanError { index, source };
        match policy {
          | SpanPolicy::Skip => {
            warn!(index, error = %error.source, "skipping component with malformed date");
            out.skipped.push(error);
          }
          | SpanPolicy::Abort => {
            return Err(error);
          }
        }
      }
    }
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::PropertyMap;

  fn component(
    props: &[(&str, &str)]
  ) -> Component {
    Component::new(
      ComponentType::Event,
      props
        .iter()
        .map(|(k, v)| (*k, *v))
        .collect::<PropertyMap>()
    )
  }

  fn ranged(
    start: &str,
    end: &str
  ) -> Component {
    component(&[
      (START_DATE_KEY, start),
      (END_DATE_KEY, end)
    ])
  }

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  fn ym(
    year: i32,
    month: u32
  ) -> YearMonth {
    YearMonth::new(year, month)
      .expect("month")
  }

  struct TestCell {
    day:    Option<u32>,
    marked: bool
  }

  impl DayCell for TestCell {
    fn day_number(&self) -> Option<u32> {
      self.day
    }

    fn set_in_range(
      &mut self,
      in_range: bool
    ) {
      self.marked = in_range;
    }
  }

  #[test]
  fn three_day_span_includes_both_endpoints(
  ) {
    let span = span_of(&ranged(
      "2024-01-01 00:00:00",
      "2024-01-03 00:00:00"
    ))
    .expect("span");
    assert_eq!(
      span.days(),
      BTreeSet::from([1, 2, 3])
    );
    assert_eq!(span.len(), 3);
  }

  #[test]
  fn end_day_is_included_regardless_of_time_of_day(
  ) {
    let span = span_of(&ranged(
      "2024-01-01 22:00:00",
      "2024-01-03 06:00:00"
    ))
    .expect("span");
    assert_eq!(
      span.days(),
      BTreeSet::from([1, 2, 3])
    );
  }

  #[test]
  fn same_day_span_has_one_day() {
    let span = span_of(&ranged(
      "2024-05-09 08:00:00",
      "2024-05-09 17:00:00"
    ))
    .expect("span");
    assert_eq!(
      span.days(),
      BTreeSet::from([9])
    );
    assert_eq!(span.len(), 1);
  }

  #[test]
  fn missing_end_date_yields_empty_span(
  ) {
    let span = span_of(&component(&[(
      START_DATE_KEY,
      "2024-01-01 00:00:00"
    )]))
    .expect("span");
    assert!(span.is_empty());

    let span = span_of(&component(&[]))
      .expect("span");
    assert!(span.is_empty());
    assert_eq!(span.len(), 0);
    assert!(span.days().is_empty());
  }

  #[test]
  fn reversed_range_yields_empty_span() {
    let span = span_of(&ranged(
      "2024-01-10 00:00:00",
      "2024-01-03 00:00:00"
    ))
    .expect("span");
    assert!(span.is_empty());
    assert!(
      DaySpan::between(
        date(2024, 1, 10),
        date(2024, 1, 3)
      )
      .is_empty()
    );
  }

  #[test]
  fn malformed_date_propagates() {
    let err = span_of(&ranged(
      "yesterday 00:00:00",
      "2024-01-03 00:00:00"
    ))
    .expect_err("must fail");
    assert!(matches!(
      err,
      DateTimeError::Format { .. }
    ));
  }

  #[test]
  fn span_crossing_month_end_rolls_over(
  ) {
    let span = span_of(&ranged(
      "2024-01-30 00:00:00",
      "2024-02-02 00:00:00"
    ))
    .expect("span");
    assert_eq!(span.len(), 4);
    assert_eq!(
      span.first(),
      Some(date(2024, 1, 30))
    );
    assert_eq!(
      span.last(),
      Some(date(2024, 2, 2))
    );
    assert_eq!(
      span.days(),
      BTreeSet::from([1, 2, 30, 31])
    );
    assert_eq!(
      span.in_month(ym(2024, 2)),
      BTreeSet::from([1, 2])
    );
    assert_eq!(
      span.dates().collect::<Vec<_>>(),
      vec![
        date(2024, 1, 30),
        date(2024, 1, 31),
        date(2024, 2, 1),
        date(2024, 2, 2)
      ]
    );
  }

  #[test]
  fn span_over_whole_year_range_stays_cheap(
  ) {
    let span = span_of(&ranged(
      "0000-01-01 00:00:00",
      "9999-12-31 00:00:00"
    ))
    .expect("span");

    assert_eq!(span.len(), 3_652_425);
    assert_eq!(
      span.days(),
      (1..=31).collect::<BTreeSet<u32>>()
    );
    assert!(is_in_span(31, &span));
    assert!(span.covers(date(5000, 6, 15)));
    assert!(
      !span.covers(date(10_000, 1, 1))
    );
    assert_eq!(
      span.in_month(ym(2024, 2)),
      (1..=29).collect::<BTreeSet<u32>>()
    );

    let mut cells: Vec<TestCell> = (1..=
      29)
      .map(|d| {
        TestCell {
          day:    Some(d),
          marked: false
        }
      })
      .collect();
    match_cells_to_span(
      &mut cells,
      &span,
      ym(2024, 2)
    );
    assert!(
      cells.iter().all(|c| c.marked)
    );
  }

  #[test]
  fn in_month_is_empty_outside_the_span(
  ) {
    let span = DaySpan::between(
      date(2024, 3, 5),
      date(2024, 3, 7)
    );
    assert!(
      span.in_month(ym(2024, 4)).is_empty()
    );
    assert!(
      span.in_month(ym(2024, 2)).is_empty()
    );
    assert_eq!(
      span.in_month(ym(2024, 3)),
      BTreeSet::from([5, 6, 7])
    );
  }

  #[test]
  fn is_in_span_matches_day_set() {
    let span = span_of(&ranged(
      "2024-03-05 00:00:00",
      "2024-03-07 00:00:00"
    ))
    .expect("span");
    let days = span.days();
    for day in 1..=31 {
      assert_eq!(
        is_in_span(day, &span),
        days.contains(&day),
        "day {day}"
      );
    }
  }

  #[test]
  fn matching_marks_only_covered_cells_of_the_month(
  ) {
    let span = span_of(&ranged(
      "2024-01-30 00:00:00",
      "2024-02-02 00:00:00"
    ))
    .expect("span");
    let mut cells: Vec<TestCell> =
      std::iter::once(TestCell {
        day:    None,
        marked: false
      })
      .chain((1..=29).map(|d| {
        TestCell {
          day:    Some(d),
          marked: false
        }
      }))
      .collect();

    match_cells_to_span(
      &mut cells,
      &span,
      ym(2024, 2)
    );

    let marked: Vec<u32> = cells
      .iter()
      .filter(|c| c.marked)
      .filter_map(|c| c.day)
      .collect();
    assert_eq!(marked, vec![1, 2]);
    assert!(!cells[0].marked);
  }

  #[test]
  fn skip_policy_keeps_good_spans_and_records_failures(
  ) {
    let components = vec![
      ranged(
        "2024-01-01 00:00:00",
        "2024-01-02 00:00:00"
      ),
      ranged(
        "2024-01-xx 00:00:00",
        "2024-01-02 00:00:00"
      ),
      component(&[]),
      ranged(
        "2024-01-05 00:00:00",
        "2024-01-05 00:00:00"
      ),
    ];

    let set = collect_spans(
      &components,
      SpanPolicy::Skip
    )
    .expect("skip never fails");
    assert_eq!(set.spans.len(), 2);
    assert_eq!(set.spans[0].index, 0);
    assert_eq!(set.spans[1].index, 3);
    assert_eq!(set.skipped.len(), 1);
    assert_eq!(set.skipped[0].index, 1);
    assert!(set.covers(date(2024, 1, 5)));
    assert!(
      !set.covers(date(2024, 1, 3))
    );
  }

  #[test]
  fn abort_policy_stops_at_first_malformed_component(
  ) {
    let components = vec![
      ranged(
        "2024-01-01 00:00:00",
        "2024-01-02 00:00:00"
      ),
      ranged(
        "2024-01-01 00:00:00",
        "soon"
      ),
    ];
    let err = collect_spans(
      &components,
      SpanPolicy::Abort
    )
    .expect_err("abort");
    assert_eq!(err.index, 1);
  }

  #[test]
  fn span_policy_parses_config_values() {
    assert_eq!(
      "skip"
        .parse::<SpanPolicy>()
        .expect("skip"),
      SpanPolicy::Skip
    );
    assert_eq!(
      "ABORT"
        .parse::<SpanPolicy>()
        .expect("abort"),
      SpanPolicy::Abort
    );
    assert!(
      "maybe"
        .parse::<SpanPolicy>()
        .is_err()
    );
  }
}
