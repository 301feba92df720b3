use chrono::Weekday;
use thiserror::Error;
use tracing::{
  debug,
  info
};

use crate::grid::{
  MonthGrid,
  YearMonth
};
use crate::model::Calendar;
use crate::span::{
  SpanError,
  SpanPolicy,
  SpanSet,
  collect_spans
};

#[derive(
  Debug, Error, Clone, PartialEq, Eq,
)]
pub enum SelectionError {
  #[error(
    "invalid calendar selected: {0}"
  )]
  UnknownCalendar(String),

  #[error(
    "failed to map calendar \
     {calendar:?}"
  )]
  Span {
    calendar: String,
    #[source]
    source:   SpanError
  }
}

/// What the user is looking at: the selected calendar (by name) and the month
/// on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContext {
  pub selected: Option<String>,
  pub month:    YearMonth
}

impl ViewContext {
  pub fn new(month: YearMonth) -> Self {
    Self {
      selected: None,
      month
    }
  }

  pub fn with_calendar(
    mut self,
    name: impl Into<String>
  ) -> Self {
    self.selected = Some(name.into());
    self
  }

  pub fn next_month(&self) -> Self {
    Self {
      selected: self.selected.clone(),
      month:    self.month.next()
    }
  }

  pub fn prev_month(&self) -> Self {
    Self {
      selected: self.selected.clone(),
      month:    self.month.prev()
    }
  }
}

/// Finds a calendar by name. An empty name means nothing is selected.
pub fn select_calendar<'a>(
  calendars: &'a [Calendar],
  name: &str
) -> Result<
  Option<&'a Calendar>,
  SelectionError
> {
  let name = name.trim();
  if name.is_empty() {
    return Ok(None);
  }

  calendars
    .iter()
    .find(|calendar| {
      calendar.name == name
    })
    .map(Some)
    .ok_or_else(|| {
      SelectionError::UnknownCalendar(
        name.to_string()
      )
    })
}

#[derive(Debug, Clone)]
pub struct RenderedMonth<'a> {
  pub grid:     MonthGrid,
  pub calendar: Option<&'a Calendar>,
  pub spans:    SpanSet
}

impl RenderedMonth<'_> {
  pub fn skipped(&self) -> &[SpanError] {
    &self.spans.skipped
  }
}

/// Builds the grid for `ctx.month` and highlights every day covered by a
/// component of the selected calendar.
#[tracing::instrument(
  skip(calendars),
  fields(
    month = %ctx.month,
    selected = ?ctx.selected
  )
)]
pub fn render_month<'a>(
  calendars: &'a [Calendar],
  ctx: &ViewContext,
  week_start: Weekday,
  policy: SpanPolicy
) -> Result<RenderedMonth<'a>, SelectionError>
{
  let mut grid =
    MonthGrid::new(ctx.month, week_start);

  let calendar =
    match ctx.selected.as_deref() {
      | Some(name) => {
        select_calendar(calendars, name)?
      }
      | None => None
    };

  let Some(calendar) = calendar else {
    debug!("no calendar selected; rendering empty grid");
    return Ok(RenderedMonth {
      grid,
      calendar: None,
      spans: SpanSet::default()
    });
  };

  let spans = collect_spans(
    &calendar.components,
    policy
  )
  .map_err(|source| {
    SelectionError::Span {
      calendar: calendar.name.clone(),
      source
    }
  })?;

  for entry in &spans.spans {
    grid.highlight(&entry.span);
  }

  info!(
    calendar = %calendar.name,
    spans = spans.spans.len(),
    skipped = spans.skipped.len(),
    highlighted = grid.highlighted_days().len(),
    "rendered month"
  );

  Ok(RenderedMonth {
    grid,
    calendar: Some(calendar),
    spans
  })
}
