use std::fs;
use std::path::Path;

use almanac_shared::CalendarDto;
use anyhow::Context;
use tracing::info;

use crate::model::{
  Calendar,
  map_calendars
};

/// Decodes a `get_calendar_of_current_user` response body.
pub fn parse_payload(
  raw: &str
) -> anyhow::Result<Vec<Calendar>> {
  let dtos: Vec<CalendarDto> =
    serde_json::from_str(raw).context(
      "calendar payload is not a JSON \
       array of calendars"
    )?;
  let calendars = map_calendars(dtos)?;
  Ok(calendars)
}

#[tracing::instrument]
pub fn load_payload(
  path: &Path
) -> anyhow::Result<Vec<Calendar>> {
  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;
  let calendars = parse_payload(&raw)
    .with_context(|| {
      format!(
        "failed to load calendars from \
         {}",
        path.display()
      )
    })?;
  info!(
    count = calendars.len(),
    "loaded calendar payload"
  );
  Ok(calendars)
}
