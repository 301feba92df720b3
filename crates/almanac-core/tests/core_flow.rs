use std::collections::BTreeSet;
use std::fs;

use almanac_core::config::Config;
use almanac_core::grid::YearMonth;
use almanac_core::payload::load_payload;
use almanac_core::render::Renderer;
use almanac_core::selection::{
  SelectionError,
  ViewContext,
  render_month
};
use almanac_core::span::{
  SpanPolicy,
  is_in_span,
  span_of
};
use tempfile::tempdir;

const PAYLOAD: &str = r#"[
  {
    "name": "work",
    "components": [
      {
        "c_type": "EVENT",
        "properties": [
          { "key": "SUMMARY", "val": "release week" },
          { "key": "START_DATE", "val": "2024-10-28 09:00:00.000000000 +01:00" },
          { "key": "END_DATE", "val": "2024-11-01 17:00:00.000000000 +01:00" }
        ]
      },
      {
        "c_type": "TODO",
        "properties": [
          { "key": "SUMMARY", "val": "no dates" }
        ]
      },
      {
        "c_type": "VENUE",
        "properties": [
          { "key": "START_DATE", "val": "2024-10-xx 00:00:00" },
          { "key": "END_DATE", "val": "2024-10-10 00:00:00" }
        ]
      }
    ],
    "properties": [{ "key": "COLOR", "val": "blue" }],
    "users": [{ "username": "ada", "email": "ada@example.org" }]
  },
  {
    "name": "home",
    "components": []
  }
]"#;

fn october() -> YearMonth {
  YearMonth::new(2024, 10)
    .expect("month")
}

#[test]
fn payload_to_highlighted_month() {
  let temp = tempdir().expect("tempdir");
  let payload_path =
    temp.path().join("calendars.json");
  fs::write(&payload_path, PAYLOAD)
    .expect("write payload");

  let rc_path =
    temp.path().join("almanacrc");
  fs::write(
    &rc_path,
    "calendar.week_start = sunday\n\
     span.on_error = skip\n\
     color = off\n"
  )
  .expect("write rc");

  let cfg =
    Config::load(Some(rc_path.as_path()))
      .expect("load config");
  let calendars =
    load_payload(&payload_path)
      .expect("load payload");
  assert_eq!(calendars.len(), 2);

  let ctx = ViewContext::new(october())
    .with_calendar("work");
  let rendered = render_month(
    &calendars,
    &ctx,
    cfg.week_start().expect("week start"),
    cfg.span_policy().expect("policy")
  )
  .expect("render october");

  assert_eq!(
    rendered.grid.highlighted_days(),
    vec![28, 29, 30, 31]
  );
  assert_eq!(rendered.spans.spans.len(), 1);
  assert_eq!(rendered.skipped().len(), 1);
  assert_eq!(rendered.skipped()[0].index, 2);

  let november = render_month(
    &calendars,
    &ctx.next_month(),
    cfg.week_start().expect("week start"),
    SpanPolicy::Skip
  )
  .expect("render november");
  assert_eq!(
    november.grid.highlighted_days(),
    vec![1]
  );

  let mut buf = Vec::new();
  Renderer::new(&cfg)
    .expect("renderer")
    .write_month(&mut buf, &rendered)
    .expect("write month");
  let text =
    String::from_utf8(buf).expect("utf8");
  assert!(text.contains("October 2024"));
  assert!(text.contains("[28][29][30][31]"));
}

#[test]
fn abort_policy_surfaces_malformed_component(
) {
  let temp = tempdir().expect("tempdir");
  let payload_path =
    temp.path().join("calendars.json");
  fs::write(&payload_path, PAYLOAD)
    .expect("write payload");

  let calendars =
    load_payload(&payload_path)
      .expect("load payload");
  let ctx = ViewContext::new(october())
    .with_calendar("work");

  let err = render_month(
    &calendars,
    &ctx,
    chrono::Weekday::Mon,
    SpanPolicy::Abort
  )
  .expect_err("abort");
  match err {
    | SelectionError::Span {
      calendar,
      source
    } => {
      assert_eq!(calendar, "work");
      assert_eq!(source.index, 2);
    }
    | other => {
      panic!("unexpected error: {other:?}")
    }
  }
}

#[test]
fn unknown_calendar_and_missing_file_are_errors(
) {
  let temp = tempdir().expect("tempdir");
  assert!(
    load_payload(
      &temp.path().join("missing.json")
    )
    .is_err()
  );

  let payload_path =
    temp.path().join("calendars.json");
  fs::write(&payload_path, PAYLOAD)
    .expect("write payload");
  let calendars =
    load_payload(&payload_path)
      .expect("load payload");

  let ctx = ViewContext::new(october())
    .with_calendar("school");
  assert!(matches!(
    render_month(
      &calendars,
      &ctx,
      chrono::Weekday::Mon,
      SpanPolicy::Skip
    ),
    Err(SelectionError::UnknownCalendar(_))
  ));
}

#[test]
fn span_membership_matches_day_set() {
  let temp = tempdir().expect("tempdir");
  let payload_path =
    temp.path().join("calendars.json");
  fs::write(&payload_path, PAYLOAD)
    .expect("write payload");
  let calendars =
    load_payload(&payload_path)
      .expect("load payload");

  let release = &calendars[0].components[0];
  let span = span_of(release).expect("span");
  assert_eq!(
    span.days(),
    BTreeSet::from([1, 28, 29, 30, 31])
  );
  assert!(is_in_span(29, &span));
  assert!(!is_in_span(2, &span));

  let undated = &calendars[0].components[1];
  assert!(
    span_of(undated)
      .expect("span")
      .is_empty()
  );
}
