use std::io::{
  self,
  IsTerminal,
  Write
};

use almanac_shared::{
  END_DATE_KEY,
  START_DATE_KEY
};
use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::CalDateTime;
use crate::grid::GridCell;
use crate::model::{
  Calendar,
  ComponentType
};
use crate::selection::RenderedMonth;
use crate::span::DaySpan;

const CELL_WIDTH: usize = 4;

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color_cfg = cfg
      .get("color")
      .unwrap_or_else(|| {
        "on".to_string()
      });
    let color = match color_cfg
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        true
      }
      | "off" | "no" | "false" | "0" => {
        false
      }
      | other => {
        return Err(anyhow!(
          "invalid color setting: \
           {other}"
        ));
      }
    };

    Ok(Self {
      color: color
        && io::stdout().is_terminal()
    })
  }

  pub fn plain() -> Self {
    Self { color: false }
  }

  #[tracing::instrument(skip_all)]
  pub fn print_month(
    &mut self,
    rendered: &RenderedMonth<'_>
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    self.write_month(&mut out, rendered)?;

    if let Some(calendar) =
      rendered.calendar
    {
      writeln!(out)?;
      write_component_table(
        &mut out, calendar
      )?;
    }

    for skipped in rendered.skipped() {
      writeln!(
        out,
        "skipped component #{}: {}",
        skipped.index, skipped.source
      )?;
    }

    Ok(())
  }

  pub fn write_month<W: Write>(
    &self,
    mut writer: W,
    rendered: &RenderedMonth<'_>
  ) -> anyhow::Result<()> {
    let grid = &rendered.grid;
    let row_width = CELL_WIDTH * 7;

    let title = grid.month().title();
    let padding = row_width
      .saturating_sub(
        UnicodeWidthStr::width(
          title.as_str()
        )
      )
      / 2;
    writeln!(
      writer,
      "{}{}",
      " ".repeat(padding),
      title
    )?;

    let header = grid
      .weekday_labels()
      .into_iter()
      .map(|label| format!(" {label:>2} "))
      .collect::<String>();
    writeln!(writer, "{}", header.trim_end())?;

    let accent =
      rendered.calendar.and_then(
        |calendar| {
          calendar
            .components
            .iter()
            .find_map(|c| {
              c.kind.accent_color()
            })
        }
      );

    for week in grid.weeks() {
      let line = week
        .iter()
        .map(|cell| {
          self.format_cell(cell, accent)
        })
        .collect::<String>();
      writeln!(
        writer,
        "{}",
        line.trim_end()
      )?;
    }

    Ok(())
  }

  #[tracing::instrument(skip(self))]
  pub fn print_datetime(
    &mut self,
    value: &CalDateTime
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
      out,
      "year      {}",
      value.year()
    )?;
    writeln!(
      out,
      "month     {}",
      value.month()
    )?;
    writeln!(
      out,
      "day       {}",
      value.day()
    )?;
    writeln!(
      out,
      "hour      {}",
      value.hour()
    )?;
    writeln!(
      out,
      "minute    {}",
      value.minute()
    )?;
    writeln!(
      out,
      "second    {}",
      value.second()
    )?;
    writeln!(out, "canonical {value}")?;
    Ok(())
  }

  #[tracing::instrument(skip_all)]
  pub fn print_span(
    &mut self,
    span: &DaySpan
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    let (Some(first), Some(last)) =
      (span.first(), span.last())
    else {
      writeln!(out, "(empty span)")?;
      return Ok(());
    };

    let days = span
      .days()
      .iter()
      .map(u32::to_string)
      .collect::<Vec<_>>()
      .join(" ");
    writeln!(
      out,
      "{} .. {} ({} days)",
      first,
      last,
      span.len()
    )?;
    writeln!(out, "days: {days}")?;
    Ok(())
  }

  #[tracing::instrument(skip_all)]
  pub fn print_calendars(
    &mut self,
    calendars: &[Calendar]
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    let headers = vec![
      "Name".to_string(),
      "Components".to_string(),
      "Users".to_string(),
    ];
    let rows = calendars
      .iter()
      .map(|calendar| {
        vec![
          self.paint(&calendar.name, "33"),
          calendar
            .components
            .len()
            .to_string(),
          calendar
            .users
            .iter()
            .map(|user| {
              user.username.as_str()
            })
            .collect::<Vec<_>>()
            .join(", "),
        ]
      })
      .collect();
    write_table(&mut out, headers, rows)
  }

  #[tracing::instrument(skip_all)]
  pub fn print_config(
    &mut self,
    cfg: &Config
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    let mut entries: Vec<_> =
      cfg.iter().collect();
    entries.sort();
    let rows = entries
      .into_iter()
      .map(|(k, v)| {
        vec![k.clone(), v.clone()]
      })
      .collect();
    write_table(
      &mut out,
      vec![
        "Key".to_string(),
        "Value".to_string(),
      ],
      rows
    )?;
    for file in &cfg.loaded_files {
      writeln!(
        out,
        "loaded {}",
        file.display()
      )?;
    }
    Ok(())
  }

  fn format_cell(
    &self,
    cell: &GridCell,
    accent: Option<&str>
  ) -> String {
    match cell {
      | GridCell::Blank => {
        " ".repeat(CELL_WIDTH)
      }
      | GridCell::Day {
        day,
        in_range: false
      } => format!(" {day:>2} "),
      | GridCell::Day {
        day,
        in_range: true
      } if self.color => {
        // events get their accent as a 24-bit background
        let code = accent
          .and_then(ansi_background)
          .unwrap_or_else(|| {
            "7".to_string()
          });
        format!(
          " {} ",
          self.paint(
            &format!("{day:>2}"),
            &code
          )
        )
      }
      | GridCell::Day {
        day,
        in_range: true
      } => format!("[{day:>2}]")
    }
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

fn write_component_table<W: Write>(
  mut writer: W,
  calendar: &Calendar
) -> anyhow::Result<()> {
  let headers = vec![
    "Type".to_string(),
    "Start".to_string(),
    "End".to_string(),
    "Summary".to_string(),
  ];
  let rows = calendar
    .components
    .iter()
    .map(|component| {
      vec![
        component_label(component.kind),
        component
          .properties
          .get(START_DATE_KEY)
          .unwrap_or("-")
          .to_string(),
        component
          .properties
          .get(END_DATE_KEY)
          .unwrap_or("-")
          .to_string(),
        component
          .summary()
          .unwrap_or_default()
          .to_string(),
      ]
    })
    .collect();
  write_table(&mut writer, headers, rows)
}

fn component_label(
  kind: ComponentType
) -> String {
  kind.as_str().to_string()
}

fn ansi_background(
  hex: &str
) -> Option<String> {
  let hex = hex.strip_prefix('#')?;
  if hex.len() != 6 {
    return None;
  }
  let channel =
    |range: std::ops::Range<usize>| {
      u8::from_str_radix(
        hex.get(range)?,
        16
      )
      .ok()
    };
  let (r, g, b) = (
    channel(0..2)?,
    channel(2..4)?,
    channel(4..6)?
  );
  Some(format!("48;2;{r};{g};{b};97"))
}

fn write_table<W: Write>(
  mut writer: W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let column_count = headers.len();
  let mut widths =
    vec![0usize; column_count];

  for (idx, header) in
    headers.iter().enumerate()
  {
    widths[idx] = widths[idx].max(
      UnicodeWidthStr::width(
        header.as_str()
      )
    );
  }

  for row in &rows {
    for (idx, cell) in
      row.iter().enumerate()
    {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  for idx in 0..column_count {
    write!(
      writer,
      "{:width$} ",
      headers[idx],
      width = widths[idx]
    )?;
  }
  writeln!(writer)?;

  for idx in 0..column_count {
    write!(
      writer,
      "{:-<width$} ",
      "",
      width = widths[idx]
    )?;
  }
  writeln!(writer)?;

  for row in rows {
    for idx in 0..column_count {
      let cell = &row[idx];
      let visible_width =
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        );
      let padding = widths[idx]
        .saturating_sub(visible_width);
      write!(
        writer,
        "{}{} ",
        cell,
        " ".repeat(padding)
      )?;
    }
    writeln!(writer)?;
  }

  Ok(())
}

fn strip_ansi(s: &str) -> String {
  let mut out =
    String::with_capacity(s.len());
  let mut escaped = false;

  for ch in s.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }

    if ch == '\x1b' {
      escaped = true;
      continue;
    }

    out.push(ch);
  }

  out
}
