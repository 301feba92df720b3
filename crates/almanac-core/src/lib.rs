pub mod cli;
pub mod config;
pub mod datetime;
pub mod grid;
pub mod model;
pub mod payload;
pub mod render;
pub mod selection;
pub mod span;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::cli::Command;
use crate::datetime::CalDateTime;
use crate::grid::YearMonth;
use crate::model::{
  Component,
  ComponentType,
  PropertyMap
};
use crate::selection::ViewContext;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting almanac"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.almanacrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let mut renderer =
    render::Renderer::new(&cfg)?;

  match cli.command {
    | Command::Month {
      payload,
      calendar,
      month
    } => {
      let calendars =
        payload::load_payload(&payload)?;
      let month = match month {
        | Some(raw) => {
          YearMonth::parse(&raw)
            .context("invalid --month")?
        }
        | None => {
          let tz = cfg.timezone()?;
          YearMonth::from_date(
            Utc::now()
              .with_timezone(&tz)
              .date_naive()
          )
        }
      };

      let mut ctx = ViewContext::new(month);
      ctx.selected = calendar;

      let rendered =
        selection::render_month(
          &calendars,
          &ctx,
          cfg.week_start()?,
          cfg.span_policy()?
        )?;
      renderer.print_month(&rendered)?;
    }
    | Command::Span { start, end } => {
      let component = Component::new(
        ComponentType::Other,
        PropertyMap::from_iter([
          (
            almanac_shared::START_DATE_KEY,
            start
          ),
          (
            almanac_shared::END_DATE_KEY,
            end
          )
        ])
      );
      let span = span::span_of(&component)?;
      renderer.print_span(&span)?;
    }
    | Command::Parse { text } => {
      let value =
        CalDateTime::parse(&text)?;
      renderer.print_datetime(&value)?;
    }
    | Command::Calendars { payload } => {
      let calendars =
        payload::load_payload(&payload)?;
      renderer
        .print_calendars(&calendars)?;
    }
    | Command::Config => {
      renderer.print_config(&cfg)?;
    }
  }

  info!("done");
  Ok(())
}
