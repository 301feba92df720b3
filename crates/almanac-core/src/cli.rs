use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Parser,
  Subcommand
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
  pub cleaned_args: Vec<OsString>,
  pub rc_overrides: Vec<(String, String)>
}

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(
        || {
          anyhow!(
            "expected KEY=VALUE, got: {s}"
          )
        }
      )?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "almanac",
  version,
  about = "Month grid and date-span viewer for calendar payloads"
)]
pub struct GlobalCli {
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true
  )]
  pub verbose: u8,

  #[arg(
    short = 'q',
    long = "quiet",
    action = ArgAction::Count,
    global = true
  )]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
    action = ArgAction::Append,
    global = true
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(
    long = "almanacrc",
    global = true
  )]
  pub almanacrc: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Render one month with the selected calendar's spans highlighted.
  Month {
    #[arg(long)]
    payload: PathBuf,

    #[arg(long)]
    calendar: Option<String>,

    /// YYYY-MM; defaults to the current month.
    #[arg(long)]
    month: Option<String>
  },

  /// Print the days covered by a start/end pair.
  Span {
    #[arg(long)]
    start: String,

    #[arg(long)]
    end: String
  },

  /// Parse a backend datetime and print its fields.
  Parse { text: String },

  /// List calendars in a payload.
  Calendars {
    #[arg(long)]
    payload: PathBuf
  },

  /// Show the effective configuration.
  Config
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log \
           filter: {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_level(true)
      .with_writer(std::io::stderr)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(error = %err, "tracing subscriber already set, continuing");
  }

  Ok(())
}

/// Pulls `rc.key=value` / `rc.key:value` tokens out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(
  raw: &[OsString]
) -> anyhow::Result<PreprocessedArgs> {
  let mut cleaned =
    Vec::with_capacity(raw.len());
  let mut overrides: Vec<(
    String,
    String
  )> = Vec::new();

  let mut iter = raw.iter().cloned();
  if let Some(bin) = iter.next() {
    cleaned.push(bin);
  }

  for arg in iter {
    let s = arg.to_string_lossy();
    if let Some(rest) =
      s.strip_prefix("rc.")
    {
      let parsed = if let Some((k, v)) =
        rest.split_once('=')
      {
        Some((
          format!("rc.{k}"),
          v.to_string()
        ))
      } else if let Some((k, v)) =
        rest.split_once(':')
      {
        Some((
          format!("rc.{k}"),
          v.to_string()
        ))
      } else {
        None
      };

      if let Some((k, v)) = parsed {
        debug!(key = %k, value = %v, "captured positional rc override");
        overrides.push((k, v));
        continue;
      }
    }

    cleaned.push(arg);
  }

  Ok(PreprocessedArgs {
    cleaned_args: cleaned,
    rc_overrides: overrides
  })
}
