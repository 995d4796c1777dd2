use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Local,
  NaiveDate,
  NaiveTime,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::calendar::{
  DayOnly,
  add_days,
  shift_months,
  try_add_days,
  start_of_month
};

const TIMEZONE_CONFIG_FILE: &str =
  "planner-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "PLANNER_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "PLANNER_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Explicitly configured timezone, if any. `None` means the host calendar
/// decides day boundaries.
pub fn configured_timezone()
-> Option<&'static Tz> {
  static CONFIGURED_TZ: OnceLock<
    Option<Tz>
  > = OnceLock::new();
  CONFIGURED_TZ
    .get_or_init(
      resolve_configured_timezone
    )
    .as_ref()
}

/// Calendar day of `now` in the configured timezone or the host calendar.
#[must_use]
pub fn local_day(
  now: DateTime<Utc>
) -> NaiveDate {
  match configured_timezone() {
    | Some(tz) => {
      now.with_timezone(tz).day_only()
    }
    | None => now
      .with_timezone(&Local)
      .day_only()
  }
}

#[derive(Debug)]
enum TimezoneSource {
  Env,
  File(PathBuf)
}

fn resolve_configured_timezone()
-> Option<Tz> {
  match timezone_from_env()
    .or_else(timezone_from_file)
  {
    | Some((tz, source)) => {
      tracing::info!(timezone = %tz, ?source, "using configured timezone");
      Some(tz)
    }
    | None => {
      tracing::debug!(
        "no timezone configured; \
         day boundaries follow the host"
      );
      None
    }
  }
}

fn timezone_from_env()
-> Option<(Tz, TimezoneSource)> {
  let raw =
    std::env::var(TIMEZONE_ENV_VAR)
      .ok()?;
  match parse_timezone_id(&raw) {
    | Ok(tz) => {
      Some((tz, TimezoneSource::Env))
    }
    | Err(err) => {
      tracing::warn!(error = %err, "ignoring {}", TIMEZONE_ENV_VAR);
      None
    }
  }
}

/// `$PLANNER_TIME_CONFIG`, else `planner-time.toml` in the working
/// directory.
fn timezone_from_file()
-> Option<(Tz, TimezoneSource)> {
  let path = std::env::var_os(
    TIMEZONE_CONFIG_ENV_VAR
  )
  .filter(|raw| !raw.is_empty())
  .map(PathBuf::from)
  .or_else(|| {
    std::env::current_dir().ok().map(
      |dir| {
        dir.join(TIMEZONE_CONFIG_FILE)
      }
    )
  })?;
  if !path.is_file() {
    return None;
  }

  match read_timezone_file(&path) {
    | Ok(Some(tz)) => Some((
      tz,
      TimezoneSource::File(path)
    )),
    | Ok(None) => {
      tracing::warn!(
        file = %path.display(),
        "no timezone key in planner-time.toml"
      );
      None
    }
    | Err(err) => {
      tracing::warn!(
        file = %path.display(),
        error = %format!("{err:#}"),
        "ignoring timezone file"
      );
      None
    }
  }
}

fn read_timezone_file(
  path: &Path
) -> anyhow::Result<Option<Tz>> {
  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;
  parse_timezone_config(&raw)?
    .map(|id| parse_timezone_id(&id))
    .transpose()
}

/// `timezone = "..."` at the top level or under `[time]`.
fn parse_timezone_config(
  raw: &str
) -> anyhow::Result<Option<String>> {
  let parsed =
    toml::from_str::<TimezoneConfig>(
      raw
    )
    .context(
      "planner-time.toml is not valid \
       toml"
    )?;
  Ok(parsed.timezone.or_else(|| {
    parsed
      .time
      .and_then(|section| section.timezone)
  }))
}

fn parse_timezone_id(
  raw: &str
) -> anyhow::Result<Tz> {
  let id = raw.trim();
  if id.is_empty() {
    return Err(anyhow!(
      "timezone id is empty"
    ));
  }
  id.parse::<Tz>().map_err(|err| {
    anyhow!(
      "unknown timezone {id}: {err}"
    )
  })
}

/// Resolves a day expression relative to `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_day_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  if let Some(target_weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today,
      target_weekday
    ));
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)d$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(token)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
    let offset =
      if negative { -num } else { num };
    return try_add_days(today, offset)
      .ok_or_else(|| {
        anyhow!(
          "day offset out of range: \
           {token}"
        )
      });
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized day expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd, YYYY-MM-DD"
  })
}

/// Resolves a month expression to the first day of that month.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_month_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let this_month =
    start_of_month(today);

  match lower.as_str() {
    | "this" | "current" => {
      return Ok(this_month);
    }
    | "next" => {
      return step_month(this_month, 1);
    }
    | "prev" | "previous" | "last" => {
      return step_month(this_month, -1);
    }
    | _ => {}
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    return NaiveDate::from_ymd_opt(
      today.year(),
      month,
      1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month value: {month}"
      )
    });
  }

  if let Some(step) = token
    .strip_prefix('+')
    .or_else(|| {
      token
        .starts_with('-')
        .then_some(token)
    })
    && let Ok(step) = step.parse::<i64>()
  {
    let step = i32::try_from(step)
      .map_err(|_| {
        anyhow!(
          "month offset out of range: \
           {token}"
        )
      })?;
    return step_month(this_month, step);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &format!("{token}-01"),
      "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized month expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: this/next/prev, \
     +N/-N, month names (e.g. march), \
     YYYY-MM"
  })
}

fn step_month(
  month_start: NaiveDate,
  months: i32
) -> anyhow::Result<NaiveDate> {
  shift_months(month_start, months)
    .ok_or_else(|| {
      anyhow!(
        "month offset out of range: \
         {months:+}"
      )
    })
}

/// `15:23`, `3:23pm` and friends.
pub fn parse_clock_time(
  token: &str
) -> anyhow::Result<NaiveTime> {
  let (hour, minute) =
    parse_clock_parts(token)
      .ok_or_else(|| {
        anyhow!(
          "invalid clock time: \
           {token} (expected HH:MM or \
           H:MMam/pm)"
        )
      })?;
  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
  .ok_or_else(|| {
    anyhow!(
      "invalid clock time: {token}"
    )
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  add_days(from, delta)
}

fn parse_clock_parts(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}


pub mod compact_utc_serde {
  use chrono::{
    DateTime,
    NaiveDateTime,
    Utc
  };
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  const FORMAT: &str = "%Y%m%dT%H%M%SZ";

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &dt.format(FORMAT).to_string()
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    NaiveDateTime::parse_from_str(
      &raw, FORMAT
    )
    .map(|ndt| {
      DateTime::<Utc>::from_naive_utc_and_offset(
        ndt, Utc
      )
    })
    .map_err(serde::de::Error::custom)
  }
}
