use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "PLANNERRC";
const RC_FILE_NAME: &str = ".plannerrc";

/// Keys the planner reads, with their defaults.
const DEFAULTS: [(&str, &str); 4] = [
  ("data.location", "~/.planner"),
  ("default.command", "month"),
  ("color", "on"),
  ("week.start", "sunday")
];

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map: DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }
}

#[derive(Debug, PartialEq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

/// One line of a plannerrc: `key = value`, `include PATH`, or nothing.
fn parse_rc_line(
  raw: &str
) -> Option<RcLine<'_>> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return Some(RcLine::Blank);
  }
  if let Some(path) =
    line.strip_prefix("include ")
  {
    return Some(RcLine::Include(
      path.trim()
    ));
  }
  let (key, value) =
    line.split_once('=')?;
  let key = key.trim();
  (!key.is_empty()).then(|| {
    RcLine::Setting(key, value.trim())
  })
}

impl Config {
  /// Defaults, then the plannerrc picked by `--plannerrc`, `$PLANNERRC`
  /// or `~/.plannerrc`.
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match rc_path(rc_override) {
      | Some(path) => {
        info!(plannerrc = %path.display(), "loading plannerrc");
        cfg.read_rc(&path, &mut vec![])?;
      }
      | None => {
        debug!(
          "no plannerrc; using defaults"
        );
      }
    }

    Ok(cfg)
  }

  /// `rc.week.start` and `week.start` name the same key.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      let key = key
        .strip_prefix("rc.")
        .map(str::to_string)
        .unwrap_or(key);
      self.set(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// `color` as a switch; anything but on/off spellings is an error.
  pub fn color_enabled(
    &self
  ) -> anyhow::Result<bool> {
    let raw = self
      .map
      .get("color")
      .map_or("on", String::as_str);
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        Ok(true)
      }
      | "off" | "no" | "false" | "0" => {
        Ok(false)
      }
      | other => Err(anyhow!(
        "invalid color setting: \
         {other} (expected on or off)"
      ))
    }
  }

  /// First column of the month grid. Only `monday` changes the default.
  pub fn week_start(&self) -> Weekday {
    let raw = self
      .map
      .get("week.start")
      .map_or("sunday", |v| v.trim());
    if raw.eq_ignore_ascii_case("monday")
    {
      Weekday::Mon
    } else {
      if !raw
        .eq_ignore_ascii_case("sunday")
      {
        warn!(value = %raw, "week.start must be sunday or monday; using sunday");
      }
      Weekday::Sun
    }
  }

  /// Data directory from `--data` or `data.location`, created if missing.
  #[tracing::instrument(skip(
    self,
    override_dir
  ))]
  pub fn data_dir(
    &self,
    override_dir: Option<&Path>
  ) -> anyhow::Result<PathBuf> {
    let dir = match override_dir {
      | Some(path) => {
        path.to_path_buf()
      }
      | None => {
        let raw = self
          .get("data.location")
          .unwrap_or_default();
        if raw.trim().is_empty() {
          return Err(anyhow!(
            "data.location is empty"
          ));
        }
        expand_home(Path::new(
          raw.trim()
        ))
        .context("data.location")?
      }
    };

    if !dir.exists() {
      info!(dir = %dir.display(), "creating data directory");
      fs::create_dir_all(&dir)
        .with_context(|| {
          format!(
            "failed to create data \
             directory {}",
            dir.display()
          )
        })?;
    }

    Ok(dir)
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  fn set(
    &mut self,
    key: String,
    value: String
  ) {
    if !DEFAULTS
      .iter()
      .any(|(known, _)| *known == key)
    {
      warn!(key = %key, "unknown planner setting; kept but unused");
    }
    trace!(key = %key, value = %value, "config key set");
    self.map.insert(key, value);
  }

  /// Reads `path` and its includes. `open` holds the files currently
  /// being read, so a file that includes itself, directly or through
  /// others, is rejected.
  fn read_rc(
    &mut self,
    path: &Path,
    open: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_home(path)?;
    let canonical = fs::canonicalize(
      &path
    )
    .with_context(|| {
      format!(
        "failed to read plannerrc {}",
        path.display()
      )
    })?;
    if open.contains(&canonical) {
      return Err(anyhow!(
        "include cycle at {}",
        path.display()
      ));
    }

    let text =
      fs::read_to_string(&canonical)
        .with_context(|| {
          format!(
            "failed to read plannerrc {}",
            path.display()
          )
        })?;
    self
      .loaded_files
      .push(canonical.clone());
    let base_dir = canonical
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();
    open.push(canonical);

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      match parse_rc_line(raw_line) {
        | Some(RcLine::Blank) => {}
        | Some(RcLine::Setting(
          key,
          value
        )) => {
          self.set(
            key.to_string(),
            value.to_string()
          );
        }
        | Some(RcLine::Include(
          include
        )) => {
          if include.is_empty() {
            return Err(anyhow!(
              "{}:{}: include needs a \
               path",
              path.display(),
              idx + 1
            ));
          }
          let target =
            base_dir.join(expand_home(
              Path::new(include)
            )?);
          if !target.exists() {
            warn!(include = %target.display(), "included plannerrc missing; skipped");
            continue;
          }
          debug!(include = %target.display(), line = idx + 1, "reading include");
          self.read_rc(&target, open)?;
        }
        | None => {
          return Err(anyhow!(
            "invalid config line {}:{}: \
             {} (expected key = value)",
            path.display(),
            idx + 1,
            raw_line.trim()
          ));
        }
      }
    }

    open.pop();
    Ok(())
  }
}

/// `--plannerrc`, then `$PLANNERRC` (empty or `/dev/null` disables),
/// then `~/.plannerrc` when it exists.
fn rc_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  match std::env::var_os(RC_ENV_VAR) {
    | Some(raw)
      if raw.is_empty()
        || raw == "/dev/null" =>
    {
      None
    }
    | Some(raw) => {
      Some(PathBuf::from(raw))
    }
    | None => dirs::home_dir()
      .map(|home| {
        home.join(RC_FILE_NAME)
      })
      .filter(|candidate| {
        candidate.exists()
      })
  }
}

/// Replaces a leading `~/`; absolute and relative paths pass through.
fn expand_home(
  path: &Path
) -> anyhow::Result<PathBuf> {
  let Ok(rest) = path.strip_prefix("~")
  else {
    return Ok(path.to_path_buf());
  };
  let home =
    dirs::home_dir().ok_or_else(|| {
      anyhow!(
        "cannot expand {}: no home \
         directory",
        path.display()
      )
    })?;
  Ok(home.join(rest))
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::Weekday;
  use tempfile::tempdir;

  use super::{
    Config,
    RcLine,
    parse_rc_line
  };

  #[test]
  fn loads_rc_file_with_includes_and_comments(
  ) {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "color = off\n"
    )
    .expect("write include");
    let rc = temp.path().join("main.rc");
    fs::write(
      &rc,
      "# planner settings\n\
       week.start = Monday  # grid\n\
       include extra.rc\n\
       data.location = /tmp/planner\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path()))
      .expect("load config");

    assert_eq!(
      cfg.week_start(),
      Weekday::Mon
    );
    assert!(
      !cfg
        .color_enabled()
        .expect("color switch")
    );
    assert_eq!(
      cfg.get("data.location").as_deref(),
      Some("/tmp/planner")
    );
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("month")
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn include_cycles_are_errors() {
    let temp =
      tempdir().expect("tempdir");
    let own = temp.path().join("a.rc");
    fs::write(&own, "include a.rc\n")
      .expect("write self include");
    let err =
      Config::load(Some(own.as_path()))
        .expect_err("self include");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );

    let first = temp.path().join("b.rc");
    let second = temp.path().join("c.rc");
    fs::write(
      &first,
      "color = off\ninclude c.rc\n"
    )
    .expect("write b");
    fs::write(&second, "include b.rc\n")
      .expect("write c");
    let err =
      Config::load(Some(first.as_path()))
        .expect_err("mutual include");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn same_file_may_be_included_twice_without_a_cycle(
  ) {
    let temp =
      tempdir().expect("tempdir");
    fs::write(
      temp.path().join("shared.rc"),
      "week.start = monday\n"
    )
    .expect("write shared");
    let rc = temp.path().join("main.rc");
    fs::write(
      &rc,
      "include shared.rc\ninclude shared.rc\n"
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path()))
      .expect("diamond include");
    assert_eq!(
      cfg.week_start(),
      Weekday::Mon
    );
  }

  #[test]
  fn rejects_lines_without_equals() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "week.start\n")
      .expect("write rc");

    let err = Config::load(Some(rc.as_path()))
      .expect_err("invalid line");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn rc_lines_strip_comments() {
    assert_eq!(
      parse_rc_line("  # only"),
      Some(RcLine::Blank)
    );
    assert_eq!(
      parse_rc_line("color = off # no"),
      Some(RcLine::Setting("color", "off"))
    );
    assert_eq!(
      parse_rc_line("include ~/x.rc"),
      Some(RcLine::Include("~/x.rc"))
    );
    assert_eq!(
      parse_rc_line("= off"),
      None
    );
  }

  #[test]
  fn overrides_and_invalid_values() {
    let mut cfg = Config::default();
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );

    cfg.apply_overrides(vec![
      (
        "rc.week.start".to_string(),
        "friday".to_string()
      ),
      (
        "color".to_string(),
        "sometimes".to_string()
      )
    ]);
    assert_eq!(
      cfg.get("week.start").as_deref(),
      Some("friday")
    );
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );
    assert!(
      cfg
        .color_enabled()
        .expect_err("bad color")
        .to_string()
        .contains("invalid color setting")
    );
  }

  #[test]
  fn data_dir_prefers_flag_and_creates_it(
  ) {
    let temp =
      tempdir().expect("tempdir");
    let mut cfg = Config::default();
    let flagged = temp.path().join("flag");
    assert_eq!(
      cfg
        .data_dir(Some(flagged.as_path()))
        .expect("flag dir"),
      flagged
    );
    assert!(flagged.is_dir());

    let configured =
      temp.path().join("configured");
    cfg.apply_overrides(vec![(
      "data.location".to_string(),
      configured.display().to_string()
    )]);
    assert_eq!(
      cfg.data_dir(None).expect("cfg dir"),
      configured
    );

    cfg.apply_overrides(vec![(
      "data.location".to_string(),
      " ".to_string()
    )]);
    assert!(cfg.data_dir(None).is_err());
  }
}
