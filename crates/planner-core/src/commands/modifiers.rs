use anyhow::anyhow;
use chrono::{
  NaiveDate,
  NaiveTime
};
use tracing::{
  instrument,
  warn
};

use crate::datetime::{
  parse_clock_time,
  parse_day_expr
};
use crate::task::{
  COLOR_TAGS,
  RepeatRule,
  TaskDraft
};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Mod {
  Day(NaiveDate),
  Start(NaiveTime),
  End(NaiveTime),
  Category(String),
  Color(String),
  Repeat(RepeatRule),
  Details(Option<String>)
}

/// Splits `args` into title words and `key:value` modifiers. Everything
/// after `--` is title text.
#[instrument(skip(args, today))]
pub(super) fn parse_title_and_mods(
  args: &[String],
  today: NaiveDate
) -> anyhow::Result<(Option<String>, Vec<Mod>)>
{
  let mut title_parts = Vec::new();
  let mut mods = Vec::new();

  let mut literal = false;
  for arg in args {
    if arg == "--" {
      literal = true;
      continue;
    }

    if !literal
      && let Some(one_mod) =
        parse_one_mod(arg, today)?
    {
      mods.push(one_mod);
      continue;
    }

    title_parts.push(arg.clone());
  }

  let title = if title_parts.is_empty() {
    None
  } else {
    Some(title_parts.join(" "))
  };

  Ok((title, mods))
}

fn parse_one_mod(
  tok: &str,
  today: NaiveDate
) -> anyhow::Result<Option<Mod>> {
  let Some((key, value)) =
    tok.split_once(':')
  else {
    return Ok(None);
  };

  let key = key.to_ascii_lowercase();

  match key.as_str() {
    | "day" | "date" => {
      Ok(Some(Mod::Day(
        parse_day_expr(value, today)?
      )))
    }
    | "start" => {
      Ok(Some(Mod::Start(
        parse_clock_time(value)?
      )))
    }
    | "end" => {
      Ok(Some(Mod::End(
        parse_clock_time(value)?
      )))
    }
    | "category" | "cat" => {
      let category = value.trim();
      if category.is_empty() {
        return Err(anyhow!(
          "category cannot be empty"
        ));
      }
      Ok(Some(Mod::Category(
        category.to_string()
      )))
    }
    | "color" => {
      let color = value
        .trim()
        .to_ascii_lowercase();
      if !COLOR_TAGS
        .contains(&color.as_str())
      {
        warn!(color = %color, "color tag outside the standard palette");
      }
      Ok(Some(Mod::Color(color)))
    }
    | "repeat" | "recur" => {
      Ok(Some(Mod::Repeat(
        RepeatRule::normalize(value)
      )))
    }
    | "details" | "note" => {
      let details = value.trim();
      Ok(Some(Mod::Details(
        (!details.is_empty())
          .then(|| details.to_string())
      )))
    }
    | _ => Ok(None)
  }
}

/// Applies `mods` in order. Moving the start without an explicit `end:`
/// keeps the block's length, which must still end on the same day.
pub(super) fn apply_mods(
  draft: &mut TaskDraft,
  mods: &[Mod]
) -> anyhow::Result<()> {
  let explicit_end = mods
    .iter()
    .any(|one_mod| {
      matches!(one_mod, Mod::End(_))
    });

  for one_mod in mods {
    match one_mod {
      | Mod::Day(day) => {
        draft.day = *day;
      }
      | Mod::Start(start) => {
        let length =
          draft.end - draft.start;
        if !explicit_end {
          let (end, wrapped) = start
            .overflowing_add_signed(length);
          if wrapped != 0 {
            return Err(anyhow!(
              "a {}m block starting at {} \
               would cross midnight; give \
               end: as well",
              length.num_minutes(),
              start.format("%H:%M")
            ));
          }
          draft.end = end;
        }
        draft.start = *start;
      }
      | Mod::End(end) => {
        draft.end = *end;
      }
      | Mod::Category(category) => {
        draft.category =
          category.clone();
      }
      | Mod::Color(color) => {
        draft.color_tag =
          color.clone();
      }
      | Mod::Repeat(rule) => {
        draft.repeat_rule = *rule;
      }
      | Mod::Details(details) => {
        draft.details =
          details.clone();
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveTime;

  use super::*;
  use crate::test_support::day;

  fn args(
    items: &[&str]
  ) -> Vec<String> {
    items
      .iter()
      .map(|s| s.to_string())
      .collect()
  }

  fn time(
    h: u32,
    m: u32
  ) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0)
      .expect("valid time")
  }

  #[test]
  fn splits_title_words_from_modifiers(
  ) {
    let today = day(2024, 2, 1);
    let (title, mods) =
      parse_title_and_mods(
        &args(&[
          "Study",
          "start:18:00",
          "SwiftUI",
          "repeat:Weekly",
          "--",
          "cat:Study"
        ]),
        today
      )
      .expect("parse");

    assert_eq!(
      title.as_deref(),
      Some("Study SwiftUI cat:Study")
    );
    assert_eq!(
      mods,
      vec![
        Mod::Start(time(18, 0)),
        Mod::Repeat(RepeatRule::Weekly)
      ]
    );
  }

  #[test]
  fn moving_start_keeps_length_unless_end_given(
  ) {
    let mut draft = TaskDraft::new(
      "Gym",
      day(2024, 2, 1)
    );
    apply_mods(
      &mut draft,
      &[Mod::Start(time(19, 30))]
    )
    .expect("same day");
    assert_eq!(
      draft.end,
      time(20, 30)
    );

    apply_mods(
      &mut draft,
      &[
        Mod::End(time(21, 0)),
        Mod::Start(time(20, 0))
      ]
    )
    .expect("explicit end");
    assert_eq!(
      draft.start,
      time(20, 0)
    );
    assert_eq!(
      draft.end,
      time(21, 0)
    );
  }

  #[test]
  fn late_start_that_would_wrap_past_midnight_fails(
  ) {
    let mut draft = TaskDraft::new(
      "Read",
      day(2024, 2, 1)
    );
    let err = apply_mods(
      &mut draft,
      &[Mod::Start(time(23, 30))]
    )
    .expect_err("crosses midnight");
    assert!(
      err
        .to_string()
        .contains("would cross midnight")
    );

    assert_eq!(
      draft.start,
      time(9, 0)
    );

    apply_mods(
      &mut draft,
      &[Mod::Start(time(22, 30))]
    )
    .expect("ends before midnight");
    assert_eq!(
      draft.end,
      time(23, 30)
    );
  }

  #[test]
  fn rejects_bad_values() {
    let today = day(2024, 2, 1);
    assert!(
      parse_title_and_mods(
        &args(&["x", "start:25:00"]),
        today
      )
      .is_err()
    );
    assert!(
      parse_title_and_mods(
        &args(&["x", "category:"]),
        today
      )
      .is_err()
    );

    let (_, mods) =
      parse_title_and_mods(
        &args(&["details:"]),
        today
      )
      .expect("parse");
    assert_eq!(
      mods,
      vec![Mod::Details(None)]
    );
  }
}
