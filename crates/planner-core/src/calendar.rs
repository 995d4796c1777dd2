//! Day-granularity calendar arithmetic.
//!
//! Every other module goes through these helpers for month bounds and
//! day ranges.

use chrono::{
  DateTime,
  Datelike,
  Days,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Weekday
};

/// Truncation to day granularity.
pub trait DayOnly {
  fn day_only(&self) -> NaiveDate;
}

impl DayOnly for NaiveDate {
  fn day_only(&self) -> NaiveDate {
    *self
  }
}

impl DayOnly for NaiveDateTime {
  fn day_only(&self) -> NaiveDate {
    self.date()
  }
}

impl<Tz: TimeZone> DayOnly
  for DateTime<Tz>
{
  fn day_only(&self) -> NaiveDate {
    self.date_naive()
  }
}

#[must_use]
pub fn day_only(
  date: impl DayOnly
) -> NaiveDate {
  date.day_only()
}

#[must_use]
pub fn start_of_month(
  date: impl DayOnly
) -> NaiveDate {
  let day = date.day_only();
  first_day_of_month(
    day.year(),
    day.month()
  )
}

/// Last day of the month containing `date`.
#[must_use]
pub fn last_day_of_month(
  date: impl DayOnly
) -> NaiveDate {
  let day = date.day_only();
  let (next_year, next_month) =
    if day.month() >= 12 {
      (day.year().saturating_add(1), 1_u32)
    } else {
      (day.year(), day.month() + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

/// Last instant (23:59:59) of the month containing `date`.
#[must_use]
pub fn end_of_month(
  date: impl DayOnly
) -> NaiveDateTime {
  last_day_of_month(date)
    .and_time(last_second_of_day())
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(first_day_of_month(
    year, month
  ))
  .day()
}

/// Whole days in `[from, to]`; 0 when `from > to`.
#[must_use]
pub fn inclusive_day_count(
  from: NaiveDate,
  to: NaiveDate
) -> u32 {
  if from > to {
    return 0;
  }
  u32::try_from(days_between(from, to) + 1)
    .unwrap_or(u32::MAX)
}

/// Signed number of whole days from `from` to `to`.
#[must_use]
pub fn days_between(
  from: NaiveDate,
  to: NaiveDate
) -> i64 {
  to.signed_duration_since(from)
    .num_days()
}

/// `date` moved by `days`, or `None` outside chrono's calendar range.
#[must_use]
pub fn try_add_days(
  date: NaiveDate,
  days: i64
) -> Option<NaiveDate> {
  let step =
    Days::new(days.unsigned_abs());
  if days < 0 {
    date.checked_sub_days(step)
  } else {
    date.checked_add_days(step)
  }
}

/// [`try_add_days`] saturating at `NaiveDate::MIN`/`MAX`. For the
/// week- and month-sized steps of the engine and the grid; user input
/// goes through [`try_add_days`].
#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  try_add_days(date, days).unwrap_or(
    if days < 0 {
      NaiveDate::MIN
    } else {
      NaiveDate::MAX
    }
  )
}

/// Moves `date` by whole months, clamping the day to the target
/// month's length.
#[must_use]
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> Option<NaiveDate> {
  let step =
    Months::new(months.unsigned_abs());
  if months < 0 {
    date.checked_sub_months(step)
  } else {
    date.checked_add_months(step)
  }
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

fn last_second_of_day() -> NaiveTime {
  NaiveTime::from_hms_opt(23, 59, 59)
    .unwrap_or(NaiveTime::MIN)
}

/// Inclusive `[start, end]` range of days the engine computes over.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
pub struct DayWindow {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl DayWindow {
  #[must_use]
  pub fn new(
    start: NaiveDate,
    end: NaiveDate
  ) -> Self {
    Self { start, end }
  }

  /// The whole month containing `date`.
  #[must_use]
  pub fn month_of(
    date: impl DayOnly
  ) -> Self {
    let day = date.day_only();
    Self {
      start: start_of_month(day),
      end:   last_day_of_month(day)
    }
  }

  #[must_use]
  pub fn contains(
    &self,
    day: NaiveDate
  ) -> bool {
    self.start <= day && day <= self.end
  }

  #[must_use]
  pub fn len_days(&self) -> u32 {
    inclusive_day_count(
      self.start, self.end
    )
  }

  pub fn days(
    &self
  ) -> impl Iterator<Item = NaiveDate>
  {
    let start = self.start;
    (0..i64::from(self.len_days()))
      .map(move |offset| {
        add_days(start, offset)
      })
  }

  #[must_use]
  pub fn end_instant(
    &self
  ) -> NaiveDateTime {
    self
      .end
      .and_time(last_second_of_day())
  }

  /// Month window `months` away from the month of `start`.
  #[must_use]
  pub fn shift_months(
    &self,
    months: i32
  ) -> Option<Self> {
    shift_months(
      start_of_month(self.start),
      months
    )
    .map(Self::month_of)
  }
}
