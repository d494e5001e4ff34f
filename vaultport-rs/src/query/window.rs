//! Expansion of relative-date quick options into explicit UTC windows.
//!
//! Windows depend on the evaluation instant, so compiling the same view at
//! a different moment yields different bounds.

use crate::query::types::QuickOption;
use crate::resolve::date::start_of_day;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeDelta, Utc};

/// A half-open time range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    /// The window covering one calendar day. `None` for the last
    /// representable day.
    pub fn day(date: NaiveDate) -> Option<Self> {
        Self::dates(date, date.succ_opt()?)
    }

    fn dates(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        let window = Self {
            from: start_of_day(from),
            to: start_of_day(to),
        };
        (window.from < window.to).then_some(window)
    }

    /// The last whole second inside the window.
    pub fn last_second(&self) -> DateTime<Utc> {
        self.to - Duration::seconds(1)
    }
}

/// `date` moved by `days`, or `None` outside the calendar range.
fn shift_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(TimeDelta::try_days(days)?)
}

/// The window a quick option denotes at `now`. `ExactDate` has none, and
/// neither has an offset that leaves the calendar range.
pub fn quick_window(option: QuickOption, now: DateTime<Utc>) -> Option<DateWindow> {
    let today = now.date_naive();
    match option {
        QuickOption::ExactDate => None,
        QuickOption::Yesterday => DateWindow::day(today.pred_opt()?),
        QuickOption::Today => DateWindow::day(today),
        QuickOption::Tomorrow => DateWindow::day(today.succ_opt()?),
        QuickOption::NumberOfDaysAgo(n) => DateWindow::day(shift_days(today, n.checked_neg()?)?),
        QuickOption::NumberOfDaysNow(n) => DateWindow::day(shift_days(today, n)?),
        QuickOption::LastWeek => week_window(today, -1),
        QuickOption::CurrentWeek => week_window(today, 0),
        QuickOption::NextWeek => week_window(today, 1),
        QuickOption::LastMonth => month_window(today, -1),
        QuickOption::CurrentMonth => month_window(today, 0),
        QuickOption::NextMonth => month_window(today, 1),
        QuickOption::LastYear => year_window(today.year() - 1),
        QuickOption::CurrentYear => year_window(today.year()),
        QuickOption::NextYear => year_window(today.year() + 1),
    }
}

/// Monday-anchored seven days, shifted by `offset` weeks.
fn week_window(today: NaiveDate, offset: i64) -> Option<DateWindow> {
    let monday = shift_days(today, -i64::from(today.weekday().num_days_from_monday()))?;
    let start = shift_days(monday, offset * 7)?;
    DateWindow::dates(start, shift_days(start, 7)?)
}

fn month_start(year: i32, month0: i64) -> Option<NaiveDate> {
    let total = i64::from(year) * 12 + month0;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12) + 1).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_window(today: NaiveDate, offset: i64) -> Option<DateWindow> {
    let month0 = i64::from(today.month0()) + offset;
    let from = month_start(today.year(), month0)?;
    let to = month_start(today.year(), month0 + 1)?;
    DateWindow::dates(from, to)
}

fn year_window(year: i32) -> Option<DateWindow> {
    let from = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let to = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
    DateWindow::dates(from, to)
}
