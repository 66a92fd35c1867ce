use crate::models::PlanEvent;
use chrono::{Datelike, NaiveDate};

/// Shape of one rendered month: day-cell count plus how many blank cells
/// precede the 1st (weeks start on Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub days: u32,
    pub leading_blanks: u32,
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_y, next_m) = next_month(year, month);
    let next_first = NaiveDate::from_ymd_opt(next_y, next_m, 1)?;
    Some(next_first.signed_duration_since(first).num_days() as u32)
}

pub fn month_grid(year: i32, month: u32) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(MonthGrid {
        year,
        month,
        days: days_in_month(year, month)?,
        leading_blanks: first.weekday().num_days_from_sunday(),
    })
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Plans falling on the given day, in list order.
pub fn events_on(events: &[PlanEvent], date: NaiveDate) -> Vec<&PlanEvent> {
    events.iter().filter(|e| e.date == date).collect()
}

/// Plans falling anywhere in the given month, in list order.
pub fn events_in_month(events: &[PlanEvent], year: i32, month: u32) -> Vec<&PlanEvent> {
    events
        .iter()
        .filter(|e| e.date.year() == year && e.date.month() == month)
        .collect()
}
