use chrono::NaiveDate;
use date_calendar_online_sync::calendar::{
    days_in_month, events_in_month, events_on, month_grid, next_month, prev_month,
};
use date_calendar_online_sync::models::{EventKind, PlanEvent};

fn plan(id: &str, date: &str) -> PlanEvent {
    PlanEvent {
        id: id.into(),
        title: format!("plan {}", id),
        kind: EventKind::Food,
        description: String::new(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        images: Vec::new(),
    }
}

#[test]
fn may_2024_grid() {
    // 2024-05-01 was a Wednesday.
    let grid = month_grid(2024, 5).unwrap();
    assert_eq!(grid.days, 31);
    assert_eq!(grid.leading_blanks, 3);
}

#[test]
fn leap_february() {
    assert_eq!(days_in_month(2024, 2), Some(29));
    assert_eq!(days_in_month(2023, 2), Some(28));
}

#[test]
fn invalid_month_is_none() {
    assert!(month_grid(2024, 13).is_none());
    assert!(days_in_month(2024, 0).is_none());
}

#[test]
fn month_navigation_wraps_years() {
    assert_eq!(prev_month(2024, 1), (2023, 12));
    assert_eq!(next_month(2024, 12), (2025, 1));
    assert_eq!(prev_month(2024, 6), (2024, 5));
    assert_eq!(next_month(2024, 6), (2024, 7));
}

#[test]
fn events_filtered_by_day_in_list_order() {
    let events = vec![
        plan("a", "2024-05-01"),
        plan("b", "2024-05-02"),
        plan("c", "2024-05-01"),
    ];
    let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let on_day = events_on(&events, day);
    assert_eq!(on_day.len(), 2);
    assert_eq!(on_day[0].id, "a");
    assert_eq!(on_day[1].id, "c");
}

#[test]
fn events_filtered_by_month() {
    let events = vec![
        plan("a", "2024-05-01"),
        plan("b", "2024-06-02"),
        plan("c", "2024-05-31"),
        plan("d", "2023-05-10"),
    ];
    let in_may = events_in_month(&events, 2024, 5);
    assert_eq!(in_may.len(), 2);
    assert_eq!(in_may[0].id, "a");
    assert_eq!(in_may[1].id, "c");
}
