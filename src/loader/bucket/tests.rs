use super::*;
use chrono::TimeZone;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap()
}

#[test]
fn constructors_truncate_to_bucket_start() {
    let t = utc(2024, 3, 17, 13, 45);
    assert_eq!(Bucket::hour(t).instant, utc(2024, 3, 17, 13, 0));
    assert_eq!(Bucket::day(t).instant, utc(2024, 3, 17, 0, 0));
    assert_eq!(Bucket::month(t).instant, utc(2024, 3, 1, 0, 0));
}

#[test]
fn path_segments_omit_finer_parts() {
    let t = utc(2024, 3, 7, 5, 0);
    assert_eq!(Bucket::month(t).path_segments(), vec!["2024", "03"]);
    assert_eq!(Bucket::day(t).path_segments(), vec!["2024", "03", "07"]);
    assert_eq!(Bucket::hour(t).path_segments(), vec!["2024", "03", "07", "05"]);
}

#[test]
fn labels_follow_bucket_start() {
    let b = Bucket::hour(utc(2024, 1, 2, 9, 30));
    assert_eq!(b.date_label(), "2024-01-02");
    assert_eq!(b.hour_label().as_deref(), Some("09"));
    assert_eq!(Bucket::day(utc(2024, 1, 2, 9, 30)).hour_label(), None);
}

#[test]
fn month_bucket_spans_whole_month() {
    let feb = Bucket::month(utc(2024, 2, 10, 0, 0));
    assert!(feb.contains(utc(2024, 2, 29, 23, 59)));
    assert!(!feb.contains(utc(2024, 3, 1, 0, 0)));
    assert!(!feb.contains(utc(2024, 1, 31, 23, 59)));
}

#[test]
fn three_day_period_plans_three_day_buckets() {
    let buckets = plan_period(
        parse_instant("2024-01-01", RangeEdge::Start).unwrap(),
        parse_instant("2024-01-03", RangeEdge::End).unwrap(),
    )
    .unwrap();
    assert_eq!(buckets.len(), 3);
    assert!(buckets.iter().all(|b| b.granularity == Granularity::Day));
    let days: Vec<String> = buckets.iter().map(|b| b.date_label()).collect();
    assert_eq!(days, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
}

#[test]
fn up_to_a_month_still_plans_day_buckets() {
    let buckets = plan_period(utc(2024, 1, 1, 0, 0), utc(2024, 1, 31, 12, 0)).unwrap();
    assert_eq!(buckets.len(), 31);
    assert!(buckets.iter().all(|b| b.granularity == Granularity::Day));

    let week_and_a_bit = plan_period(utc(2024, 1, 1, 0, 0), utc(2024, 1, 10, 0, 0)).unwrap();
    assert_eq!(week_and_a_bit.len(), 10);
    assert!(week_and_a_bit
        .iter()
        .all(|b| b.granularity == Granularity::Day));
}

#[test]
fn year_long_period_plans_thirteen_months_ascending() {
    let buckets = plan_period(utc(2023, 1, 1, 0, 0), utc(2024, 1, 1, 0, 0)).unwrap();
    assert_eq!(buckets.len(), 13);
    assert!(buckets.iter().all(|b| b.granularity == Granularity::Month));
    assert_eq!(buckets[0].instant, utc(2023, 1, 1, 0, 0));
    assert_eq!(buckets[12].instant, utc(2024, 1, 1, 0, 0));
    assert!(buckets.windows(2).all(|w| w[0].instant < w[1].instant));
}

#[test]
fn month_plan_never_drops_the_start_month() {
    // 62 days touched: round(2.0) + 1 = 3 months back from April would stop at February.
    let start = utc(2024, 1, 31, 12, 0);
    let end = utc(2024, 4, 1, 1, 0);
    let buckets = plan_period(start, end).unwrap();
    assert_eq!(buckets.first().unwrap().instant, utc(2024, 1, 1, 0, 0));
    assert_eq!(buckets.last().unwrap().instant, utc(2024, 4, 1, 0, 0));
    assert_eq!(buckets.len(), 4);
}

#[test]
fn planned_buckets_cover_the_range_without_overlap() {
    let cases = [
        (utc(2024, 1, 1, 0, 0), utc(2024, 1, 1, 0, 0)),
        (utc(2024, 2, 27, 22, 0), utc(2024, 3, 2, 3, 0)),
        (utc(2023, 12, 15, 0, 0), utc(2024, 2, 20, 0, 0)),
        (utc(2022, 6, 30, 23, 0), utc(2024, 6, 1, 0, 0)),
    ];
    for (start, end) in cases {
        let buckets = plan_period(start, end).unwrap();
        assert!(buckets.first().unwrap().contains(start), "{start} not covered");
        assert!(buckets.last().unwrap().contains(end), "{end} not covered");
        for w in buckets.windows(2) {
            assert!(w[0].end() < w[1].instant, "overlap at {}", w[1].instant);
            assert_eq!(w[0].end() + Duration::milliseconds(1), w[1].instant, "gap");
        }
    }
}

#[test]
fn end_before_start_is_rejected() {
    let err = plan_period(utc(2024, 1, 2, 0, 0), utc(2024, 1, 1, 0, 0)).unwrap_err();
    assert!(matches!(err, LoaderError::InvalidRange { .. }));
}

#[test]
fn last_week_is_168_hours_most_recent_first() {
    let end = utc(2024, 5, 10, 14, 20);
    let buckets = plan_relative(RelativeWindow::LastWeek, end);
    assert_eq!(buckets.len(), 168);
    assert_eq!(buckets[0].instant, utc(2024, 5, 10, 14, 0));
    assert_eq!(buckets[167].instant, utc(2024, 5, 3, 15, 0));
    assert!(buckets.windows(2).all(|w| w[0].instant > w[1].instant));
    assert!(buckets.iter().all(|b| b.granularity == Granularity::Hour));
}

#[test]
fn previous_31_days_is_744_hours() {
    let buckets = plan_relative(RelativeWindow::Previous31Days, utc(2024, 5, 10, 0, 0));
    assert_eq!(buckets.len(), 744);
    assert_eq!(buckets[743].instant, utc(2024, 4, 9, 1, 0));
}

#[test]
fn previous_12_months_spans_thirteen_calendar_months() {
    let buckets = plan_relative(RelativeWindow::Previous12Months, utc(2024, 3, 31, 8, 0));
    let labels: Vec<String> = buckets.iter().map(|b| b.date_label()).collect();
    assert_eq!(labels.len(), 13);
    assert_eq!(labels[0], "2024-03-01");
    assert_eq!(labels[1], "2024-02-01");
    assert_eq!(labels[12], "2023-03-01");
}

#[test]
fn parse_instant_handles_dates_and_instants() {
    assert_eq!(
        parse_instant("2024-01-03", RangeEdge::Start),
        Some(utc(2024, 1, 3, 0, 0))
    );
    assert_eq!(
        parse_instant("2024-01-03", RangeEdge::End),
        Some(utc(2024, 1, 4, 0, 0) - Duration::milliseconds(1))
    );
    assert_eq!(
        parse_instant("2024-01-03T10:15:00+02:00", RangeEdge::Start),
        Some(utc(2024, 1, 3, 8, 15))
    );
    assert_eq!(
        parse_instant("2024-01-03T10:15:00", RangeEdge::End),
        Some(utc(2024, 1, 3, 10, 15))
    );
    assert_eq!(parse_instant("yesterday", RangeEdge::Start), None);
}
