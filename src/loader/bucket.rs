use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike, Utc};

use super::error::LoaderError;

pub const LAST_WEEK_HOURS: usize = 7 * 24;
pub const PREVIOUS_31_DAYS_HOURS: usize = 31 * 24;
// 12 full months plus the partial months at both ends of the window.
pub const PREVIOUS_12_MONTHS_BUCKETS: usize = 13;

const WEEK_DAYS: i64 = 7;
const MONTH_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hour,
    Day,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
        }
    }
}

/// One remotely fetchable unit: an hour, a day or a month, anchored at its first instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub granularity: Granularity,
    pub instant: DateTime<Utc>,
}

impl Bucket {
    pub fn hour(t: DateTime<Utc>) -> Self {
        Self {
            granularity: Granularity::Hour,
            instant: floor_to(t, 3600),
        }
    }

    pub fn day(t: DateTime<Utc>) -> Self {
        Self {
            granularity: Granularity::Day,
            instant: floor_to(t, 86_400),
        }
    }

    pub fn month(t: DateTime<Utc>) -> Self {
        let day_start = floor_to(t, 86_400);
        let first = day_start.with_day(1).unwrap_or(day_start);
        Self {
            granularity: Granularity::Month,
            instant: first,
        }
    }

    /// Last instant still inside the bucket.
    pub fn end(&self) -> DateTime<Utc> {
        let next = match self.granularity {
            Granularity::Hour => self.instant + Duration::hours(1),
            Granularity::Day => self.instant + Duration::days(1),
            Granularity::Month => self
                .instant
                .checked_add_months(Months::new(1))
                .unwrap_or(self.instant),
        };
        next - Duration::milliseconds(1)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.instant <= t && t <= self.end()
    }

    /// `YYYY-MM-DD` of the bucket start.
    pub fn date_label(&self) -> String {
        self.instant.format("%Y-%m-%d").to_string()
    }

    /// `HH`, for hour buckets only.
    pub fn hour_label(&self) -> Option<String> {
        match self.granularity {
            Granularity::Hour => Some(format!("{:02}", self.instant.hour())),
            _ => None,
        }
    }

    /// Zero-padded date path segments, coarsest first.
    pub fn path_segments(&self) -> Vec<String> {
        let t = self.instant;
        let mut out = vec![format!("{:04}", t.year()), format!("{:02}", t.month())];
        if matches!(self.granularity, Granularity::Day | Granularity::Hour) {
            out.push(format!("{:02}", t.day()));
        }
        if self.granularity == Granularity::Hour {
            out.push(format!("{:02}", t.hour()));
        }
        out
    }
}

fn floor_to(t: DateTime<Utc>, step_secs: i64) -> DateTime<Utc> {
    let secs = t.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(step_secs), 0).unwrap_or(t)
}

/// Fixed-size windows that end at a given instant (usually now).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeWindow {
    LastWeek,
    Previous31Days,
    Previous12Months,
}

impl RelativeWindow {
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::LastWeek | Self::Previous31Days => Granularity::Hour,
            Self::Previous12Months => Granularity::Month,
        }
    }

    pub fn bucket_count(&self) -> usize {
        match self {
            Self::LastWeek => LAST_WEEK_HOURS,
            Self::Previous31Days => PREVIOUS_31_DAYS_HOURS,
            Self::Previous12Months => PREVIOUS_12_MONTHS_BUCKETS,
        }
    }
}

/// Buckets for a relative window, most recent first.
pub fn plan_relative(window: RelativeWindow, end: DateTime<Utc>) -> Vec<Bucket> {
    let count = window.bucket_count();
    match window {
        RelativeWindow::LastWeek | RelativeWindow::Previous31Days => {
            let last = Bucket::hour(end).instant;
            (0..count)
                .map(|i| Bucket {
                    granularity: Granularity::Hour,
                    instant: last - Duration::hours(i as i64),
                })
                .collect()
        }
        RelativeWindow::Previous12Months => months_back_from(Bucket::month(end).instant, count),
    }
}

/// Buckets covering `[start, end]` inclusive, oldest first.
pub fn plan_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Bucket>, LoaderError> {
    if end < start {
        return Err(LoaderError::InvalidRange { start, end });
    }
    let days = days_touched(start, end);
    let buckets = match days {
        d if d <= WEEK_DAYS => day_buckets(start, days),
        // Kept apart from the week branch: the API's day and month views differ and
        // callers expect day precision up to a month.
        d if d <= MONTH_DAYS => day_buckets(start, days),
        _ => month_buckets(start, end, days),
    };
    Ok(buckets)
}

fn days_touched(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end.date_naive() - start.date_naive()).num_days() + 1
}

fn day_buckets(start: DateTime<Utc>, days: i64) -> Vec<Bucket> {
    let first = Bucket::day(start).instant;
    (0..days)
        .map(|i| Bucket {
            granularity: Granularity::Day,
            instant: first + Duration::days(i),
        })
        .collect()
}

fn month_buckets(start: DateTime<Utc>, end: DateTime<Utc>, days: i64) -> Vec<Bucket> {
    let count = (days as f64 / MONTH_DAYS as f64).round() as usize + 1;
    let first = Bucket::month(start).instant;
    let mut months = months_back_from(Bucket::month(end).instant, count);

    // Rounding can leave the start month out on ranges that straddle month edges.
    while let Some(oldest) = months.last().map(|b| b.instant) {
        if oldest <= first {
            break;
        }
        match oldest.checked_sub_months(Months::new(1)) {
            Some(prev) => months.push(Bucket {
                granularity: Granularity::Month,
                instant: prev,
            }),
            None => break,
        }
    }

    months.reverse();
    months
}

fn months_back_from(last: DateTime<Utc>, count: usize) -> Vec<Bucket> {
    let mut out = Vec::with_capacity(count);
    let mut cur = Some(last);
    for _ in 0..count {
        let Some(instant) = cur else {
            break;
        };
        out.push(Bucket {
            granularity: Granularity::Month,
            instant,
        });
        cur = instant.checked_sub_months(Months::new(1));
    }
    out
}

/// Which side of a range a user-supplied instant bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEdge {
    Start,
    End,
}

/// Parses RFC 3339 instants, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and bare dates.
///
/// A bare date bounds a whole day: its first instant as a start, its last millisecond
/// as an end.
pub fn parse_instant(s: &str, edge: RangeEdge) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let day_start = date.and_hms_opt(0, 0, 0)?.and_utc();
    match edge {
        RangeEdge::Start => Some(day_start),
        RangeEdge::End => Some(day_start + Duration::days(1) - Duration::milliseconds(1)),
    }
}

#[cfg(test)]
mod tests;
