use time::{Date, OffsetDateTime, Time};

const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// An optional calendar-date range over registration timestamps.
///
/// Bounds are calendar dates with no time of day: the lower bound is
/// expanded to the start of its day and the upper bound to its end
/// (23:59:59), both UTC. A malformed bound degrades to "no filter"
/// rather than an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateRange {
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl DateRange {
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Self {
        DateRange {
            start: start.and_then(parse_calendar_date).map(start_of_day),
            end: end.and_then(parse_calendar_date).map(end_of_day),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// A record is in range iff its timestamp is known and within both
    /// bounds. Records without a parsable timestamp never match.
    pub fn contains(&self, registered_at: Option<OffsetDateTime>) -> bool {
        let instant = match registered_at {
            Some(instant) => instant,
            None => return false,
        };

        self.start.map_or(true, |start| start <= instant)
            && self.end.map_or(true, |end| instant <= end)
    }
}

fn parse_calendar_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), CALENDAR_DATE_FORMAT).ok()
}

fn start_of_day(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

fn end_of_day(date: Date) -> OffsetDateTime {
    let last_second = Time::try_from_hms(23, 59, 59).expect("build end-of-day time");

    date.with_time(last_second).assume_utc()
}
