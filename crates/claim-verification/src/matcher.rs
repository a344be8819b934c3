//! Disaster relevance matching
//!
//! An event corroborates a claim when it lies within `radius_km` of the
//! claim location (haversine, mean Earth radius 6371 km) AND its date is
//! within [`DATE_WINDOW_DAYS`] whole days of the claim date.
//!
//! # Date convention
//!
//! Before subtracting, the claim date takes the event's zone: its wall
//! clock is kept and its offset replaced by the event's (or dropped when the
//! event is naive). The difference is then floored to whole days, so minus
//! one hour counts as minus one day. Anything unparsable is "not relevant".

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use claim_geo::Coordinate;
use disaster_feeds::EventRecord;

/// Maximum distance in days between event and claim date
pub const DATE_WINDOW_DAYS: i64 = 30;

const MICROS_PER_DAY: i64 = 86_400_000_000;

const OFFSET_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A wall-clock time with an optional UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl Timestamp {
    /// Parse an ISO-8601 date or date-time. A trailing `Z` means UTC.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.replace('Z', "+00:00");
        let s = normalized.as_str();

        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = chrono::DateTime::parse_from_str(s, fmt) {
                return Some(Self {
                    local: dt.naive_local(),
                    offset: Some(*dt.offset()),
                });
            }
        }

        for fmt in NAIVE_FORMATS {
            if let Ok(local) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self { local, offset: None });
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(|date| Self {
                local: date.and_time(NaiveTime::MIN),
                offset: None,
            })
    }

    /// Same wall clock, labelled with `other`'s zone
    pub fn in_zone_of(self, other: &Timestamp) -> Self {
        Self {
            local: self.local,
            offset: other.offset,
        }
    }

    /// `None` when the shift leaves chrono's date range
    fn utc(&self) -> Option<NaiveDateTime> {
        match self.offset {
            Some(offset) => self
                .local
                .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc()))),
            None => Some(self.local),
        }
    }
}

/// Whole days from `target` to `event`, floored, after moving `target`
/// into the event's zone. `None` when either instant is out of range.
pub fn whole_days_between(event: &Timestamp, target: &Timestamp) -> Option<i64> {
    let target = target.in_zone_of(event);
    let delta = event.utc()?.signed_duration_since(target.utc()?);
    Some(match delta.num_microseconds() {
        Some(micros) => micros.div_euclid(MICROS_PER_DAY),
        None => delta.num_days(),
    })
}

/// Whether two date strings are within `threshold_days` of each other.
/// Unparsable input yields `false`.
pub fn is_date_close(event_date: &str, target_date: &str, threshold_days: i64) -> bool {
    match (Timestamp::parse(event_date), Timestamp::parse(target_date)) {
        (Some(event), Some(target)) => whole_days_between(&event, &target)
            .is_some_and(|days| days.abs() <= threshold_days),
        _ => false,
    }
}

/// Joint spatial and temporal relevance of an event to a claim
pub fn is_relevant(
    event: &EventRecord,
    coordinate: Coordinate,
    date: Option<&str>,
    radius_km: f64,
) -> bool {
    let Some(event_coordinate) = event.coordinates else {
        return false;
    };

    let distance_km = coordinate.distance_km(&event_coordinate);
    if !(distance_km <= radius_km) {
        return false;
    }

    match (event.occurred_at.as_deref(), date) {
        (Some(event_date), Some(target_date)) => {
            is_date_close(event_date, target_date, DATE_WINDOW_DAYS)
        }
        _ => false,
    }
}
