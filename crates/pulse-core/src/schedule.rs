//! Delivery scheduling gate.
//!
//! A pure predicate over a user's delivery preferences and the current
//! instant. The hourly batch jobs evaluate it once for the generate action
//! and once (independently) for the send action; the two actions share the
//! logic but gate different targets.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How often a user wants a newsletter generated and delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl DeliveryFrequency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryFrequency::Daily => "daily",
            DeliveryFrequency::Weekly => "weekly",
            DeliveryFrequency::Biweekly => "biweekly",
            DeliveryFrequency::Monthly => "monthly",
        }
    }
}

impl FromStr for DeliveryFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(DeliveryFrequency::Daily),
            "weekly" => Ok(DeliveryFrequency::Weekly),
            "biweekly" => Ok(DeliveryFrequency::Biweekly),
            "monthly" => Ok(DeliveryFrequency::Monthly),
            other => Err(format!("unknown delivery frequency: {other}")),
        }
    }
}

/// A user's parsed delivery preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySchedule {
    pub frequency: DeliveryFrequency,
    /// Only consulted for weekly/biweekly frequencies.
    pub day: Weekday,
    /// Hour of day, 0-23, UTC.
    pub hour: u32,
}

impl DeliverySchedule {
    /// Parse preferences from their stored text/int representation.
    ///
    /// `day` is a lowercase English weekday name (`"monday"`).
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn parse(frequency: &str, day: &str, hour: i16) -> Result<Self, String> {
        let frequency = frequency.parse::<DeliveryFrequency>()?;
        let day = day
            .parse::<Weekday>()
            .map_err(|_| format!("unknown delivery day: {day}"))?;
        let hour = u32::try_from(hour).ok().filter(|h| *h < 24).ok_or_else(|| {
            format!("delivery hour out of range: {hour}")
        })?;
        Ok(Self {
            frequency,
            day,
            hour,
        })
    }
}

/// Decide whether a recurring action is due at `now`.
///
/// - daily: the hour matches.
/// - weekly: the weekday and hour match.
/// - biweekly: weekly, and `ceil(day_of_month / 7)` is even. This is a
///   calendar-week approximation, not a true 14-day cadence; it drifts at
///   month boundaries but matches the documented behavior.
/// - monthly: the 1st of the month, at the matching hour.
///
/// All comparisons are in UTC; callers store preferences in UTC hours.
#[must_use]
pub fn is_due(schedule: DeliverySchedule, now: DateTime<Utc>) -> bool {
    let hour_matches = now.hour() == schedule.hour;
    match schedule.frequency {
        DeliveryFrequency::Daily => hour_matches,
        DeliveryFrequency::Weekly => now.weekday() == schedule.day && hour_matches,
        DeliveryFrequency::Biweekly => {
            let week_of_month = now.day().div_ceil(7);
            now.weekday() == schedule.day && hour_matches && week_of_month % 2 == 0
        }
        DeliveryFrequency::Monthly => now.day() == 1 && hour_matches,
    }
}
