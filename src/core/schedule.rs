use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScheduleError {
    #[error("invalid time of day: {0:?}")]
    InvalidTimeOfDay(String),
    #[error("{prayer} at {time} does not exist on {date} in this timezone")]
    NonexistentLocalTime {
        prayer: Prayer,
        time: TimeOfDay,
        date: chrono::NaiveDate,
    },
}

/// The five daily prayers, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    pub fn arabic_name(self) -> &'static str {
        match self {
            Prayer::Fajr => "الفجر",
            Prayer::Dhuhr => "الظهر",
            Prayer::Asr => "العصر",
            Prayer::Maghrib => "المغرب",
            Prayer::Isha => "العشاء",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time with minute precision and no date attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeOfDay(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn minutes_since_midnight(self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    pub fn to_naive_time(self) -> chrono::NaiveTime {
        // hour/minute are range-checked on construction
        chrono::NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0)
            .unwrap_or_default()
    }

    /// `h:MM AM/PM`, with midnight and noon shown as 12.
    pub fn format_12h(self) -> String {
        let suffix = if self.hour >= 12 { "PM" } else { "AM" };
        let display_hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{}:{:02} {}", display_hour, self.minute, suffix)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    /// Parses strict 24-hour `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTimeOfDay(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(h) || !two_digits(m) {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One day's prayer times, always all five in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrayerSchedule {
    times: [TimeOfDay; 5],
}

impl PrayerSchedule {
    pub fn new(times: [TimeOfDay; 5]) -> Self {
        Self { times }
    }

    /// Builds a schedule from five `HH:MM` strings (Fajr first).
    pub fn parse(times: [&str; 5]) -> Result<Self, ScheduleError> {
        let [fajr, dhuhr, asr, maghrib, isha] = times;
        Ok(Self::new([
            fajr.parse()?,
            dhuhr.parse()?,
            asr.parse()?,
            maghrib.parse()?,
            isha.parse()?,
        ]))
    }

    pub fn time_of(&self, prayer: Prayer) -> TimeOfDay {
        self.times[prayer as usize]
    }

    pub fn entries(&self) -> impl Iterator<Item = (Prayer, TimeOfDay)> + '_ {
        Prayer::ALL.iter().map(move |&p| (p, self.time_of(p)))
    }
}

impl Serialize for PrayerSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(5))?;
        for (prayer, time) in self.entries() {
            map.serialize_entry(prayer.name(), &time)?;
        }
        map.end()
    }
}

/// The prayer whose time window contains `at`. Before Fajr this is still
/// the previous night's Isha.
pub fn current_prayer(schedule: &PrayerSchedule, at: TimeOfDay) -> Prayer {
    let now = at.minutes_since_midnight();
    for (i, (_, time)) in schedule.entries().enumerate() {
        if now < time.minutes_since_midnight() {
            return if i == 0 { Prayer::Isha } else { Prayer::ALL[i - 1] };
        }
    }
    Prayer::Isha
}
