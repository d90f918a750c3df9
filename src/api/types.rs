use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::collectors::aladhan::PrayerTimesReport;
use crate::core::schedule::Prayer;
use crate::scheduler::triggers::NotificationTrigger;

#[derive(Debug, Serialize)]
pub struct CityDto {
    pub name: &'static str,
    pub region: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub qibla_bearing: u16,
}

#[derive(Debug, Serialize)]
pub struct PrayerTimeDto {
    pub prayer: Prayer,
    pub arabic: &'static str,
    pub time: String,
    pub display: String,
    pub is_current: bool,
}

#[derive(Debug, Serialize)]
pub struct PrayerTimesDto {
    #[serde(flatten)]
    pub report: PrayerTimesReport,
    pub prayers: Vec<PrayerTimeDto>,
    pub current_prayer: Prayer,
    pub qibla_bearing: u16,
    pub local_time: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
pub struct QiblaDto {
    pub lat: f64,
    pub lon: f64,
    pub bearing: u16,
}

#[derive(Debug, Serialize)]
pub struct NotificationsDto {
    pub city: Option<String>,
    pub enabled: bool,
    pub pending: Vec<NotificationTrigger>,
}

/// Reply to scheduling. `is_fallback` is set when the built-in times were
/// armed because the real ones could not be fetched.
#[derive(Debug, Serialize)]
pub struct ScheduledNotificationsDto {
    pub city: String,
    pub is_fallback: bool,
    pub pending: Vec<NotificationTrigger>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleNotificationsDto {
    pub city: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleNotificationsDto {
    pub enabled: bool,
}
