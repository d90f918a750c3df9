use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use serde::{Serialize, Serializer};

use crate::core::schedule::{Prayer, PrayerSchedule, ScheduleError, TimeOfDay};

/// How long before a prayer a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderOffset {
    FifteenMinutes,
    FiveMinutes,
    AtTime,
}

impl ReminderOffset {
    /// Earliest reminder first.
    pub const ALL: [ReminderOffset; 3] = [
        ReminderOffset::FifteenMinutes,
        ReminderOffset::FiveMinutes,
        ReminderOffset::AtTime,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            ReminderOffset::FifteenMinutes => 15,
            ReminderOffset::FiveMinutes => 5,
            ReminderOffset::AtTime => 0,
        }
    }

    /// The early heads-up may dismiss itself; the later two stay until acknowledged.
    pub fn requires_ack(self) -> bool {
        !matches!(self, ReminderOffset::FifteenMinutes)
    }

    fn tag_suffix(self) -> &'static str {
        match self {
            ReminderOffset::FifteenMinutes => "15min",
            ReminderOffset::FiveMinutes => "5min",
            ReminderOffset::AtTime => "now",
        }
    }
}

impl Serialize for ReminderOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.minutes())
    }
}

/// What the host notification capability is asked to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub require_ack: bool,
}

impl NotificationPayload {
    pub fn for_reminder(prayer: Prayer, time: TimeOfDay, offset: ReminderOffset) -> Self {
        let (title, body) = match offset {
            ReminderOffset::AtTime => (
                format!("{prayer} Prayer Time Now"),
                format!("It's time for {prayer} prayer ({time}). Allahu Akbar!"),
            ),
            ReminderOffset::FiveMinutes => (
                format!("{prayer} Prayer in 5 minutes"),
                format!("{prayer} prayer time is at {time}. Time to prepare for prayer."),
            ),
            ReminderOffset::FifteenMinutes => (
                format!("{prayer} Prayer in 15 minutes"),
                format!("{prayer} prayer time is at {time}. Start preparing for prayer."),
            ),
        };
        Self {
            title,
            body,
            tag: format!("prayer-{}-{}", prayer, offset.tag_suffix()),
            require_ack: offset.requires_ack(),
        }
    }

    /// Shown once when reminders are switched on.
    pub fn enabled_confirmation() -> Self {
        Self {
            title: "Prayer Notifications Enabled".to_string(),
            body: "You will receive reminders 15 minutes, 5 minutes before, and at prayer time."
                .to_string(),
            tag: "prayer-notifications-enabled".to_string(),
            require_ack: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationTrigger {
    pub prayer: Prayer,
    pub offset: ReminderOffset,
    pub fire_at: DateTime<FixedOffset>,
    pub payload: NotificationPayload,
}

/// Computes every reminder still ahead of `now` for the next occurrence of
/// each prayer.
///
/// Prayer times are read as wall-clock times in `now`'s timezone on `now`'s
/// date. A prayer at or before `now` moves to the same time tomorrow, then
/// the 15/5/0 minute reminders are derived from it and only those strictly
/// after `now` are kept. Output is ordered by prayer, earliest reminder first.
pub fn plan_notifications<Tz: TimeZone>(
    schedule: &PrayerSchedule,
    now: &DateTime<Tz>,
) -> Result<Vec<NotificationTrigger>, ScheduleError> {
    let tz = now.timezone();
    let today = now.date_naive();
    let mut triggers = Vec::with_capacity(Prayer::ALL.len() * ReminderOffset::ALL.len());

    for (prayer, time) in schedule.entries() {
        let mut prayer_at = local_instant(&tz, today, prayer, time)?;
        if prayer_at <= *now {
            let tomorrow = today
                .succ_opt()
                .ok_or(ScheduleError::NonexistentLocalTime { prayer, time, date: today })?;
            prayer_at = local_instant(&tz, tomorrow, prayer, time)?;
        }

        for offset in ReminderOffset::ALL {
            let fire_at = prayer_at.clone() - Duration::minutes(offset.minutes());
            if fire_at > *now {
                triggers.push(NotificationTrigger {
                    prayer,
                    offset,
                    fire_at: fire_at.fixed_offset(),
                    payload: NotificationPayload::for_reminder(prayer, time, offset),
                });
            }
        }
    }

    Ok(triggers)
}

fn local_instant<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    prayer: Prayer,
    time: TimeOfDay,
) -> Result<DateTime<Tz>, ScheduleError> {
    tz.from_local_datetime(&date.and_time(time.to_naive_time()))
        .earliest()
        .ok_or(ScheduleError::NonexistentLocalTime { prayer, time, date })
}
