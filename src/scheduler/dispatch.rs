use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::schedule::{PrayerSchedule, ScheduleError};
use crate::scheduler::triggers::{plan_notifications, NotificationPayload, NotificationTrigger};

/// Host capability that actually shows a notification. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn deliver(&self, payload: &NotificationPayload);
}

/// Delivers by emitting a log event; the default for a headless service.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, payload: &NotificationPayload) {
        info!(
            tag = %payload.tag,
            require_ack = payload.require_ack,
            body = %payload.body,
            "{}",
            payload.title
        );
    }
}

/// Timers armed for one schedule. Cancelling (or dropping) the batch aborts
/// every reminder that has not fired yet.
pub struct ScheduledBatch {
    entries: Vec<(NotificationTrigger, JoinHandle<()>)>,
}

impl ScheduledBatch {
    pub fn pending(&self) -> Vec<NotificationTrigger> {
        self.entries
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(trigger, _)| trigger.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Aborts all outstanding timers and returns how many were still pending.
    pub fn cancel(&mut self) -> usize {
        let mut aborted = 0;
        for (_, handle) in self.entries.drain(..) {
            if !handle.is_finished() {
                aborted += 1;
            }
            handle.abort();
        }
        aborted
    }
}

impl Drop for ScheduledBatch {
    fn drop(&mut self) {
        for (_, handle) in &self.entries {
            handle.abort();
        }
    }
}

/// Registers one timer per trigger and returns immediately. Must be called
/// from within a tokio runtime.
pub fn arm<Tz: TimeZone>(
    triggers: Vec<NotificationTrigger>,
    now: &DateTime<Tz>,
    notifier: Arc<dyn Notifier>,
) -> ScheduledBatch {
    let now = now.fixed_offset();
    let mut entries = Vec::with_capacity(triggers.len());

    for trigger in triggers {
        let delay = match (trigger.fire_at - now).to_std() {
            Ok(d) if !d.is_zero() => d,
            _ => {
                warn!(tag = %trigger.payload.tag, fire_at = %trigger.fire_at, "Skipping reminder that is not in the future");
                continue;
            }
        };

        debug!(tag = %trigger.payload.tag, delay_secs = delay.as_secs(), "Arming reminder");
        // Fixed here, not when the task is first polled.
        let deadline = tokio::time::Instant::now() + delay;
        let payload = trigger.payload.clone();
        let notifier = Arc::clone(&notifier);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            notifier.deliver(&payload);
        });
        entries.push((trigger, handle));
    }

    ScheduledBatch { entries }
}

#[derive(Debug, Error, PartialEq)]
pub enum NotificationError {
    #[error("notifications are disabled")]
    Disabled,
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

struct ServiceState {
    enabled: bool,
    label: Option<String>,
    active: Option<ScheduledBatch>,
}

/// Owns the single live batch of reminders. Scheduling a new one always
/// cancels the previous batch first.
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    state: Mutex<ServiceState>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, enabled: bool) -> Self {
        Self {
            notifier,
            state: Mutex::new(ServiceState {
                enabled,
                label: None,
                active: None,
            }),
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }

    /// Switches reminders on or off. Turning them on sends a confirmation;
    /// turning them off cancels whatever is armed.
    pub async fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        if enabled {
            info!("Prayer notifications enabled");
            self.notifier.deliver(&NotificationPayload::enabled_confirmation());
        } else {
            let cancelled = state.active.take().map(|mut b| b.cancel()).unwrap_or(0);
            state.label = None;
            info!(cancelled, "Prayer notifications disabled");
        }
    }

    /// Replaces the armed reminders with those for `schedule` as seen from `now`.
    pub async fn reschedule<Tz: TimeZone>(
        &self,
        label: &str,
        schedule: &PrayerSchedule,
        now: &DateTime<Tz>,
    ) -> Result<Vec<NotificationTrigger>, NotificationError> {
        let mut state = self.state.lock().await;
        if !state.enabled {
            return Err(NotificationError::Disabled);
        }

        let triggers = plan_notifications(schedule, now)?;

        if let Some(mut previous) = state.active.take() {
            let cancelled = previous.cancel();
            debug!(cancelled, previous = ?state.label, "Cancelled previous reminders");
        }

        let batch = arm(triggers.clone(), now, Arc::clone(&self.notifier));
        info!(label, count = batch.len(), "Scheduled prayer reminders");
        state.active = Some(batch);
        state.label = Some(label.to_string());
        Ok(triggers)
    }

    /// Cancels the armed batch, returning how many reminders were dropped.
    pub async fn cancel_all(&self) -> usize {
        let mut state = self.state.lock().await;
        state.label = None;
        state.active.take().map(|mut b| b.cancel()).unwrap_or(0)
    }

    pub async fn pending(&self) -> (Option<String>, Vec<NotificationTrigger>) {
        let state = self.state.lock().await;
        let pending = state.active.as_ref().map(|b| b.pending()).unwrap_or_default();
        (state.label.clone(), pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        delivered: StdMutex<Vec<NotificationPayload>>,
    }

    impl Recorder {
        fn tags(&self) -> Vec<String> {
            self.delivered.lock().unwrap().iter().map(|p| p.tag.clone()).collect()
        }
    }

    impl Notifier for Recorder {
        fn deliver(&self, payload: &NotificationPayload) {
            self.delivered.lock().unwrap().push(payload.clone());
        }
    }

    fn schedule() -> PrayerSchedule {
        PrayerSchedule::parse(["05:15", "12:30", "15:45", "18:20", "19:50"]).unwrap()
    }

    fn algiers_now(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 11, 16, h, m, 0)
            .unwrap()
    }

    async fn settle(by: Duration) {
        tokio::time::advance(by.to_std().unwrap()).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_reminders_in_time_order() {
        let recorder = Arc::new(Recorder::default());
        let now = algiers_now(12, 27);
        let triggers = plan_notifications(&schedule(), &now).unwrap();
        let _batch = arm(triggers, &now, recorder.clone());

        settle(Duration::minutes(2)).await;
        assert!(recorder.tags().is_empty());

        settle(Duration::minutes(1)).await;
        assert_eq!(recorder.tags(), vec!["prayer-Dhuhr-now"]);

        // Asr reminders at 15:30 and 15:40
        settle(Duration::hours(3)).await;
        assert_eq!(recorder.tags(), vec!["prayer-Dhuhr-now", "prayer-Asr-15min"]);
        settle(Duration::minutes(10)).await;
        assert_eq!(
            recorder.tags(),
            vec!["prayer-Dhuhr-now", "prayer-Asr-15min", "prayer-Asr-5min"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_fixed_when_armed() {
        let recorder = Arc::new(Recorder::default());
        let now = algiers_now(12, 27);
        let triggers = plan_notifications(&schedule(), &now).unwrap();
        let _batch = arm(triggers, &now, recorder.clone());

        // The clock moves before any timer task has been polled.
        settle(Duration::minutes(3)).await;
        assert_eq!(recorder.tags(), vec!["prayer-Dhuhr-now"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_batch_never_fires() {
        let recorder = Arc::new(Recorder::default());
        let now = algiers_now(12, 27);
        let triggers = plan_notifications(&schedule(), &now).unwrap();
        let mut batch = arm(triggers, &now, recorder.clone());
        assert_eq!(batch.pending().len(), batch.len());

        assert_eq!(batch.cancel(), 13);
        settle(Duration::hours(30)).await;
        assert!(recorder.tags().is_empty());
        assert!(batch.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_batch_cancels_it() {
        let recorder = Arc::new(Recorder::default());
        let now = algiers_now(12, 27);
        let triggers = plan_notifications(&schedule(), &now).unwrap();
        drop(arm(triggers, &now, recorder.clone()));

        settle(Duration::hours(30)).await;
        assert!(recorder.tags().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn past_triggers_are_not_armed() {
        let recorder = Arc::new(Recorder::default());
        let now = algiers_now(12, 27);
        let mut triggers = plan_notifications(&schedule(), &now).unwrap();
        let later = algiers_now(13, 0);
        triggers.retain(|t| t.prayer == crate::core::schedule::Prayer::Dhuhr);

        // Dhuhr (12:30) is already behind 13:00.
        let batch = arm(triggers, &later, recorder.clone());
        assert_eq!(batch.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_previous_city() {
        let recorder = Arc::new(Recorder::default());
        let service = NotificationService::new(recorder.clone(), true);
        let now = algiers_now(12, 27);

        service.reschedule("Algiers", &schedule(), &now).await.unwrap();
        let oran = PrayerSchedule::parse(["05:30", "12:50", "16:00", "18:35", "20:05"]).unwrap();
        let triggers = service.reschedule("Oran", &oran, &now).await.unwrap();
        assert_eq!(triggers.len(), 15);

        let (label, pending) = service.pending().await;
        assert_eq!(label.as_deref(), Some("Oran"));
        assert_eq!(pending.len(), 15);

        // Algiers Dhuhr at 12:30 would have fired here.
        settle(Duration::minutes(3)).await;
        assert!(recorder.tags().is_empty());

        // Oran Dhuhr reminders at 12:35 and 12:45
        settle(Duration::minutes(5)).await;
        assert_eq!(recorder.tags(), vec!["prayer-Dhuhr-15min"]);
        settle(Duration::minutes(10)).await;
        assert_eq!(recorder.tags(), vec!["prayer-Dhuhr-15min", "prayer-Dhuhr-5min"]);
        assert_eq!(service.pending().await.1.len(), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_service_refuses_and_enabling_confirms() {
        let recorder = Arc::new(Recorder::default());
        let service = NotificationService::new(recorder.clone(), false);
        let now = Utc::now();

        let err = service.reschedule("Algiers", &schedule(), &now).await.unwrap_err();
        assert_eq!(err, NotificationError::Disabled);

        service.set_enabled(true).await;
        assert!(service.is_enabled().await);
        assert_eq!(recorder.tags(), vec!["prayer-notifications-enabled"]);

        service.reschedule("Algiers", &schedule(), &now).await.unwrap();
        service.set_enabled(false).await;
        assert!(service.pending().await.1.is_empty());
        assert_eq!(service.pending().await.0, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_reports_dropped_count() {
        let service = NotificationService::new(Arc::new(Recorder::default()), true);
        let now = algiers_now(4, 0);
        service.reschedule("Algiers", &schedule(), &now).await.unwrap();
        assert_eq!(service.cancel_all().await, 15);
        assert_eq!(service.cancel_all().await, 0);
    }
}
