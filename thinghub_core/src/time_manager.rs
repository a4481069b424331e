//! TimeManager: a per-second tick plus a `dateTimeChanged` signal that
//! fires when the minute component advances (§4.5). Grounded in
//! `original_source/libnymea-core/time/timemanager.cpp`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

use crate::hub_events::{publish, HubEvent, HubEventSender};

pub struct TimeManager {
    events: HubEventSender,
    offset: watch::Sender<ChronoDuration>,
    stop: watch::Sender<bool>,
}

impl TimeManager {
    pub fn new(events: HubEventSender) -> Self {
        let (offset, _) = watch::channel(ChronoDuration::zero());
        let (stop, _) = watch::channel(false);
        Self { events, offset, stop }
    }

    pub fn current_date_time(&self) -> DateTime<Utc> {
        Utc::now() + *self.offset.borrow()
    }

    /// Test-only: pins `currentDateTime` by recording an offset from
    /// wall-clock `now`, then immediately emits `dateTimeChanged` once.
    pub fn set_time(&self, dt: DateTime<Utc>) {
        let offset = dt - Utc::now();
        let _ = self.offset.send(offset);
        debug!(%dt, "time manager offset overridden");
        publish(&self.events, HubEvent::DateTimeChanged(dt));
    }

    /// Idempotent: calling `stop` on an already-stopped manager is a
    /// no-op rather than an error.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Runs the per-second tick loop until `stop` is called. Emits
    /// `tick` every second and `dateTimeChanged` whenever the minute
    /// component of `currentDateTime` differs from the previous tick's.
    pub async fn run(&self) {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stop_rx = self.stop.subscribe();
        let mut last_minute: Option<(chrono::NaiveDate, u32, u32)> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = self.current_date_time();
                    publish(&self.events, HubEvent::Tick(now));

                    let minute_key = (now.date_naive(), now.hour(), now.minute());
                    if last_minute != Some(minute_key) {
                        last_minute = Some(minute_key);
                        publish(&self.events, HubEvent::DateTimeChanged(now));
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        debug!("time manager stopped");
                        break;
                    }
                }
            }
        }
    }
}

use chrono::Timelike;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_time_moves_current_date_time() {
        let (tx, _rx) = tokio::sync::broadcast::channel(16);
        let manager = TimeManager::new(tx);
        let target = chrono::NaiveDate::from_ymd_opt(2030, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        manager.set_time(target);
        let now = manager.current_date_time();
        assert_eq!(now.date_naive(), target.date_naive());
        assert_eq!(now.hour(), 12);
    }

    #[test]
    fn stop_is_idempotent() {
        let (tx, _rx) = tokio::sync::broadcast::channel(16);
        let manager = TimeManager::new(tx);
        manager.stop();
        manager.stop();
        assert!(*manager.stop.subscribe().borrow());
    }
}
