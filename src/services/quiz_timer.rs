use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant},
};

pub type OnTimeUp = Box<dyn FnOnce() + Send + 'static>;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No time limit configured.
    Unlimited,
    Running(u32),
    /// The 1 -> 0 transition. Reported exactly once.
    Expired,
    Stopped,
}

/// Countdown state, one decrement per tick. Holds no clock of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCountdown {
    remaining: Option<u32>,
    expired: bool,
}

impl QuizCountdown {
    pub fn new(duration_minutes: Option<u32>) -> Self {
        Self {
            remaining: duration_minutes.map(|m| m.saturating_mul(60)),
            expired: false,
        }
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.remaining {
            None => TickOutcome::Unlimited,
            Some(_) if self.expired => TickOutcome::Stopped,
            Some(0) => TickOutcome::Stopped,
            Some(1) => {
                self.remaining = Some(0);
                self.expired = true;
                TickOutcome::Expired
            }
            Some(seconds) => {
                self.remaining = Some(seconds - 1);
                TickOutcome::Running(seconds - 1)
            }
        }
    }
}

/// Drives a `QuizCountdown` on a tokio interval. Starting again replaces the
/// running countdown; cancelling or dropping stops it mid-count.
pub struct QuizTimer {
    handle: Option<JoinHandle<()>>,
    remaining: Arc<watch::Sender<Option<u32>>>,
}

impl Default for QuizTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizTimer {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(None);
        Self {
            handle: None,
            remaining: Arc::new(sender),
        }
    }

    pub fn start(&mut self, duration_minutes: Option<u32>, on_time_up: OnTimeUp) {
        self.cancel();

        let mut countdown = QuizCountdown::new(duration_minutes);
        self.remaining.send_replace(countdown.remaining_seconds());

        if countdown.remaining_seconds().is_none() {
            return;
        }

        let remaining = Arc::clone(&self.remaining);
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            let mut on_time_up = Some(on_time_up);

            loop {
                interval.tick().await;
                match countdown.tick() {
                    TickOutcome::Running(seconds) => {
                        remaining.send_replace(Some(seconds));
                    }
                    TickOutcome::Expired => {
                        remaining.send_replace(Some(0));
                        if let Some(callback) = on_time_up.take() {
                            callback();
                        }
                        break;
                    }
                    TickOutcome::Unlimited | TickOutcome::Stopped => break,
                }
            }
        });

        self.handle = Some(handle);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        *self.remaining.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One countdown per (user, quiz) session.
#[derive(Default)]
pub struct SessionTimers {
    timers: Mutex<HashMap<(String, String), QuizTimer>>,
}

impl SessionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts from the full duration) the countdown for a session.
    pub async fn start(
        &self,
        user_id: &str,
        quiz_id: &str,
        duration_minutes: Option<u32>,
        on_time_up: OnTimeUp,
    ) {
        let mut timers = self.timers.lock().await;
        // Expired entries stay until `take_expired` claims them.
        timers.retain(|_, timer| timer.is_running() || timer.remaining_seconds() == Some(0));

        let timer = timers
            .entry((user_id.to_string(), quiz_id.to_string()))
            .or_default();
        timer.start(duration_minutes, on_time_up);

        log::debug!(
            "Started countdown of {:?} minutes for user {} on quiz {}",
            duration_minutes,
            user_id,
            quiz_id
        );
    }

    pub async fn cancel(&self, user_id: &str, quiz_id: &str) {
        let mut timers = self.timers.lock().await;
        if let Some(mut timer) = timers.remove(&(user_id.to_string(), quiz_id.to_string())) {
            timer.cancel();
        }
    }

    /// Removes the session's countdown if it ran out. False when it was
    /// cancelled or restarted since expiring.
    pub async fn take_expired(&self, user_id: &str, quiz_id: &str) -> bool {
        let mut timers = self.timers.lock().await;
        let key = (user_id.to_string(), quiz_id.to_string());
        let expired = timers
            .get(&key)
            .is_some_and(|timer| timer.remaining_seconds() == Some(0));
        if expired {
            timers.remove(&key);
        }
        expired
    }

    pub async fn remaining_seconds(&self, user_id: &str, quiz_id: &str) -> Option<u32> {
        let timers = self.timers.lock().await;
        timers
            .get(&(user_id.to_string(), quiz_id.to_string()))
            .and_then(QuizTimer::remaining_seconds)
    }
}
