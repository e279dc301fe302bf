//! Room timers
//!
//! Each room owns one [`RoomTimers`] with a named slot per timer. Arming a
//! slot replaces (and cancels) whatever was there, and every firing carries
//! the generation it was armed with so a late firing from a cancelled timer
//! is recognised and ignored. [`RoomTimers::cancel_all`] is the single stop
//! routine used on every terminal transition.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot: seat an AI if no second human shows up
    AiFallback,
    /// Repeating one-second countdown step
    CountdownTick,
    /// One-shot safety deadline that force-starts a stalled countdown
    CountdownDeadline,
    /// Repeating gravity tick while playing
    Gravity,
    /// Repeating AI input step while playing
    AiMove,
}

impl TimerKind {
    pub const ALL: [TimerKind; 5] = [
        TimerKind::AiFallback,
        TimerKind::CountdownTick,
        TimerKind::CountdownDeadline,
        TimerKind::Gravity,
        TimerKind::AiMove,
    ];
}

/// A single timer firing as delivered to the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerFire {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Cancels its timer when dropped
pub struct TimerHandle {
    fire: TimerFire,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(fire: TimerFire, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            fire,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn fire(&self) -> TimerFire {
        self.fire
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").field("fire", &self.fire).finish()
    }
}

/// Something that can deliver [`TimerFire`]s back to a room later
pub trait TimerDriver {
    /// Fire once after `delay`, then every `period` if given
    fn schedule(&mut self, fire: TimerFire, delay: Duration, period: Option<Duration>) -> TimerHandle;
}

/// Named timer slots for one room
#[derive(Debug, Default)]
pub struct RoomTimers {
    generation: u64,
    ai_fallback: Option<TimerHandle>,
    countdown_tick: Option<TimerHandle>,
    countdown_deadline: Option<TimerHandle>,
    gravity: Option<TimerHandle>,
    ai_move: Option<TimerHandle>,
}

impl RoomTimers {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: TimerKind) -> &Option<TimerHandle> {
        match kind {
            TimerKind::AiFallback => &self.ai_fallback,
            TimerKind::CountdownTick => &self.countdown_tick,
            TimerKind::CountdownDeadline => &self.countdown_deadline,
            TimerKind::Gravity => &self.gravity,
            TimerKind::AiMove => &self.ai_move,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::AiFallback => &mut self.ai_fallback,
            TimerKind::CountdownTick => &mut self.countdown_tick,
            TimerKind::CountdownDeadline => &mut self.countdown_deadline,
            TimerKind::Gravity => &mut self.gravity,
            TimerKind::AiMove => &mut self.ai_move,
        }
    }

    /// Arm `kind`, replacing any timer already in that slot
    pub fn arm<D: TimerDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        kind: TimerKind,
        delay: Duration,
        period: Option<Duration>,
    ) {
        self.generation += 1;
        let fire = TimerFire {
            kind,
            generation: self.generation,
        };
        // Cancel the previous timer before scheduling its replacement
        self.slot_mut(kind).take();
        let handle = driver.schedule(fire, delay, period);
        *self.slot_mut(kind) = Some(handle);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.slot_mut(kind).take();
    }

    pub fn cancel_all(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel(kind);
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Whether `fire` comes from the timer currently armed in its slot
    pub fn is_current(&self, fire: TimerFire) -> bool {
        self.slot(fire.kind)
            .as_ref()
            .is_some_and(|handle| handle.fire() == fire)
    }
}

/// Delivers firings through a channel from spawned tokio tasks
#[derive(Debug, Clone)]
pub struct TokioTimerDriver {
    tx: mpsc::UnboundedSender<TimerFire>,
}

impl TokioTimerDriver {
    pub fn new(tx: mpsc::UnboundedSender<TimerFire>) -> Self {
        Self { tx }
    }
}

impl TimerDriver for TokioTimerDriver {
    fn schedule(&mut self, fire: TimerFire, delay: Duration, period: Option<Duration>) -> TimerHandle {
        let tx = self.tx.clone();
        let task: JoinHandle<()> = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(fire).is_err() {
                return;
            }
            let Some(period) = period else {
                return;
            };
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tx.send(fire).is_err() {
                    break;
                }
            }
        });
        TimerHandle::new(fire, move || task.abort())
    }
}

/// A timer recorded by [`ManualTimerDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub fire: TimerFire,
    pub delay: Duration,
    pub period: Option<Duration>,
    pub cancelled: bool,
}

/// Records schedules instead of running them; the caller fires timers by hand.
///
/// Clones share the same record, so a test can keep one clone and hand the
/// other to a room.
#[derive(Debug, Clone, Default)]
pub struct ManualTimerDriver {
    scheduled: Arc<Mutex<Vec<ScheduledTimer>>>,
}

impl ManualTimerDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every timer scheduled so far, oldest first
    pub fn scheduled(&self) -> Vec<ScheduledTimer> {
        self.scheduled
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Most recently scheduled, still-live timer of `kind`
    pub fn live(&self, kind: TimerKind) -> Option<ScheduledTimer> {
        self.scheduled()
            .into_iter()
            .rev()
            .find(|t| t.fire.kind == kind && !t.cancelled)
    }
}

impl TimerDriver for ManualTimerDriver {
    fn schedule(&mut self, fire: TimerFire, delay: Duration, period: Option<Duration>) -> TimerHandle {
        if let Ok(mut list) = self.scheduled.lock() {
            list.push(ScheduledTimer {
                fire,
                delay,
                period,
                cancelled: false,
            });
        }
        let scheduled = Arc::clone(&self.scheduled);
        TimerHandle::new(fire, move || {
            if let Ok(mut list) = scheduled.lock() {
                if let Some(timer) = list.iter_mut().find(|t| t.fire == fire) {
                    timer.cancelled = true;
                }
            }
        })
    }
}
