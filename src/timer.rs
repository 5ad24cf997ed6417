//! Pausable countdown driving a room's ticks
//!
//! The timer never sleeps by itself. Arming it hands a
//! [`AlarmMessage::Tick`] to the room's scheduler; the scheduler delivers the
//! alarm back after the current interval and the room calls [`Timer::fire`].
//! Every arm bumps a generation counter, so an alarm that was scheduled before
//! a pause or a restart no longer matches and is dropped. This keeps at most
//! one live tick in flight no matter how often the timer is paused, resumed or
//! restarted from inside its own tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Alarms scheduled by the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// One timer unit has passed for the armed generation
    Tick {
        /// Generation the alarm was armed for
        generation: u64,
    },
}

/// Which room routine runs after each tick
///
/// The room registers exactly one of these at a time; registering a new one
/// replaces the previous handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickHandler {
    /// Presentation countdown before the first question
    Presentation,
    /// Round countdown while players answer
    Answering,
}

/// A pausable, speed-adjustable countdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    elapsed: u64,
    countdown_from: u64,
    speed: u32,
    normal_speed: u32,
    panic_speed: u32,
    interval: Duration,
    generation: u64,
    pending: Option<u64>,
    running: bool,
    on_tick: Option<TickHandler>,
}

impl Timer {
    /// Creates a paused timer using the tick interval and speeds in `settings`
    pub fn new(settings: &Settings) -> Self {
        Self {
            elapsed: 0,
            countdown_from: 0,
            speed: settings.normal_speed,
            normal_speed: settings.normal_speed,
            panic_speed: settings.panic_speed,
            interval: settings.tick_interval,
            generation: 0,
            pending: None,
            running: false,
            on_tick: None,
        }
    }

    /// Resets elapsed time to zero and starts ticking
    pub fn start<S: FnMut(crate::AlarmMessage, Duration)>(&mut self, schedule_message: &mut S) {
        self.elapsed = 0;
        self.pending = None;
        self.running = true;
        self.arm(schedule_message);
    }

    /// Sets a countdown target of `units` and starts ticking from zero
    pub fn start_countdown<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        units: u64,
        schedule_message: &mut S,
    ) {
        self.countdown_from = units;
        self.start(schedule_message);
    }

    /// Cancels the pending tick. Calling it again has no effect.
    pub fn pause(&mut self) {
        self.running = false;
        if self.pending.take().is_some() {
            self.generation += 1;
        }
    }

    /// Re-arms ticking from the current elapsed time if paused
    pub fn resume<S: FnMut(crate::AlarmMessage, Duration)>(&mut self, schedule_message: &mut S) {
        if self.running {
            return;
        }
        self.running = true;
        self.arm(schedule_message);
    }

    /// Flips between paused and running, returning whether the timer is now paused
    pub fn toggle_pause<S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        schedule_message: &mut S,
    ) -> bool {
        if self.running {
            self.pause();
        } else {
            self.resume(schedule_message);
        }
        self.is_paused()
    }

    /// Switches to panic speed for every tick armed from now on
    pub fn panic(&mut self) {
        self.speed = self.panic_speed;
    }

    /// Restores normal speed for every tick armed from now on
    pub fn stop_panicking(&mut self) {
        self.speed = self.normal_speed;
    }

    /// Replaces the routine run after each tick
    pub fn on_tick(&mut self, handler: TickHandler) {
        self.on_tick = Some(handler);
    }

    /// The routine currently registered, if any
    pub fn handler(&self) -> Option<TickHandler> {
        self.on_tick
    }

    /// Accepts a delivered tick alarm
    ///
    /// Returns `false` and leaves the timer untouched if the alarm belongs to
    /// a cancelled or superseded generation. Otherwise elapsed time advances by
    /// one unit and the caller is expected to run the handler and then
    /// [`rearm`](Self::rearm).
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.pending != Some(generation) {
            return false;
        }
        self.pending = None;
        self.elapsed += 1;
        true
    }

    /// Schedules the next tick unless the handler paused the timer
    pub fn rearm<S: FnMut(crate::AlarmMessage, Duration)>(&mut self, schedule_message: &mut S) {
        if self.running && self.pending.is_none() {
            self.arm(schedule_message);
        }
    }

    /// Drives the countdown straight to zero
    pub fn skip(&mut self) {
        self.elapsed = self.elapsed.max(self.countdown_from);
    }

    fn arm<S: FnMut(crate::AlarmMessage, Duration)>(&mut self, schedule_message: &mut S) {
        self.generation += 1;
        self.pending = Some(self.generation);
        schedule_message(
            AlarmMessage::Tick {
                generation: self.generation,
            }
            .into(),
            self.current_interval(),
        );
    }

    /// Wall-clock delay between ticks at the current speed
    pub fn current_interval(&self) -> Duration {
        self.interval / self.speed.max(1)
    }

    /// Units elapsed since the last start
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Units left on the countdown, never below zero
    pub fn remaining(&self) -> u64 {
        self.countdown_from.saturating_sub(self.elapsed)
    }

    /// Whether the countdown reached zero
    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Whether no tick is scheduled
    pub fn is_paused(&self) -> bool {
        !self.running
    }

    /// Whether ticks are armed at panic speed
    pub fn is_panicking(&self) -> bool {
        self.speed == self.panic_speed && self.panic_speed != self.normal_speed
    }
}
