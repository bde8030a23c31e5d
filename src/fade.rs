// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Per-sample gain ramps.
//!
//! - [`LinearRamp`] steps linearly toward a target and holds it.
//! - [`MuteFader`] ramps between silence and unity for the mute switch.
//! - [`BusFader`] switches between buses by fading the old one out to silence and
//!   the new one in. Two buses are never audible in the same sample.
//!
//! All of these are owned by the audio thread and never allocate.

use std::time::Duration;

/// A linear ramp toward a target value.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    step: f32,
    /// Samples left until `current == target`.
    remaining: u32,
    /// Samples a full ramp takes.
    length: u32,
}

impl LinearRamp {
    /// Creates a ramp resting at `value`.
    pub fn new(value: f32) -> LinearRamp {
        LinearRamp {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
            length: 0,
        }
    }

    /// Sets the ramp length to `ceil(sample_rate * time)` samples and snaps to the
    /// current target.
    pub fn reset(&mut self, sample_rate: f64, time: Duration) {
        self.length = ramp_samples(sample_rate, time);
        self.set_current_and_target(self.target);
    }

    /// Number of samples a ramp takes.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Jumps to `value` with no ramp.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Starts ramping toward `target` from the current value. Setting the target
    /// it already has does nothing, so an in-flight or finished ramp is kept.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }
        self.target = target;

        if self.length == 0 {
            self.set_current_and_target(target);
            return;
        }
        self.remaining = self.length;
        self.step = (target - self.current) / self.length as f32;
    }

    /// Advances one sample and returns the new value.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        self.current = if self.remaining == 0 {
            self.target
        } else {
            self.current + self.step
        };
        self.current
    }

    /// True while the ramp has not reached its target.
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

fn ramp_samples(sample_rate: f64, time: Duration) -> u32 {
    let exact = sample_rate * time.as_secs_f64();
    let nearest = exact.round();
    // Whole sample counts that picked up float error must not gain a sample.
    let samples = if (exact - nearest).abs() < 1e-6 {
        nearest
    } else {
        exact.ceil()
    };
    samples.max(0.0) as u32
}

/// Fades the signal between silence and unity.
#[derive(Debug, Clone)]
pub struct MuteFader {
    ramp: LinearRamp,
}

impl MuteFader {
    /// Creates an unmuted fader.
    pub fn new() -> MuteFader {
        MuteFader {
            ramp: LinearRamp::new(1.0),
        }
    }

    /// Sets the ramp length and snaps to the current target.
    pub fn prepare(&mut self, sample_rate: f64, fade: Duration) {
        self.ramp.reset(sample_rate, fade);
    }

    pub fn mute(&mut self) {
        self.ramp.set_target(0.0);
    }

    pub fn unmute(&mut self) {
        self.ramp.set_target(1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        if muted {
            self.mute();
        } else {
            self.unmute();
        }
    }

    /// True when the target is silence.
    pub fn is_muted(&self) -> bool {
        self.ramp.target() == 0.0
    }

    /// The gain for the next sample.
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        self.ramp.next_value()
    }

    pub fn ramp(&self) -> &LinearRamp {
        &self.ramp
    }
}

impl Default for MuteFader {
    fn default() -> Self {
        MuteFader::new()
    }
}

/// Where a [`BusFader`] is in a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FadingOut,
    FadingIn,
}

/// Switches between buses through silence: fade the active bus out, switch, fade
/// the requested bus in.
///
/// Requests never interrupt a fade. If the request changes during a fade-out, the
/// latest request is the one switched to; if it changes during a fade-in, a new
/// switch starts once the fade-in completes.
#[derive(Debug, Clone)]
pub struct BusFader {
    active: usize,
    requested: usize,
    phase: Phase,
    ramp: LinearRamp,
}

impl BusFader {
    /// Creates a fader resting on bus 0 at unity.
    pub fn new() -> BusFader {
        BusFader {
            active: 0,
            requested: 0,
            phase: Phase::Idle,
            ramp: LinearRamp::new(1.0),
        }
    }

    /// Sets the ramp length and returns to bus 0 at unity.
    pub fn prepare(&mut self, sample_rate: f64, fade: Duration) {
        self.active = 0;
        self.requested = 0;
        self.phase = Phase::Idle;
        self.ramp.set_current_and_target(1.0);
        self.ramp.reset(sample_rate, fade);
    }

    /// Rests on `bus` at unity with no fade.
    pub fn settle(&mut self, bus: usize) {
        self.active = bus;
        self.requested = bus;
        self.phase = Phase::Idle;
        self.ramp.set_current_and_target(1.0);
    }

    /// Records the bus to switch to. Takes effect from the next `next_state`.
    pub fn request_bus(&mut self, bus: usize) {
        self.requested = bus;
    }

    /// The bus currently audible.
    pub fn active_bus(&self) -> usize {
        self.active
    }

    /// The last requested bus.
    pub fn requested_bus(&self) -> usize {
        self.requested
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advances one sample and returns the audible bus and its gain.
    ///
    /// The active bus changes only on the sample where the fade-out reaches
    /// silence; that sample already carries the first step of the fade-in.
    #[inline]
    pub fn next_state(&mut self) -> (usize, f32) {
        if self.phase == Phase::Idle && self.requested != self.active {
            self.phase = Phase::FadingOut;
            self.ramp.set_current_and_target(1.0);
            self.ramp.set_target(0.0);
        }

        let mut gain = self.ramp.next_value();

        if self.phase == Phase::FadingOut && !self.ramp.is_ramping() {
            self.active = self.requested;
            self.phase = Phase::FadingIn;
            self.ramp.set_current_and_target(0.0);
            self.ramp.set_target(1.0);
            gain = self.ramp.next_value();
        }

        if self.phase == Phase::FadingIn && !self.ramp.is_ramping() {
            self.phase = Phase::Idle;
        }

        (self.active, gain)
    }
}

impl Default for BusFader {
    fn default() -> Self {
        BusFader::new()
    }
}

/// The crossfade shape a product uses.
#[derive(Debug, Clone)]
pub enum Fader {
    Mute(MuteFader),
    Bus(BusFader),
}

impl Fader {
    pub fn prepare(&mut self, sample_rate: f64, fade: Duration) {
        match self {
            Fader::Mute(fader) => fader.prepare(sample_rate, fade),
            Fader::Bus(fader) => fader.prepare(sample_rate, fade),
        }
    }

    /// Points the fader at the selected action. For the mute fader action 0
    /// (stop) mutes and anything else unmutes; for the bus fader the action is
    /// the bus.
    #[inline]
    pub fn select(&mut self, action: usize) {
        match self {
            Fader::Mute(fader) => fader.set_muted(action == 0),
            Fader::Bus(fader) => fader.request_bus(action),
        }
    }

    /// Jumps to the selected action with no fade.
    pub fn settle(&mut self, action: usize) {
        match self {
            Fader::Mute(fader) => {
                let gain = if action == 0 { 0.0 } else { 1.0 };
                fader.ramp.set_current_and_target(gain);
            }
            Fader::Bus(fader) => fader.settle(action),
        }
    }

    /// Advances one sample. The mute fader always reports bus 0.
    #[inline]
    pub fn next_state(&mut self) -> (usize, f32) {
        match self {
            Fader::Mute(fader) => (0, fader.next_gain()),
            Fader::Bus(fader) => fader.next_state(),
        }
    }
}
