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

//! State shared by the audio thread and the control thread.
//!
//! Everything here is reached through an `Arc` held by both sides. Every field is
//! either immutable after construction or an atomic accessed with relaxed
//! ordering; no field is protected by a lock, and a write on one side may be seen
//! by the other up to one block late.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::config::Variant;
use crate::learn::{LearnController, LearnPolicy};
use crate::notify::{Changes, Notifier};
use crate::triggers::{ActionIndex, TriggerTable};

#[derive(Debug)]
pub struct Shared {
    /// Immutable after construction.
    variant: Variant,

    /// Slot writes come from the control thread (clear, load, presets) and from
    /// the audio thread (learn capture). Each slot is its own relaxed atomic.
    triggers: TriggerTable,

    /// Entered and cancelled by the control thread; finished by the audio thread
    /// with a compare-exchange so a newer target is never clobbered.
    learn: LearnController,

    /// The selected action. Written by the control thread (click, select) and by
    /// the audio thread (matched trigger); the last store wins. The audio thread
    /// hands it to the fader once per block.
    selected: AtomicUsize,

    /// Gain of the last rendered sample as `f32` bits. Written only by the audio
    /// thread.
    gain: AtomicU32,

    /// Bus of the last rendered sample. Written only by the audio thread.
    active_bus: AtomicUsize,

    /// Change notifications. The audio thread only marks; the control thread
    /// marks and wakes.
    notifier: Notifier,
}

impl Shared {
    pub fn new(variant: Variant, slots: usize, policy: LearnPolicy) -> Shared {
        let selected = variant.initial_selection();
        let (active_bus, gain) = match variant {
            Variant::MuteSwitch => (0, if selected == Variant::STOP { 0.0 } else { 1.0 }),
            Variant::BusSelector { .. } => (selected, 1.0),
        };

        Shared {
            variant,
            triggers: TriggerTable::new(variant.actions(), slots),
            learn: LearnController::new(policy),
            selected: AtomicUsize::new(selected),
            gain: AtomicU32::new(f32::to_bits(gain)),
            active_bus: AtomicUsize::new(active_bus),
            notifier: Notifier::new(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn triggers(&self) -> &TriggerTable {
        &self.triggers
    }

    pub fn learn(&self) -> &LearnController {
        &self.learn
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Records changes and wakes a waiting subscriber. Control thread only.
    pub fn notify(&self, changes: Changes) {
        self.notifier.notify(changes);
    }

    /// Records changes for the subscriber to poll. Safe on the audio thread.
    #[inline]
    pub fn mark(&self, changes: Changes) {
        self.notifier.mark(changes);
    }

    pub fn selected(&self) -> ActionIndex {
        self.selected.load(Ordering::Relaxed)
    }

    /// Selects an action and notifies when the selection changed. Out of range
    /// actions are ignored. Control thread only.
    pub fn select(&self, action: ActionIndex) -> bool {
        match self.store_selected(action) {
            Some(true) => {
                self.notify(Changes::SELECTION);
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Like `select`, but only marks the change. Safe on the audio thread.
    #[inline]
    pub fn select_marked(&self, action: ActionIndex) -> bool {
        match self.store_selected(action) {
            Some(true) => {
                self.mark(Changes::SELECTION);
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Stores the selection. None when out of range, otherwise whether it changed.
    #[inline]
    fn store_selected(&self, action: ActionIndex) -> Option<bool> {
        if action >= self.variant.actions() {
            return None;
        }
        Some(self.selected.swap(action, Ordering::Relaxed) != action)
    }

    /// Publishes what the renderer last produced.
    #[inline]
    pub fn publish(&self, active_bus: usize, gain: f32) {
        self.active_bus.store(active_bus, Ordering::Relaxed);
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn active_bus(&self) -> usize {
        self.active_bus.load(Ordering::Relaxed)
    }
}
