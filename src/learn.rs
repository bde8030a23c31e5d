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
use std::sync::atomic::{AtomicI32, Ordering};

use crate::midi::MidiKey;
use crate::triggers::{ActionIndex, TriggerTable};

const NOT_LEARNING: i32 = -1;

/// The learn mode as seen by one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnState {
    NotLearning,
    Learning(ActionIndex),
}

impl LearnState {
    fn to_raw(self) -> i32 {
        match self {
            LearnState::NotLearning => NOT_LEARNING,
            LearnState::Learning(action) => i32::try_from(action).unwrap_or(NOT_LEARNING),
        }
    }

    fn from_raw(raw: i32) -> LearnState {
        match usize::try_from(raw) {
            Ok(action) => LearnState::Learning(action),
            Err(_) => LearnState::NotLearning,
        }
    }

    /// The action being learned, if any.
    pub fn action(self) -> Option<ActionIndex> {
        match self {
            LearnState::NotLearning => None,
            LearnState::Learning(action) => Some(action),
        }
    }
}

/// Behavior switches that differ between products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnPolicy {
    /// Remove a captured key from every other action before storing it.
    pub evict_duplicates: bool,
    /// Clear an action's triggers when learn mode is entered for it.
    pub clear_on_learn: bool,
}

impl Default for LearnPolicy {
    fn default() -> Self {
        LearnPolicy {
            evict_duplicates: false,
            clear_on_learn: true,
        }
    }
}

/// What a capture did with the accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// The key went into `slot`. `finished` is set when that was the last free slot
    /// and learn mode has ended.
    Stored {
        action: ActionIndex,
        slot: usize,
        finished: bool,
    },
    /// The action had no free slot; learn mode has ended without storing.
    Full { action: ActionIndex },
}

/// The learn state machine.
///
/// The control thread enters and cancels learn mode. The audio thread commits
/// captured keys and leaves learn mode once the action's slots are full. The
/// target is one relaxed `AtomicI32`, so neither side waits on the other.
#[derive(Debug)]
pub struct LearnController {
    /// Written by the control thread (enter/cancel) and the audio thread (finish).
    target: AtomicI32,
    policy: LearnPolicy,
}

impl LearnController {
    /// Creates a controller that is not learning.
    pub fn new(policy: LearnPolicy) -> LearnController {
        LearnController {
            target: AtomicI32::new(NOT_LEARNING),
            policy,
        }
    }

    pub fn policy(&self) -> LearnPolicy {
        self.policy
    }

    /// The current learn state.
    pub fn state(&self) -> LearnState {
        LearnState::from_raw(self.target.load(Ordering::Relaxed))
    }

    /// Sets the learn state directly.
    pub fn set(&self, state: LearnState) {
        self.target.store(state.to_raw(), Ordering::Relaxed);
    }

    /// Long press: start learning the action, replacing any other learn state.
    /// Out of range actions are ignored.
    pub fn long_press(&self, table: &TriggerTable, action: ActionIndex) {
        if action >= table.actions() {
            return;
        }
        if self.policy.clear_on_learn {
            table.clear(action);
        }
        self.set(LearnState::Learning(action));
    }

    /// Click: cancels learn mode if it is capturing this action. Returns false when
    /// the click was not consumed and the caller should perform the action instead.
    pub fn click(&self, action: ActionIndex) -> bool {
        if self.state() == LearnState::Learning(action) {
            self.set(LearnState::NotLearning);
            return true;
        }
        false
    }

    /// Commits an accepted key while learning. Returns None when not learning.
    ///
    /// Runs on the audio thread: bounded by the table size and never allocates.
    pub fn capture(&self, table: &TriggerTable, key: MidiKey) -> Option<Capture> {
        let action = self.state().action()?;

        if self.policy.evict_duplicates {
            table.evict(key, action);
        }

        match table.first_free(action) {
            Some(slot) => {
                table.set(action, slot, key);
                let finished = table.first_free(action).is_none();
                if finished {
                    self.finish(action);
                }
                Some(Capture::Stored {
                    action,
                    slot,
                    finished,
                })
            }
            None => {
                self.finish(action);
                Some(Capture::Full { action })
            }
        }
    }

    /// Leaves learn mode only if it is still learning `action`, so a long press on
    /// another action in the meantime is kept.
    fn finish(&self, action: ActionIndex) {
        let Ok(raw) = i32::try_from(action) else {
            return;
        };
        let _ = self
            .target
            .compare_exchange(raw, NOT_LEARNING, Ordering::Relaxed, Ordering::Relaxed);
    }
}
