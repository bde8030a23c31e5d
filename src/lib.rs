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

//! MIDI-triggered mute switch and bus selector.
//!
//! A [`processor::Processor`] runs on the audio thread: it debounces incoming
//! MIDI, matches it against learned triggers and fades between selections
//! without allocating or locking. A [`processor::Controls`] handle gives a
//! control surface the same state from another thread.

pub mod buffer;
pub mod config;
pub mod debounce;
pub mod fade;
pub mod learn;
pub mod midi;
pub mod notify;
pub mod processor;
pub mod render;
pub mod shared;
pub mod state;
pub mod triggers;

#[cfg(test)]
mod testutil;

pub use processor::{ButtonState, Controls, Processor, Snapshot};
