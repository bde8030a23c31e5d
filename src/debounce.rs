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
use std::time::Duration;

use tracing::debug;

use crate::midi::MidiEvent;

/// Suppresses MIDI events that arrive within the refractory window of the last
/// accepted one.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    /// Length of the refractory window.
    refractory_samples: u64,
    /// Samples between the last accepted event and the start of the current block.
    samples_since_accepted: u64,
}

impl Debouncer {
    /// Creates a debouncer with an empty window. Call `prepare` before use.
    pub fn new() -> Debouncer {
        Debouncer::default()
    }

    /// Configures the window for the given sample rate and resets the counter so
    /// that the first event after prepare is always accepted.
    pub fn prepare(&mut self, sample_rate: f64, block_size_hint: usize, refractory: Duration) {
        self.refractory_samples = (sample_rate * refractory.as_secs_f64()).round() as u64;
        self.samples_since_accepted = self.refractory_samples;

        debug!(
            sample_rate,
            block_size_hint,
            refractory_samples = self.refractory_samples,
            "Debouncer prepared"
        );
    }

    /// Scans the block's events in order and returns the first one that is not
    /// excluded and falls outside the refractory window. Later events in the same
    /// block are ignored once one is accepted.
    ///
    /// When nothing is accepted the counter advances by `block_samples`.
    pub fn process_block<F>(
        &mut self,
        events: &[MidiEvent],
        block_samples: usize,
        exclude: F,
    ) -> Option<MidiEvent>
    where
        F: Fn(&MidiEvent) -> bool,
    {
        for event in events.iter().filter(|event| !exclude(event)) {
            let elapsed = self
                .samples_since_accepted
                .saturating_add(u64::from(event.sample_offset()));

            if elapsed >= self.refractory_samples {
                self.samples_since_accepted = 0;
                return Some(*event);
            }
        }

        self.samples_since_accepted = self
            .samples_since_accepted
            .saturating_add(block_samples as u64);
        None
    }

    /// Length of the refractory window in samples.
    pub fn refractory_samples(&self) -> u64 {
        self.refractory_samples
    }

    pub fn samples_since_accepted(&self) -> u64 {
        self.samples_since_accepted
    }
}
