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
/// Channel slices for one block. Borrowed from the host for the duration of a
/// single `process_block` call.
pub enum AudioBlock<'a, 'b> {
    /// A single bus processed in place. Only bus 0 exists; any other bus renders
    /// as silence.
    InPlace { channels: &'a mut [&'b mut [f32]] },
    /// One input per selectable bus, each a list of channels, rendered into a
    /// single output bus. Only one input bus feeds the output in any sample.
    Buses {
        inputs: &'a [&'b [&'b [f32]]],
        outputs: &'a mut [&'b mut [f32]],
    },
}

impl<'a, 'b> AudioBlock<'a, 'b> {
    /// Wraps channels for in-place processing.
    pub fn in_place(channels: &'a mut [&'b mut [f32]]) -> Self {
        AudioBlock::InPlace { channels }
    }

    /// Wraps per-bus inputs and an output bus.
    pub fn buses(inputs: &'a [&'b [&'b [f32]]], outputs: &'a mut [&'b mut [f32]]) -> Self {
        AudioBlock::Buses { inputs, outputs }
    }

    /// Samples in the block: the length of the shortest output channel.
    pub fn num_samples(&self) -> usize {
        let outputs: &[&mut [f32]] = match self {
            AudioBlock::InPlace { channels } => channels,
            AudioBlock::Buses { outputs, .. } => outputs,
        };
        outputs
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(0)
    }

    /// Writes one sample of every output channel from the given bus at the given
    /// gain.
    #[inline]
    pub fn render_sample(&mut self, sample: usize, bus: usize, gain: f32) {
        match self {
            AudioBlock::InPlace { channels } => {
                let gain = if bus == 0 { gain } else { 0.0 };
                for channel in channels.iter_mut() {
                    if let Some(value) = channel.get_mut(sample) {
                        *value *= gain;
                    }
                }
            }
            AudioBlock::Buses { inputs, outputs } => {
                let input = inputs.get(bus).copied().unwrap_or(&[]);
                for (index, channel) in outputs.iter_mut().enumerate() {
                    let source = input
                        .get(index)
                        .and_then(|channel| channel.get(sample))
                        .copied()
                        .unwrap_or(0.0);
                    if let Some(value) = channel.get_mut(sample) {
                        *value = source * gain;
                    }
                }
            }
        }
    }
}
