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
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use midly::{live::LiveEvent, MetaMessage, Smf, Timing, TrackEventKind};
use tracing::{debug, info};

use crate::buffer::AudioBlock;
use crate::config::{ConfigError, Settings, Variant};
use crate::midi::MidiEvent;
use crate::processor::Processor;

/// The tempo a file plays at until its first tempo event, in microseconds per beat.
const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Invalid(String),
}

/// How a render runs.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Samples per block handed to the processor.
    pub block_size: usize,
    /// Saved trigger state to load before rendering.
    pub state: Option<Vec<u8>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            block_size: 512,
            state: None,
        }
    }
}

/// What a render did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: usize,
    /// Channel events delivered to the processor.
    pub midi_events: usize,
}

/// Renders `inputs` through a processor driven by the MIDI file into a 32-bit
/// float WAV at `output`.
///
/// The mute switch takes exactly one input. The bus selector takes one input
/// per bus, in bus order; buses without an input are silent. Every input must
/// share a sample rate, and the output has the channel count of the first input.
pub fn render(
    settings: &Settings,
    midi: &Path,
    inputs: &[PathBuf],
    output: &Path,
    options: &RenderOptions,
) -> Result<RenderSummary, RenderError> {
    if options.block_size == 0 {
        return Err(RenderError::Invalid("block size must be positive".into()));
    }
    let variant = settings.variant();
    let allowed = match variant {
        Variant::MuteSwitch => 1..=1,
        Variant::BusSelector { buses } => 1..=buses,
    };
    if !allowed.contains(&inputs.len()) {
        return Err(RenderError::Invalid(format!(
            "{} takes {}-{} inputs, got {}",
            variant.kind(),
            allowed.start(),
            allowed.end(),
            inputs.len()
        )));
    }

    let mut buses = Vec::with_capacity(inputs.len());
    let mut sample_rate = None;
    for path in inputs {
        let (rate, channels) = read_wav(path)?;
        if sample_rate.is_some_and(|expected| expected != rate) {
            return Err(RenderError::Invalid(format!(
                "{} is {} Hz, expected {} Hz",
                path.display(),
                rate,
                sample_rate.unwrap_or_default()
            )));
        }
        sample_rate = Some(rate);
        buses.push(channels);
    }
    let sample_rate = sample_rate.unwrap_or_default();

    let length = buses
        .iter()
        .flatten()
        .map(Vec::len)
        .max()
        .unwrap_or_default();
    for channel in buses.iter_mut().flatten() {
        channel.resize(length, 0.0);
    }

    let events = midi_events(&fs::read(midi)?, f64::from(sample_rate))?;

    let mut processor = Processor::new(settings)?;
    if let Some(state) = &options.state {
        processor.controls().load_state(state);
    }
    processor.prepare(f64::from(sample_rate), options.block_size);

    let channel_count = buses.first().map(Vec::len).unwrap_or_default();
    let mut rendered = match variant {
        Variant::MuteSwitch => buses.remove(0),
        Variant::BusSelector { .. } => vec![vec![0.0; length]; channel_count],
    };

    info!(
        midi = ?midi,
        inputs = inputs.len(),
        sample_rate,
        channels = channel_count,
        samples = length,
        block_size = options.block_size,
        "Rendering"
    );
    let started = Instant::now();

    let mut block_events = Vec::new();
    let mut next_event = 0;
    let mut delivered = 0;
    for start in (0..length).step_by(options.block_size) {
        let end = (start + options.block_size).min(length);

        block_events.clear();
        while let Some((at, event)) = events.get(next_event) {
            if *at >= end as u64 {
                break;
            }
            block_events.push(event.at((*at - start as u64) as u32));
            next_event += 1;
        }
        delivered += block_events.len();

        let mut outputs: Vec<&mut [f32]> = rendered
            .iter_mut()
            .map(|channel| &mut channel[start..end])
            .collect();
        match variant {
            Variant::MuteSwitch => {
                let mut block = AudioBlock::in_place(&mut outputs);
                processor.process_block(&mut block, &block_events);
            }
            Variant::BusSelector { .. } => {
                let bus_channels: Vec<Vec<&[f32]>> = buses
                    .iter()
                    .map(|bus| bus.iter().map(|channel| &channel[start..end]).collect())
                    .collect();
                let inputs: Vec<&[&[f32]]> = bus_channels.iter().map(Vec::as_slice).collect();
                let mut block = AudioBlock::buses(&inputs, &mut outputs);
                processor.process_block(&mut block, &block_events);
            }
        }
    }

    write_wav(output, &rendered, sample_rate)?;

    let summary = RenderSummary {
        sample_rate,
        channels: channel_count,
        samples: length,
        midi_events: delivered,
    };
    info!(
        output = ?output,
        midi_events = summary.midi_events,
        dropped = events.len() - delivered,
        elapsed = ?started.elapsed(),
        "Rendered"
    );
    Ok(summary)
}

/// Reads a WAV file into one buffer per channel, scaling integer samples to
/// [-1.0, 1.0).
fn read_wav(path: &Path) -> Result<(u32, Vec<Vec<f32>>), RenderError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<f32>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|sample| sample as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()?
        }
    };

    let channel_count = usize::from(spec.channels);
    if channel_count == 0 {
        return Err(RenderError::Invalid(format!(
            "{} has no channels",
            path.display()
        )));
    }
    let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
    for (index, sample) in samples.into_iter().enumerate() {
        channels[index % channel_count].push(sample);
    }

    debug!(
        path = ?path,
        sample_rate = spec.sample_rate,
        channels = channel_count,
        bits = spec.bits_per_sample,
        "Read input"
    );
    Ok((spec.sample_rate, channels))
}

fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) -> Result<(), RenderError> {
    let channel_count = u16::try_from(channels.len())
        .map_err(|_| RenderError::Invalid(format!("too many channels: {}", channels.len())))?;
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: channel_count,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = channels.first().map(Vec::len).unwrap_or_default();
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Reads the channel events of a Standard MIDI File, positioned in samples.
///
/// Tracks are merged as if they played in parallel. Metrical files follow their
/// tempo events; timecode files tick at a fixed rate.
fn midi_events(data: &[u8], sample_rate: f64) -> Result<Vec<(u64, MidiEvent)>, RenderError> {
    let smf = Smf::parse(data)?;

    let mut timed = Vec::new();
    for track in smf.tracks.iter() {
        let mut tick = 0u64;
        for event in track.iter() {
            tick += u64::from(event.delta.as_int());
            timed.push((tick, event.kind));
        }
    }
    // Stable, so events on the same tick keep their track order.
    timed.sort_by_key(|(tick, _)| *tick);

    let mut seconds_per_tick = match smf.header.timing {
        Timing::Metrical(ticks_per_beat) => {
            f64::from(DEFAULT_TEMPO) / 1_000_000.0 / f64::from(ticks_per_beat.as_int().max(1))
        }
        Timing::Timecode(fps, subframes) => {
            1.0 / (f64::from(fps.as_f32()) * f64::from(subframes.max(1)))
        }
    };

    let mut events = Vec::new();
    let mut last_tick = 0u64;
    let mut seconds = 0.0;
    for (tick, kind) in timed {
        seconds += (tick - last_tick) as f64 * seconds_per_tick;
        last_tick = tick;

        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                if let Timing::Metrical(ticks_per_beat) = smf.header.timing {
                    seconds_per_tick = f64::from(tempo.as_int())
                        / 1_000_000.0
                        / f64::from(ticks_per_beat.as_int().max(1));
                }
            }
            TrackEventKind::Midi { channel, message } => {
                let live = LiveEvent::Midi { channel, message };
                if let Some(event) = MidiEvent::from_live(0, &live) {
                    events.push(((seconds * sample_rate).round() as u64, event));
                }
            }
            _ => {}
        }
    }
    Ok(events)
}
