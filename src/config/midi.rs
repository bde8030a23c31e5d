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
use midly::{
    live::LiveEvent,
    num::{u14, u4, u7},
    MidiMessage, PitchBend,
};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::midi::MidiKey;

/// Implementers must convert to a MIDI live event.
pub trait ToMidiEvent {
    /// Converts the implementer to a MIDI live event.
    fn to_midi_event(&self) -> Result<LiveEvent<'static>, ConfigError>;
}

/// MIDI events that can be parsed from YAML. Channels are 1-indexed.
///
/// Only the status byte and first data byte take part in trigger matching, so
/// velocities and values are optional.
#[derive(Deserialize, Clone, Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    NoteOff {
        channel: u8,
        key: u8,
        #[serde(default)]
        velocity: u8,
    },
    NoteOn {
        channel: u8,
        key: u8,
        #[serde(default)]
        velocity: u8,
    },
    Aftertouch {
        channel: u8,
        key: u8,
        #[serde(default)]
        velocity: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        #[serde(default)]
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    ChannelAftertouch {
        channel: u8,
        #[serde(default)]
        velocity: u8,
    },
    PitchBend {
        channel: u8,
        bend: u16,
    },
}

impl Event {
    /// The trigger key this event matches.
    pub fn key(&self) -> Result<MidiKey, ConfigError> {
        let event = self.to_midi_event()?;
        MidiKey::from_live(&event)
            .ok_or_else(|| ConfigError::Midi(format!("{:?} cannot be used as a trigger", self)))
    }
}

/// Creates a note on event.
#[cfg(test)]
pub fn note_on(channel: u8, key: u8) -> Event {
    Event::NoteOn {
        channel,
        key,
        velocity: 127,
    }
}

impl ToMidiEvent for Event {
    fn to_midi_event(&self) -> Result<LiveEvent<'static>, ConfigError> {
        let (channel, message) = match *self {
            Event::NoteOff {
                channel,
                key,
                velocity,
            } => (
                channel,
                MidiMessage::NoteOff {
                    key: parse_u7(key)?,
                    vel: parse_u7(velocity)?,
                },
            ),
            Event::NoteOn {
                channel,
                key,
                velocity,
            } => (
                channel,
                MidiMessage::NoteOn {
                    key: parse_u7(key)?,
                    vel: parse_u7(velocity)?,
                },
            ),
            Event::Aftertouch {
                channel,
                key,
                velocity,
            } => (
                channel,
                MidiMessage::Aftertouch {
                    key: parse_u7(key)?,
                    vel: parse_u7(velocity)?,
                },
            ),
            Event::ControlChange {
                channel,
                controller,
                value,
            } => (
                channel,
                MidiMessage::Controller {
                    controller: parse_u7(controller)?,
                    value: parse_u7(value)?,
                },
            ),
            Event::ProgramChange { channel, program } => (
                channel,
                MidiMessage::ProgramChange {
                    program: parse_u7(program)?,
                },
            ),
            Event::ChannelAftertouch { channel, velocity } => (
                channel,
                MidiMessage::ChannelAftertouch {
                    vel: parse_u7(velocity)?,
                },
            ),
            Event::PitchBend { channel, bend } => (
                channel,
                MidiMessage::PitchBend {
                    bend: PitchBend(parse_u14(bend)?),
                },
            ),
        };

        Ok(LiveEvent::Midi {
            channel: parse_channel(channel)?,
            message,
        })
    }
}

/// Parses a channel from the config. Input is expected to be [1, 16].
fn parse_channel(channel: u8) -> Result<u4, ConfigError> {
    channel
        .checked_sub(1)
        .and_then(u4::try_from)
        .ok_or_else(|| ConfigError::Midi(format!("channel {} is not in 1-16", channel)))
}

/// Parses a raw u7 value.
fn parse_u7(raw: u8) -> Result<u7, ConfigError> {
    u7::try_from(raw).ok_or_else(|| ConfigError::Midi(format!("{} is not a 7-bit value", raw)))
}

/// Parses a raw u14 value.
fn parse_u14(raw: u16) -> Result<u14, ConfigError> {
    u14::try_from(raw).ok_or_else(|| ConfigError::Midi(format!("{} is not a 14-bit value", raw)))
}
