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
use std::fmt;

use midly::{live::LiveEvent, MidiMessage};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const SYSTEM: u8 = 0xF0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A packed identifier built from a MIDI status byte and its first data byte.
///
/// The packing is `status << 8 | data1`, so the channel, the message type and the
/// note/controller/program number all take part in equality. Negative values are
/// the unassigned sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiKey(i32);

impl MidiKey {
    /// The sentinel stored in empty trigger slots.
    pub const UNASSIGNED: MidiKey = MidiKey(-1);

    /// Packs a status byte and first data byte into a key.
    pub const fn pack(status: u8, data1: u8) -> MidiKey {
        MidiKey(((status as i32) << 8) | data1 as i32)
    }

    /// Builds a key from its stored integer form. Any negative value is unassigned.
    pub const fn from_raw(raw: i32) -> MidiKey {
        if raw < 0 {
            MidiKey::UNASSIGNED
        } else {
            MidiKey(raw)
        }
    }

    /// The key for a parsed live event. System messages have no key.
    pub fn from_live(event: &LiveEvent) -> Option<MidiKey> {
        MidiEvent::from_live(0, event).map(|event| event.key())
    }

    /// The integer form used for atomic storage and persistence.
    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_assigned(self) -> bool {
        self.0 >= 0
    }

    /// The status byte, if assigned.
    pub fn status(self) -> Option<u8> {
        self.is_assigned().then_some(((self.0 >> 8) & 0xFF) as u8)
    }

    /// The first data byte, if assigned.
    pub fn data1(self) -> Option<u8> {
        self.is_assigned().then_some((self.0 & 0xFF) as u8)
    }
}

impl Default for MidiKey {
    fn default() -> Self {
        MidiKey::UNASSIGNED
    }
}

/// Formats the key the way trigger buttons show it: `Ch 1 C3`, `Ch 2 CC 7`,
/// `Ch 16 Prog 5`, or `status:data1` in hex for anything else. Unassigned keys
/// format as an empty string.
impl fmt::Display for MidiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Some(status), Some(data1)) = (self.status(), self.data1()) else {
            return Ok(());
        };

        let channel = (status & 0x0F) + 1;
        match status & 0xF0 {
            NOTE_ON => write!(f, "Ch {} {}", channel, note_name(data1)),
            CONTROL_CHANGE => write!(f, "Ch {} CC {}", channel, data1),
            PROGRAM_CHANGE => write!(f, "Ch {} Prog {}", channel, data1),
            _ => write!(f, "Ch {} {:x}:{:x}", channel, status, data1),
        }
    }
}

/// Note name with sharps, where middle C (60) is C3.
fn note_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 2;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}

/// A short channel message positioned within an audio block.
///
/// Stored inline so it can be copied around the audio thread without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Offset of the event from the start of its block, in samples.
    sample_offset: u32,
    status: u8,
    data1: u8,
    data2: u8,
}

impl MidiEvent {
    /// Creates an event from raw bytes.
    pub const fn new(sample_offset: u32, status: u8, data1: u8, data2: u8) -> MidiEvent {
        MidiEvent {
            sample_offset,
            status,
            data1,
            data2,
        }
    }

    /// A note on. The channel is zero-based.
    pub const fn note_on(sample_offset: u32, channel: u8, key: u8, velocity: u8) -> MidiEvent {
        MidiEvent::new(sample_offset, NOTE_ON | (channel & 0x0F), key, velocity)
    }

    /// A note off. The channel is zero-based.
    pub const fn note_off(sample_offset: u32, channel: u8, key: u8, velocity: u8) -> MidiEvent {
        MidiEvent::new(sample_offset, NOTE_OFF | (channel & 0x0F), key, velocity)
    }

    /// A control change. The channel is zero-based.
    pub const fn control_change(
        sample_offset: u32,
        channel: u8,
        controller: u8,
        value: u8,
    ) -> MidiEvent {
        MidiEvent::new(
            sample_offset,
            CONTROL_CHANGE | (channel & 0x0F),
            controller,
            value,
        )
    }

    /// A program change. The channel is zero-based.
    pub const fn program_change(sample_offset: u32, channel: u8, program: u8) -> MidiEvent {
        MidiEvent::new(sample_offset, PROGRAM_CHANGE | (channel & 0x0F), program, 0)
    }

    /// Reads an event from raw wire bytes. Returns None when the first byte is not a
    /// channel status byte, so system common and realtime messages are dropped.
    pub fn from_bytes(sample_offset: u32, bytes: &[u8]) -> Option<MidiEvent> {
        let status = *bytes.first()?;
        if !(0x80..SYSTEM).contains(&status) {
            return None;
        }
        Some(MidiEvent::new(
            sample_offset,
            status,
            bytes.get(1).copied().unwrap_or(0),
            bytes.get(2).copied().unwrap_or(0),
        ))
    }

    /// Converts a parsed channel message. System common and realtime messages are
    /// not triggers and yield None.
    pub fn from_live(sample_offset: u32, event: &LiveEvent) -> Option<MidiEvent> {
        let LiveEvent::Midi { channel, message } = event else {
            return None;
        };
        let channel = channel.as_int();

        let (kind, data1, data2) = match *message {
            MidiMessage::NoteOff { key, vel } => (NOTE_OFF, key.as_int(), vel.as_int()),
            MidiMessage::NoteOn { key, vel } => (NOTE_ON, key.as_int(), vel.as_int()),
            MidiMessage::Aftertouch { key, vel } => (0xA0, key.as_int(), vel.as_int()),
            MidiMessage::Controller { controller, value } => {
                (CONTROL_CHANGE, controller.as_int(), value.as_int())
            }
            MidiMessage::ProgramChange { program } => (PROGRAM_CHANGE, program.as_int(), 0),
            MidiMessage::ChannelAftertouch { vel } => (0xD0, vel.as_int(), 0),
            MidiMessage::PitchBend { bend } => {
                let raw = bend.0.as_int();
                (0xE0, (raw & 0x7F) as u8, ((raw >> 7) & 0x7F) as u8)
            }
        };

        Some(MidiEvent::new(sample_offset, kind | channel, data1, data2))
    }

    /// Returns a copy of this event moved to the given offset.
    pub const fn at(self, sample_offset: u32) -> MidiEvent {
        MidiEvent {
            sample_offset,
            ..self
        }
    }

    pub const fn sample_offset(&self) -> u32 {
        self.sample_offset
    }

    pub const fn status(&self) -> u8 {
        self.status
    }

    pub const fn data1(&self) -> u8 {
        self.data1
    }

    pub const fn data2(&self) -> u8 {
        self.data2
    }

    /// Zero-based channel.
    pub const fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// True for note offs and for note ons with zero velocity.
    pub const fn is_release(&self) -> bool {
        match self.status & 0xF0 {
            NOTE_OFF => true,
            NOTE_ON => self.data2 == 0,
            _ => false,
        }
    }

    /// Whether this is a system common or realtime message.
    pub const fn is_system(&self) -> bool {
        self.status >= SYSTEM
    }

    /// Releases and system messages never learn or fire a trigger.
    pub const fn is_ignored(&self) -> bool {
        self.is_release() || self.is_system()
    }

    /// The key this event matches against.
    pub const fn key(&self) -> MidiKey {
        MidiKey::pack(self.status, self.data1)
    }
}
