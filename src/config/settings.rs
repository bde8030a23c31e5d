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
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ConfigError;
use super::midi::Event;
use crate::learn::LearnPolicy;
use crate::midi::MidiKey;
use crate::triggers::ActionIndex;

const DEFAULT_TRIGGER_SLOTS: usize = 4;
const MAX_TRIGGER_SLOTS: usize = 16;
const MIN_BUSES: usize = 2;
const MAX_BUSES: usize = 16;
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);
const DEFAULT_FADE: Duration = Duration::from_millis(50);

/// The product shape: which actions exist and which crossfade drives them.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    /// Two actions, stop (0) and go (1), fading one signal in and out.
    #[default]
    MuteSwitch,
    /// One action per input bus; switching fades through silence.
    BusSelector { buses: usize },
}

impl Variant {
    /// The stop action of the mute switch.
    pub const STOP: ActionIndex = 0;
    /// The go action of the mute switch.
    pub const GO: ActionIndex = 1;

    /// Number of actions, and so of trigger lists.
    pub fn actions(&self) -> usize {
        match self {
            Variant::MuteSwitch => 2,
            Variant::BusSelector { buses } => *buses,
        }
    }

    /// The name shown for an action, or None when out of range.
    pub fn action_name(&self, action: ActionIndex) -> Option<String> {
        if action >= self.actions() {
            return None;
        }
        Some(match self {
            Variant::MuteSwitch if action == Variant::STOP => "stop".to_string(),
            Variant::MuteSwitch => "go".to_string(),
            Variant::BusSelector { .. } => format!("bus {}", action + 1),
        })
    }

    /// Looks up an action by its name, ignoring case.
    pub fn action_index(&self, name: &str) -> Option<ActionIndex> {
        let name = name.trim();
        (0..self.actions()).find(|action| {
            self.action_name(*action)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
        })
    }

    /// The action selected when an instance is created: go for the mute switch,
    /// the first bus for the selector.
    pub fn initial_selection(&self) -> ActionIndex {
        match self {
            Variant::MuteSwitch => Variant::GO,
            Variant::BusSelector { .. } => 0,
        }
    }

    /// The tag used in settings and saved state.
    pub fn kind(&self) -> &'static str {
        match self {
            Variant::MuteSwitch => "mute_switch",
            Variant::BusSelector { .. } => "bus_selector",
        }
    }
}

/// A YAML representation of the learn policy.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LearnSettings {
    /// Remove a learned key from every other action (default: false).
    evict_duplicates: Option<bool>,

    /// Clear an action's triggers when learn starts (default: true).
    clear_on_learn: Option<bool>,
}

impl LearnSettings {
    /// The learn policy with defaults filled in.
    pub fn policy(&self) -> LearnPolicy {
        let defaults = LearnPolicy::default();
        LearnPolicy {
            evict_duplicates: self.evict_duplicates.unwrap_or(defaults.evict_duplicates),
            clear_on_learn: self.clear_on_learn.unwrap_or(defaults.clear_on_learn),
        }
    }
}

/// Triggers assigned to an action before anything is learned.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Preset {
    /// The action name, e.g. `stop`, `go` or `bus 2`.
    action: String,

    /// The events that trigger the action, in slot order.
    events: Vec<Event>,
}

impl Preset {
    pub fn new(action: &str, events: Vec<Event>) -> Preset {
        Preset {
            action: action.to_string(),
            events,
        }
    }
}

/// A YAML representation of the processor settings.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// The product variant (default: mute_switch).
    #[serde(default)]
    variant: Variant,

    /// Trigger slots per action (default: 4).
    trigger_slots: Option<usize>,

    /// Refractory window for incoming MIDI (default: 10ms).
    debounce: Option<String>,

    /// Length of each fade ramp (default: 50ms).
    fade: Option<String>,

    /// Learn behavior.
    #[serde(default)]
    learn: LearnSettings,

    /// Triggers assigned at startup.
    #[serde(default)]
    presets: Vec<Preset>,
}

impl Settings {
    /// Creates settings for the variant with every other value defaulted.
    pub fn new(variant: Variant) -> Settings {
        Settings {
            variant,
            ..Default::default()
        }
    }

    /// Parse settings from a file. The format follows the file extension.
    pub fn deserialize(path: &Path) -> Result<Settings, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;

        info!(
            path = ?path,
            variant = settings.variant.kind(),
            actions = settings.variant.actions(),
            "Loaded settings"
        );
        Ok(settings)
    }

    pub fn with_trigger_slots(mut self, slots: usize) -> Settings {
        self.trigger_slots = Some(slots);
        self
    }

    pub fn with_debounce(mut self, debounce: &str) -> Settings {
        self.debounce = Some(debounce.to_string());
        self
    }

    pub fn with_fade(mut self, fade: &str) -> Settings {
        self.fade = Some(fade.to_string());
        self
    }

    pub fn with_learn_policy(mut self, policy: LearnPolicy) -> Settings {
        self.learn = LearnSettings {
            evict_duplicates: Some(policy.evict_duplicates),
            clear_on_learn: Some(policy.clear_on_learn),
        };
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Settings {
        self.presets.push(preset);
        self
    }

    /// Checks every value the processor depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Variant::BusSelector { buses } = self.variant {
            if !(MIN_BUSES..=MAX_BUSES).contains(&buses) {
                return Err(ConfigError::Invalid(format!(
                    "bus_selector needs {}-{} buses, got {}",
                    MIN_BUSES, MAX_BUSES, buses
                )));
            }
        }

        let slots = self.trigger_slots();
        if !(1..=MAX_TRIGGER_SLOTS).contains(&slots) {
            return Err(ConfigError::Invalid(format!(
                "trigger_slots must be 1-{}, got {}",
                MAX_TRIGGER_SLOTS, slots
            )));
        }

        self.debounce()?;
        self.fade()?;
        self.presets()?;
        Ok(())
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Returns the trigger slots per action (default: 4).
    pub fn trigger_slots(&self) -> usize {
        self.trigger_slots.unwrap_or(DEFAULT_TRIGGER_SLOTS)
    }

    /// Returns the debounce window (default: 10ms).
    pub fn debounce(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.debounce.as_deref(), DEFAULT_DEBOUNCE)
    }

    /// Returns the fade length (default: 50ms).
    pub fn fade(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.fade.as_deref(), DEFAULT_FADE)
    }

    pub fn learn_policy(&self) -> LearnPolicy {
        self.learn.policy()
    }

    /// Resolves the presets to action indices and trigger keys.
    pub fn presets(&self) -> Result<Vec<(ActionIndex, Vec<MidiKey>)>, ConfigError> {
        self.presets
            .iter()
            .map(|preset| {
                let action = self.variant.action_index(&preset.action).ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "unknown action {:?} for {}",
                        preset.action,
                        self.variant.kind()
                    ))
                })?;
                if preset.events.len() > self.trigger_slots() {
                    return Err(ConfigError::Invalid(format!(
                        "action {:?} has {} presets but only {} slots",
                        preset.action,
                        preset.events.len(),
                        self.trigger_slots()
                    )));
                }
                if preset
                    .events
                    .iter()
                    .any(|event| matches!(event, Event::NoteOff { .. }))
                {
                    return Err(ConfigError::Invalid(format!(
                        "action {:?} has a note_off preset, which can never fire",
                        preset.action
                    )));
                }
                let keys = preset
                    .events
                    .iter()
                    .map(Event::key)
                    .collect::<Result<Vec<MidiKey>, ConfigError>>()?;
                Ok((action, keys))
            })
            .collect()
    }
}

fn parse_duration(value: Option<&str>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.to_string())
            .map(Duration::from)
            .map_err(|e| ConfigError::Duration {
                value: value.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}
