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
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Variant;
use crate::midi::MidiKey;
use crate::triggers::TriggerTable;

/// The document version written by this crate.
pub const VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("malformed state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state is for {found}, expected {expected}")]
    WrongVariant {
        expected: &'static str,
        found: &'static str,
    },
}

fn default_version() -> u32 {
    VERSION
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Document {
    MuteSwitch {
        #[serde(default = "default_version")]
        version: u32,
        #[serde(default)]
        stop_triggers: Vec<i32>,
        #[serde(default)]
        go_triggers: Vec<i32>,
    },
    BusSelector {
        #[serde(default = "default_version")]
        version: u32,
        #[serde(default)]
        bus_triggers: Vec<Vec<i32>>,
    },
}

impl Document {
    fn kind(&self) -> &'static str {
        match self {
            Document::MuteSwitch { .. } => "mute_switch",
            Document::BusSelector { .. } => "bus_selector",
        }
    }

    fn version(&self) -> u32 {
        match self {
            Document::MuteSwitch { version, .. } | Document::BusSelector { version, .. } => {
                *version
            }
        }
    }

    /// The raw lists, one per action, in action order.
    fn into_lists(self) -> Vec<Vec<i32>> {
        match self {
            Document::MuteSwitch {
                stop_triggers,
                go_triggers,
                ..
            } => vec![stop_triggers, go_triggers],
            Document::BusSelector { bus_triggers, .. } => bus_triggers,
        }
    }
}

fn raw_keys(table: &TriggerTable, action: usize) -> Vec<i32> {
    table.keys(action).map(MidiKey::raw).collect()
}

/// Serializes every slot of the table as a document tagged with the variant:
///
/// ```json
/// {"type":"mute_switch","version":1,"stop_triggers":[36928,-1,-1,-1],"go_triggers":[-1,-1,-1,-1]}
/// {"type":"bus_selector","version":1,"bus_triggers":[[36928,-1],[-1,-1]]}
/// ```
///
/// Negative entries are unassigned.
pub fn save(variant: Variant, table: &TriggerTable) -> Result<Vec<u8>, StateError> {
    let document = match variant {
        Variant::MuteSwitch => Document::MuteSwitch {
            version: VERSION,
            stop_triggers: raw_keys(table, Variant::STOP),
            go_triggers: raw_keys(table, Variant::GO),
        },
        Variant::BusSelector { .. } => Document::BusSelector {
            version: VERSION,
            bus_triggers: (0..table.actions())
                .map(|action| raw_keys(table, action))
                .collect(),
        },
    };
    Ok(serde_json::to_vec(&document)?)
}

/// Parses saved state into one list of keys per action, each exactly `slots`
/// long.
pub fn parse(
    variant: Variant,
    slots: usize,
    data: &[u8],
) -> Result<Vec<Vec<MidiKey>>, StateError> {
    let document: Document = serde_json::from_slice(data)?;
    if document.kind() != variant.kind() {
        return Err(StateError::WrongVariant {
            expected: variant.kind(),
            found: document.kind(),
        });
    }
    if document.version() > VERSION {
        warn!(
            version = document.version(),
            supported = VERSION,
            "State was saved by a newer version"
        );
    }

    let mut lists = document.into_lists().into_iter();
    Ok((0..variant.actions())
        .map(|_| {
            let list = lists.next().unwrap_or_default();
            (0..slots)
                .map(|slot| {
                    list.get(slot)
                        .copied()
                        .map(MidiKey::from_raw)
                        .unwrap_or(MidiKey::UNASSIGNED)
                })
                .collect()
        })
        .collect())
}

/// Replaces the table's contents with saved state. On any error the table is
/// left fully unassigned and the error is returned.
pub fn restore(variant: Variant, table: &TriggerTable, data: &[u8]) -> Result<(), StateError> {
    let lists = match parse(variant, table.slots(), data) {
        Ok(lists) => lists,
        Err(e) => {
            table.clear_all();
            return Err(e);
        }
    };

    for (action, keys) in lists.iter().enumerate() {
        for (slot, key) in keys.iter().enumerate() {
            table.set(action, slot, *key);
        }
    }
    debug!(
        actions = lists.len(),
        assigned = lists.iter().flatten().filter(|key| key.is_assigned()).count(),
        "Restored triggers"
    );
    Ok(())
}
