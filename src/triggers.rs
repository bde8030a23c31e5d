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

use crate::midi::{MidiEvent, MidiKey};

/// Index of a logical action (stop/go, or a bus).
pub type ActionIndex = usize;

/// Fixed-capacity trigger slots per action.
///
/// Every slot is an `AtomicI32` holding a packed `MidiKey` or the unassigned
/// sentinel. All loads and stores are relaxed: each slot is torn-free on its own,
/// and no ordering between slots is promised. Storage is allocated once at
/// construction, so reads and writes never allocate.
#[derive(Debug)]
pub struct TriggerTable {
    actions: usize,
    slots_per_action: usize,
    slots: Box<[AtomicI32]>,
}

impl TriggerTable {
    /// Creates a table with every slot unassigned.
    pub fn new(actions: usize, slots_per_action: usize) -> TriggerTable {
        TriggerTable {
            actions,
            slots_per_action,
            slots: (0..actions * slots_per_action)
                .map(|_| AtomicI32::new(MidiKey::UNASSIGNED.raw()))
                .collect(),
        }
    }

    /// Number of actions.
    pub fn actions(&self) -> usize {
        self.actions
    }

    /// Number of slots per action.
    pub fn slots(&self) -> usize {
        self.slots_per_action
    }

    fn slot(&self, action: ActionIndex, slot: usize) -> Option<&AtomicI32> {
        if action >= self.actions || slot >= self.slots_per_action {
            return None;
        }
        self.slots.get(action * self.slots_per_action + slot)
    }

    fn action_slots(&self, action: ActionIndex) -> &[AtomicI32] {
        if action >= self.actions {
            return &[];
        }
        let start = action * self.slots_per_action;
        &self.slots[start..start + self.slots_per_action]
    }

    /// Gets the key at the slot. Out of range yields the unassigned sentinel.
    pub fn get(&self, action: ActionIndex, slot: usize) -> MidiKey {
        self.slot(action, slot)
            .map(|slot| MidiKey::from_raw(slot.load(Ordering::Relaxed)))
            .unwrap_or(MidiKey::UNASSIGNED)
    }

    /// Sets the key at the slot. Returns false when out of range.
    pub fn set(&self, action: ActionIndex, slot: usize, key: MidiKey) -> bool {
        match self.slot(action, slot) {
            Some(slot) => {
                slot.store(key.raw(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Unassigns every slot of the action.
    pub fn clear(&self, action: ActionIndex) {
        for slot in self.action_slots(action) {
            slot.store(MidiKey::UNASSIGNED.raw(), Ordering::Relaxed);
        }
    }

    /// Unassigns every slot of every action.
    pub fn clear_all(&self) {
        for slot in self.slots.iter() {
            slot.store(MidiKey::UNASSIGNED.raw(), Ordering::Relaxed);
        }
    }

    /// Iterates over the action's slots in order, sentinels included.
    pub fn keys(&self, action: ActionIndex) -> impl Iterator<Item = MidiKey> + '_ {
        self.action_slots(action)
            .iter()
            .map(|slot| MidiKey::from_raw(slot.load(Ordering::Relaxed)))
    }

    /// The first unassigned slot of the action.
    pub fn first_free(&self, action: ActionIndex) -> Option<usize> {
        self.keys(action).position(|key| !key.is_assigned())
    }

    /// True if any slot of the action holds the key.
    pub fn contains(&self, action: ActionIndex, key: MidiKey) -> bool {
        key.is_assigned() && self.keys(action).any(|stored| stored == key)
    }

    /// Removes the key from every action other than `keep`.
    pub fn evict(&self, key: MidiKey, keep: ActionIndex) {
        if !key.is_assigned() {
            return;
        }
        for action in (0..self.actions).filter(|action| *action != keep) {
            for slot in self.action_slots(action) {
                // A lost race with the control thread only leaves a stale key,
                // which the next eviction or clear removes.
                let _ = slot.compare_exchange(
                    key.raw(),
                    MidiKey::UNASSIGNED.raw(),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                );
            }
        }
    }

    /// Display text for an action: one label per assigned slot, newline separated,
    /// or `--` when nothing is assigned.
    pub fn label(&self, action: ActionIndex) -> String {
        let labels: Vec<String> = self
            .keys(action)
            .filter(|key| key.is_assigned())
            .map(|key| key.to_string())
            .collect();

        if labels.is_empty() {
            "--".to_string()
        } else {
            labels.join("\n")
        }
    }
}

/// Resolves an event to the first action whose slots contain its key.
///
/// Actions are scanned in index order, so with the mute switch a key bound to
/// both stop (0) and go (1) always resolves to stop.
pub fn match_event(event: &MidiEvent, table: &TriggerTable) -> Option<ActionIndex> {
    let key = event.key();
    (0..table.actions()).find(|action| table.contains(*action, key))
}

#[cfg(test)]
mod test {
    use super::{match_event, TriggerTable};
    use crate::midi::{MidiEvent, MidiKey};

    #[test]
    fn test_new_table_unassigned() {
        let table = TriggerTable::new(2, 4);
        assert_eq!(2, table.actions());
        assert_eq!(4, table.slots());
        for action in 0..2 {
            assert!(table.keys(action).all(|key| !key.is_assigned()));
            assert_eq!(Some(0), table.first_free(action));
            assert_eq!("--", table.label(action));
        }
    }

    #[test]
    fn test_bounds() {
        let table = TriggerTable::new(2, 4);
        let key = MidiKey::pack(0x90, 60);
        assert!(!table.set(2, 0, key));
        assert!(!table.set(0, 4, key));
        assert_eq!(MidiKey::UNASSIGNED, table.get(2, 0));
        assert_eq!(MidiKey::UNASSIGNED, table.get(0, 4));
        assert_eq!(0, table.keys(5).count());

        assert!(table.set(1, 3, key));
        assert_eq!(key, table.get(1, 3));
    }

    #[test]
    fn test_clear_leaves_other_actions() {
        let table = TriggerTable::new(2, 2);
        table.set(0, 0, MidiKey::pack(0x90, 60));
        table.set(1, 0, MidiKey::pack(0x90, 61));
        table.clear(0);
        assert_eq!(MidiKey::UNASSIGNED, table.get(0, 0));
        assert_eq!(MidiKey::pack(0x90, 61), table.get(1, 0));

        table.clear_all();
        assert_eq!(MidiKey::UNASSIGNED, table.get(1, 0));
    }

    #[test]
    fn test_first_free_with_gaps() {
        let table = TriggerTable::new(1, 4);
        table.set(0, 0, MidiKey::pack(0x90, 60));
        table.set(0, 2, MidiKey::pack(0x90, 62));
        assert_eq!(Some(1), table.first_free(0));
        table.set(0, 1, MidiKey::pack(0x90, 61));
        assert_eq!(Some(3), table.first_free(0));
        table.set(0, 3, MidiKey::pack(0x90, 63));
        assert_eq!(None, table.first_free(0));
    }

    #[test]
    fn test_match_priority() {
        let table = TriggerTable::new(2, 4);
        let event = MidiEvent::note_on(0, 0, 60, 100);
        table.set(1, 0, event.key());
        assert_eq!(Some(1), match_event(&event, &table));

        table.set(0, 3, event.key());
        assert_eq!(Some(0), match_event(&event, &table));
    }

    #[test]
    fn test_match_requires_exact_key() {
        let table = TriggerTable::new(2, 4);
        table.set(0, 0, MidiKey::pack(0x90, 60));
        assert_eq!(None, match_event(&MidiEvent::note_on(0, 1, 60, 100), &table));
        assert_eq!(None, match_event(&MidiEvent::note_on(0, 0, 61, 100), &table));
        assert_eq!(
            None,
            match_event(&MidiEvent::control_change(0, 0, 60, 100), &table)
        );
        assert_eq!(
            Some(0),
            match_event(&MidiEvent::note_on(0, 0, 60, 1), &table)
        );
    }

    #[test]
    fn test_evict() {
        let table = TriggerTable::new(3, 2);
        let key = MidiKey::pack(0xB0, 7);
        table.set(0, 1, key);
        table.set(1, 0, key);
        table.set(2, 0, key);
        table.set(2, 1, MidiKey::pack(0xB0, 8));

        table.evict(key, 2);
        assert!(!table.contains(0, key));
        assert!(!table.contains(1, key));
        assert!(table.contains(2, key));
        assert_eq!(MidiKey::pack(0xB0, 8), table.get(2, 1));
    }

    #[test]
    fn test_label() {
        let table = TriggerTable::new(1, 4);
        table.set(0, 1, MidiKey::pack(0x90, 60));
        table.set(0, 3, MidiKey::pack(0xB1, 7));
        assert_eq!("Ch 1 C3\nCh 2 CC 7", table.label(0));
    }
}
