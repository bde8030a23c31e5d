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
use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::buffer::AudioBlock;
use crate::config::{ConfigError, Settings, Variant};
use crate::debounce::Debouncer;
use crate::fade::{BusFader, Fader, MuteFader};
use crate::learn::{Capture, LearnState};
use crate::midi::{MidiEvent, MidiKey};
use crate::notify::{Changes, Subscription};
use crate::shared::Shared;
use crate::state::{self, StateError};
use crate::triggers::{match_event, ActionIndex};

/// The block processor. Owned by the audio thread.
///
/// Nothing reachable from `process_block` allocates, locks or logs.
pub struct Processor {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    fader: Fader,
    debounce: Duration,
    fade: Duration,
}

impl Processor {
    /// Creates a processor from validated settings, with presets loaded and
    /// nothing learned.
    pub fn new(settings: &Settings) -> Result<Processor, ConfigError> {
        settings.validate()?;

        let variant = settings.variant();
        let shared = Arc::new(Shared::new(
            variant,
            settings.trigger_slots(),
            settings.learn_policy(),
        ));
        for (action, keys) in settings.presets()? {
            for (slot, key) in keys.into_iter().enumerate() {
                shared.triggers().set(action, slot, key);
            }
        }

        let fader = match variant {
            Variant::MuteSwitch => Fader::Mute(MuteFader::new()),
            Variant::BusSelector { .. } => Fader::Bus(BusFader::new()),
        };
        let mut processor = Processor {
            shared,
            debouncer: Debouncer::new(),
            fader,
            debounce: settings.debounce()?,
            fade: settings.fade()?,
        };
        processor.fader.settle(processor.shared.selected());
        Ok(processor)
    }

    /// A handle for the control thread.
    pub fn controls(&self) -> Controls {
        Controls {
            shared: self.shared.clone(),
        }
    }

    /// Configures for a sample rate and resets the debounce and fade state. The
    /// fader lands on the current selection without fading.
    pub fn prepare(&mut self, sample_rate: f64, max_block_samples: usize) {
        self.debouncer
            .prepare(sample_rate, max_block_samples, self.debounce);
        self.fader.prepare(sample_rate, self.fade);

        let selected = self.shared.selected();
        self.fader.settle(selected);
        let (bus, gain) = match self.shared.variant() {
            Variant::MuteSwitch => (0, if selected == Variant::STOP { 0.0 } else { 1.0 }),
            Variant::BusSelector { .. } => (selected, 1.0),
        };
        self.shared.publish(bus, gain);

        info!(
            sample_rate,
            max_block_samples,
            debounce = ?self.debounce,
            fade = ?self.fade,
            "Prepared processor"
        );
    }

    /// Processes one block. `midi` must be in sample order with offsets inside
    /// the block.
    pub fn process_block(&mut self, audio: &mut AudioBlock, midi: &[MidiEvent]) {
        let samples = audio.num_samples();
        let shared = &*self.shared;

        if let Some(event) = self
            .debouncer
            .process_block(midi, samples, MidiEvent::is_ignored)
        {
            match shared.learn().capture(shared.triggers(), event.key()) {
                Some(Capture::Stored { finished, .. }) => {
                    let changes = if finished {
                        Changes::TRIGGERS | Changes::LEARN
                    } else {
                        Changes::TRIGGERS
                    };
                    shared.mark(changes);
                }
                Some(Capture::Full { .. }) => shared.mark(Changes::LEARN),
                None => {
                    if let Some(action) = match_event(&event, shared.triggers()) {
                        shared.select_marked(action);
                    }
                }
            }
        }

        // Picks up control thread selections as well as the match above.
        self.fader.select(shared.selected());

        let mut last = None;
        for sample in 0..samples {
            let (bus, gain) = self.fader.next_state();
            audio.render_sample(sample, bus, gain);
            last = Some((bus, gain));
        }
        if let Some((bus, gain)) = last {
            shared.publish(bus, gain);
        }
    }
}

/// What a control surface draws for one action.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonState {
    pub name: String,
    /// The action is the current selection: stop while muted, go while not.
    pub selected: bool,
    /// The action is capturing the next trigger.
    pub learning: bool,
    /// The learned triggers, one per line, or `--`.
    pub label: String,
}

/// Everything a control surface polls, read in one go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub selected: ActionIndex,
    pub learning: LearnState,
    pub active_bus: usize,
    pub gain: f32,
}

/// The control thread's handle on a processor. Cheap to clone; every method is
/// safe to call while the audio thread is rendering.
#[derive(Clone)]
pub struct Controls {
    shared: Arc<Shared>,
}

impl Controls {
    pub fn variant(&self) -> Variant {
        self.shared.variant()
    }

    pub fn actions(&self) -> usize {
        self.shared.triggers().actions()
    }

    pub fn slots(&self) -> usize {
        self.shared.triggers().slots()
    }

    /// The trigger in a slot, or unassigned when out of range.
    pub fn trigger(&self, action: ActionIndex, slot: usize) -> MidiKey {
        self.shared.triggers().get(action, slot)
    }

    pub fn selected(&self) -> ActionIndex {
        self.shared.selected()
    }

    /// True for the mute switch while stop is selected.
    pub fn is_muted(&self) -> bool {
        self.shared.variant() == Variant::MuteSwitch && self.shared.selected() == Variant::STOP
    }

    pub fn learn_state(&self) -> LearnState {
        self.shared.learn().state()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            selected: self.shared.selected(),
            learning: self.shared.learn().state(),
            active_bus: self.shared.active_bus(),
            gain: self.shared.gain(),
        }
    }

    /// The button for an action, or None when out of range.
    pub fn button(&self, action: ActionIndex) -> Option<ButtonState> {
        let name = self.shared.variant().action_name(action)?;
        Some(ButtonState {
            name,
            selected: self.shared.selected() == action,
            learning: self.shared.learn().state() == LearnState::Learning(action),
            label: self.shared.triggers().label(action),
        })
    }

    pub fn buttons(&self) -> Vec<ButtonState> {
        (0..self.actions())
            .filter_map(|action| self.button(action))
            .collect()
    }

    /// Selects an action. Returns false when out of range.
    pub fn select(&self, action: ActionIndex) -> bool {
        self.shared.select(action)
    }

    /// Mutes or unmutes the mute switch. Returns false for other variants.
    pub fn set_muted(&self, muted: bool) -> bool {
        if self.shared.variant() != Variant::MuteSwitch {
            return false;
        }
        self.select(if muted { Variant::STOP } else { Variant::GO })
    }

    /// Unassigns every trigger of the action.
    pub fn clear_triggers(&self, action: ActionIndex) {
        if action >= self.actions() {
            return;
        }
        self.shared.triggers().clear(action);
        self.shared.notify(Changes::TRIGGERS);
        info!(action, "Cleared triggers");
    }

    /// Sets the learn state directly. Out of range actions are ignored.
    pub fn set_learn(&self, state: LearnState) {
        if state.action().is_some_and(|action| action >= self.actions()) {
            return;
        }
        self.shared.learn().set(state);
        self.shared.notify(Changes::LEARN);
    }

    /// A click on an action's button: cancels learning that action, otherwise
    /// selects it.
    pub fn click(&self, action: ActionIndex) {
        if self.shared.learn().click(action) {
            self.shared.notify(Changes::LEARN);
            info!(action, "Learn cancelled");
            return;
        }
        self.select(action);
    }

    /// A long press on an action's button: starts learning triggers for it.
    pub fn long_press(&self, action: ActionIndex) {
        if action >= self.actions() {
            return;
        }
        let learn = self.shared.learn();
        learn.long_press(self.shared.triggers(), action);

        let changes = if learn.policy().clear_on_learn {
            Changes::LEARN | Changes::TRIGGERS
        } else {
            Changes::LEARN
        };
        self.shared.notify(changes);
        info!(action, "Learning triggers");
    }

    /// Serializes the trigger table.
    pub fn save_state(&self) -> Result<Vec<u8>, StateError> {
        state::save(self.shared.variant(), self.shared.triggers())
    }

    /// Restores the trigger table. Malformed state leaves every slot unassigned.
    pub fn load_state(&self, data: &[u8]) {
        match state::restore(self.shared.variant(), self.shared.triggers(), data) {
            Ok(()) => info!(bytes = data.len(), "Loaded state"),
            Err(e) => warn!(err = %e, "Ignoring saved state"),
        }
        self.shared.notify(Changes::TRIGGERS);
    }

    /// Subscribes to change notifications. Changes made on the audio thread are
    /// picked up by polling rather than a wake-up.
    pub fn subscribe(&self) -> Subscription {
        self.shared.notifier().subscribe()
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use super::{Controls, Processor};
    use crate::buffer::AudioBlock;
    use crate::config::{midi, Preset, Settings, Variant};
    use crate::learn::{LearnPolicy, LearnState};
    use crate::midi::{MidiEvent, MidiKey};
    use crate::notify::Changes;

    const SAMPLE_RATE: f64 = 1000.0;

    fn mute_settings() -> Settings {
        Settings::default()
            .with_fade("4ms")
            .with_debounce("10ms")
            .with_preset(Preset::new("stop", vec![midi::note_on(1, 60)]))
            .with_preset(Preset::new("go", vec![midi::note_on(1, 61)]))
    }

    fn prepared(settings: &Settings) -> Result<(Processor, Controls), Box<dyn Error>> {
        let mut processor = Processor::new(settings)?;
        processor.prepare(SAMPLE_RATE, 8);
        let controls = processor.controls();
        Ok((processor, controls))
    }

    /// Runs a block of ones through the processor in place.
    fn run(processor: &mut Processor, samples: usize, midi: &[MidiEvent]) -> Vec<f32> {
        let mut channel = vec![1.0; samples];
        let mut channels: Vec<&mut [f32]> = vec![channel.as_mut_slice()];
        processor.process_block(&mut AudioBlock::in_place(&mut channels), midi);
        channel
    }

    #[test]
    fn test_presets_loaded() -> Result<(), Box<dyn Error>> {
        let (_, controls) = prepared(&mute_settings())?;
        assert_eq!(MidiKey::pack(0x90, 60), controls.trigger(Variant::STOP, 0));
        assert_eq!(MidiKey::pack(0x90, 61), controls.trigger(Variant::GO, 0));
        assert_eq!(MidiKey::UNASSIGNED, controls.trigger(Variant::GO, 1));
        assert_eq!(MidiKey::UNASSIGNED, controls.trigger(2, 0));
        assert_eq!(MidiKey::UNASSIGNED, controls.trigger(0, 4));
        Ok(())
    }

    #[test]
    fn test_trigger_mutes_and_unmutes() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&mute_settings())?;
        assert!(!controls.is_muted());
        assert_eq!(vec![1.0; 8], run(&mut processor, 8, &[]));

        let stop = MidiEvent::note_on(3, 0, 60, 100);
        assert_eq!(
            vec![0.75, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0, 0.0],
            run(&mut processor, 8, &[stop])
        );
        assert!(controls.is_muted());
        assert_eq!(0.0, controls.snapshot().gain);

        // Still inside the 10 sample window of the stop.
        let go = MidiEvent::note_on(0, 0, 61, 100);
        assert_eq!(vec![0.0; 8], run(&mut processor, 8, &[go]));
        assert!(controls.is_muted());

        // 8 samples have passed; offset 2 reaches the window.
        assert_eq!(
            vec![0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0, 1.0],
            run(&mut processor, 8, &[go.at(2)])
        );
        assert!(!controls.is_muted());
        Ok(())
    }

    #[test]
    fn test_stop_wins_over_go() -> Result<(), Box<dyn Error>> {
        let settings = Settings::default()
            .with_fade("0ms")
            .with_preset(Preset::new("stop", vec![midi::note_on(1, 60)]))
            .with_preset(Preset::new("go", vec![midi::note_on(1, 60)]));
        let (mut processor, controls) = prepared(&settings)?;

        run(&mut processor, 8, &[MidiEvent::note_on(0, 0, 60, 100)]);
        assert!(controls.is_muted());
        Ok(())
    }

    #[test]
    fn test_releases_are_ignored() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&mute_settings())?;
        let releases = [
            MidiEvent::note_off(0, 0, 60, 0),
            MidiEvent::note_on(1, 0, 60, 0),
        ];
        assert_eq!(vec![1.0; 8], run(&mut processor, 8, &releases));
        assert!(!controls.is_muted());

        // The releases did not open a refractory window.
        run(&mut processor, 8, &[MidiEvent::note_on(0, 0, 60, 100)]);
        assert!(controls.is_muted());
        Ok(())
    }

    #[test]
    fn test_unmatched_event_does_nothing() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&mute_settings())?;
        let subscription = controls.subscribe();
        run(&mut processor, 8, &[MidiEvent::control_change(0, 0, 60, 100)]);
        assert!(!controls.is_muted());
        assert_eq!(None, subscription.try_take());
        Ok(())
    }

    #[test]
    fn test_learn_through_processor() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&Settings::default().with_trigger_slots(1))?;
        let subscription = controls.subscribe();

        controls.long_press(Variant::STOP);
        assert_eq!(LearnState::Learning(Variant::STOP), controls.learn_state());
        assert!(subscription.try_take().is_some());

        // Learning does not also perform the action.
        let samples = run(&mut processor, 8, &[MidiEvent::note_on(0, 0, 60, 100)]);
        assert_eq!(vec![1.0; 8], samples);
        assert!(!controls.is_muted());

        assert_eq!(0x903C, controls.trigger(Variant::STOP, 0).raw());
        assert_eq!(LearnState::NotLearning, controls.learn_state());
        assert_eq!(
            Some(Changes::TRIGGERS | Changes::LEARN),
            subscription.try_take()
        );
        Ok(())
    }

    #[test]
    fn test_learn_ignores_releases() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&Settings::default())?;
        controls.long_press(Variant::GO);

        run(&mut processor, 8, &[MidiEvent::note_off(0, 2, 40, 64)]);
        assert!(!controls.trigger(Variant::GO, 0).is_assigned());

        run(&mut processor, 8, &[MidiEvent::control_change(0, 2, 40, 64)]);
        assert_eq!(MidiKey::pack(0xB2, 40), controls.trigger(Variant::GO, 0));
        assert_eq!(LearnState::Learning(Variant::GO), controls.learn_state());
        Ok(())
    }

    #[test]
    fn test_system_messages_are_not_learned() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&Settings::default())?;
        controls.long_press(Variant::STOP);

        let midi: Vec<MidiEvent> = [
            MidiEvent::from_bytes(0, &[0xFE]),
            MidiEvent::from_bytes(4, &[0x90, 60, 100]),
        ]
        .into_iter()
        .flatten()
        .collect();
        assert_eq!(1, midi.len());
        run(&mut processor, 8, &midi);
        run(&mut processor, 8, &[]);

        // Built by hand, so it reaches the debouncer and must be skipped there.
        run(
            &mut processor,
            8,
            &[MidiEvent::new(0, 0xF8, 0, 0), MidiEvent::note_on(3, 0, 62, 90)],
        );

        assert_eq!(MidiKey::pack(0x90, 60), controls.trigger(Variant::STOP, 0));
        assert_eq!(MidiKey::pack(0x90, 62), controls.trigger(Variant::STOP, 1));
        assert_eq!(LearnState::Learning(Variant::STOP), controls.learn_state());
        Ok(())
    }

    #[test]
    fn test_click() -> Result<(), Box<dyn Error>> {
        let (_, controls) = prepared(&mute_settings())?;
        let subscription = controls.subscribe();

        controls.click(Variant::STOP);
        assert!(controls.is_muted());
        assert_eq!(Some(Changes::SELECTION), subscription.try_take());

        controls.long_press(Variant::GO);
        // Learning go: a click on stop still mutes and keeps learn mode.
        controls.click(Variant::STOP);
        assert_eq!(LearnState::Learning(Variant::GO), controls.learn_state());

        // A click on go cancels learning instead of unmuting.
        controls.click(Variant::GO);
        assert_eq!(LearnState::NotLearning, controls.learn_state());
        assert!(controls.is_muted());
        Ok(())
    }

    #[test]
    fn test_long_press_clears_triggers() -> Result<(), Box<dyn Error>> {
        let (_, controls) = prepared(&mute_settings())?;
        controls.long_press(Variant::GO);
        assert!(!controls.trigger(Variant::GO, 0).is_assigned());
        assert!(controls.trigger(Variant::STOP, 0).is_assigned());

        let keep = mute_settings().with_learn_policy(LearnPolicy {
            evict_duplicates: false,
            clear_on_learn: false,
        });
        let (_, controls) = prepared(&keep)?;
        controls.long_press(Variant::GO);
        assert!(controls.trigger(Variant::GO, 0).is_assigned());
        Ok(())
    }

    #[test]
    fn test_write_accessors() -> Result<(), Box<dyn Error>> {
        let (_, controls) = prepared(&mute_settings())?;

        assert!(controls.set_muted(true));
        assert!(controls.set_muted(true));
        assert!(controls.is_muted());
        assert!(!controls.select(5));

        controls.clear_triggers(Variant::STOP);
        assert!(!controls.trigger(Variant::STOP, 0).is_assigned());

        controls.set_learn(LearnState::Learning(1));
        assert_eq!(LearnState::Learning(1), controls.learn_state());
        controls.set_learn(LearnState::Learning(2));
        assert_eq!(LearnState::Learning(1), controls.learn_state());
        controls.set_learn(LearnState::NotLearning);
        assert_eq!(LearnState::NotLearning, controls.learn_state());
        Ok(())
    }

    #[test]
    fn test_repeated_mute_keeps_ramp() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&mute_settings())?;
        controls.set_muted(true);
        assert_eq!(vec![0.75, 0.5], run(&mut processor, 2, &[]));
        controls.set_muted(true);
        assert_eq!(vec![0.25, 0.0, 0.0], run(&mut processor, 3, &[]));
        controls.set_muted(true);
        assert_eq!(vec![0.0, 0.0], run(&mut processor, 2, &[]));
        Ok(())
    }

    #[test]
    fn test_buttons() -> Result<(), Box<dyn Error>> {
        let (_, controls) = prepared(&mute_settings())?;
        controls.long_press(Variant::STOP);

        let buttons = controls.buttons();
        assert_eq!(2, buttons.len());
        assert_eq!("stop", buttons[0].name);
        assert!(!buttons[0].selected);
        assert!(buttons[0].learning);
        assert_eq!("--", buttons[0].label);

        assert_eq!("go", buttons[1].name);
        assert!(buttons[1].selected);
        assert!(!buttons[1].learning);
        assert_eq!("Ch 1 C#3", buttons[1].label);

        assert_eq!(None, controls.button(2));
        Ok(())
    }

    #[test]
    fn test_state_round_trip() -> Result<(), Box<dyn Error>> {
        let (_, controls) = prepared(&mute_settings())?;
        let data = controls.save_state()?;

        let (_, restored) = prepared(&Settings::default())?;
        let subscription = restored.subscribe();
        restored.load_state(&data);
        assert_eq!(MidiKey::pack(0x90, 60), restored.trigger(Variant::STOP, 0));
        assert_eq!(MidiKey::pack(0x90, 61), restored.trigger(Variant::GO, 0));
        assert_eq!(Some(Changes::TRIGGERS), subscription.try_take());

        restored.load_state(b"<Mutander/>");
        assert!(!restored.trigger(Variant::STOP, 0).is_assigned());
        assert!(!restored.trigger(Variant::GO, 0).is_assigned());
        Ok(())
    }

    #[test]
    fn test_bus_selector_switches_through_silence() -> Result<(), Box<dyn Error>> {
        let settings = Settings::new(Variant::BusSelector { buses: 2 })
            .with_fade("4ms")
            .with_preset(Preset::new("bus 2", vec![midi::note_on(1, 62)]));
        let (mut processor, controls) = prepared(&settings)?;
        assert_eq!(0, controls.selected());

        let first = [1.0; 12];
        let second = [2.0; 12];
        let bus_one: [&[f32]; 1] = [&first];
        let bus_two: [&[f32]; 1] = [&second];
        let inputs: [&[&[f32]]; 2] = [&bus_one, &bus_two];
        let mut output = vec![0.0; 12];
        let mut outputs: Vec<&mut [f32]> = vec![output.as_mut_slice()];

        processor.process_block(
            &mut AudioBlock::buses(&inputs, &mut outputs),
            &[MidiEvent::note_on(5, 0, 62, 100)],
        );

        assert_eq!(
            vec![0.75, 0.5, 0.25, 0.5, 1.0, 1.5, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
            output
        );
        let snapshot = controls.snapshot();
        assert_eq!(1, snapshot.selected);
        assert_eq!(1, snapshot.active_bus);
        assert_eq!(1.0, snapshot.gain);
        assert!(!controls.set_muted(true));
        Ok(())
    }

    #[test]
    fn test_prepare_settles_on_selection() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&mute_settings())?;
        controls.set_muted(true);
        processor.prepare(SAMPLE_RATE, 8);
        assert_eq!(vec![0.0; 4], run(&mut processor, 4, &[]));
        assert_eq!(0.0, controls.snapshot().gain);
        Ok(())
    }

    #[test]
    fn test_midi_changes_reach_waiting_subscriber() -> Result<(), Box<dyn Error>> {
        let (mut processor, controls) = prepared(&mute_settings())?;
        let subscription = controls.subscribe();

        let waiter = thread::spawn(move || subscription.wait_timeout(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        run(&mut processor, 8, &[MidiEvent::note_on(0, 0, 60, 100)]);

        let changes = waiter.join().map_err(|_| "waiter panicked")?;
        assert_eq!(Some(Changes::SELECTION), changes);
        Ok(())
    }

    #[test]
    fn test_controls_from_another_thread() -> Result<(), Box<dyn Error>> {
        const BUSES: usize = 3;
        let settings = Settings::new(Variant::BusSelector { buses: BUSES })
            .with_fade("2ms")
            .with_debounce("0ms")
            .with_trigger_slots(2)
            .with_preset(Preset::new("bus 2", vec![midi::note_on(1, 61)]))
            .with_preset(Preset::new("bus 3", vec![midi::note_on(1, 62)]));
        let (mut processor, controls) = prepared(&settings)?;

        let done = Arc::new(AtomicBool::new(false));
        let ui = {
            let controls = controls.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut round = 0;
                while !done.load(Ordering::Relaxed) {
                    let action = round % BUSES;
                    match round % 5 {
                        0 | 1 => controls.click(action),
                        2 => controls.long_press(action),
                        3 => controls.clear_triggers(action),
                        _ => {
                            controls.buttons();
                        }
                    }
                    round += 1;
                }
            })
        };

        let bus_values = [[1.0f32; 8], [2.0; 8], [3.0; 8]];
        let bus_one: [&[f32]; 1] = [&bus_values[0]];
        let bus_two: [&[f32]; 1] = [&bus_values[1]];
        let bus_three: [&[f32]; 1] = [&bus_values[2]];
        let inputs: [&[&[f32]]; BUSES] = [&bus_one, &bus_two, &bus_three];

        for block in 0..2000u32 {
            let midi = [MidiEvent::note_on(block % 8, 0, 60 + (block % 4) as u8, 100)];
            let mut output = vec![0.0; 8];
            let mut outputs: Vec<&mut [f32]> = vec![output.as_mut_slice()];
            processor.process_block(&mut AudioBlock::buses(&inputs, &mut outputs), &midi);

            assert!(output.iter().all(|sample| (0.0..=3.0).contains(sample)));
            let snapshot = controls.snapshot();
            assert!(snapshot.selected < BUSES);
            assert!(snapshot.active_bus < BUSES);
            assert!((0.0..=1.0).contains(&snapshot.gain));
            match snapshot.learning {
                LearnState::NotLearning => {}
                LearnState::Learning(action) => assert!(action < BUSES),
            }
        }

        done.store(true, Ordering::Relaxed);
        ui.join().map_err(|_| "control thread panicked")?;

        for action in 0..BUSES {
            for slot in 0..controls.slots() {
                let key = controls.trigger(action, slot);
                assert!(!key.is_assigned() || (0x903C..=0x903F).contains(&key.raw()));
            }
        }
        Ok(())
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Processor::new(&Settings::default().with_trigger_slots(0)).is_err());
    }
}
