//! Drives plugin instances as voices of one audio line.

use std::collections::VecDeque;
use std::sync::Arc;

use compas_core::copy;
use tracing::debug;

use crate::channel_data::KEY_COUNT;
use crate::error::{EngineError, Result};
use crate::port::SharedPort;

use super::{ControlValue, MidiEvent, PluginDescriptor, PluginInstance, PortDescriptor};

/// Most note events the host holds between periods. Overflow drops the
/// oldest event.
const EVENT_CAPACITY: usize = 128;

/// How many instances the host runs per audio line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceMode {
    /// One instance plays every note, the live-instrument shape.
    #[default]
    Live,
    /// One instance per MIDI note. Only keyed-on notes run, so the cost
    /// scales with the number of sounding keys.
    PerNote,
}

impl VoiceMode {
    fn instance_count(self) -> usize {
        match self {
            VoiceMode::Live => 1,
            VoiceMode::PerNote => KEY_COUNT,
        }
    }
}

/// Ties one engine port to one plugin control port.
#[derive(Debug, Clone)]
pub struct ControlBinding {
    /// Control port index inside the plugin.
    pub port_index: usize,
    /// Engine port whose value is pushed once per period.
    pub port: SharedPort,
}

struct Slot {
    instance: Box<dyn PluginInstance>,
    controls: Vec<(usize, ControlValue)>,
}

struct PortLayout {
    audio_inputs: Vec<usize>,
    audio_outputs: Vec<usize>,
    control_inputs: Vec<usize>,
}

impl PortLayout {
    fn scan(descriptor: &dyn PluginDescriptor) -> Self {
        let mut layout = PortLayout {
            audio_inputs: Vec::new(),
            audio_outputs: Vec::new(),
            control_inputs: Vec::new(),
        };

        for index in 0..descriptor.port_count() {
            let port = descriptor.port_descriptor(index);

            if port.contains(PortDescriptor::AUDIO.union(PortDescriptor::INPUT)) {
                layout.audio_inputs.push(index);
            } else if port.contains(PortDescriptor::AUDIO.union(PortDescriptor::OUTPUT)) {
                layout.audio_outputs.push(index);
            } else if port.contains(PortDescriptor::CONTROL.union(PortDescriptor::INPUT)) {
                layout.control_inputs.push(index);
            }
        }

        layout
    }
}

/// Runs a plugin as the sound source of one audio line.
///
/// The host owns the instances, their control cells and the f32 scratch
/// lines the plugin renders into. Each period it snapshots the bound engine
/// ports, hands queued note events to the instances and mixes their output
/// back into the voice buffer through the sample codec.
pub struct PluginHost {
    descriptor: Arc<dyn PluginDescriptor>,
    mode: VoiceMode,
    buffer_size: usize,
    layout: PortLayout,
    slots: Vec<Slot>,
    bindings: Vec<ControlBinding>,
    program: Option<(u32, u32)>,
    events: VecDeque<MidiEvent>,
    key_on: [u32; KEY_COUNT],
    input_scratch: Vec<Vec<f32>>,
    output_scratch: Vec<Vec<f32>>,
}

impl PluginHost {
    /// Instantiates, wires and activates every slot up front.
    ///
    /// Control ports are connected immediately and primed with their hint
    /// defaults, so a host without any [`bind_control`](Self::bind_control)
    /// calls still runs the plugin at sane settings.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoLines`] when the plugin declares no audio output,
    /// [`EngineError::PluginInstantiate`] when any instantiation fails.
    pub fn new(
        descriptor: Arc<dyn PluginDescriptor>,
        mode: VoiceMode,
        samplerate: u32,
        buffer_size: usize,
    ) -> Result<Self> {
        let layout = PortLayout::scan(descriptor.as_ref());

        if layout.audio_outputs.is_empty() {
            return Err(EngineError::NoLines);
        }

        let mut slots = Vec::with_capacity(mode.instance_count());

        for _ in 0..mode.instance_count() {
            let mut instance = descriptor
                .instantiate(samplerate)
                .ok_or_else(|| EngineError::plugin_instantiate(descriptor.name()))?;

            let mut controls = Vec::with_capacity(layout.control_inputs.len());

            for &index in &layout.control_inputs {
                let cell = instance.connect_control_port(index);
                cell.set(descriptor.port_hint(index).default.unwrap_or(0.0));
                controls.push((index, cell));
            }

            instance.activate();
            slots.push(Slot { instance, controls });
        }

        debug!(
            plugin = descriptor.name(),
            instances = slots.len(),
            inputs = layout.audio_inputs.len(),
            outputs = layout.audio_outputs.len(),
            "plugin host ready"
        );

        Ok(PluginHost {
            input_scratch: vec![vec![0.0; buffer_size]; layout.audio_inputs.len()],
            output_scratch: vec![vec![0.0; buffer_size]; layout.audio_outputs.len()],
            descriptor,
            mode,
            buffer_size,
            layout,
            slots,
            bindings: Vec::new(),
            program: None,
            events: VecDeque::with_capacity(EVENT_CAPACITY),
            key_on: [0; KEY_COUNT],
        })
    }

    /// The plugin being hosted.
    pub fn descriptor(&self) -> &dyn PluginDescriptor {
        self.descriptor.as_ref()
    }

    /// Voice mode the host was built with.
    pub fn voice_mode(&self) -> VoiceMode {
        self.mode
    }

    /// Number of instances the host keeps running.
    pub fn instance_count(&self) -> usize {
        self.slots.len()
    }

    /// Audio input lines the plugin declares.
    pub fn input_line_count(&self) -> usize {
        self.layout.audio_inputs.len()
    }

    /// Audio output lines the plugin declares.
    pub fn output_line_count(&self) -> usize {
        self.layout.audio_outputs.len()
    }

    /// Events waiting for the next period.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Sounding count of one MIDI note.
    pub fn key_on_count(&self, key: u32) -> u32 {
        self.key_on.get(key as usize).copied().unwrap_or(0)
    }

    /// Program forwarded to the instances, when one was selected.
    pub fn program(&self) -> Option<(u32, u32)> {
        self.program
    }

    /// Routes an engine port into a plugin control port.
    ///
    /// The port value is read once per period, clamped by the plugin's
    /// hint and written to the matching control cell of every slot.
    pub fn bind_control(&mut self, port_index: usize, port: SharedPort) {
        self.bindings.push(ControlBinding { port_index, port });
    }

    /// Selects a factory program on every instance.
    pub fn select_program(&mut self, bank: u32, program: u32) {
        self.program = Some((bank, program));

        for slot in &mut self.slots {
            slot.instance.select_program(bank, program);
        }
    }

    /// Queues a note event for the next period.
    pub fn post_event(&mut self, event: MidiEvent) {
        if self.events.len() == EVENT_CAPACITY {
            let dropped = self.events.pop_front();
            debug!(?dropped, "event queue full, dropping oldest");
        }

        match event {
            MidiEvent::NoteOn { key, .. } => {
                if let Some(count) = self.key_on.get_mut(key as usize) {
                    *count += 1;
                }
            }
            MidiEvent::NoteOff { key } => {
                if let Some(count) = self.key_on.get_mut(key as usize) {
                    *count = count.saturating_sub(1);
                }
            }
        }

        self.events.push_back(event);
    }

    /// Runs one period and mixes the plugin output onto `buffer`.
    ///
    /// The buffer content feeds the plugin's audio inputs; keyed-off notes
    /// still run the period their note-off arrives in so the instance sees
    /// the release.
    pub fn run_period(&mut self, buffer: &mut [f64]) {
        let frames = buffer.len().min(self.buffer_size);
        if frames == 0 {
            return;
        }

        let control_values = self.control_snapshot();

        for slot in &mut self.slots {
            for &(index, value) in &control_values {
                for (control_index, cell) in &slot.controls {
                    if *control_index == index {
                        cell.set(value);
                    }
                }
            }
        }

        for line in &mut self.input_scratch {
            line[..frames].fill(0.0);
            copy(&mut line[..frames], 1, &buffer[..frames], 1, frames);
        }

        let events: Vec<MidiEvent> = self.events.drain(..).collect();

        match self.mode {
            VoiceMode::Live => {
                self.run_slot(0, &events, buffer, frames);
            }
            VoiceMode::PerNote => {
                for key in 0..KEY_COUNT {
                    let keyed = self.key_on[key] > 0;
                    let addressed = events.iter().any(|event| event.key() as usize == key);

                    if !keyed && !addressed {
                        continue;
                    }

                    let slot_events: Vec<MidiEvent> = events
                        .iter()
                        .copied()
                        .filter(|event| event.key() as usize == key)
                        .collect();

                    self.run_slot(key, &slot_events, buffer, frames);
                }
            }
        }
    }

    /// Reads every bound engine port once, clamped by the plugin's hints.
    fn control_snapshot(&self) -> Vec<(usize, f32)> {
        let mut values = Vec::with_capacity(self.bindings.len());

        for binding in &self.bindings {
            let Some(value) = binding.port.safe_read().as_f64() else {
                continue;
            };

            let hint = self.descriptor.port_hint(binding.port_index);
            values.push((binding.port_index, hint.constrain(value as f32)));
        }

        values
    }

    fn run_slot(
        &mut self,
        slot_index: usize,
        events: &[MidiEvent],
        buffer: &mut [f64],
        frames: usize,
    ) {
        for line in &mut self.output_scratch {
            line[..frames].fill(0.0);
        }

        let inputs: Vec<&[f32]> = self
            .input_scratch
            .iter()
            .map(|line| &line[..frames])
            .collect();

        let mut outputs: Vec<&mut [f32]> = self
            .output_scratch
            .iter_mut()
            .map(|line| &mut line[..frames])
            .collect();

        self.slots[slot_index]
            .instance
            .run_synth(&inputs, &mut outputs, frames, events);

        for line in &self.output_scratch {
            copy(&mut buffer[..frames], 1, &line[..frames], 1, frames);
        }
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            slot.instance.deactivate();
        }
    }
}
