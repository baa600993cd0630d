//! Polyphonic voice management: MIDI events in, modulated voice generators out.

use std::sync::Arc;

use basedrop::{Collector, Shared};
use crossbeam_channel::Sender;
use crossbeam_queue::ArrayQueue;

use crate::{
    channel::{
        Channel, MIDI_CC_ALL_NOTES_OFF, MIDI_CC_ALL_SOUND_OFF, MIDI_CC_RESET_CONTROLLERS,
    },
    error::Error,
    modulator::{defaults::DefaultModulators, ModulatorSource},
    utils::curve,
    voice::{Voice, VoiceId, VoiceStatus},
    zone::Preset,
};

// -------------------------------------------------------------------------------------------------

mod event;
mod handle;

pub(crate) use event::SynthMessage;
pub use event::SynthStatusEvent;
pub use handle::SynthHandle;

// -------------------------------------------------------------------------------------------------

/// Renders a single voice's audio into the synth's output buffer.
///
/// The synth only manages voices and their generator modulation: turning generator values
/// into audio is up to the renderer.
pub trait VoiceRenderer {
    /// Mix the given voice into the interleaved `output` buffer with `channel_count`
    /// channels. Return false when the voice finished playing, e.g. when its release
    /// envelope ran out: the voice then is freed for new notes.
    fn render_voice(&mut self, voice: &Voice, output: &mut [f32], channel_count: usize) -> bool;
}

// -------------------------------------------------------------------------------------------------

/// Options to create a [`Synth`] with.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// By default 16. Number of MIDI channels.
    pub channel_count: usize,

    /// By default 64. Maximum number of voices which can play at the same time. When all
    /// voices are playing, new notes steal existing ones.
    pub polyphony: usize,

    /// By default 1024. Size of the lock-free queue which passes events from
    /// [`SynthHandle`]s to the synth.
    pub event_queue_size: usize,

    /// By default 2. Number of interleaved channels in rendered output buffers.
    pub output_channel_count: usize,

    /// By default the SoundFont 2.04 default modulators. Applied to all new voices.
    pub default_modulators: DefaultModulators,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            channel_count: 16,
            polyphony: 64,
            event_queue_size: 1024,
            output_channel_count: 2,
            default_modulators: DefaultModulators::new(),
        }
    }
}

impl SynthConfig {
    pub fn channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    pub fn event_queue_size(mut self, size: usize) -> Self {
        self.event_queue_size = size;
        self
    }

    pub fn output_channel_count(mut self, channel_count: usize) -> Self {
        self.output_channel_count = channel_count;
        self
    }

    pub fn default_modulators(mut self, modulators: DefaultModulators) -> Self {
        self.default_modulators = modulators;
        self
    }

    /// Validate all parameters. Returns Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.channel_count == 0 {
            return Err(Error::ParameterError(
                "synth config 'channel_count' must be > 0".to_string(),
            ));
        }
        if self.polyphony == 0 {
            return Err(Error::ParameterError(
                "synth config 'polyphony' must be > 0".to_string(),
            ));
        }
        if self.event_queue_size == 0 {
            return Err(Error::ParameterError(
                "synth config 'event_queue_size' must be > 0".to_string(),
            ));
        }
        if self.output_channel_count == 0 {
            return Err(Error::ParameterError(
                "synth config 'output_channel_count' must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// A polyphonic SoundFont voice manager, driven from the audio thread.
///
/// Events arrive via [`SynthHandle`]s, which can be used from any thread. Processing events
/// and rendering never allocates: voices and their modulator tables are preallocated.
pub struct Synth {
    output_channel_count: usize,
    default_modulators: DefaultModulators,
    channels: Vec<Channel>,
    presets: Vec<Option<Shared<Arc<Preset>>>>,
    voices: Vec<Voice>,
    last_voice_id: VoiceId,
    event_queue: Arc<ArrayQueue<SynthMessage>>,
    status_sender: Option<Sender<SynthStatusEvent>>,
}

impl Synth {
    /// Create a new synth and a handle to send events to it.
    pub fn new(config: SynthConfig) -> Result<(Self, SynthHandle), Error> {
        config.validate()?;
        curve::init_curve_tables();
        let event_queue = Arc::new(ArrayQueue::new(config.event_queue_size));
        let handle = SynthHandle::new(
            config.channel_count,
            Arc::clone(&event_queue),
            Collector::new(),
        );
        // Voice clones would drop their preallocated table capacity
        let voices = (0..config.polyphony).map(|_| Voice::new()).collect();
        let synth = Self {
            output_channel_count: config.output_channel_count,
            default_modulators: config.default_modulators,
            channels: (0..config.channel_count).map(|_| Channel::new()).collect(),
            presets: (0..config.channel_count).map(|_| None).collect(),
            voices,
            last_voice_id: 0,
            event_queue,
            status_sender: None,
        };
        Ok((synth, handle))
    }

    /// Set a channel to receive voice start and stop events. Pass None to disable events.
    pub fn set_status_sender(&mut self, sender: Option<Sender<SynthStatusEvent>>) {
        self.status_sender = sender;
    }

    pub fn output_channel_count(&self) -> usize {
        self.output_channel_count
    }

    pub fn default_modulators(&self) -> &DefaultModulators {
        &self.default_modulators
    }

    /// Controller state of the given MIDI channel.
    pub fn channel(&self, channel: usize) -> Option<&Channel> {
        self.channels.get(channel)
    }

    /// All voices, including idle ones.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    /// Apply all pending events and bring the modulation of all playing voices up to date.
    ///
    /// Called by [`render`](Self::render). Use this directly when rendering voices manually.
    pub fn process_events(&mut self) {
        while let Some(message) = self.event_queue.pop() {
            self.handle_message(message);
        }
        for voice in self.voices.iter_mut().filter(|voice| voice.is_active()) {
            if let Some(channel) = self.channels.get(voice.channel()) {
                voice.update_modulation(channel);
            }
        }
    }

    /// Process pending events, then let the given renderer mix all playing voices into the
    /// interleaved output buffer.
    pub fn render<R: VoiceRenderer>(&mut self, output: &mut [f32], renderer: &mut R) {
        Self::assert_no_alloc(|| {
            self.process_events();
            output.fill(0.0);
            for voice in self.voices.iter_mut().filter(|voice| voice.is_active()) {
                if !renderer.render_voice(voice, output, self.output_channel_count) {
                    send_status(&self.status_sender, finished_event(voice));
                    voice.finish();
                }
            }
        })
    }

    fn handle_message(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn {
                channel,
                key,
                velocity,
            } => self.note_on(channel, key, velocity),
            SynthMessage::NoteOff { channel, key } => {
                let Some(state) = self.channels.get(channel) else {
                    return;
                };
                let sustain_pedal_down = state.is_sustain_pedal_down();
                for voice in self.voices.iter_mut() {
                    if voice.channel() == channel
                        && voice.key() == key
                        && voice.status() == VoiceStatus::On
                    {
                        voice.note_off(sustain_pedal_down);
                    }
                }
            }
            SynthMessage::ControlChange { channel, cc, value } => {
                self.control_change(channel, cc, value)
            }
            SynthMessage::PitchBend { channel, value } => {
                if let Some(state) = self.channels.get_mut(channel) {
                    state.set_pitch_bend(value);
                    self.controller_changed(channel, None, ModulatorSource::PitchWheel);
                }
            }
            SynthMessage::ChannelPressure { channel, value } => {
                if let Some(state) = self.channels.get_mut(channel) {
                    state.set_channel_pressure(value);
                    self.controller_changed(channel, None, ModulatorSource::ChannelPressure);
                }
            }
            SynthMessage::KeyPressure {
                channel,
                key,
                value,
            } => {
                if let Some(state) = self.channels.get_mut(channel) {
                    state.set_key_pressure(key, value);
                    self.controller_changed(channel, Some(key), ModulatorSource::KeyPressure);
                }
            }
            SynthMessage::PitchWheelSensitivity { channel, semitones } => {
                if let Some(state) = self.channels.get_mut(channel) {
                    state.set_pitch_wheel_sensitivity(semitones);
                    self.controller_changed(
                        channel,
                        None,
                        ModulatorSource::PitchWheelSensitivity,
                    );
                }
            }
            SynthMessage::ProgramChange { channel, preset } => {
                if let Some(slot) = self.presets.get_mut(channel) {
                    log::debug!("Channel {channel}: selected preset '{}'", preset.name());
                    // the replaced preset gets freed by the collector
                    *slot = Some(preset);
                }
            }
            SynthMessage::AllNotesOff => {
                for voice in self.voices.iter_mut() {
                    voice.release();
                }
            }
        }
    }

    fn note_on(&mut self, channel: usize, key: u8, velocity: u8) {
        let Self {
            default_modulators,
            presets,
            voices,
            last_voice_id,
            status_sender,
            ..
        } = self;
        let Some(Some(preset)) = presets.get(channel) else {
            log::debug!("Channel {channel}: ignoring note on, no preset selected");
            return;
        };
        for layer in preset.layers(key, velocity) {
            let Some(index) = Self::allocate_voice(voices) else {
                return;
            };
            let voice = &mut voices[index];
            if voice.is_active() {
                log::debug!(
                    "Stealing voice {} (channel {}, key {})",
                    voice.id(),
                    voice.channel(),
                    voice.key()
                );
                send_status(status_sender, finished_event(voice));
                voice.finish();
            }
            *last_voice_id += 1;
            voice.start(
                *last_voice_id,
                channel,
                key,
                velocity,
                &layer,
                default_modulators,
            );
            send_status(
                status_sender,
                SynthStatusEvent::VoiceStarted {
                    id: voice.id(),
                    channel,
                    key,
                    velocity,
                },
            );
        }
    }

    fn control_change(&mut self, channel: usize, cc: u8, value: u8) {
        let Some(state) = self.channels.get_mut(channel) else {
            return;
        };
        match cc {
            MIDI_CC_ALL_SOUND_OFF => {
                for voice in self.voices.iter_mut() {
                    if voice.is_active() && voice.channel() == channel {
                        send_status(&self.status_sender, finished_event(voice));
                        voice.finish();
                    }
                }
            }
            MIDI_CC_RESET_CONTROLLERS => {
                state.reset_controllers();
                for voice in self.voices.iter_mut() {
                    if voice.is_active() && voice.channel() == channel {
                        voice.release_sustained();
                        voice.controllers_reset();
                    }
                }
            }
            MIDI_CC_ALL_NOTES_OFF => {
                let sustain_pedal_down = state.is_sustain_pedal_down();
                for voice in self.voices.iter_mut() {
                    if voice.is_active() && voice.channel() == channel {
                        voice.note_off(sustain_pedal_down);
                    }
                }
            }
            _ => {
                let sustain_was_down = state.is_sustain_pedal_down();
                let source = state.set_cc(cc, value);
                if sustain_was_down && !state.is_sustain_pedal_down() {
                    for voice in self.voices.iter_mut() {
                        if voice.channel() == channel {
                            voice.release_sustained();
                        }
                    }
                }
                self.controller_changed(channel, None, source);
            }
        }
    }

    /// Notify playing voices on the given channel, or only those playing `key`, about a
    /// changed controller.
    fn controller_changed(&mut self, channel: usize, key: Option<u8>, source: ModulatorSource) {
        for voice in self.voices.iter_mut() {
            if voice.is_active()
                && voice.channel() == channel
                && key.is_none_or(|key| key == voice.key())
            {
                voice.controller_changed(source);
            }
        }
    }

    /// Pick a voice for a new note: the first idle one, else the oldest released one, else
    /// the oldest one.
    fn allocate_voice(voices: &[Voice]) -> Option<usize> {
        if let Some(index) = voices.iter().position(|voice| !voice.is_active()) {
            return Some(index);
        }
        let oldest = |status: Option<VoiceStatus>| {
            voices
                .iter()
                .enumerate()
                .filter(|(_, voice)| status.is_none_or(|status| voice.status() == status))
                .min_by_key(|(_, voice)| voice.id())
                .map(|(index, _)| index)
        };
        oldest(Some(VoiceStatus::Released)).or_else(|| oldest(None))
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------

fn finished_event(voice: &Voice) -> SynthStatusEvent {
    SynthStatusEvent::VoiceFinished {
        id: voice.id(),
        channel: voice.channel(),
        key: voice.key(),
    }
}

fn send_status(sender: &Option<Sender<SynthStatusEvent>>, event: SynthStatusEvent) {
    if let Some(sender) = sender {
        if let Err(err) = sender.try_send(event) {
            log::warn!("Failed to send synth status event: {err}");
        }
    }
}

// -------------------------------------------------------------------------------------------------
