use std::sync::{Arc, Mutex};

use basedrop::{Collector, Handle, Shared};
use crossbeam_queue::ArrayQueue;

use super::SynthMessage;
use crate::{error::Error, zone::Preset};

// -------------------------------------------------------------------------------------------------

/// Send MIDI events and presets to a [`Synth`](super::Synth) from any thread.
///
/// Handles are `Send` and `Sync` so they can be sent across threads. Sending never blocks:
/// when the synth's event queue is full, the event is rejected with [`Error::SendError`].
#[derive(Clone)]
pub struct SynthHandle {
    channel_count: usize,
    event_queue: Arc<ArrayQueue<SynthMessage>>,
    collector: Arc<Mutex<Collector>>,
    collector_handle: Handle,
}

impl SynthHandle {
    pub(crate) fn new(
        channel_count: usize,
        event_queue: Arc<ArrayQueue<SynthMessage>>,
        collector: Collector,
    ) -> Self {
        let collector_handle = collector.handle();
        Self {
            channel_count,
            event_queue,
            collector: Arc::new(Mutex::new(collector)),
            collector_handle,
        }
    }

    /// Number of MIDI channels the synth was configured with.
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Start a note. A velocity of 0 releases the note, as in MIDI.
    pub fn note_on(&self, channel: usize, key: u8, velocity: u8) -> Result<(), Error> {
        if velocity == 0 {
            return self.note_off(channel, key);
        }
        self.check_channel(channel)?;
        self.send(
            SynthMessage::NoteOn {
                channel,
                key: key & 0x7F,
                velocity: velocity & 0x7F,
            },
            "note on",
        )
    }

    pub fn note_off(&self, channel: usize, key: u8) -> Result<(), Error> {
        self.check_channel(channel)?;
        self.send(
            SynthMessage::NoteOff {
                channel,
                key: key & 0x7F,
            },
            "note off",
        )
    }

    /// Set a MIDI controller value.
    ///
    /// CC 64 (sustain), 120 (all sound off), 121 (reset all controllers) and 123 (all notes
    /// off) also act on the channel's playing voices.
    pub fn control_change(&self, channel: usize, cc: u8, value: u8) -> Result<(), Error> {
        self.check_channel(channel)?;
        if cc > 127 {
            return Err(Error::ParameterError(format!(
                "Invalid MIDI controller number: '{cc}'"
            )));
        }
        self.send(
            SynthMessage::ControlChange {
                channel,
                cc,
                value: value & 0x7F,
            },
            "control change",
        )
    }

    /// Set the 14-bit pitch wheel value, 0..=16383 with center 8192.
    pub fn pitch_bend(&self, channel: usize, value: u16) -> Result<(), Error> {
        self.check_channel(channel)?;
        if value > 16383 {
            return Err(Error::ParameterError(format!(
                "Invalid pitch bend value: '{value}'. Expected a value in range 0..=16383"
            )));
        }
        self.send(SynthMessage::PitchBend { channel, value }, "pitch bend")
    }

    pub fn channel_pressure(&self, channel: usize, value: u8) -> Result<(), Error> {
        self.check_channel(channel)?;
        self.send(
            SynthMessage::ChannelPressure {
                channel,
                value: value & 0x7F,
            },
            "channel pressure",
        )
    }

    pub fn key_pressure(&self, channel: usize, key: u8, value: u8) -> Result<(), Error> {
        self.check_channel(channel)?;
        self.send(
            SynthMessage::KeyPressure {
                channel,
                key: key & 0x7F,
                value: value & 0x7F,
            },
            "key pressure",
        )
    }

    /// Set the pitch wheel sensitivity in semitones. Also reachable via RPN 0.
    pub fn pitch_wheel_sensitivity(&self, channel: usize, semitones: u8) -> Result<(), Error> {
        self.check_channel(channel)?;
        if semitones > 127 {
            return Err(Error::ParameterError(format!(
                "Invalid pitch wheel sensitivity: '{semitones}'"
            )));
        }
        self.send(
            SynthMessage::PitchWheelSensitivity { channel, semitones },
            "pitch wheel sensitivity",
        )
    }

    /// Select the preset new notes on the given channel are started with.
    ///
    /// A replaced preset is not freed on the audio thread: it gets released with the next
    /// [`collect_garbage`](Self::collect_garbage) call.
    pub fn program_change(&self, channel: usize, preset: Arc<Preset>) -> Result<(), Error> {
        self.check_channel(channel)?;
        let preset = Shared::new(&self.collector_handle, preset);
        self.send(
            SynthMessage::ProgramChange { channel, preset },
            "program change",
        )
    }

    /// Release all playing notes on all channels, ignoring the sustain pedal.
    pub fn all_notes_off(&self) -> Result<(), Error> {
        self.send(SynthMessage::AllNotesOff, "all notes off")
    }

    /// Free presets which got dropped by the audio thread. Call this periodically from a
    /// non real-time thread.
    pub fn collect_garbage(&self) {
        match self.collector.lock() {
            Ok(mut collector) => collector.collect(),
            Err(err) => log::error!("Failed to lock the synth's garbage collector: {err}"),
        }
    }

    fn check_channel(&self, channel: usize) -> Result<(), Error> {
        if channel >= self.channel_count {
            return Err(Error::ChannelNotFound(channel));
        }
        Ok(())
    }

    fn send(&self, message: SynthMessage, name: &str) -> Result<(), Error> {
        self.event_queue
            .push(message)
            .map_err(|_| Error::SendError(format!("Synth event queue is full ({name})")))
    }
}
