use std::sync::Arc;

use basedrop::Shared;

use crate::{voice::VoiceId, zone::Preset};

// -------------------------------------------------------------------------------------------------

/// Events sent from a [`SynthHandle`](super::SynthHandle) to the synth's audio thread.
pub(crate) enum SynthMessage {
    NoteOn {
        channel: usize,
        key: u8,
        velocity: u8,
    },
    NoteOff {
        channel: usize,
        key: u8,
    },
    ControlChange {
        channel: usize,
        cc: u8,
        value: u8,
    },
    PitchBend {
        channel: usize,
        value: u16,
    },
    ChannelPressure {
        channel: usize,
        value: u8,
    },
    KeyPressure {
        channel: usize,
        key: u8,
        value: u8,
    },
    PitchWheelSensitivity {
        channel: usize,
        semitones: u8,
    },
    ProgramChange {
        channel: usize,
        preset: Shared<Arc<Preset>>,
    },
    AllNotesOff,
}

// -------------------------------------------------------------------------------------------------

/// Voice status events, optionally emitted by the synth while rendering.
///
/// See [`Synth::set_status_sender`](super::Synth::set_status_sender).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthStatusEvent {
    VoiceStarted {
        id: VoiceId,
        channel: usize,
        key: u8,
        velocity: u8,
    },
    /// Sent when a voice got stopped by its renderer, by a sound off controller, or was
    /// stolen by a new note.
    VoiceFinished {
        id: VoiceId,
        channel: usize,
        key: u8,
    },
}
