#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod channel;
mod error;
mod generator;
mod modulation;
mod modulator;
mod synth;
mod voice;
mod zone;

// public, flat re-exports
pub use error::Error;

pub use modulator::{
    chain::{ModulatorChain, MAX_CHAIN_LENGTH},
    defaults::DefaultModulators,
    mapping::map_source,
    CustomMapping, Modulator, ModulatorDestination, ModulatorRecord, ModulatorSource,
    ModulatorSourceSet, ModulatorTransform, SourceCurve, SourceDirection, SourceMapping,
    SourcePolarity, SourceSlot, SourceViolation, CONTROLLER_RANGE_7BIT,
    CONTROLLER_RANGE_PITCH_WHEEL, MIDI_CC_BALANCE, MIDI_CC_PAN,
};

pub use modulation::{
    diagnostics::{Diagnostics, ModulatorDiagnostic, ModulatorViolation},
    sanitizer::{sanitize, SanitizedModulators},
    table::VoiceModulatorTable,
    MergeMode, MergeOutcome, MAX_VOICE_MODULATORS, MAX_ZONE_MODULATORS,
};

pub use generator::{Generator, GeneratorValues, GENERATOR_COUNT};

pub use channel::{
    Channel, ControllerState, VoiceContext, DEFAULT_PITCH_WHEEL_SENSITIVITY, PITCH_BEND_CENTER,
};

pub use zone::{Instrument, Preset, PresetZone, VoiceLayer, Zone};

pub use voice::{ModulationState, Voice, VoiceId, VoiceStatus};

pub use synth::{Synth, SynthConfig, SynthHandle, SynthStatusEvent, VoiceRenderer};

// public mods
pub mod utils;
