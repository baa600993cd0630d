//! SoundFont generators: the synthesis parameters modulators write into.

use strum::EnumCount;

// -------------------------------------------------------------------------------------------------

/// A SoundFont 2 generator id.
///
/// Covers all 60 ids of the SoundFont 2.04 generator enumeration, including the unused and
/// reserved slots so raw ids map 1:1, plus a few synth specific generators which are only
/// targeted by default modulators.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumCount,
    strum::EnumIter,
    strum::FromRepr,
    strum::IntoStaticStr,
)]
#[repr(u16)]
pub enum Generator {
    StartAddrOffset = 0,
    EndAddrOffset = 1,
    StartLoopAddrOffset = 2,
    EndLoopAddrOffset = 3,
    StartAddrCoarseOffset = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    FilterFc = 8,
    FilterQ = 9,
    ModLfoToFilterFc = 10,
    ModEnvToFilterFc = 11,
    EndAddrCoarseOffset = 12,
    ModLfoToVolume = 13,
    Unused1 = 14,
    ChorusSend = 15,
    ReverbSend = 16,
    Pan = 17,
    Unused2 = 18,
    Unused3 = 19,
    Unused4 = 20,
    ModLfoDelay = 21,
    ModLfoFreq = 22,
    VibLfoDelay = 23,
    VibLfoFreq = 24,
    ModEnvDelay = 25,
    ModEnvAttack = 26,
    ModEnvHold = 27,
    ModEnvDecay = 28,
    ModEnvSustain = 29,
    ModEnvRelease = 30,
    KeyToModEnvHold = 31,
    KeyToModEnvDecay = 32,
    VolEnvDelay = 33,
    VolEnvAttack = 34,
    VolEnvHold = 35,
    VolEnvDecay = 36,
    VolEnvSustain = 37,
    VolEnvRelease = 38,
    KeyToVolEnvHold = 39,
    KeyToVolEnvDecay = 40,
    Instrument = 41,
    Reserved1 = 42,
    KeyRange = 43,
    VelRange = 44,
    StartLoopAddrCoarseOffset = 45,
    KeyNum = 46,
    Velocity = 47,
    Attenuation = 48,
    Reserved2 = 49,
    EndLoopAddrCoarseOffset = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleMode = 54,
    Reserved3 = 55,
    ScaleTune = 56,
    ExclusiveClass = 57,
    OverrideRootKey = 58,
    /// Pitch in cents. Not part of the SoundFont file format: the synth sets it per voice.
    Pitch = 59,
    /// Stereo balance, targeted by the default CC8 modulator.
    CustomBalance = 60,
    /// Custom filter cutoff, only targeted by user defined modulators.
    CustomFilterFc = 61,
    /// Custom filter Q, only targeted by user defined modulators.
    CustomFilterQ = 62,
}

/// Number of generators a voice tracks.
pub const GENERATOR_COUNT: usize = Generator::COUNT;

impl Generator {
    /// Map a raw SoundFont generator id to a generator. Returns None for ids out of range.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::from_repr(id)
    }

    /// Map a generator id as found in SoundFont files. Returns None for ids out of range, for
    /// unused and reserved generators, and for the synth's internal generators.
    pub fn from_sf2_id(id: u16) -> Option<Self> {
        Self::from_id(id)
            .filter(|generator| *generator <= Self::OverrideRootKey && !generator.is_unused())
    }

    /// The raw SoundFont generator id.
    #[inline]
    pub const fn id(self) -> u16 {
        self as u16
    }

    /// Index into per-voice generator arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Initial value as defined in SoundFont 2.01 section 8.1.3.
    pub const fn default_value(self) -> f64 {
        match self {
            Self::FilterFc => 13500.0,
            Self::ModLfoDelay
            | Self::VibLfoDelay
            | Self::ModEnvDelay
            | Self::ModEnvAttack
            | Self::ModEnvHold
            | Self::ModEnvDecay
            | Self::ModEnvRelease
            | Self::VolEnvDelay
            | Self::VolEnvAttack
            | Self::VolEnvHold
            | Self::VolEnvDecay
            | Self::VolEnvRelease => -12000.0, // instantaneous
            Self::KeyNum | Self::Velocity | Self::OverrideRootKey => -1.0, // disabled
            Self::ScaleTune => 100.0, // one semitone per key
            _ => 0.0,
        }
    }

    /// Returns true for generators which are unused or reserved in the SoundFont 2.04 generator list.
    pub const fn is_unused(self) -> bool {
        matches!(
            self,
            Self::Unused1
                | Self::Unused2
                | Self::Unused3
                | Self::Unused4
                | Self::Reserved1
                | Self::Reserved2
                | Self::Reserved3
        )
    }
}

// -------------------------------------------------------------------------------------------------

/// Per-voice generator values: a base value set by zone layering and a modulation input
/// which is written by the voice's modulators.
///
/// DSP reads [`value`](Self::value) or [`modulation`](Self::modulation) each block to
/// compute its parameters.
#[derive(Debug, Clone)]
pub struct GeneratorValues {
    base: [f64; GENERATOR_COUNT],
    modulation: [f64; GENERATOR_COUNT],
}

impl Default for GeneratorValues {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorValues {
    /// Create a new set of values initialized to the generator defaults.
    pub fn new() -> Self {
        let mut values = Self {
            base: [0.0; GENERATOR_COUNT],
            modulation: [0.0; GENERATOR_COUNT],
        };
        values.reset();
        values
    }

    /// Reset all base values to their defaults and clear all modulation inputs.
    pub fn reset(&mut self) {
        use strum::IntoEnumIterator;
        for generator in Generator::iter() {
            self.base[generator.index()] = generator.default_value();
        }
        self.modulation.fill(0.0);
    }

    /// The generator's base value.
    #[inline]
    pub fn base(&self, generator: Generator) -> f64 {
        self.base[generator.index()]
    }

    /// Set the generator's base value.
    #[inline]
    pub fn set_base(&mut self, generator: Generator, value: f64) {
        self.base[generator.index()] = value;
    }

    /// Add an offset to the generator's base value.
    #[inline]
    pub fn add_base(&mut self, generator: Generator, offset: f64) {
        self.base[generator.index()] += offset;
    }

    /// The summed output of all modulators which target the generator.
    #[inline]
    pub fn modulation(&self, generator: Generator) -> f64 {
        self.modulation[generator.index()]
    }

    /// Base value plus modulation input.
    #[inline]
    pub fn value(&self, generator: Generator) -> f64 {
        let index = generator.index();
        self.base[index] + self.modulation[index]
    }

    #[inline]
    pub(crate) fn set_modulation(&mut self, generator: Generator, value: f64) {
        self.modulation[generator.index()] = value;
    }

    #[inline]
    pub(crate) fn add_modulation(&mut self, generator: Generator, value: f64) {
        self.modulation[generator.index()] += value;
    }

    #[inline]
    pub(crate) fn clear_modulation(&mut self) {
        self.modulation.fill(0.0);
    }
}

// -------------------------------------------------------------------------------------------------
