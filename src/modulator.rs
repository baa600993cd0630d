//! SoundFont modulators: two mapped controller sources, scaled by an amount, driving a
//! generator or the link input of another modulator.

use std::{fmt, sync::Arc};

use crate::{channel::VoiceContext, generator::Generator, utils::BitSet128};

// -------------------------------------------------------------------------------------------------

pub(crate) mod chain;
pub(crate) mod defaults;
pub(crate) mod mapping;

use mapping::map_source;

// -------------------------------------------------------------------------------------------------

/// MIDI CC number for balance, which uses the adjusted pan range.
pub const MIDI_CC_BALANCE: u8 = 8;
/// MIDI CC number for pan, which uses the adjusted pan range.
pub const MIDI_CC_PAN: u8 = 10;

/// Range of 7-bit controller sources.
pub const CONTROLLER_RANGE_7BIT: f64 = 127.0;
/// Range of 14-bit pitch wheel sources.
pub const CONTROLLER_RANGE_PITCH_WHEEL: f64 = 16384.0;

// -------------------------------------------------------------------------------------------------

/// Controller a modulator source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulatorSource {
    /// No controller: a missing source1 disables the modulator, a missing source2 is a neutral
    /// multiplier of 1.
    None,
    /// Note-on velocity of the voice.
    Velocity,
    /// Note-on key number of the voice.
    Key,
    /// Polyphonic pressure of the voice's key.
    KeyPressure,
    /// Channel pressure.
    ChannelPressure,
    /// 14-bit pitch wheel.
    PitchWheel,
    /// Pitch wheel sensitivity (RPN 0) in semitones.
    PitchWheelSensitivity,
    /// Summed output of all modulators which link into this one. Only valid as source1.
    Link,
    /// A MIDI continuous controller.
    Cc(u8),
    /// General controller index outside of the defined set, as found in corrupt SoundFonts.
    Undefined(u8),
}

impl ModulatorSource {
    /// Decode a general controller index.
    pub const fn from_general_index(index: u8) -> Self {
        match index {
            0 => Self::None,
            2 => Self::Velocity,
            3 => Self::Key,
            10 => Self::KeyPressure,
            13 => Self::ChannelPressure,
            14 => Self::PitchWheel,
            16 => Self::PitchWheelSensitivity,
            127 => Self::Link,
            other => Self::Undefined(other),
        }
    }

    /// General controller index, or None for MIDI CCs.
    pub const fn general_index(self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Velocity => Some(2),
            Self::Key => Some(3),
            Self::KeyPressure => Some(10),
            Self::ChannelPressure => Some(13),
            Self::PitchWheel => Some(14),
            Self::PitchWheelSensitivity => Some(16),
            Self::Link => Some(127),
            Self::Undefined(index) => Some(index),
            Self::Cc(_) => None,
        }
    }

    /// Returns true for MIDI CC sources.
    pub const fn is_cc(self) -> bool {
        matches!(self, Self::Cc(_))
    }

    /// MIDI CCs which may not be used as modulation sources (SoundFont 2.01 section 8.2.1):
    /// bank select, data entry, (N)RPN selectors and channel mode messages.
    pub const fn is_forbidden_cc(cc: u8) -> bool {
        matches!(cc, 0 | 6 | 32 | 38 | 98..=101) || cc >= 120
    }
}

impl fmt::Display for ModulatorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cc(cc) => write!(f, "CC{cc}"),
            Self::Undefined(index) => write!(f, "undefined general controller {index}"),
            other => write!(f, "{other:?}"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Fixed size set of controller sources, e.g. the controllers which changed since a voice's
/// modulators were evaluated last. `None` and `Link` are never contained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModulatorSourceSet {
    ccs: BitSet128,
    general: BitSet128,
}

impl ModulatorSourceSet {
    pub const fn new() -> Self {
        Self {
            ccs: BitSet128::new(),
            general: BitSet128::new(),
        }
    }

    pub fn insert(&mut self, source: ModulatorSource) {
        match source {
            ModulatorSource::None | ModulatorSource::Link => {}
            ModulatorSource::Cc(cc) => self.ccs.insert(cc as usize & 0x7F),
            other => {
                if let Some(index) = other.general_index() {
                    self.general.insert(index as usize & 0x7F);
                }
            }
        }
    }

    pub fn contains(&self, source: ModulatorSource) -> bool {
        match source {
            ModulatorSource::None | ModulatorSource::Link => false,
            ModulatorSource::Cc(cc) => self.ccs.contains(cc as usize),
            other => other
                .general_index()
                .is_some_and(|index| self.general.contains(index as usize)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ccs.is_empty() && self.general.is_empty()
    }

    pub fn clear(&mut self) {
        self.ccs.clear();
        self.general.clear();
    }
}

// -------------------------------------------------------------------------------------------------

/// Curve a raw controller value is mapped through.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCurve {
    #[default]
    Linear,
    Concave,
    Convex,
    Switch,
    /// Mapped by the modulator's [`CustomMapping`] function.
    Custom,
    /// SoundFont curve type outside of the defined set.
    Undefined(u8),
}

/// Output domain of a mapped source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourcePolarity {
    /// 0..=1
    #[default]
    Unipolar,
    /// -1..=1
    Bipolar,
}

/// Direction a mapped source moves in when the controller value increases.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDirection {
    #[default]
    Positive,
    Negative,
}

/// How a modulator source maps raw controller values into its output domain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceMapping {
    pub curve: SourceCurve,
    pub polarity: SourcePolarity,
    pub direction: SourceDirection,
}

impl SourceMapping {
    pub const fn new(
        curve: SourceCurve,
        polarity: SourcePolarity,
        direction: SourceDirection,
    ) -> Self {
        Self {
            curve,
            polarity,
            direction,
        }
    }

    /// Linear, unipolar, positive: the identity mapping.
    pub const fn linear() -> Self {
        Self::new(
            SourceCurve::Linear,
            SourcePolarity::Unipolar,
            SourceDirection::Positive,
        )
    }

    pub const fn with_curve(mut self, curve: SourceCurve) -> Self {
        self.curve = curve;
        self
    }

    pub const fn bipolar(mut self) -> Self {
        self.polarity = SourcePolarity::Bipolar;
        self
    }

    pub const fn negative(mut self) -> Self {
        self.direction = SourceDirection::Negative;
        self
    }

    #[inline]
    pub const fn is_bipolar(&self) -> bool {
        matches!(self.polarity, SourcePolarity::Bipolar)
    }

    /// Decode the mapping bits of a raw SoundFont source operator.
    pub const fn from_sf2(source: u16) -> Self {
        let direction = if source & (1 << 8) != 0 {
            SourceDirection::Negative
        } else {
            SourceDirection::Positive
        };
        let polarity = if source & (1 << 9) != 0 {
            SourcePolarity::Bipolar
        } else {
            SourcePolarity::Unipolar
        };
        let curve = match (source >> 10) as u8 {
            0 => SourceCurve::Linear,
            1 => SourceCurve::Concave,
            2 => SourceCurve::Convex,
            3 => SourceCurve::Switch,
            other => SourceCurve::Undefined(other),
        };
        Self::new(curve, polarity, direction)
    }
}

// -------------------------------------------------------------------------------------------------

/// Where a modulator's output goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulatorDestination {
    /// Terminal modulator: adds into the generator's modulation input.
    Generator(Generator),
    /// Non-terminal modulator: adds into the link input of the modulator at the given index.
    /// In zone lists this is an index into the list, in chains it is relative to the chain's
    /// terminal modulator.
    Link(usize),
    /// Generator id outside of the defined set, as found in corrupt SoundFonts.
    Undefined(u16),
}

impl ModulatorDestination {
    /// The target generator, when this is a terminal destination.
    pub const fn generator(&self) -> Option<Generator> {
        match self {
            Self::Generator(generator) => Some(*generator),
            _ => None,
        }
    }

    /// The target link index, when this is a non-terminal destination.
    pub const fn link(&self) -> Option<usize> {
        match self {
            Self::Link(index) => Some(*index),
            _ => None,
        }
    }

    /// Decode a raw SoundFont destination operator: bit 15 marks a link.
    pub fn from_sf2(destination: u16) -> Self {
        if destination & 0x8000 != 0 {
            Self::Link((destination & 0x7FFF) as usize)
        } else {
            match Generator::from_sf2_id(destination) {
                Some(generator) => Self::Generator(generator),
                None => Self::Undefined(destination),
            }
        }
    }
}

impl From<Generator> for ModulatorDestination {
    fn from(generator: Generator) -> Self {
        Self::Generator(generator)
    }
}

impl fmt::Display for ModulatorDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generator(generator) => write!(f, "{generator}"),
            Self::Link(index) => write!(f, "link to modulator {index}"),
            Self::Undefined(id) => write!(f, "undefined generator {id}"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Transform applied to a modulator's output before it is summed into its destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulatorTransform {
    #[default]
    Linear,
    /// Absolute value of the output.
    Absolute,
    /// SoundFont transform id outside of the defined set.
    Undefined(u16),
}

impl ModulatorTransform {
    pub const fn from_sf2(transform: u16) -> Self {
        match transform {
            0 => Self::Linear,
            2 => Self::Absolute,
            other => Self::Undefined(other),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Which of the two modulator sources a check or mapping refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceSlot {
    Source1,
    Source2,
}

impl fmt::Display for SourceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source1 => write!(f, "source1"),
            Self::Source2 => write!(f, "source2"),
        }
    }
}

/// User defined source mapping function, used for sources with a [`SourceCurve::Custom`] curve.
///
/// Called with the raw controller value, the controller's range and the source slot. The
/// returned value is used as is, so it should stay within the source's polarity domain.
#[derive(Clone)]
pub struct CustomMapping(Arc<dyn Fn(f64, f64, SourceSlot) -> f64 + Send + Sync>);

impl CustomMapping {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(f64, f64, SourceSlot) -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    #[inline]
    pub(crate) fn map(&self, value: f64, range: f64, slot: SourceSlot) -> f64 {
        (self.0)(value, range, slot)
    }
}

impl fmt::Debug for CustomMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomMapping").finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// Reason why a modulator's sources were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceViolation {
    /// The link pseudo source was used as source2.
    LinkAsSource2,
    /// A general controller index outside of the defined set.
    UndefinedSource(SourceSlot, u8),
    /// A MIDI CC which may not be used as a modulation source.
    ForbiddenCc(SourceSlot, u8),
    /// Source2 is "none" but flagged bipolar.
    BipolarNoneSource2,
    /// A curve type outside of the defined set.
    UndefinedCurve(SourceSlot, u8),
    /// A custom curve without a mapping function.
    MissingCustomMapping(SourceSlot),
    /// A transform outside of the defined set.
    UndefinedTransform(u16),
}

impl fmt::Display for SourceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkAsSource2 => write!(f, "link source is only allowed as source1"),
            Self::UndefinedSource(slot, index) => {
                write!(f, "{slot} uses undefined general controller {index}")
            }
            Self::ForbiddenCc(slot, cc) => write!(f, "{slot} uses forbidden CC{cc}"),
            Self::BipolarNoneSource2 => write!(f, "source2 is none but bipolar"),
            Self::UndefinedCurve(slot, curve) => write!(f, "{slot} uses undefined curve {curve}"),
            Self::MissingCustomMapping(slot) => {
                write!(f, "{slot} uses a custom curve without mapping function")
            }
            Self::UndefinedTransform(transform) => write!(f, "undefined transform {transform}"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Raw modulator record as stored in a SoundFont's `pmod` / `imod` chunks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModulatorRecord {
    /// Source operator: index bits 0..=6, CC flag bit 7, direction bit 8, polarity bit 9,
    /// curve type bits 10..=15.
    pub source: u16,
    /// Generator id or, with bit 15 set, the index of the linked modulator.
    pub destination: u16,
    pub amount: i16,
    /// Amount source operator, same layout as `source`.
    pub amount_source: u16,
    pub transform: u16,
}

// -------------------------------------------------------------------------------------------------

/// A single SoundFont modulator.
///
/// Computes `amount * map(source1) * map(source2)` and adds the result into a generator or
/// into the link input of another modulator. Modulators which link into each other form a
/// [`ModulatorChain`](crate::ModulatorChain).
#[derive(Debug, Clone)]
pub struct Modulator {
    destination: ModulatorDestination,
    source1: ModulatorSource,
    mapping1: SourceMapping,
    source2: ModulatorSource,
    mapping2: SourceMapping,
    transform: ModulatorTransform,
    amount: f64,
    custom_mapping: Option<CustomMapping>,
}

impl Modulator {
    /// Create a new modulator without sources and with amount 0 for the given destination.
    pub fn new<D: Into<ModulatorDestination>>(destination: D) -> Self {
        Self {
            destination: destination.into(),
            source1: ModulatorSource::None,
            mapping1: SourceMapping::default(),
            source2: ModulatorSource::None,
            mapping2: SourceMapping::default(),
            transform: ModulatorTransform::Linear,
            amount: 0.0,
            custom_mapping: None,
        }
    }

    /// Create a new modulator which feeds the link input of the modulator at `index`.
    pub fn linked_to(index: usize) -> Self {
        Self::new(ModulatorDestination::Link(index))
    }

    /// Decode a raw SoundFont modulator record. Undefined sources, curves, transforms or
    /// generator ids are preserved as `Undefined` values and rejected by validation.
    pub fn from_record(record: &ModulatorRecord) -> Self {
        fn decode_source(source: u16) -> ModulatorSource {
            let index = (source & 0x7F) as u8;
            if source & 0x80 != 0 {
                ModulatorSource::Cc(index)
            } else {
                ModulatorSource::from_general_index(index)
            }
        }
        Self {
            destination: ModulatorDestination::from_sf2(record.destination),
            source1: decode_source(record.source),
            mapping1: SourceMapping::from_sf2(record.source),
            source2: decode_source(record.amount_source),
            mapping2: SourceMapping::from_sf2(record.amount_source),
            transform: ModulatorTransform::from_sf2(record.transform),
            amount: record.amount as f64,
            custom_mapping: None,
        }
    }

    pub fn with_source1(mut self, source: ModulatorSource, mapping: SourceMapping) -> Self {
        self.set_source1(source, mapping);
        self
    }

    pub fn with_source2(mut self, source: ModulatorSource, mapping: SourceMapping) -> Self {
        self.set_source2(source, mapping);
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_transform(mut self, transform: ModulatorTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set a mapping function for sources with a [`SourceCurve::Custom`] curve.
    pub fn with_custom_mapping(mut self, mapping: CustomMapping) -> Self {
        self.custom_mapping = Some(mapping);
        self
    }

    #[inline]
    pub fn destination(&self) -> ModulatorDestination {
        self.destination
    }
    pub fn set_destination<D: Into<ModulatorDestination>>(&mut self, destination: D) {
        self.destination = destination.into();
    }

    #[inline]
    pub fn source1(&self) -> ModulatorSource {
        self.source1
    }
    #[inline]
    pub fn mapping1(&self) -> SourceMapping {
        self.mapping1
    }
    pub fn set_source1(&mut self, source: ModulatorSource, mapping: SourceMapping) {
        self.source1 = source;
        self.mapping1 = mapping;
    }

    #[inline]
    pub fn source2(&self) -> ModulatorSource {
        self.source2
    }
    #[inline]
    pub fn mapping2(&self) -> SourceMapping {
        self.mapping2
    }
    pub fn set_source2(&mut self, source: ModulatorSource, mapping: SourceMapping) {
        self.source2 = source;
        self.mapping2 = mapping;
    }

    #[inline]
    pub fn transform(&self) -> ModulatorTransform {
        self.transform
    }
    pub fn set_transform(&mut self, transform: ModulatorTransform) {
        self.transform = transform;
    }

    #[inline]
    pub fn amount(&self) -> f64 {
        self.amount
    }
    pub fn set_amount(&mut self, amount: f64) {
        self.amount = amount;
    }

    pub fn custom_mapping(&self) -> Option<&CustomMapping> {
        self.custom_mapping.as_ref()
    }

    /// Returns true when the destination is a generator.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.destination, ModulatorDestination::Generator(_))
    }

    /// Returns true when source1 is the link pseudo source, so the modulator consumes the
    /// output of other modulators.
    #[inline]
    pub fn has_link_source(&self) -> bool {
        self.source1 == ModulatorSource::Link
    }

    /// Returns true if any of the two sources reads the given controller.
    pub fn has_source(&self, source: ModulatorSource) -> bool {
        self.source1 == source || self.source2 == source
    }

    /// Returns true if any of the two sources is contained in the given set.
    pub fn has_any_source(&self, sources: &ModulatorSourceSet) -> bool {
        sources.contains(self.source1) || sources.contains(self.source2)
    }

    /// Returns true if this is a terminal modulator for the given generator.
    pub fn has_destination(&self, generator: Generator) -> bool {
        self.destination == ModulatorDestination::Generator(generator)
    }

    /// Two modulators are identical when destination, both sources, their mappings and the
    /// transform match. The amount is not part of the identity.
    pub fn is_identical(&self, other: &Modulator) -> bool {
        self.destination == other.destination && self.has_identical_sources(other)
    }

    /// Identity test without the destination, used to compare chain members whose link
    /// destinations are positional.
    pub(crate) fn has_identical_sources(&self, other: &Modulator) -> bool {
        self.source1 == other.source1
            && self.mapping1 == other.mapping1
            && self.source2 == other.source2
            && self.mapping2 == other.mapping2
            && self.transform == other.transform
    }

    /// Validate sources, mappings and transform against SoundFont 2.01 sections 7.4, 7.8
    /// and 8.2.1. A missing source1 is valid: such a modulator always outputs 0.
    pub fn check_sources(&self) -> Result<(), SourceViolation> {
        self.check_source(SourceSlot::Source1)?;
        self.check_source(SourceSlot::Source2)?;
        if let ModulatorTransform::Undefined(transform) = self.transform {
            return Err(SourceViolation::UndefinedTransform(transform));
        }
        Ok(())
    }

    fn check_source(&self, slot: SourceSlot) -> Result<(), SourceViolation> {
        let (source, mapping) = match slot {
            SourceSlot::Source1 => (self.source1, self.mapping1),
            SourceSlot::Source2 => (self.source2, self.mapping2),
        };
        match source {
            ModulatorSource::Cc(cc) if ModulatorSource::is_forbidden_cc(cc) => {
                return Err(SourceViolation::ForbiddenCc(slot, cc));
            }
            ModulatorSource::Undefined(index) => {
                return Err(SourceViolation::UndefinedSource(slot, index));
            }
            ModulatorSource::Link if slot == SourceSlot::Source2 => {
                return Err(SourceViolation::LinkAsSource2);
            }
            ModulatorSource::None if slot == SourceSlot::Source2 && mapping.is_bipolar() => {
                return Err(SourceViolation::BipolarNoneSource2);
            }
            _ => {}
        }
        let is_mapped = !matches!(source, ModulatorSource::None | ModulatorSource::Link);
        match mapping.curve {
            SourceCurve::Undefined(curve) if is_mapped => {
                Err(SourceViolation::UndefinedCurve(slot, curve))
            }
            SourceCurve::Custom if is_mapped && self.custom_mapping.is_none() => {
                Err(SourceViolation::MissingCustomMapping(slot))
            }
            _ => Ok(()),
        }
    }

    /// The default velocity to filter cutoff modulator. Evaluates to 0 to keep the sound of
    /// existing content, which was tuned against synths ignoring this default modulator.
    fn is_velocity_to_filter_compat(&self) -> bool {
        self.source1 == ModulatorSource::Velocity
            && self.mapping1 == SourceMapping::linear().negative()
            && self.source2 == ModulatorSource::Velocity
            && self.mapping2 == SourceMapping::linear().with_curve(SourceCurve::Switch)
            && self.destination == ModulatorDestination::Generator(Generator::FilterFc)
    }

    /// Evaluate the modulator for the given voice. `link_value` is the summed output of all
    /// modulators which link into this one and is only used with a link source1.
    ///
    /// Never fails: undefined sources or curves log an error and evaluate to 0.
    pub fn value(&self, context: &VoiceContext, link_value: f64) -> f64 {
        if self.is_velocity_to_filter_compat() {
            return 0.0;
        }

        let value1 = match self.source1 {
            ModulatorSource::Link => link_value,
            ModulatorSource::None => return 0.0,
            source => self.mapped_source_value(source, self.mapping1, SourceSlot::Source1, context),
        };
        if value1 == 0.0 {
            return 0.0;
        }

        let value2 = match self.source2 {
            ModulatorSource::None => 1.0,
            source => self.mapped_source_value(source, self.mapping2, SourceSlot::Source2, context),
        };

        let value = self.amount * value1 * value2;
        match self.transform {
            ModulatorTransform::Absolute => value.abs(),
            _ => value,
        }
    }

    fn mapped_source_value(
        &self,
        source: ModulatorSource,
        mapping: SourceMapping,
        slot: SourceSlot,
        context: &VoiceContext,
    ) -> f64 {
        let Some((value, range)) = source_value(source, context) else {
            log::error!("Unexpected modulator {slot} '{source}' in evaluation");
            return 0.0;
        };
        if mapping.curve == SourceCurve::Custom {
            match &self.custom_mapping {
                Some(custom) => custom.map(value, range, slot),
                None => {
                    log::error!("Modulator {slot} uses a custom curve without mapping function");
                    0.0
                }
            }
        } else {
            map_source(value, range, mapping)
        }
    }
}

/// Read a controller's raw value and range for mapping. Pan and balance use an adjusted range
/// so that the controller's center value 64 maps exactly to the center of the output domain
/// (MIDI RP-036). A missing source reads as its full range.
fn source_value(source: ModulatorSource, context: &VoiceContext) -> Option<(f64, f64)> {
    match source {
        ModulatorSource::None => Some((CONTROLLER_RANGE_7BIT, CONTROLLER_RANGE_7BIT)),
        ModulatorSource::Cc(cc @ (MIDI_CC_PAN | MIDI_CC_BALANCE)) => {
            let value = context.read_controller(ModulatorSource::Cc(cc));
            Some(((value - 1.0).max(0.0), CONTROLLER_RANGE_7BIT - 1.0))
        }
        ModulatorSource::PitchWheel => Some((
            context.read_controller(source),
            CONTROLLER_RANGE_PITCH_WHEEL,
        )),
        ModulatorSource::Link | ModulatorSource::Undefined(_) => None,
        _ => Some((context.read_controller(source), CONTROLLER_RANGE_7BIT)),
    }
}

// -------------------------------------------------------------------------------------------------
