use crate::{
    error::Error,
    generator::Generator,
    modulation::{MergeMode, MergeOutcome},
    modulator::{
        Modulator, ModulatorSource, SourceCurve, SourceMapping, MIDI_CC_BALANCE, MIDI_CC_PAN,
    },
};

// -------------------------------------------------------------------------------------------------

/// The set of modulators every voice starts with before zone modulators are merged in.
///
/// Defaults to the SoundFont 2.04 default modulators (section 8.4) plus a CC8 balance
/// modulator. All defaults are simple, terminal modulators.
#[derive(Debug, Clone)]
pub struct DefaultModulators {
    modulators: Vec<Modulator>,
}

impl Default for DefaultModulators {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultModulators {
    /// Create the standard default modulator set.
    pub fn new() -> Self {
        let concave_negative = SourceMapping::linear()
            .with_curve(SourceCurve::Concave)
            .negative();
        let linear = SourceMapping::linear();

        let modulators = vec![
            // velocity to initial attenuation
            Modulator::new(Generator::Attenuation)
                .with_source1(ModulatorSource::Velocity, concave_negative)
                .with_amount(960.0),
            // velocity to filter cutoff: evaluates to 0, see Modulator::value
            Modulator::new(Generator::FilterFc)
                .with_source1(ModulatorSource::Velocity, linear.negative())
                .with_source2(
                    ModulatorSource::Velocity,
                    linear.with_curve(SourceCurve::Switch),
                )
                .with_amount(-2400.0),
            // channel pressure to vibrato LFO pitch depth
            Modulator::new(Generator::VibLfoToPitch)
                .with_source1(ModulatorSource::ChannelPressure, linear)
                .with_amount(50.0),
            // modulation wheel to vibrato LFO pitch depth
            Modulator::new(Generator::VibLfoToPitch)
                .with_source1(ModulatorSource::Cc(1), linear)
                .with_amount(50.0),
            // volume to initial attenuation
            Modulator::new(Generator::Attenuation)
                .with_source1(ModulatorSource::Cc(7), concave_negative)
                .with_amount(960.0),
            // pan to pan
            Modulator::new(Generator::Pan)
                .with_source1(ModulatorSource::Cc(MIDI_CC_PAN), linear.bipolar())
                .with_amount(500.0),
            // expression to initial attenuation
            Modulator::new(Generator::Attenuation)
                .with_source1(ModulatorSource::Cc(11), concave_negative)
                .with_amount(960.0),
            // reverb send
            Modulator::new(Generator::ReverbSend)
                .with_source1(ModulatorSource::Cc(91), linear)
                .with_amount(200.0),
            // chorus send
            Modulator::new(Generator::ChorusSend)
                .with_source1(ModulatorSource::Cc(93), linear)
                .with_amount(200.0),
            // pitch wheel, scaled by the pitch wheel sensitivity
            Modulator::new(Generator::Pitch)
                .with_source1(ModulatorSource::PitchWheel, linear.bipolar())
                .with_source2(ModulatorSource::PitchWheelSensitivity, linear)
                .with_amount(12700.0),
            // balance
            Modulator::new(Generator::CustomBalance)
                .with_source1(
                    ModulatorSource::Cc(MIDI_CC_BALANCE),
                    linear.with_curve(SourceCurve::Concave).bipolar(),
                )
                .with_amount(960.0),
        ];
        Self { modulators }
    }

    /// Create an empty default modulator set.
    pub fn empty() -> Self {
        Self {
            modulators: Vec::new(),
        }
    }

    /// Number of default modulators.
    pub fn len(&self) -> usize {
        self.modulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modulators.is_empty()
    }

    /// Iterate over all default modulators.
    pub fn iter(&self) -> impl Iterator<Item = &Modulator> {
        self.modulators.iter()
    }

    /// Add a modulator to the set. If an identical modulator exists, its amount gets summed
    /// up with ([`MergeMode::Add`]) or replaced by ([`MergeMode::Overwrite`]) the new amount.
    pub fn add(&mut self, modulator: Modulator, mode: MergeMode) -> Result<MergeOutcome, Error> {
        if mode == MergeMode::Default {
            return Err(Error::ParameterError(
                "default modulators must be added in 'Add' or 'Overwrite' mode".to_string(),
            ));
        }
        if !modulator.is_terminal() || modulator.has_link_source() {
            return Err(Error::InvalidModulator(
                "default modulators can't be linked".to_string(),
            ));
        }
        modulator
            .check_sources()
            .map_err(|violation| Error::InvalidModulator(violation.to_string()))?;

        if let Some(existing) = self
            .modulators
            .iter_mut()
            .find(|existing| existing.is_identical(&modulator))
        {
            if mode == MergeMode::Add {
                existing.set_amount(existing.amount() + modulator.amount());
                Ok(MergeOutcome::Summed)
            } else {
                existing.set_amount(modulator.amount());
                Ok(MergeOutcome::Overwritten)
            }
        } else {
            self.modulators.push(modulator);
            Ok(MergeOutcome::Added)
        }
    }

    /// Remove the modulator which is identical to the given one.
    pub fn remove(&mut self, modulator: &Modulator) -> Result<(), Error> {
        let position = self
            .modulators
            .iter()
            .position(|existing| existing.is_identical(modulator))
            .ok_or(Error::ModulatorNotFound)?;
        self.modulators.remove(position);
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
