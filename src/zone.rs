//! Presets, instruments and their zones, and the layering rules which turn matching zones into
//! a voice's generator values and modulator table.

use std::{ops::RangeInclusive, sync::Arc};

use crate::{
    generator::{Generator, GeneratorValues},
    modulation::{
        sanitizer::{sanitize, SanitizedModulators},
        table::VoiceModulatorTable,
        MergeMode,
    },
    modulator::{chain::ModulatorChain, defaults::DefaultModulators, Modulator, ModulatorRecord},
};

// -------------------------------------------------------------------------------------------------

/// A key and velocity range with generator settings and sanitized modulators.
#[derive(Debug, Clone)]
pub struct Zone {
    name: String,
    key_range: RangeInclusive<u8>,
    velocity_range: RangeInclusive<u8>,
    generators: Vec<(Generator, f64)>,
    modulators: SanitizedModulators,
}

impl Zone {
    /// Create a new zone covering all keys and velocities.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key_range: 0..=127,
            velocity_range: 0..=127,
            generators: Vec::new(),
            modulators: SanitizedModulators::default(),
        }
    }

    pub fn with_key_range(mut self, range: RangeInclusive<u8>) -> Self {
        self.key_range = range;
        self
    }

    pub fn with_velocity_range(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity_range = range;
        self
    }

    /// Set a generator value. Setting the same generator twice replaces the first value.
    pub fn with_generator(mut self, generator: Generator, value: f64) -> Self {
        match self.generators.iter_mut().find(|(g, _)| *g == generator) {
            Some((_, existing)) => *existing = value,
            None => self.generators.push((generator, value)),
        }
        self
    }

    /// Set the zone's modulators. The list gets sanitized: invalid entries are dropped and
    /// reported in the zone's modulator diagnostics.
    pub fn with_modulators(mut self, modulators: &[Modulator]) -> Self {
        self.modulators = sanitize(&self.name, modulators);
        self
    }

    /// Set the zone's modulators from raw SoundFont modulator records.
    pub fn with_modulator_records(self, records: &[ModulatorRecord]) -> Self {
        let modulators = records
            .iter()
            .map(Modulator::from_record)
            .collect::<Vec<_>>();
        self.with_modulators(&modulators)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_range(&self) -> &RangeInclusive<u8> {
        &self.key_range
    }

    pub fn velocity_range(&self) -> &RangeInclusive<u8> {
        &self.velocity_range
    }

    /// Returns true if the zone applies to the given key and velocity.
    pub fn contains(&self, key: u8, velocity: u8) -> bool {
        self.key_range.contains(&key) && self.velocity_range.contains(&velocity)
    }

    /// The zone's value for the given generator, if set.
    pub fn generator(&self, generator: Generator) -> Option<f64> {
        self.generators
            .iter()
            .find(|(g, _)| *g == generator)
            .map(|(_, value)| *value)
    }

    pub fn generators(&self) -> &[(Generator, f64)] {
        &self.generators
    }

    pub fn modulators(&self) -> &SanitizedModulators {
        &self.modulators
    }
}

// -------------------------------------------------------------------------------------------------

/// An instrument: an optional global zone and a list of local zones.
#[derive(Debug, Clone)]
pub struct Instrument {
    name: String,
    global_zone: Option<Zone>,
    zones: Vec<Zone>,
}

impl Instrument {
    pub fn new(name: &str, global_zone: Option<Zone>, zones: Vec<Zone>) -> Self {
        Self {
            name: name.to_string(),
            global_zone,
            zones,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn global_zone(&self) -> Option<&Zone> {
        self.global_zone.as_ref()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }
}

/// A preset zone, referring to the instrument it plays.
#[derive(Debug, Clone)]
pub struct PresetZone {
    zone: Zone,
    instrument: Arc<Instrument>,
}

impl PresetZone {
    pub fn new(zone: Zone, instrument: Arc<Instrument>) -> Self {
        Self { zone, instrument }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }
}

/// A preset: an optional global zone and a list of preset zones.
#[derive(Debug, Clone)]
pub struct Preset {
    name: String,
    global_zone: Option<Zone>,
    zones: Vec<PresetZone>,
}

impl Preset {
    pub fn new(name: &str, global_zone: Option<Zone>, zones: Vec<PresetZone>) -> Self {
        Self {
            name: name.to_string(),
            global_zone,
            zones,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn global_zone(&self) -> Option<&Zone> {
        self.global_zone.as_ref()
    }

    pub fn zones(&self) -> &[PresetZone] {
        &self.zones
    }

    /// All zone combinations which play the given key and velocity. Each layer starts a voice.
    pub fn layers(&self, key: u8, velocity: u8) -> impl Iterator<Item = VoiceLayer<'_>> {
        self.zones
            .iter()
            .filter(move |preset_zone| preset_zone.zone.contains(key, velocity))
            .flat_map(move |preset_zone| {
                preset_zone
                    .instrument
                    .zones
                    .iter()
                    .filter(move |zone| zone.contains(key, velocity))
                    .map(move |instrument_zone| VoiceLayer {
                        preset_global: self.global_zone.as_ref(),
                        preset_zone: &preset_zone.zone,
                        instrument_global: preset_zone.instrument.global_zone.as_ref(),
                        instrument_zone,
                    })
            })
    }
}

// -------------------------------------------------------------------------------------------------

/// The four zones which contribute to a single voice.
#[derive(Debug, Clone, Copy)]
pub struct VoiceLayer<'a> {
    pub preset_global: Option<&'a Zone>,
    pub preset_zone: &'a Zone,
    pub instrument_global: Option<&'a Zone>,
    pub instrument_zone: &'a Zone,
}

impl VoiceLayer<'_> {
    /// Set up a voice's generator values and modulator table from the layer's zones.
    ///
    /// Generators: instrument values are absolute, a local value overrides the global one.
    /// Preset values are relative and added on top, again a local value overrides the global.
    ///
    /// Modulators: defaults come first. Instrument modulators then overwrite identical
    /// defaults, and preset modulators get added to identical ones. At both levels a local
    /// modulator supersedes an identical global one.
    ///
    /// Does not allocate.
    pub fn apply(
        &self,
        defaults: &DefaultModulators,
        table: &mut VoiceModulatorTable,
        values: &mut GeneratorValues,
    ) {
        values.reset();
        apply_generators(self.instrument_global, self.instrument_zone, |generator, value| {
            values.set_base(generator, value)
        });
        apply_generators(self.preset_global, self.preset_zone, |generator, value| {
            values.add_base(generator, value)
        });

        table.clear();
        for modulator in defaults.iter() {
            table.add_modulator(modulator, MergeMode::Default);
        }
        merge_zone_modulators(
            self.instrument_global,
            self.instrument_zone,
            MergeMode::Overwrite,
            table,
        );
        merge_zone_modulators(self.preset_global, self.preset_zone, MergeMode::Add, table);
    }
}

/// Generators which select zones or samples rather than shaping the sound.
fn is_layered(generator: Generator) -> bool {
    !matches!(
        generator,
        Generator::KeyRange | Generator::VelRange | Generator::Instrument | Generator::SampleId
    ) && !generator.is_unused()
}

fn apply_generators<F: FnMut(Generator, f64)>(global: Option<&Zone>, local: &Zone, mut apply: F) {
    if let Some(global) = global {
        for &(generator, value) in global.generators() {
            if is_layered(generator) && local.generator(generator).is_none() {
                apply(generator, value);
            }
        }
    }
    for &(generator, value) in local.generators() {
        if is_layered(generator) {
            apply(generator, value);
        }
    }
}

fn merge_zone_modulators(
    global: Option<&Zone>,
    local: &Zone,
    mode: MergeMode,
    table: &mut VoiceModulatorTable,
) {
    let local_chains = local.modulators().chains();
    let global_chains = global
        .map(|zone| zone.modulators().chains())
        .unwrap_or_default();
    let superseded = |chain: &ModulatorChain| {
        local_chains
            .iter()
            .any(|local_chain| local_chain.is_identical(chain))
    };
    let chains = local_chains
        .iter()
        .chain(global_chains.iter().filter(|chain| !superseded(*chain)));
    for chain in chains {
        // zero amounts add nothing
        if mode == MergeMode::Add && chain.nodes().iter().all(|node| node.amount() == 0.0) {
            continue;
        }
        table.add(chain, mode);
    }
}

// -------------------------------------------------------------------------------------------------
