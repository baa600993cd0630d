//! A single playing note: its generator values, modulator table and modulation state.

use crate::{
    channel::{ControllerState, VoiceContext},
    generator::GeneratorValues,
    modulation::{table::VoiceModulatorTable, MergeMode, MergeOutcome},
    modulator::{
        chain::ModulatorChain, defaults::DefaultModulators, ModulatorSource, ModulatorSourceSet,
    },
    zone::VoiceLayer,
};

// -------------------------------------------------------------------------------------------------

/// Unique id of a started voice.
pub type VoiceId = u64;

// -------------------------------------------------------------------------------------------------

/// Playback status of a voice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum VoiceStatus {
    /// Not playing. Available for new notes.
    #[default]
    Idle,
    /// Playing, key held down.
    On,
    /// Key released while the sustain pedal is down.
    Sustained,
    /// Key released, playing its release phase.
    Released,
}

/// State of a voice's generator modulation inputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ModulationState {
    /// No modulators set up.
    #[default]
    Empty,
    /// Modulators set up, but not yet evaluated.
    Populated,
    /// Modulation inputs reflect the current controller values.
    UpToDate,
    /// Controllers which affect some modulators changed since the last evaluation.
    Stale,
}

// -------------------------------------------------------------------------------------------------

/// A synth voice.
///
/// Voices are preallocated by the synth and reused: starting and stopping them does not
/// allocate.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    channel: usize,
    key: u8,
    velocity: u8,
    status: VoiceStatus,
    modulation_state: ModulationState,
    modulators: VoiceModulatorTable,
    generators: GeneratorValues,
    pending_sources: ModulatorSourceSet,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    /// Create a new idle voice.
    pub fn new() -> Self {
        Self {
            id: 0,
            channel: 0,
            key: 0,
            velocity: 0,
            status: VoiceStatus::Idle,
            modulation_state: ModulationState::Empty,
            modulators: VoiceModulatorTable::new(),
            generators: GeneratorValues::new(),
            pending_sources: ModulatorSourceSet::new(),
        }
    }

    /// The voice's unique id. Ids increase with each started voice.
    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn status(&self) -> VoiceStatus {
        self.status
    }

    /// Returns true when the voice is playing, including its release phase.
    pub fn is_active(&self) -> bool {
        self.status != VoiceStatus::Idle
    }

    pub fn modulation_state(&self) -> ModulationState {
        self.modulation_state
    }

    /// The voice's generator values, as consumed by DSP.
    pub fn generators(&self) -> &GeneratorValues {
        &self.generators
    }

    pub fn modulators(&self) -> &VoiceModulatorTable {
        &self.modulators
    }

    /// Start the voice for the given note with generators and modulators from the given
    /// zone layer.
    pub(crate) fn start(
        &mut self,
        id: VoiceId,
        channel: usize,
        key: u8,
        velocity: u8,
        layer: &VoiceLayer,
        defaults: &DefaultModulators,
    ) {
        self.id = id;
        self.channel = channel;
        self.key = key;
        self.velocity = velocity;
        self.status = VoiceStatus::On;
        layer.apply(defaults, &mut self.modulators, &mut self.generators);
        self.pending_sources.clear();
        self.modulation_state = if self.modulators.is_empty() {
            ModulationState::Empty
        } else {
            ModulationState::Populated
        };
    }

    /// Merge an additional modulator chain into a playing voice.
    pub fn add_modulator(&mut self, chain: &ModulatorChain, mode: MergeMode) -> MergeOutcome {
        let outcome = self.modulators.add(chain, mode);
        if outcome.is_merged() {
            self.modulation_state = ModulationState::Populated;
        }
        outcome
    }

    /// Release the voice's key. Voices get sustained instead while the sustain pedal is down.
    pub(crate) fn note_off(&mut self, sustain_pedal_down: bool) {
        if self.status == VoiceStatus::On {
            self.status = if sustain_pedal_down {
                VoiceStatus::Sustained
            } else {
                VoiceStatus::Released
            };
        }
    }

    /// Release a sustained voice after the sustain pedal got lifted.
    pub(crate) fn release_sustained(&mut self) {
        if self.status == VoiceStatus::Sustained {
            self.status = VoiceStatus::Released;
        }
    }

    /// Release the voice regardless of the sustain pedal.
    pub(crate) fn release(&mut self) {
        if matches!(self.status, VoiceStatus::On | VoiceStatus::Sustained) {
            self.status = VoiceStatus::Released;
        }
    }

    /// Stop the voice immediately and free it for new notes.
    pub(crate) fn finish(&mut self) {
        self.status = VoiceStatus::Idle;
        self.modulation_state = ModulationState::Empty;
        self.modulators.clear();
        self.pending_sources.clear();
    }

    /// Mark a controller as changed. The affected modulators are evaluated with the next
    /// [`update_modulation`](Self::update_modulation).
    pub(crate) fn controller_changed(&mut self, source: ModulatorSource) {
        match self.modulation_state {
            ModulationState::UpToDate | ModulationState::Stale => {
                self.pending_sources.insert(source);
                self.modulation_state = ModulationState::Stale;
            }
            // a full evaluation is pending, or there's nothing to evaluate
            ModulationState::Populated | ModulationState::Empty => {}
        }
    }

    /// Mark all controllers as changed, e.g. after a controller reset. The next update
    /// evaluates all modulators.
    pub(crate) fn controllers_reset(&mut self) {
        if self.modulation_state != ModulationState::Empty {
            self.pending_sources.clear();
            self.modulation_state = ModulationState::Populated;
        }
    }

    /// Bring the generator modulation inputs up to date with the given controller state.
    pub(crate) fn update_modulation(&mut self, controllers: &dyn ControllerState) {
        let context = VoiceContext::new(controllers, self.key, self.velocity);
        match self.modulation_state {
            ModulationState::Populated => {
                self.modulators.recompute(&context, &mut self.generators);
            }
            ModulationState::Stale => {
                self.modulators.recompute_sources(
                    &self.pending_sources,
                    &context,
                    &mut self.generators,
                );
            }
            ModulationState::Empty | ModulationState::UpToDate => return,
        }
        self.pending_sources.clear();
        self.modulation_state = ModulationState::UpToDate;
    }
}

// -------------------------------------------------------------------------------------------------
