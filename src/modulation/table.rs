use assume::assume;

use crate::{
    channel::VoiceContext,
    generator::{Generator, GeneratorValues},
    modulation::{MergeMode, MergeOutcome, MAX_VOICE_MODULATORS},
    modulator::{
        chain::{match_chain_nodes, ModulatorChain, MAX_CHAIN_LENGTH},
        Modulator, ModulatorDestination, ModulatorSourceSet,
    },
    utils::BitSet128,
};

// -------------------------------------------------------------------------------------------------

/// Location of a chain within the table's node list.
#[derive(Debug, Clone, Copy)]
struct ChainSlot {
    start: usize,
    len: usize,
    generator: Generator,
}

// -------------------------------------------------------------------------------------------------

/// Per-voice modulator table.
///
/// Holds up to [`MAX_VOICE_MODULATORS`] modulators, merged from the default modulators and
/// the voice's zones, and evaluates them into a voice's [`GeneratorValues`]. Chains are
/// stored contiguously with their terminal first. Link destinations are resolved to absolute
/// table positions when a chain gets added.
///
/// All operations, except [`new`](Self::new), are allocation free and can be used on the
/// audio thread.
#[derive(Debug, Clone)]
pub struct VoiceModulatorTable {
    nodes: Vec<Modulator>,
    chains: Vec<ChainSlot>,
    targets: [usize; MAX_VOICE_MODULATORS],
    accumulators: [f64; MAX_VOICE_MODULATORS],
}

impl Default for VoiceModulatorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceModulatorTable {
    /// Create a new empty table with preallocated storage.
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(MAX_VOICE_MODULATORS),
            chains: Vec::with_capacity(MAX_VOICE_MODULATORS),
            targets: [0; MAX_VOICE_MODULATORS],
            accumulators: [0.0; MAX_VOICE_MODULATORS],
        }
    }

    /// Number of chains, simple and complex, in the table.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Number of modulators in the table, including all chain members.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Remove all modulators. Keeps the allocated storage.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.chains.clear();
    }

    /// Iterate over all chains as member slices, terminal first. Link destinations of the
    /// members are chain relative.
    pub fn chains(&self) -> impl Iterator<Item = &[Modulator]> {
        self.chains
            .iter()
            .map(|slot| &self.nodes[slot.start..slot.start + slot.len])
    }

    /// Merge a chain into the table.
    pub fn add(&mut self, chain: &ModulatorChain, mode: MergeMode) -> MergeOutcome {
        if let Err((index, violation)) = chain.check_sources() {
            log::warn!("Rejecting voice modulator chain member {index}: {violation}");
            return MergeOutcome::Rejected;
        }
        self.merge_nodes(chain.nodes(), mode)
    }

    /// Merge a single terminal modulator into the table.
    pub fn add_modulator(&mut self, modulator: &Modulator, mode: MergeMode) -> MergeOutcome {
        if !modulator.is_terminal() || modulator.has_link_source() {
            log::warn!(
                "Rejecting unchained voice modulator with destination '{}'",
                modulator.destination()
            );
            return MergeOutcome::Rejected;
        }
        if let Err(violation) = modulator.check_sources() {
            log::warn!("Rejecting voice modulator: {violation}");
            return MergeOutcome::Rejected;
        }
        self.merge_nodes(std::slice::from_ref(modulator), mode)
    }

    fn merge_nodes(&mut self, nodes: &[Modulator], mode: MergeMode) -> MergeOutcome {
        let mut mapping = [0; MAX_CHAIN_LENGTH];
        for chain_index in 0..self.chains.len() {
            let slot = self.chains[chain_index];
            let existing = &self.nodes[slot.start..slot.start + slot.len];
            if !match_chain_nodes(nodes, existing, &mut mapping) {
                continue;
            }
            return match mode {
                MergeMode::Default => MergeOutcome::Skipped,
                MergeMode::Add => {
                    for (index, node) in nodes.iter().enumerate() {
                        let existing = &mut self.nodes[slot.start + mapping[index]];
                        existing.set_amount(existing.amount() + node.amount());
                    }
                    MergeOutcome::Summed
                }
                MergeMode::Overwrite => {
                    for (index, node) in nodes.iter().enumerate() {
                        self.nodes[slot.start + mapping[index]].set_amount(node.amount());
                    }
                    MergeOutcome::Overwritten
                }
            };
        }

        if self.nodes.len() + nodes.len() > MAX_VOICE_MODULATORS {
            log::warn!(
                "Voice modulator table is full: ignoring modulator for '{}'",
                nodes[0].destination()
            );
            return MergeOutcome::TableFull;
        }
        let Some(generator) = nodes[0].destination().generator() else {
            return MergeOutcome::Rejected;
        };
        let start = self.nodes.len();
        for (index, node) in nodes.iter().enumerate() {
            if let ModulatorDestination::Link(target) = node.destination() {
                self.targets[start + index] = start + target;
            }
            self.nodes.push(node.clone());
        }
        self.chains.push(ChainSlot {
            start,
            len: nodes.len(),
            generator,
        });
        MergeOutcome::Added
    }

    /// Evaluate all modulators and write their summed outputs into the generators' modulation
    /// inputs. Modulation inputs of generators without modulators are reset to 0.
    pub fn recompute(&mut self, context: &VoiceContext, values: &mut GeneratorValues) {
        values.clear_modulation();
        for chain_index in 0..self.chains.len() {
            let slot = self.chains[chain_index];
            self.evaluate_chain(slot, context, values);
        }
    }

    /// Re-evaluate all chains of generators which are affected by the given changed
    /// sources. A generator is affected when any member of any of its chains reads one
    /// of the sources.
    pub fn recompute_sources(
        &mut self,
        changed: &ModulatorSourceSet,
        context: &VoiceContext,
        values: &mut GeneratorValues,
    ) {
        if changed.is_empty() {
            return;
        }
        let mut affected = BitSet128::new();
        for slot in &self.chains {
            let nodes = &self.nodes[slot.start..slot.start + slot.len];
            if nodes.iter().any(|node| node.has_any_source(changed)) {
                affected.insert(slot.generator.index());
            }
        }
        if affected.is_empty() {
            return;
        }
        for slot in &self.chains {
            if affected.contains(slot.generator.index()) {
                values.set_modulation(slot.generator, 0.0);
            }
        }
        for chain_index in 0..self.chains.len() {
            let slot = self.chains[chain_index];
            if affected.contains(slot.generator.index()) {
                self.evaluate_chain(slot, context, values);
            }
        }
    }

    /// Evaluate a chain back to front: feeders are stored after the members they link into.
    fn evaluate_chain(
        &mut self,
        slot: ChainSlot,
        context: &VoiceContext,
        values: &mut GeneratorValues,
    ) {
        let end = slot.start + slot.len;
        assume!(unsafe: end <= self.nodes.len(), "Chain slots are within the node list");
        self.accumulators[slot.start..end].fill(0.0);
        for index in (slot.start + 1..end).rev() {
            let value = self.nodes[index].value(context, self.accumulators[index]);
            let target = self.targets[index];
            assume!(unsafe: target < index, "Links point to earlier chain members");
            self.accumulators[target] += value;
        }
        let value = self.nodes[slot.start].value(context, self.accumulators[slot.start]);
        values.add_modulation(slot.generator, value);
    }
}

// -------------------------------------------------------------------------------------------------
