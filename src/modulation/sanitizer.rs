use crate::{
    modulation::{
        diagnostics::{Diagnostics, ModulatorViolation},
        MAX_ZONE_MODULATORS,
    },
    modulator::{
        chain::{ModulatorChain, MAX_CHAIN_LENGTH},
        Modulator, ModulatorDestination,
    },
};

// -------------------------------------------------------------------------------------------------

/// A zone's modulator list after sanitizing.
///
/// Keeps the original list together with a validity flag per entry, and the valid modulators
/// grouped into [`ModulatorChain`]s in emission order: one chain per valid terminal modulator,
/// in the order the terminals appear in the original list.
#[derive(Debug, Clone, Default)]
pub struct SanitizedModulators {
    entries: Vec<Modulator>,
    valid: Vec<bool>,
    chains: Vec<ModulatorChain>,
    diagnostics: Diagnostics,
}

impl SanitizedModulators {
    /// The original, unmodified modulator list.
    pub fn entries(&self) -> &[Modulator] {
        &self.entries
    }

    /// Returns true if the modulator at the given position in the original list survived.
    pub fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }

    /// Number of surviving modulators, including all chain members.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|valid| **valid).count()
    }

    /// Number of modulators which are members of complex chains.
    pub fn linked_count(&self) -> usize {
        self.chains
            .iter()
            .filter(|chain| chain.is_complex())
            .map(ModulatorChain::len)
            .sum()
    }

    /// All valid chains, simple and complex, in emission order.
    pub fn chains(&self) -> &[ModulatorChain] {
        &self.chains
    }

    /// Diagnostics for all dropped modulators.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Flatten the valid chains into a plain modulator list with absolute link destinations.
    /// Sanitizing the flattened list again results in the same chains.
    pub fn flattened(&self) -> Vec<Modulator> {
        let mut modulators = Vec::with_capacity(self.valid_count());
        for chain in &self.chains {
            let offset = modulators.len();
            for node in chain.nodes() {
                let mut node = node.clone();
                if let ModulatorDestination::Link(target) = node.destination() {
                    node.set_destination(ModulatorDestination::Link(offset + target));
                }
                modulators.push(node);
            }
        }
        modulators
    }
}

// -------------------------------------------------------------------------------------------------

/// Validate a zone's raw modulator list and group it into chains.
///
/// Never fails: modulators with invalid sources or destinations, circular or dangling link
/// paths, isolated link sources, duplicates and modulators exceeding the zone capacity are
/// dropped and reported in the returned diagnostics. The worst case is an empty result.
///
/// Runs at load time only: allocates freely.
pub fn sanitize(zone: &str, modulators: &[Modulator]) -> SanitizedModulators {
    let count = modulators.len();
    let mut diagnostics = Diagnostics::new(zone);
    let mut valid = vec![true; count];

    check_entries(modulators, &mut valid, &mut diagnostics);
    check_link_paths(modulators, &mut valid, &mut diagnostics);
    check_isolated_links(modulators, &mut valid, &mut diagnostics);

    let candidates = collect_chains(modulators, &mut valid, &mut diagnostics);
    let chains = select_chains(candidates, &mut valid, &mut diagnostics);

    diagnostics.summarize(count);
    SanitizedModulators {
        entries: modulators.to_vec(),
        valid,
        chains,
        diagnostics,
    }
}

fn invalidate(
    valid: &mut [bool],
    diagnostics: &mut Diagnostics,
    index: usize,
    violation: ModulatorViolation,
) {
    if valid[index] {
        valid[index] = false;
        diagnostics.report(index, violation);
    }
}

/// Per entry checks: sources, generator ids and link ranges.
fn check_entries(modulators: &[Modulator], valid: &mut [bool], diagnostics: &mut Diagnostics) {
    for (index, modulator) in modulators.iter().enumerate() {
        let violation = match modulator.check_sources() {
            Err(violation) => Some(ModulatorViolation::InvalidSource(violation)),
            Ok(()) => match modulator.destination() {
                ModulatorDestination::Undefined(id) => {
                    Some(ModulatorViolation::InvalidDestination(id))
                }
                ModulatorDestination::Link(target) if target >= modulators.len() => {
                    Some(ModulatorViolation::LinkOutOfRange(target))
                }
                _ => None,
            },
        };
        if let Some(violation) = violation {
            invalidate(valid, diagnostics, index, violation);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathState {
    Unknown,
    Visiting,
    Reaches,
    Dead,
}

/// Follow each modulator's link path until it reaches a valid terminal. Each modulator has a
/// single destination, so paths can only merge or run into a cycle.
fn check_link_paths(modulators: &[Modulator], valid: &mut [bool], diagnostics: &mut Diagnostics) {
    let mut states = vec![PathState::Unknown; modulators.len()];
    let mut path = Vec::new();

    for start in 0..modulators.len() {
        if states[start] != PathState::Unknown {
            continue;
        }
        path.clear();
        let mut current = start;
        let reaches = loop {
            match states[current] {
                PathState::Reaches => break true,
                PathState::Dead => break false,
                PathState::Visiting => {
                    let cycle_start = path.iter().position(|&index| index == current);
                    for &index in &path[cycle_start.unwrap_or(0)..] {
                        invalidate(valid, diagnostics, index, ModulatorViolation::Cycle);
                        states[index] = PathState::Dead;
                    }
                    break false;
                }
                PathState::Unknown => {}
            }
            if !valid[current] {
                states[current] = PathState::Dead;
                break false;
            }
            match modulators[current].destination() {
                ModulatorDestination::Link(target) => {
                    if !modulators[target].has_link_source() {
                        invalidate(
                            valid,
                            diagnostics,
                            current,
                            ModulatorViolation::LinkTargetWithoutLinkSource(target),
                        );
                        states[current] = PathState::Dead;
                        break false;
                    }
                    states[current] = PathState::Visiting;
                    path.push(current);
                    current = target;
                }
                _ => {
                    states[current] = PathState::Reaches;
                    break true;
                }
            }
        };
        for &index in &path {
            if states[index] == PathState::Visiting {
                if reaches {
                    states[index] = PathState::Reaches;
                } else {
                    states[index] = PathState::Dead;
                    invalidate(valid, diagnostics, index, ModulatorViolation::Orphan);
                }
            }
        }
    }
}

/// Drop modulators with a link source which no valid modulator links into. Dropping one may
/// isolate its own destination in turn, so dropped entries release their target.
fn check_isolated_links(
    modulators: &[Modulator],
    valid: &mut [bool],
    diagnostics: &mut Diagnostics,
) {
    let mut feeder_counts = vec![0usize; modulators.len()];
    for (index, modulator) in modulators.iter().enumerate() {
        if let (true, ModulatorDestination::Link(target)) = (valid[index], modulator.destination())
        {
            feeder_counts[target] += 1;
        }
    }
    let mut isolated = (0..modulators.len())
        .rev()
        .filter(|&index| {
            valid[index] && modulators[index].has_link_source() && feeder_counts[index] == 0
        })
        .collect::<Vec<_>>();
    while let Some(index) = isolated.pop() {
        if !valid[index] {
            continue;
        }
        invalidate(valid, diagnostics, index, ModulatorViolation::IsolatedLink);
        if let ModulatorDestination::Link(target) = modulators[index].destination() {
            feeder_counts[target] -= 1;
            if valid[target] && modulators[target].has_link_source() && feeder_counts[target] == 0
            {
                isolated.push(target);
            }
        }
    }
}

/// A chain built from the list along with the original list positions of its members.
struct ChainCandidate {
    indices: Vec<usize>,
    chain: ModulatorChain,
}

/// Build a chain for each valid terminal. Feeders get collected depth first in list order
/// and their destinations rewritten to chain relative positions. Chains with more than
/// [`MAX_CHAIN_LENGTH`] members are dropped as a whole.
fn collect_chains(
    modulators: &[Modulator],
    valid: &mut [bool],
    diagnostics: &mut Diagnostics,
) -> Vec<ChainCandidate> {
    let mut feeders = vec![Vec::new(); modulators.len()];
    for (index, modulator) in modulators.iter().enumerate() {
        if let (true, ModulatorDestination::Link(target)) = (valid[index], modulator.destination())
        {
            feeders[target].push(index);
        }
    }

    let mut candidates = Vec::new();
    let mut pending = Vec::new();
    for (terminal, modulator) in modulators.iter().enumerate() {
        if !valid[terminal] {
            continue;
        }
        let Some(generator) = modulator.destination().generator() else {
            continue;
        };
        // depth first, feeders in list order: (list index, parent chain position)
        let mut members = Vec::new();
        let mut oversized = false;
        pending.clear();
        pending.push((terminal, None));
        while let Some((index, parent)) = pending.pop() {
            if members.len() == MAX_CHAIN_LENGTH {
                oversized = true;
                break;
            }
            let position = members.len();
            members.push((index, parent));
            pending.extend(feeders[index].iter().rev().map(|&feeder| (feeder, Some(position))));
        }
        if oversized {
            pending.clear();
            pending.push((terminal, None));
            while let Some((index, _)) = pending.pop() {
                invalidate(valid, diagnostics, index, ModulatorViolation::Capacity);
                pending.extend(feeders[index].iter().map(|&feeder| (feeder, None)));
            }
            continue;
        }
        let nodes = members
            .iter()
            .map(|&(index, parent)| {
                let mut node = modulators[index].clone();
                if let Some(parent) = parent {
                    node.set_destination(ModulatorDestination::Link(parent));
                }
                node
            })
            .collect();
        candidates.push(ChainCandidate {
            indices: members.into_iter().map(|(index, _)| index).collect(),
            chain: ModulatorChain::from_nodes_unchecked(generator, nodes),
        });
    }
    candidates
}

/// Drop chains which are superseded by an identical chain later in the list, then apply the
/// zone's capacity limit in emission order.
fn select_chains(
    candidates: Vec<ChainCandidate>,
    valid: &mut [bool],
    diagnostics: &mut Diagnostics,
) -> Vec<ModulatorChain> {
    let mut chains = Vec::with_capacity(candidates.len());
    let mut modulator_count = 0;
    for (position, candidate) in candidates.iter().enumerate() {
        let superseded_by = candidates[position + 1..]
            .iter()
            .find(|later| later.chain.is_identical(&candidate.chain));
        let violation = if let Some(later) = superseded_by {
            Some(ModulatorViolation::Duplicate(later.indices[0]))
        } else if modulator_count + candidate.chain.len() > MAX_ZONE_MODULATORS {
            Some(ModulatorViolation::Capacity)
        } else {
            None
        };
        match violation {
            Some(violation) => {
                for &index in &candidate.indices {
                    invalidate(valid, diagnostics, index, violation);
                }
            }
            None => {
                modulator_count += candidate.chain.len();
                chains.push(candidate.chain.clone());
            }
        }
    }
    chains
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::{Channel, VoiceContext},
        generator::{Generator, GeneratorValues},
        modulation::{table::VoiceModulatorTable, MergeMode},
        modulator::{ModulatorRecord, ModulatorSource, SourceCurve, SourceMapping},
        utils::assert_eq_with_epsilon,
    };

    fn linear() -> SourceMapping {
        SourceMapping::linear()
    }

    fn cc(destination: impl Into<ModulatorDestination>, cc: u8, amount: f64) -> Modulator {
        Modulator::new(destination)
            .with_source1(ModulatorSource::Cc(cc), linear())
            .with_amount(amount)
    }

    fn link(destination: impl Into<ModulatorDestination>, amount: f64) -> Modulator {
        Modulator::new(destination)
            .with_source1(ModulatorSource::Link, linear())
            .with_amount(amount)
    }

    fn to(index: usize) -> ModulatorDestination {
        ModulatorDestination::Link(index)
    }

    fn valid_flags(sanitized: &SanitizedModulators) -> Vec<bool> {
        (0..sanitized.entries().len())
            .map(|index| sanitized.is_valid(index))
            .collect()
    }

    /// Reorder a list so that entry `order[n]` lands at position `n`. Links keep pointing at
    /// the same modulators.
    fn reordered(list: &[Modulator], order: &[usize]) -> Vec<Modulator> {
        let mut positions = vec![0; list.len()];
        for (position, &index) in order.iter().enumerate() {
            positions[index] = position;
        }
        order
            .iter()
            .map(|&index| {
                let mut modulator = list[index].clone();
                if let ModulatorDestination::Link(target) = modulator.destination() {
                    if target < list.len() {
                        modulator.set_destination(ModulatorDestination::Link(positions[target]));
                    }
                }
                modulator
            })
            .collect()
    }

    /// Deterministic pseudo random orderings of `len` entries.
    fn shuffled_orders(len: usize, count: usize) -> Vec<Vec<usize>> {
        let mut orders = vec![(0..len).collect::<Vec<_>>(), (0..len).rev().collect()];
        let mut state = 0x2545_f491_4f6c_dd1du64;
        for _ in 0..count {
            let mut order = (0..len).collect::<Vec<_>>();
            for index in (1..len).rev() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                order.swap(index, (state % (index as u64 + 1)) as usize);
            }
            orders.push(order);
        }
        orders
    }

    /// Every linked member points at an earlier member with a link source, and every link
    /// path ends at the terminal.
    fn assert_acyclic(chain: &ModulatorChain) {
        let nodes = chain.nodes();
        assert!(nodes[0].is_terminal());
        for start in 1..nodes.len() {
            let mut current = start;
            let mut steps = 0;
            while let ModulatorDestination::Link(target) = nodes[current].destination() {
                assert!(target < current);
                assert!(nodes[target].has_link_source());
                current = target;
                steps += 1;
                assert!(steps <= nodes.len());
            }
            assert_eq!(current, 0);
        }
    }

    /// Two identical FilterFc chains with their branches listed in different orders, a simple
    /// modulator, a link cycle with an orphan feeding into it and a link out of range.
    fn mixed_list() -> Vec<Modulator> {
        let velocity = ModulatorSource::Velocity;
        vec![
            link(Generator::FilterFc, 1.0),
            link(to(0), 2.0).with_source2(velocity, linear()),
            cc(to(1), 2, 3.0),
            cc(to(0), 4, 4.0),
            cc(Generator::Attenuation, 5, 5.0),
            link(to(6), 6.0),
            link(to(5), 7.0),
            cc(to(5), 8, 8.0),
            link(Generator::FilterFc, 9.0),
            cc(to(8), 4, 10.0),
            link(to(8), 11.0).with_source2(velocity, linear()),
            cc(to(10), 2, 12.0),
            cc(to(42), 13, 13.0),
        ]
    }

    #[test]
    fn simple_modulators() {
        let list = [
            cc(Generator::VolEnvAttack, 20, 100.0),
            Modulator::new(Generator::FilterFc)
                .with_source1(ModulatorSource::Velocity, linear().negative())
                .with_source2(
                    ModulatorSource::Velocity,
                    linear().with_curve(SourceCurve::Switch),
                )
                .with_amount(11025.0),
            Modulator::new(Generator::Attenuation)
                .with_source1(ModulatorSource::Cc(34), linear().with_curve(SourceCurve::Concave))
                .with_amount(960.0),
        ];
        let sanitized = sanitize("simple", &list);
        assert_eq!(sanitized.linked_count(), 0);
        assert_eq!(sanitized.valid_count(), 3);
        assert_eq!(sanitized.chains().len(), 3);
        assert!(sanitized.diagnostics().is_empty());
        // order and amounts are preserved
        for (chain, modulator) in sanitized.chains().iter().zip(&list) {
            assert!(chain.terminal().is_identical(modulator));
            assert_eq!(chain.terminal().amount(), modulator.amount());
        }
    }

    #[test]
    fn valid_chains_in_any_order() {
        let m0 = link(Generator::FilterFc, 100.0);
        let m1 = Modulator::new(to(0))
            .with_source1(ModulatorSource::Cc(20), linear().with_curve(SourceCurve::Concave))
            .with_amount(200.0);
        let m2 = cc(to(0), 20, 300.0);

        let sanitized = sanitize("linked", &[m0.clone(), m1.clone(), m2.clone()]);
        assert_eq!(sanitized.linked_count(), 3);
        let chain = &sanitized.chains()[0];
        let amounts = chain.nodes().iter().map(|m| m.amount()).collect::<Vec<_>>();
        assert_eq!(amounts, vec![100.0, 200.0, 300.0]);

        let sanitized = sanitize("linked", &[m0, m2, m1]);
        assert_eq!(sanitized.linked_count(), 3);
        let chain = &sanitized.chains()[0];
        let amounts = chain.nodes().iter().map(|m| m.amount()).collect::<Vec<_>>();
        assert_eq!(amounts, vec![100.0, 300.0, 200.0]);
        assert!(chain.nodes()[1..]
            .iter()
            .all(|m| m.destination() == ModulatorDestination::Link(0)));
    }

    #[test]
    fn link_target_without_link_source() {
        let list = [
            link(Generator::FilterFc, 100.0),
            cc(to(0), 20, 200.0),
            cc(to(0), 20, 300.0).with_source1(ModulatorSource::Cc(21), linear()),
            cc(to(1), 20, 50.0),
        ];
        let sanitized = sanitize("no link source", &list);
        assert_eq!(sanitized.linked_count(), 3);
        assert_eq!(valid_flags(&sanitized), vec![true, true, true, false]);
        assert_eq!(
            sanitized.diagnostics().violation(3),
            Some(ModulatorViolation::LinkTargetWithoutLinkSource(1))
        );
    }

    #[test]
    fn nested_chain() {
        let list = [
            link(Generator::FilterFc, 100.0),
            link(to(0), 200.0),
            cc(to(0), 20, 300.0),
            cc(to(1), 20, 50.0),
        ];
        let sanitized = sanitize("nested", &list);
        assert_eq!(sanitized.linked_count(), 4);
        let chain = &sanitized.chains()[0];
        // depth first: m0, m1, m3, m2
        let amounts = chain.nodes().iter().map(|m| m.amount()).collect::<Vec<_>>();
        assert_eq!(amounts, vec![100.0, 200.0, 50.0, 300.0]);
        let destinations = chain.nodes()[1..]
            .iter()
            .map(|m| m.destination())
            .collect::<Vec<_>>();
        assert_eq!(destinations, vec![to(0), to(1), to(0)]);
    }

    #[test]
    fn dangling_and_circular_paths() {
        // m1 links into m3, which has no link source. m3 links into the dropped m1.
        let list = [
            link(Generator::FilterFc, 100.0),
            link(to(3), 200.0),
            cc(to(0), 20, 300.0),
            cc(to(1), 20, 50.0),
        ];
        let sanitized = sanitize("dangling", &list);
        assert_eq!(sanitized.linked_count(), 2);
        assert_eq!(valid_flags(&sanitized), vec![true, false, true, false]);
        assert_eq!(
            sanitized.diagnostics().violation(3),
            Some(ModulatorViolation::Orphan)
        );

        // m1 links into itself
        let list = [
            link(Generator::FilterFc, 100.0),
            link(to(1), 200.0),
            cc(to(0), 20, 300.0),
            cc(to(1), 20, 50.0),
        ];
        let sanitized = sanitize("self link", &list);
        assert_eq!(sanitized.linked_count(), 2);
        assert_eq!(valid_flags(&sanitized), vec![true, false, true, false]);
        assert_eq!(
            sanitized.diagnostics().violation(1),
            Some(ModulatorViolation::Cycle)
        );

        // m0 <-> m1, no terminal at all
        let list = [
            link(to(1), 100.0),
            link(to(0), 200.0),
            cc(to(0), 20, 300.0),
            cc(to(1), 20, 50.0),
        ];
        let sanitized = sanitize("cycle", &list);
        assert_eq!(sanitized.linked_count(), 0);
        assert_eq!(sanitized.valid_count(), 0);
        assert!(sanitized.chains().is_empty());
    }

    #[test]
    fn link_only_cycles() {
        let sanitized = sanitize(
            "ring",
            &[
                link(to(3), 100.0),
                link(to(0), 200.0),
                link(to(1), 300.0),
                link(to(2), 50.0),
            ],
        );
        assert_eq!(sanitized.valid_count(), 0);

        let sanitized = sanitize(
            "ring with tail",
            &[
                link(to(3), 100.0),
                link(to(0), 200.0),
                link(to(1), 300.0),
                link(to(1), 50.0),
            ],
        );
        assert_eq!(sanitized.valid_count(), 0);

        // the cycle m1 -> m0 -> m3 -> m1 does not affect the simple modulator m2
        let sanitized = sanitize(
            "ring and simple",
            &[
                link(to(3), 100.0),
                link(to(0), 200.0),
                cc(Generator::ModEnvHold, 20, 300.0)
                    .with_source2(ModulatorSource::Cc(21), linear()),
                link(to(1), 50.0),
            ],
        );
        assert_eq!(sanitized.linked_count(), 0);
        assert_eq!(valid_flags(&sanitized), vec![false, false, true, false]);

        // the cycle m1 <-> m3 does not affect the chain m2 -> m0
        let sanitized = sanitize(
            "ring and chain",
            &[
                link(Generator::ExclusiveClass, 100.0).with_source2(
                    ModulatorSource::Cc(20),
                    linear().with_curve(SourceCurve::Concave).bipolar(),
                ),
                link(to(3), 200.0),
                cc(to(0), 20, 300.0).with_source2(ModulatorSource::Cc(21), linear()),
                link(to(1), 50.0),
            ],
        );
        assert_eq!(sanitized.linked_count(), 2);
        assert_eq!(valid_flags(&sanitized), vec![true, false, true, false]);
    }

    #[test]
    fn isolated_links() {
        // m1 links into itself and has no link source, m0 loses all feeders
        let list = [
            cc(to(0), 20, 200.0),
            link(Generator::FilterFc, 100.0),
            cc(to(0), 20, 300.0).with_source1(ModulatorSource::Cc(20), linear().bipolar()),
        ];
        let sanitized = sanitize("isolated", &list);
        assert_eq!(sanitized.linked_count(), 0);
        assert_eq!(sanitized.valid_count(), 0);
        assert_eq!(
            sanitized.diagnostics().violation(1),
            Some(ModulatorViolation::IsolatedLink)
        );

        // m3 is isolated, which isolates m1 in turn
        let list = [
            link(Generator::FilterFc, 100.0),
            link(to(0), 200.0),
            cc(to(0), 20, 300.0),
            link(to(1), 50.0),
        ];
        let sanitized = sanitize("isolated path", &list);
        assert_eq!(sanitized.linked_count(), 2);
        assert_eq!(valid_flags(&sanitized), vec![true, false, true, false]);
    }

    #[test]
    fn link_out_of_range() {
        let list = [
            link(Generator::FilterFc, 100.0),
            cc(to(42), 20, 200.0),
            cc(to(0), 20, 300.0).with_source1(ModulatorSource::Cc(20), linear().bipolar()),
        ];
        let sanitized = sanitize("out of range", &list);
        assert_eq!(sanitized.linked_count(), 2);
        assert_eq!(valid_flags(&sanitized), vec![true, false, true]);
        assert_eq!(
            sanitized.diagnostics().violation(1),
            Some(ModulatorViolation::LinkOutOfRange(42))
        );
    }

    #[test]
    fn resanitizing_is_stable() {
        let velocity = ModulatorSource::Velocity;
        let list = [
            link(Generator::VolEnvHold, 1.0),
            link(to(0), 2.0).with_source2(velocity, linear()),
            cc(to(1), 2, 3.0),
            link(to(0), 4.0),
            cc(to(3), 2, 5.0),
        ];
        let first = sanitize("stable", &list);
        assert_eq!(first.linked_count(), 5);
        let chain = &first.chains()[0];
        let amounts = chain.nodes().iter().map(|m| m.amount()).collect::<Vec<_>>();
        assert_eq!(amounts, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let second = sanitize("stable", &first.flattened());
        assert_eq!(second.linked_count(), 5);
        assert_eq!(first.chains().len(), second.chains().len());
        for (a, b) in first.chains().iter().zip(second.chains()) {
            assert!(a.is_identical(b));
            for (x, y) in a.nodes().iter().zip(b.nodes()) {
                assert!(x.is_identical(y));
                assert_eq!(x.amount(), y.amount());
            }
        }
    }

    #[test]
    fn invalid_sources_and_destinations() {
        let list = [
            // undefined general controller
            Modulator::new(Generator::Attenuation)
                .with_source1(ModulatorSource::from_general_index(1), linear())
                .with_amount(10.0),
            // forbidden CC
            cc(Generator::Attenuation, 0, 10.0),
            // bipolar none source2
            Modulator::new(Generator::Attenuation)
                .with_source1(ModulatorSource::Velocity, linear())
                .with_source2(ModulatorSource::None, linear().bipolar())
                .with_amount(10.0),
            // no source1 is valid
            Modulator::new(Generator::Attenuation).with_amount(10.0),
            // amount 0 is valid
            Modulator::new(Generator::Pan)
                .with_source1(ModulatorSource::Key, linear())
                .with_amount(0.0),
            Modulator::from_record(&ModulatorRecord {
                source: 2,
                destination: 100,
                amount: 10,
                ..Default::default()
            }),
            // unused generator
            Modulator::from_record(&ModulatorRecord {
                source: 2,
                destination: Generator::Unused1.id(),
                amount: 10,
                ..Default::default()
            }),
            // synth internal generator
            Modulator::from_record(&ModulatorRecord {
                source: 2,
                destination: Generator::Pitch.id(),
                amount: 10,
                ..Default::default()
            }),
        ];
        let sanitized = sanitize("sources", &list);
        assert_eq!(
            valid_flags(&sanitized),
            vec![false, false, false, true, true, false, false, false]
        );
        assert!(matches!(
            sanitized.diagnostics().violation(0),
            Some(ModulatorViolation::InvalidSource(_))
        ));
        assert_eq!(
            sanitized.diagnostics().violation(5),
            Some(ModulatorViolation::InvalidDestination(100))
        );
        assert_eq!(
            sanitized.diagnostics().violation(6),
            Some(ModulatorViolation::InvalidDestination(14))
        );
        assert_eq!(
            sanitized.diagnostics().violation(7),
            Some(ModulatorViolation::InvalidDestination(59))
        );
        assert_eq!(sanitized.diagnostics().len(), 6);
        assert_eq!(sanitized.diagnostics().zone(), "sources");
    }

    #[test]
    fn duplicates_keep_the_last() {
        let list = [
            cc(Generator::Attenuation, 20, 10.0),
            cc(Generator::Attenuation, 21, 20.0),
            cc(Generator::Attenuation, 20, 30.0),
            // identical chains with feeders in different order
            link(Generator::FilterFc, 1.0),
            cc(to(3), 22, 2.0),
            cc(to(3), 23, 3.0),
            link(Generator::FilterFc, 4.0),
            cc(to(6), 23, 5.0),
            cc(to(6), 22, 6.0),
        ];
        let sanitized = sanitize("duplicates", &list);
        assert_eq!(
            valid_flags(&sanitized),
            vec![false, true, true, false, false, false, true, true, true]
        );
        assert_eq!(
            sanitized.diagnostics().violation(0),
            Some(ModulatorViolation::Duplicate(2))
        );
        assert_eq!(
            sanitized.diagnostics().violation(4),
            Some(ModulatorViolation::Duplicate(6))
        );
        assert_eq!(sanitized.chains().len(), 3);
        assert_eq!(sanitized.chains()[0].terminal().amount(), 20.0);
        assert_eq!(sanitized.chains()[1].terminal().amount(), 30.0);
        assert_eq!(sanitized.chains()[2].terminal().amount(), 4.0);
        assert_eq!(sanitized.linked_count(), 3);
    }

    #[test]
    fn velocity_to_attenuation() {
        let list = [Modulator::new(Generator::Attenuation)
            .with_source1(ModulatorSource::Velocity, linear())
            .with_amount(10.0)];
        let sanitized = sanitize("velocity", &list);
        assert_eq!(sanitized.valid_count(), 1);
        assert!(sanitized.diagnostics().is_empty());

        let mut table = VoiceModulatorTable::new();
        for chain in sanitized.chains() {
            table.add(chain, MergeMode::Default);
        }
        let channel = Channel::new();
        let mut values = GeneratorValues::new();
        table.recompute(&VoiceContext::new(&channel, 60, 100), &mut values);
        assert_eq_with_epsilon!(
            values.modulation(Generator::Attenuation),
            10.0 * 100.0 / 127.0,
            1e-9
        );
    }

    #[test]
    fn cycle_with_orphaned_feeder() {
        // m0 <-> m2 form a cycle, m3 feeds into the cycle, m1 is unrelated
        let list = [
            link(to(2), 100.0),
            cc(Generator::Attenuation, 20, 200.0),
            link(to(0), 300.0),
            cc(to(0), 21, 50.0),
        ];
        let sanitized = sanitize("cycle and orphan", &list);
        assert_eq!(valid_flags(&sanitized), vec![false, true, false, false]);
        assert_eq!(sanitized.valid_count(), 1);
        assert_eq!(sanitized.linked_count(), 0);
        assert_eq!(sanitized.chains().len(), 1);
        assert_eq!(sanitized.chains()[0].terminal().amount(), 200.0);
        for (index, violation) in [
            (0, ModulatorViolation::Cycle),
            (2, ModulatorViolation::Cycle),
            (3, ModulatorViolation::Orphan),
        ] {
            assert_eq!(sanitized.diagnostics().violation(index), Some(violation));
        }
    }

    #[test]
    fn chains_are_acyclic_in_any_order() {
        let list = mixed_list();
        for order in shuffled_orders(list.len(), 50) {
            let sanitized = sanitize("acyclic", &reordered(&list, &order));
            assert_eq!(sanitized.valid_count(), 5);
            for chain in sanitized.chains() {
                assert_acyclic(chain);
            }
            for chain in sanitize("acyclic", &sanitized.flattened()).chains() {
                assert_acyclic(chain);
            }
        }
    }

    #[test]
    fn sanitizing_does_not_depend_on_order() {
        let list = mixed_list();
        let expected = sanitize("ordered", &list);
        assert_eq!(expected.chains().len(), 2);
        assert_eq!(expected.diagnostics().len(), 8);

        for order in shuffled_orders(list.len(), 50) {
            let sanitized = sanitize("shuffled", &reordered(&list, &order));
            assert_eq!(sanitized.valid_count(), expected.valid_count());
            assert_eq!(sanitized.linked_count(), expected.linked_count());
            assert_eq!(sanitized.diagnostics().len(), expected.diagnostics().len());
            assert_eq!(sanitized.chains().len(), expected.chains().len());
            for chain in expected.chains() {
                assert_eq!(
                    sanitized
                        .chains()
                        .iter()
                        .filter(|other| other.is_identical(chain))
                        .count(),
                    1
                );
            }

            // of the two identical chains, the one whose terminal comes last survives
            let first = order.iter().position(|&index| index == 0).unwrap();
            let second = order.iter().position(|&index| index == 8).unwrap();
            let (winner, loser, amount) = if first > second {
                (first, second, 1.0)
            } else {
                (second, first, 9.0)
            };
            let filter_chain = sanitized
                .chains()
                .iter()
                .find(|chain| chain.generator() == Generator::FilterFc)
                .unwrap();
            assert_eq!(filter_chain.terminal().amount(), amount);
            assert_eq!(
                sanitized.diagnostics().violation(loser),
                Some(ModulatorViolation::Duplicate(winner))
            );
        }
    }

    #[test]
    fn oversized_chains() {
        // a single path of 10000 links into a terminal
        let count = 10_000;
        let mut list = vec![link(Generator::FilterFc, 1.0)];
        list.extend((1..count).map(|index| link(to(index - 1), 1.0)));
        list.push(cc(to(count - 1), 20, 1.0));
        list.push(cc(Generator::Pan, 21, 1.0));

        let start = std::time::Instant::now();
        let sanitized = sanitize("oversized", &list);
        assert!(start.elapsed() < std::time::Duration::from_secs(5));

        assert_eq!(sanitized.valid_count(), 1);
        assert!(sanitized.is_valid(count + 1));
        assert_eq!(sanitized.chains().len(), 1);
        assert_eq!(sanitized.linked_count(), 0);
        assert_eq!(sanitized.diagnostics().len(), count + 1);
        assert!(sanitized
            .diagnostics()
            .iter()
            .all(|entry| entry.violation == ModulatorViolation::Capacity));

        // the same path, but with an isolated link at its end
        list.truncate(count);
        let sanitized = sanitize("isolated path", &list);
        assert_eq!(sanitized.valid_count(), 0);
        assert_eq!(sanitized.diagnostics().len(), count);
        assert_eq!(
            sanitized.diagnostics().violation(count - 1),
            Some(ModulatorViolation::IsolatedLink)
        );

        // a chain of exactly the maximum length survives
        let mut list = vec![link(Generator::FilterFc, 1.0)];
        list.extend((1..MAX_CHAIN_LENGTH - 1).map(|index| link(to(index - 1), 1.0)));
        list.push(cc(to(MAX_CHAIN_LENGTH - 2), 20, 1.0));
        let sanitized = sanitize("maximum", &list);
        assert_eq!(sanitized.valid_count(), MAX_CHAIN_LENGTH);
        assert_eq!(sanitized.chains()[0].len(), MAX_CHAIN_LENGTH);
        assert_acyclic(&sanitized.chains()[0]);
    }

    #[test]
    fn zone_capacity() {
        let list = (0..MAX_ZONE_MODULATORS + 6)
            .map(|index| {
                Modulator::new(Generator::Attenuation)
                    .with_source1(ModulatorSource::Cc(1 + (index % 5) as u8), linear())
                    .with_source2(ModulatorSource::Cc(40 + (index / 5) as u8), linear())
                    .with_amount(index as f64)
            })
            .collect::<Vec<_>>();
        let sanitized = sanitize("capacity", &list);
        assert_eq!(sanitized.valid_count(), MAX_ZONE_MODULATORS);
        assert!(!sanitized.is_valid(MAX_ZONE_MODULATORS));
        assert_eq!(
            sanitized.diagnostics().violation(MAX_ZONE_MODULATORS + 5),
            Some(ModulatorViolation::Capacity)
        );
    }
}
