use std::fmt;

use crate::{
    error::Error,
    generator::Generator,
    modulator::{Modulator, ModulatorDestination, ModulatorSource, SourceViolation},
};

// -------------------------------------------------------------------------------------------------

/// Maximum number of modulators in a single chain.
pub const MAX_CHAIN_LENGTH: usize = 64;

// -------------------------------------------------------------------------------------------------

/// A terminal modulator together with all modulators which (transitively) link into it.
///
/// The terminal modulator is stored first. Every other member's destination is a
/// [`ModulatorDestination::Link`] to a member at a lower position in the chain, and every
/// linked member has a link source1. Simple chains consist of a single terminal modulator.
#[derive(Debug, Clone)]
pub struct ModulatorChain {
    generator: Generator,
    nodes: Vec<Modulator>,
}

impl ModulatorChain {
    /// Create a chain from a single terminal modulator.
    pub fn simple(modulator: Modulator) -> Result<Self, Error> {
        Self::new(vec![modulator])
    }

    /// Create a chain from a terminal modulator followed by its feeders, with link
    /// destinations relative to the chain's first member.
    pub fn new(nodes: Vec<Modulator>) -> Result<Self, Error> {
        if nodes.is_empty() {
            return Err(Error::InvalidModulator("empty modulator chain".to_string()));
        }
        if nodes.len() > MAX_CHAIN_LENGTH {
            return Err(Error::InvalidModulator(format!(
                "modulator chain exceeds {MAX_CHAIN_LENGTH} members"
            )));
        }
        let Some(generator) = nodes[0].destination().generator() else {
            return Err(Error::InvalidModulator(format!(
                "first chain member must target a generator, not '{}'",
                nodes[0].destination()
            )));
        };
        for (index, node) in nodes.iter().enumerate().skip(1) {
            match node.destination() {
                ModulatorDestination::Link(target) if target < index => {
                    if !nodes[target].has_link_source() {
                        return Err(Error::InvalidModulator(format!(
                            "chain member {index} links into member {target} without link source"
                        )));
                    }
                }
                destination => {
                    return Err(Error::InvalidModulator(format!(
                        "chain member {index} has invalid destination '{destination}'"
                    )));
                }
            }
        }
        let masks = child_masks(&nodes);
        for (index, node) in nodes.iter().enumerate() {
            if node.has_link_source() && masks[index] == 0 {
                return Err(Error::InvalidModulator(format!(
                    "chain member {index} has a link source but no linked modulators"
                )));
            }
        }
        Ok(Self { generator, nodes })
    }

    /// Create a chain from nodes which are known to be well formed. `generator` is the
    /// terminal's destination.
    pub(crate) fn from_nodes_unchecked(generator: Generator, nodes: Vec<Modulator>) -> Self {
        debug_assert!(!nodes.is_empty() && nodes.len() <= MAX_CHAIN_LENGTH);
        debug_assert!(nodes[0].destination() == ModulatorDestination::Generator(generator));
        Self { generator, nodes }
    }

    /// Number of modulators in the chain.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Chains are never empty. Provided for completeness only.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true when the chain contains linked modulators.
    #[inline]
    pub fn is_complex(&self) -> bool {
        self.nodes.len() > 1
    }

    /// The chain's terminal modulator.
    #[inline]
    pub fn terminal(&self) -> &Modulator {
        &self.nodes[0]
    }

    /// The generator the chain's output is summed into.
    #[inline]
    pub fn generator(&self) -> Generator {
        self.generator
    }

    /// All members, terminal first.
    #[inline]
    pub fn nodes(&self) -> &[Modulator] {
        &self.nodes
    }

    #[cfg(test)]
    pub(crate) fn nodes_mut(&mut self) -> &mut [Modulator] {
        &mut self.nodes
    }

    /// Returns true if any member reads the given controller.
    pub fn has_source(&self, source: ModulatorSource) -> bool {
        self.nodes.iter().any(|node| node.has_source(source))
    }

    /// Validate the sources of all members. Returns the position of the first rejected member.
    pub fn check_sources(&self) -> Result<(), (usize, SourceViolation)> {
        for (index, node) in self.nodes.iter().enumerate() {
            node.check_sources().map_err(|violation| (index, violation))?;
        }
        Ok(())
    }

    /// Two chains are identical when they have the same number of members, identical
    /// terminals, and each member's feeders can be paired up 1:1 with identical sources,
    /// regardless of their order. Amounts are not part of the identity.
    pub fn is_identical(&self, other: &ModulatorChain) -> bool {
        let mut mapping = [0; MAX_CHAIN_LENGTH];
        match_chain_nodes(&self.nodes, &other.nodes, &mut mapping)
    }
}

impl fmt::Display for ModulatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terminal = self.terminal();
        write!(
            f,
            "{} -> {} ({} members)",
            terminal.source1(),
            terminal.destination(),
            self.len()
        )
    }
}

impl TryFrom<Modulator> for ModulatorChain {
    type Error = Error;

    fn try_from(modulator: Modulator) -> Result<Self, Self::Error> {
        Self::simple(modulator)
    }
}

// -------------------------------------------------------------------------------------------------

/// Bit masks of the direct feeders of each member: bit `c` is set in `masks[p]` when member `c`
/// links into member `p`.
fn child_masks(nodes: &[Modulator]) -> [u64; MAX_CHAIN_LENGTH] {
    let mut masks = [0u64; MAX_CHAIN_LENGTH];
    for (index, node) in nodes.iter().enumerate().take(MAX_CHAIN_LENGTH).skip(1) {
        if let ModulatorDestination::Link(parent) = node.destination() {
            if parent < index {
                masks[parent] |= 1u64 << index;
            }
        }
    }
    masks
}

/// Pair up the feeders in `a_children` with the feeders in `b_children`, using `identical`
/// as the table of matching subtrees. Subtree identity is an equivalence, so taking the first
/// free candidate never blocks a later pairing.
fn pair_children(
    mut a_children: u64,
    b_children: u64,
    identical: &[u64; MAX_CHAIN_LENGTH],
    mut on_pair: impl FnMut(usize, usize),
) -> bool {
    let mut free = b_children;
    while a_children != 0 {
        let a_child = a_children.trailing_zeros() as usize;
        a_children &= a_children - 1;
        let candidates = free & identical[a_child];
        if candidates == 0 {
            return false;
        }
        let b_child = candidates.trailing_zeros() as usize;
        free &= !(1u64 << b_child);
        on_pair(a_child, b_child);
    }
    true
}

/// Match two chains given as member slices with chain relative link destinations. On success,
/// `mapping[i]` holds the position in `b` that member `i` of `a` was paired with.
///
/// Does not allocate, so it can be used on the audio thread.
pub(crate) fn match_chain_nodes(a: &[Modulator], b: &[Modulator], mapping: &mut [usize]) -> bool {
    let len = a.len();
    if len != b.len() || len == 0 || len > MAX_CHAIN_LENGTH || mapping.len() < len {
        return false;
    }
    if !a[0].is_identical(&b[0]) {
        return false;
    }
    mapping[0] = 0;
    if len == 1 {
        return true;
    }
    let a_children = child_masks(a);
    let b_children = child_masks(b);

    // identical[i] has bit j set when the subtree at a[i] matches the subtree at b[j].
    // Feeders always sit behind their targets, so filling it back to front sees all
    // feeder pairs before their parents.
    let mut identical = [0u64; MAX_CHAIN_LENGTH];
    for a_node in (0..len).rev() {
        let b_range = if a_node == 0 { 0..1 } else { 1..len };
        for b_node in b_range.rev() {
            if a_children[a_node].count_ones() != b_children[b_node].count_ones() {
                continue;
            }
            if a_node != 0 && !a[a_node].has_identical_sources(&b[b_node]) {
                continue;
            }
            if pair_children(
                a_children[a_node],
                b_children[b_node],
                &identical,
                |_, _| {},
            ) {
                identical[a_node] |= 1u64 << b_node;
            }
        }
    }
    if identical[0] & 1 == 0 {
        return false;
    }

    // parents are paired before their feeders, so walking front to back resolves the mapping
    for a_node in 0..len {
        let b_node = mapping[a_node];
        let paired = pair_children(
            a_children[a_node],
            b_children[b_node],
            &identical,
            |a_child, b_child| mapping[a_child] = b_child,
        );
        if !paired {
            return false;
        }
    }
    true
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::{SourceCurve, SourceMapping};

    fn cc(number: u8) -> ModulatorSource {
        ModulatorSource::Cc(number)
    }

    fn link_source() -> (ModulatorSource, SourceMapping) {
        (ModulatorSource::Link, SourceMapping::linear())
    }

    fn terminal(source2: ModulatorSource) -> Modulator {
        let (link, mapping) = link_source();
        Modulator::new(Generator::FilterFc)
            .with_source1(link, mapping)
            .with_source2(source2, SourceMapping::linear())
            .with_amount(100.0)
    }

    fn feeder(target: usize, source1: ModulatorSource) -> Modulator {
        Modulator::linked_to(target)
            .with_source1(source1, SourceMapping::linear().with_curve(SourceCurve::Concave))
            .with_amount(10.0)
    }

    fn linked_feeder(target: usize, source2: ModulatorSource) -> Modulator {
        let (link, mapping) = link_source();
        Modulator::linked_to(target)
            .with_source1(link, mapping)
            .with_source2(source2, SourceMapping::linear())
            .with_amount(10.0)
    }

    #[test]
    fn chain_validation() {
        assert!(ModulatorChain::new(vec![]).is_err());
        assert!(ModulatorChain::simple(feeder(0, cc(2))).is_err());
        // link source without feeders
        assert!(ModulatorChain::simple(terminal(cc(5))).is_err());
        // feeder into a member without link source
        let plain = Modulator::new(Generator::Pan)
            .with_source1(cc(3), SourceMapping::linear())
            .with_amount(1.0);
        assert!(ModulatorChain::new(vec![plain.clone(), feeder(0, cc(4))]).is_err());
        // forward link
        assert!(
            ModulatorChain::new(vec![terminal(cc(5)), feeder(2, cc(4)), feeder(0, cc(2))])
                .is_err()
        );
        assert!(ModulatorChain::simple(plain).is_ok());
        let chain = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(4))]).unwrap();
        assert!(chain.is_complex());
        assert_eq!(chain.generator(), Generator::FilterFc);
        assert!(chain.has_source(cc(4)));
        assert!(chain.has_source(cc(5)));
        assert!(!chain.has_source(cc(6)));
    }

    #[test]
    fn identical_chains() {
        // same members in the same order, different amounts
        let a = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(4)), feeder(0, cc(2))])
            .unwrap();
        let mut b = a.clone();
        b.nodes_mut()[1].set_amount(-42.0);
        assert!(a.is_identical(&b));

        // feeders in a different order
        let b = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(2)), feeder(0, cc(4))])
            .unwrap();
        assert!(a.is_identical(&b));

        // one differing feeder
        let b = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(4)), feeder(0, cc(3))])
            .unwrap();
        assert!(!a.is_identical(&b));

        // differing terminal
        let b = ModulatorChain::new(vec![terminal(cc(7)), feeder(0, cc(4)), feeder(0, cc(2))])
            .unwrap();
        assert!(!a.is_identical(&b));
    }

    #[test]
    fn identical_chains_need_identical_structure() {
        // terminal <- link feeder <- CC2   vs.   terminal <- (none feeder, CC2)
        let a =
            ModulatorChain::new(vec![terminal(cc(5)), linked_feeder(0, cc(3)), feeder(1, cc(2))])
                .unwrap();
        let b = ModulatorChain::new(vec![
            terminal(cc(5)),
            Modulator::linked_to(0)
                .with_source2(cc(3), SourceMapping::linear())
                .with_amount(10.0),
            feeder(0, cc(2)),
        ])
        .unwrap();
        assert!(!a.is_identical(&b));
        assert!(!b.is_identical(&a));

        // chains of different length
        let c = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(2))]).unwrap();
        assert!(!a.is_identical(&c));
    }

    #[test]
    fn identical_chains_with_nested_branches() {
        // terminal <- (link <- CC4 with velocity, CC2), branches listed in different orders
        let velocity = ModulatorSource::Velocity;
        let nested = |target| {
            Modulator::linked_to(target)
                .with_source1(cc(4), SourceMapping::linear())
                .with_source2(velocity, SourceMapping::linear())
                .with_amount(3.0)
        };
        let a = ModulatorChain::new(vec![
            terminal(cc(5)),
            linked_feeder(0, velocity),
            nested(1),
            feeder(0, cc(2)),
        ])
        .unwrap();
        let b = ModulatorChain::new(vec![
            terminal(cc(5)),
            feeder(0, cc(2)),
            linked_feeder(0, velocity),
            nested(2),
        ])
        .unwrap();
        assert!(a.is_identical(&b));

        // velocity on different branches
        let c = ModulatorChain::new(vec![
            terminal(cc(5)),
            linked_feeder(0, cc(9)),
            nested(1),
            feeder(0, cc(2)).with_source2(velocity, SourceMapping::linear()),
        ])
        .unwrap();
        assert!(!a.is_identical(&c));
    }

    #[test]
    fn node_mapping() {
        let a = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(4)), feeder(0, cc(2))])
            .unwrap();
        let b = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(2)), feeder(0, cc(4))])
            .unwrap();
        let mut mapping = [0; MAX_CHAIN_LENGTH];
        assert!(match_chain_nodes(a.nodes(), b.nodes(), &mut mapping));
        assert_eq!(&mapping[..3], &[0, 2, 1]);
    }

    #[test]
    fn identical_chains_with_many_equal_feeders() {
        // 30 interchangeable feeders plus a single distinct one, placed at opposite ends
        let chain = |distinct_position: usize, distinct: ModulatorSource| {
            let mut nodes = vec![terminal(cc(5))];
            for position in 1..=31 {
                if position == distinct_position {
                    nodes.push(feeder(0, distinct));
                } else {
                    nodes.push(feeder(0, cc(2)));
                }
            }
            ModulatorChain::new(nodes).unwrap()
        };
        let a = chain(31, cc(3));
        let b = chain(1, cc(3));
        let c = chain(1, cc(4));

        let start = std::time::Instant::now();
        assert!(a.is_identical(&b));
        assert!(!a.is_identical(&c));
        assert!(!c.is_identical(&a));
        assert!(start.elapsed() < std::time::Duration::from_millis(100));

        let mut mapping = [0; MAX_CHAIN_LENGTH];
        assert!(match_chain_nodes(a.nodes(), b.nodes(), &mut mapping));
        assert_eq!(mapping[31], 1);
        let mut paired = mapping[..32].to_vec();
        paired.sort_unstable();
        assert_eq!(paired, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn identical_chains_with_many_equal_branches() {
        // terminal <- 15 x (link <- CC2), one branch's leaf differs
        let chain = |distinct_branch: usize, distinct: ModulatorSource| {
            let mut nodes = vec![terminal(cc(5))];
            for branch in 0..15 {
                let parent = nodes.len();
                nodes.push(linked_feeder(0, cc(9)));
                let source = if branch == distinct_branch {
                    distinct
                } else {
                    cc(2)
                };
                nodes.push(feeder(parent, source));
            }
            ModulatorChain::new(nodes).unwrap()
        };
        let a = chain(14, cc(3));
        let b = chain(0, cc(3));
        let c = chain(0, cc(4));

        let start = std::time::Instant::now();
        assert!(a.is_identical(&b));
        assert!(!a.is_identical(&c));
        assert!(start.elapsed() < std::time::Duration::from_millis(100));

        // the distinct branch pairs up with its counterpart, leaves follow their parents
        let mut mapping = [0; MAX_CHAIN_LENGTH];
        assert!(match_chain_nodes(a.nodes(), b.nodes(), &mut mapping));
        assert_eq!(mapping[29], 1);
        assert_eq!(mapping[30], 2);
        for a_node in 1..31 {
            if let ModulatorDestination::Link(a_parent) = a.nodes()[a_node].destination() {
                assert_eq!(
                    b.nodes()[mapping[a_node]].destination(),
                    ModulatorDestination::Link(mapping[a_parent])
                );
            }
        }
    }

    #[test]
    fn chain_generator() {
        let chain = ModulatorChain::new(vec![terminal(cc(5)), feeder(0, cc(4))]).unwrap();
        assert_eq!(chain.generator(), Generator::FilterFc);
        let chain = ModulatorChain::simple(
            Modulator::new(Generator::Pan)
                .with_source1(cc(3), SourceMapping::linear())
                .with_amount(1.0),
        )
        .unwrap();
        assert_eq!(chain.generator(), Generator::Pan);
        assert!(ModulatorChain::simple(
            Modulator::new(ModulatorDestination::Undefined(900))
                .with_source1(cc(3), SourceMapping::linear())
        )
        .is_err());
    }
}
