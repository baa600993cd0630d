use std::fmt;

use crate::modulator::SourceViolation;

// -------------------------------------------------------------------------------------------------

/// Reason why a modulator got dropped from a zone's modulator list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulatorViolation {
    /// Sources, curves or transform are not allowed.
    InvalidSource(SourceViolation),
    /// The destination is not a known generator id.
    InvalidDestination(u16),
    /// The link destination points outside of the modulator list.
    LinkOutOfRange(usize),
    /// The link destination points to a modulator without link source.
    LinkTargetWithoutLinkSource(usize),
    /// The modulator is part of a circular link path.
    Cycle,
    /// The modulator's link path never reaches a generator.
    Orphan,
    /// The modulator has a link source, but no valid modulator links into it.
    IsolatedLink,
    /// An identical modulator later in the list supersedes this one.
    Duplicate(usize),
    /// The zone's modulator capacity is exhausted.
    Capacity,
}

impl fmt::Display for ModulatorViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSource(violation) => write!(f, "invalid source: {violation}"),
            Self::InvalidDestination(id) => write!(f, "invalid destination generator {id}"),
            Self::LinkOutOfRange(index) => write!(f, "link to missing modulator {index}"),
            Self::LinkTargetWithoutLinkSource(index) => {
                write!(f, "linked modulator {index} has no link source")
            }
            Self::Cycle => write!(f, "part of a circular link path"),
            Self::Orphan => write!(f, "link path without destination"),
            Self::IsolatedLink => write!(f, "link source without linked modulators"),
            Self::Duplicate(index) => write!(f, "superseded by identical modulator {index}"),
            Self::Capacity => write!(f, "too many modulators"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A dropped modulator: its position in the original list and the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulatorDiagnostic {
    pub index: usize,
    pub violation: ModulatorViolation,
}

/// Diagnostics collected while sanitizing a single zone's modulator list.
///
/// Every reported entry is logged as a warning as well.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    zone: String,
    entries: Vec<ModulatorDiagnostic>,
}

impl Diagnostics {
    pub(crate) fn new(zone: &str) -> Self {
        Self {
            zone: zone.to_string(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn report(&mut self, index: usize, violation: ModulatorViolation) {
        log::warn!(
            "Zone '{}': ignoring modulator {}: {}",
            self.zone,
            index,
            violation
        );
        self.entries.push(ModulatorDiagnostic { index, violation });
    }

    pub(crate) fn summarize(&self, modulator_count: usize) {
        if !self.entries.is_empty() {
            log::warn!(
                "Zone '{}': ignored {} of {} modulators",
                self.zone,
                self.entries.len(),
                modulator_count
            );
        }
    }

    /// Name of the zone the diagnostics belong to.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModulatorDiagnostic> {
        self.entries.iter()
    }

    /// The violation reported for the modulator at the given list position, if any.
    pub fn violation(&self, index: usize) -> Option<ModulatorViolation> {
        self.entries
            .iter()
            .find(|entry| entry.index == index)
            .map(|entry| entry.violation)
    }
}
