//! Modulation graph handling: zone level sanitizing of raw modulator lists and the per-voice
//! modulator table which merges zone modulators and evaluates them into generator values.

// -------------------------------------------------------------------------------------------------

pub(crate) mod diagnostics;
pub(crate) mod sanitizer;
pub(crate) mod table;

// -------------------------------------------------------------------------------------------------

/// Maximum number of modulators a sanitized zone keeps.
pub const MAX_ZONE_MODULATORS: usize = 64;

/// Maximum number of modulators, including all chain members, a voice can hold.
pub const MAX_VOICE_MODULATORS: usize = 64;

// -------------------------------------------------------------------------------------------------

/// How a modulator is merged into a list which may already contain an identical one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum MergeMode {
    /// Keep the existing modulator and drop the new one.
    #[default]
    Default,
    /// Add the new modulator's amount(s) to the existing one.
    Add,
    /// Replace the existing modulator's amount(s) with the new one.
    Overwrite,
}

/// Result of merging a modulator into a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum MergeOutcome {
    /// No identical modulator existed: the modulator got appended.
    Added,
    /// Amounts got summed into an identical modulator.
    Summed,
    /// Amounts of an identical modulator got replaced.
    Overwritten,
    /// An identical modulator existed and was kept.
    Skipped,
    /// The modulator failed source validation and was not added.
    Rejected,
    /// The list has no room left for the modulator.
    TableFull,
}

impl MergeOutcome {
    /// Returns true when the list now contains the modulator's contribution.
    pub fn is_merged(self) -> bool {
        matches!(self, Self::Added | Self::Summed | Self::Overwritten)
    }
}
