//! Shared helpers for modulator evaluation.

pub mod curve;

// -------------------------------------------------------------------------------------------------

/// Fixed size bit set for up to 128 entries, used to track pending controller changes
/// without allocating.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BitSet128(u128);

impl BitSet128 {
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < 128, "Invalid bit index");
        self.0 |= 1u128 << (index & 127);
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < 128 && (self.0 & (1u128 << index)) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Iterate over all set bit indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                None
            } else {
                let index = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(index)
            }
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
macro_rules! assert_eq_with_epsilon {
    ($x:expr, $y:expr, $d:expr) => {{
        let (x, y): (f64, f64) = ($x, $y);
        if (x - y).abs() > $d {
            panic!("{} is not equal to {} (epsilon {})", x, y, $d);
        }
    }};
}

#[cfg(test)]
pub(crate) use assert_eq_with_epsilon;

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_set() {
        let mut set = BitSet128::new();
        assert!(set.is_empty());
        set.insert(0);
        set.insert(64);
        set.insert(127);
        assert!(set.contains(0) && set.contains(64) && set.contains(127));
        assert!(!set.contains(1) && !set.contains(128));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 64, 127]);
        set.clear();
        assert!(set.is_empty());
    }
}
