//! Sketch configuration bound once per aggregation buffer.
//!
//! The host hands `lgK` over as a signed 32-bit integer and `seed` as a signed 64-bit integer.
//! Both round-trip exactly through [`SketchConfig`].
use crate::error::{AggregateError, Result, SketchError};

/// `lgK` applied when the caller does not pass one
pub const DEFAULT_LG_K: u8 = 11;
/// Smallest supported `lgK`
pub const MIN_LG_K: u8 = 4;
/// Largest supported `lgK`
pub const MAX_LG_K: u8 = 26;
/// Seed applied when the caller does not pass one
pub const DEFAULT_SEED: u64 = 9001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SketchConfig {
    lg_k: u8,
    seed: u64,
}

impl SketchConfig {
    /// Validate host supplied `lg_k` and `seed`
    pub fn new(lg_k: i32, seed: i64) -> Result<Self> {
        let lg_k = check_lg_k(i64::from(lg_k)).map_err(AggregateError::Config)?;
        Ok(Self {
            lg_k,
            seed: seed as u64,
        })
    }

    #[inline]
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// `lgK` in the host's integer width
    #[inline]
    pub fn host_lg_k(&self) -> i32 {
        i32::from(self.lg_k)
    }

    /// Seed in the host's integer width
    #[inline]
    pub fn host_seed(&self) -> i64 {
        self.seed as i64
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            seed: DEFAULT_SEED,
        }
    }
}

/// Check that `lg_k` is within `[MIN_LG_K, MAX_LG_K]`
pub(crate) fn check_lg_k(lg_k: i64) -> Result<u8, SketchError> {
    if (i64::from(MIN_LG_K)..=i64::from(MAX_LG_K)).contains(&lg_k) {
        Ok(lg_k as u8)
    } else {
        Err(SketchError::InvalidLgK(lg_k))
    }
}
