//! Compressed Probabilistic Counting (CPC) sketch estimates the number of distinct items
//! in a stream and is defined by two parameters:
//! - `lgK`: base-2 logarithm of the number of bit-matrix rows `K`, in [4..26] range.
//! - `seed`: 64-bit value mixed into the item hash. Sketches can only be combined
//!   when they were built with the same seed.
//!
//! # Data-structure design rationale
//!
//! Every item is hashed with `wyhash(item_bytes, seed)`. The lowest `lgK` bits of the hash
//! pick a row of a `K x 64` bit-matrix and the number of leading zeros of the hash (capped
//! at 63) picks a column. The pair is stored as a single `u32` coupon, see
//! [`representation`](crate::representation) for the layout. The sketch is the set of
//! coupons seen so far, which makes it:
//! - insensitive to duplicates and to input order,
//! - mergeable by plain set union (bitwise `OR` of the bit-matrices),
//! - reducible to a smaller `lgK` by folding rows.
//!
//! ## Low memory footprint
//! Until the number of coupons exceeds `3K/32` they are kept in a sparse ordered set;
//! afterwards the bit-matrix is materialized with one `u64` word per row.
//!
//! ## Estimation
//! ICON estimator: the expected number of coupons after `n` distinct items is
//! `E[C](n) = K * sum(1 - (1 - p_col / K)^n)` over all 64 columns, where `p_col = 2^-(col+1)`
//! (the last column takes the remaining `2^-63`). The estimate is the `n` for which
//! `E[C](n)` equals the observed coupon count, found by bisection.
use std::fmt::{Debug, Formatter};

use wyhash::wyhash;

use crate::config::{check_lg_k, SketchConfig};
use crate::error::SketchError;
use crate::representation::{encode_coupon, fold_coupon, Representation, RepresentationTrait};

pub struct CpcSketch {
    pub(crate) lg_k: u8,
    pub(crate) seed: u64,
    pub(crate) seed_hash: u32,
    pub(crate) repr: Representation,
}

impl CpcSketch {
    /// Creates new empty sketch with `2^lg_k` rows and given hash `seed`
    pub fn new(lg_k: u8, seed: u64) -> Result<Self, SketchError> {
        let lg_k = check_lg_k(i64::from(lg_k))?;
        Ok(Self {
            lg_k,
            seed,
            seed_hash: compute_seed_hash(seed),
            repr: Representation::default(),
        })
    }

    /// Creates new empty sketch from validated configuration
    pub fn with_config(config: &SketchConfig) -> Self {
        Self {
            lg_k: config.lg_k(),
            seed: config.seed(),
            seed_hash: compute_seed_hash(config.seed()),
            repr: Representation::default(),
        }
    }

    #[inline]
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 32-bit digest of the seed stored in the serialized form
    #[inline]
    pub fn seed_hash(&self) -> u32 {
        self.seed_hash
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_coupons() == 0
    }

    #[inline]
    pub fn num_coupons(&self) -> usize {
        self.repr.num_coupons()
    }

    /// Update sketch with byte string, empty input is ignored
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.update_hash(wyhash(bytes, self.seed));
    }

    /// Update sketch with UTF-8 string, empty input is ignored
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_bytes(value.as_bytes());
    }

    /// Update sketch with integer, narrower integers must be widened to `i64` by the caller
    #[inline]
    pub fn update_i64(&mut self, value: i64) {
        self.update_hash(wyhash(&value.to_le_bytes(), self.seed));
    }

    /// Update sketch with floating point value, `-0.0` and every NaN are canonicalized first
    #[inline]
    pub fn update_f64(&mut self, value: f64) {
        let value = if value == 0.0 {
            0.0
        } else if value.is_nan() {
            f64::NAN
        } else {
            value
        };
        self.update_hash(wyhash(&value.to_bits().to_le_bytes(), self.seed));
    }

    /// Update sketch with precomputed 64-bit hash
    #[inline]
    pub fn update_hash(&mut self, hash: u64) {
        let coupon = Self::encode_hash(hash, self.lg_k);
        self.repr.insert(self.lg_k, coupon);
    }

    /// Return cardinality estimate
    pub fn estimate(&self) -> f64 {
        icon_estimate(self.lg_k, self.num_coupons())
    }

    /// Return memory size of `CpcSketch`
    pub fn size_of(&self) -> usize {
        std::mem::size_of::<Self>() - std::mem::size_of::<Representation>() + self.repr.size_of()
    }

    /// Return copy of the sketch folded down to `lg_k` rows
    pub(crate) fn downsample(&self, lg_k: u8) -> Self {
        let mut sketch = Self {
            lg_k,
            seed: self.seed,
            seed_hash: self.seed_hash,
            repr: Representation::default(),
        };
        for coupon in self.repr.coupons() {
            sketch.insert_coupon(fold_coupon(coupon, lg_k));
        }
        sketch
    }

    /// Insert coupon already mapped to this sketch's `lg_k`
    #[inline]
    pub(crate) fn insert_coupon(&mut self, coupon: u32) {
        self.repr.insert(self.lg_k, coupon);
    }

    /// Return coupons in ascending order
    #[inline]
    pub(crate) fn coupons(&self) -> Vec<u32> {
        self.repr.coupons()
    }

    /// Compute coupon of the given hash
    #[inline]
    fn encode_hash(hash: u64, lg_k: u8) -> u32 {
        let row = (hash & ((1 << lg_k) - 1)) as u32;
        let col = hash.leading_zeros().min(63);
        encode_coupon(row, col)
    }
}

impl Clone for CpcSketch {
    fn clone(&self) -> Self {
        Self {
            lg_k: self.lg_k,
            seed: self.seed,
            seed_hash: self.seed_hash,
            repr: self.repr.clone(),
        }
    }
}

impl PartialEq for CpcSketch {
    /// Compare sketches by configuration and coupon set
    fn eq(&self, rhs: &Self) -> bool {
        self.lg_k == rhs.lg_k && self.seed_hash == rhs.seed_hash && self.repr == rhs.repr
    }
}

impl Debug for CpcSketch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ lg_k: {}, representation: {}, coupons: {}, estimate: {:.0} }}",
            self.lg_k,
            self.repr.name(),
            self.num_coupons(),
            self.estimate()
        )
    }
}

/// Digest of the hash seed, used to reject sketches built with another seed
pub fn compute_seed_hash(seed: u64) -> u32 {
    (wyhash(&seed.to_le_bytes(), 0) >> 32) as u32
}

/// Probability of an item hash landing in column `col`
#[inline]
fn column_probability(col: i32) -> f64 {
    0.5f64.powi((col + 1).min(63))
}

/// Expected number of coupons after inserting `n` distinct items into `k` rows
fn expected_coupons(k: f64, n: f64) -> f64 {
    let sum: f64 = (0..64)
        .map(|col| -(n * (-column_probability(col) / k).ln_1p()).exp_m1())
        .sum();
    k * sum
}

/// Invert `expected_coupons` for the observed number of coupons.
fn icon_estimate(lg_k: u8, num_coupons: usize) -> f64 {
    if num_coupons == 0 {
        return 0.0;
    }
    let k = (1u64 << lg_k) as f64;
    let c = num_coupons as f64;

    // E[C](n) <= n, so the solution is at least `c`
    let mut lo = c;
    let mut hi = 2.0 * c;
    for _ in 0..128 {
        if expected_coupons(k, hi) >= c {
            break;
        }
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..64 {
        let mid = (lo + hi) / 2.0;
        if expected_coupons(k, mid) < c {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) / 2.0
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::config::DEFAULT_SEED;
    use test_case::test_case;

    #[test_case(0 => "{ lg_k: 11, representation: sparse, coupons: 0, estimate: 0 }")]
    #[test_case(1 => "{ lg_k: 11, representation: sparse, coupons: 1, estimate: 1 }")]
    #[test_case(3 => "{ lg_k: 11, representation: sparse, coupons: 3, estimate: 3 }")]
    fn test_small_cardinality(n: i64) -> String {
        let mut sketch = CpcSketch::new(11, DEFAULT_SEED).unwrap();
        for i in 0..n {
            sketch.update_i64(i);
            sketch.update_i64(i);
        }
        format!("{:?}", sketch)
    }

    #[test_case(11, 100)]
    #[test_case(11, 1_000)]
    #[test_case(11, 10_000)]
    #[test_case(11, 100_000)]
    #[test_case(4, 1_000)]
    #[test_case(14, 50_000)]
    fn test_estimate_error(lg_k: u8, n: i64) {
        let mut sketch = CpcSketch::new(lg_k, DEFAULT_SEED).unwrap();
        for i in 0..n {
            sketch.update_i64(i);
        }
        let relative_error = (sketch.estimate() - n as f64).abs() / n as f64;
        let tolerance = if lg_k < 8 { 0.5 } else { 0.1 };
        assert!(
            relative_error < tolerance,
            "lg_k={} n={} estimate={} error={}",
            lg_k,
            n,
            sketch.estimate(),
            relative_error
        );
    }

    #[test]
    fn test_insert() {
        let mut sketch = CpcSketch::new(11, DEFAULT_SEED).unwrap();
        assert_eq!(sketch.estimate(), 0.0);
        assert!(sketch.is_empty());

        sketch.update_str("test item 1");
        assert_eq!(sketch.num_coupons(), 1);

        sketch.update_str("test item 1");
        assert_eq!(sketch.num_coupons(), 1);

        sketch.update_str("test item 2");
        assert_eq!(sketch.num_coupons(), 2);
    }

    #[test]
    fn test_ignored_inputs() {
        let mut sketch = CpcSketch::new(11, DEFAULT_SEED).unwrap();
        sketch.update_str("");
        sketch.update_bytes(&[]);
        assert!(sketch.is_empty());
    }

    #[test]
    fn test_float_canonicalization() {
        let mut sketch = CpcSketch::new(11, DEFAULT_SEED).unwrap();
        sketch.update_f64(0.0);
        sketch.update_f64(-0.0);
        sketch.update_f64(f64::NAN);
        sketch.update_f64(-f64::NAN);
        assert_eq!(sketch.num_coupons(), 2);
    }

    #[test]
    fn test_order_independence() {
        let mut lhs = CpcSketch::new(10, 7).unwrap();
        let mut rhs = CpcSketch::new(10, 7).unwrap();
        for i in 0..5_000 {
            lhs.update_i64(i);
            rhs.update_i64(4_999 - i);
        }
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.coupons(), rhs.coupons());
    }

    #[test]
    fn test_seed_changes_coupons() {
        let mut lhs = CpcSketch::new(12, 1).unwrap();
        let mut rhs = CpcSketch::new(12, 2).unwrap();
        for i in 0..100 {
            lhs.update_i64(i);
            rhs.update_i64(i);
        }
        assert_ne!(lhs.seed_hash(), rhs.seed_hash());
        assert_ne!(lhs, rhs);
    }

    #[test]
    fn test_downsample_matches_direct_build() {
        let mut large = CpcSketch::new(12, DEFAULT_SEED).unwrap();
        let mut small = CpcSketch::new(8, DEFAULT_SEED).unwrap();
        for i in 0..3_000 {
            large.update_i64(i);
            small.update_i64(i);
        }
        assert_eq!(large.downsample(8), small);
    }

    #[test_case(3)]
    #[test_case(27)]
    fn test_invalid_lg_k(lg_k: u8) {
        assert_eq!(
            CpcSketch::new(lg_k, DEFAULT_SEED).unwrap_err(),
            SketchError::InvalidLgK(i64::from(lg_k))
        );
    }
}
