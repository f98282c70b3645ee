//! Union of [`CpcSketch`]es built with the same seed.
//!
//! The union keeps an accumulator sketch. Incoming sketches with a larger `lgK` are folded
//! down to the accumulator's `lgK`; an incoming sketch with a smaller `lgK` first reduces the
//! accumulator to it. Sketches of equal `lgK` therefore merge into exactly the coupon set a
//! single sketch would have built from the combined input.
use crate::error::SketchError;
use crate::representation::fold_coupon;
use crate::sketch::CpcSketch;

#[derive(Debug, Clone)]
pub struct CpcUnion {
    accumulator: CpcSketch,
}

impl CpcUnion {
    /// Create new union accepting sketches built with `seed`
    pub fn new(lg_k: u8, seed: u64) -> Result<Self, SketchError> {
        Ok(Self {
            accumulator: CpcSketch::new(lg_k, seed)?,
        })
    }

    /// Current `lgK`, which only ever decreases
    #[inline]
    pub fn lg_k(&self) -> u8 {
        self.accumulator.lg_k()
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.accumulator.seed()
    }

    /// Fold `sketch` into the union
    pub fn update(&mut self, sketch: &CpcSketch) -> Result<(), SketchError> {
        if sketch.seed_hash() != self.accumulator.seed_hash() {
            return Err(SketchError::SeedHashMismatch {
                expected: self.accumulator.seed_hash(),
                found: sketch.seed_hash(),
            });
        }
        if sketch.is_empty() {
            return Ok(());
        }
        if sketch.lg_k() < self.accumulator.lg_k() {
            self.accumulator = self.accumulator.downsample(sketch.lg_k());
        }

        let lg_k = self.accumulator.lg_k();
        for coupon in sketch.coupons() {
            self.accumulator.insert_coupon(fold_coupon(coupon, lg_k));
        }
        Ok(())
    }

    /// Return snapshot of the union, the union itself stays usable
    pub fn result(&self) -> CpcSketch {
        self.accumulator.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SEED;
    use test_case::test_case;

    fn build(lg_k: u8, seed: u64, items: std::ops::Range<i64>) -> CpcSketch {
        let mut sketch = CpcSketch::new(lg_k, seed).unwrap();
        for i in items {
            sketch.update_i64(i);
        }
        sketch
    }

    #[test_case(0, 0)]
    #[test_case(0, 10)]
    #[test_case(10, 0)]
    #[test_case(3, 5)]
    #[test_case(100, 10_000)]
    #[test_case(10_000, 10_000)]
    fn test_union_equals_direct_build(lhs_n: i64, rhs_n: i64) {
        let lhs = build(11, DEFAULT_SEED, 0..lhs_n);
        let rhs = build(11, DEFAULT_SEED, lhs_n..lhs_n + rhs_n);
        let direct = build(11, DEFAULT_SEED, 0..lhs_n + rhs_n);

        let mut union = CpcUnion::new(11, DEFAULT_SEED).unwrap();
        union.update(&lhs).unwrap();
        union.update(&rhs).unwrap();

        assert_eq!(union.result(), direct);
        assert_eq!(union.result().serialize(), direct.serialize());
    }

    #[test]
    fn test_overlapping_inputs() {
        let lhs = build(11, DEFAULT_SEED, 0..1_000);
        let rhs = build(11, DEFAULT_SEED, 500..1_500);
        let mut union = CpcUnion::new(11, DEFAULT_SEED).unwrap();
        union.update(&lhs).unwrap();
        union.update(&rhs).unwrap();
        assert_eq!(union.result(), build(11, DEFAULT_SEED, 0..1_500));
    }

    #[test_case(12, 8, 10 => 8; "smaller incoming lgK reduces union")]
    #[test_case(8, 12, 10 => 8; "larger incoming lgK is folded down")]
    #[test_case(11, 11, 11 => 11; "equal lgK")]
    fn test_mixed_lg_k(lhs_lg_k: u8, rhs_lg_k: u8, union_lg_k: u8) -> u8 {
        let lhs = build(lhs_lg_k, DEFAULT_SEED, 0..2_000);
        let rhs = build(rhs_lg_k, DEFAULT_SEED, 1_000..3_000);
        let mut union = CpcUnion::new(union_lg_k, DEFAULT_SEED).unwrap();
        union.update(&lhs).unwrap();
        union.update(&rhs).unwrap();

        let lg_k = union.lg_k();
        assert_eq!(union.result(), build(lg_k, DEFAULT_SEED, 0..3_000));
        lg_k
    }

    #[test]
    fn test_empty_sketch_keeps_lg_k() {
        let mut union = CpcUnion::new(11, DEFAULT_SEED).unwrap();
        union.update(&build(4, DEFAULT_SEED, 0..0)).unwrap();
        assert_eq!(union.lg_k(), 11);
        assert!(union.result().is_empty());
    }

    #[test]
    fn test_seed_mismatch() {
        let mut union = CpcUnion::new(11, 1).unwrap();
        union.update(&build(11, 1, 0..10)).unwrap();
        let err = union.update(&build(11, 2, 0..10)).unwrap_err();
        assert!(matches!(err, SketchError::SeedHashMismatch { .. }));
        assert_eq!(union.result(), build(11, 1, 0..10));
    }

    #[test]
    fn test_result_is_snapshot() {
        let mut union = CpcUnion::new(11, DEFAULT_SEED).unwrap();
        union.update(&build(11, DEFAULT_SEED, 0..100)).unwrap();
        let first = union.result();
        assert_eq!(union.result(), first);

        union.update(&build(11, DEFAULT_SEED, 100..200)).unwrap();
        assert_eq!(first, build(11, DEFAULT_SEED, 0..100));
        assert_eq!(union.result(), build(11, DEFAULT_SEED, 0..200));
    }
}
