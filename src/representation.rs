//! Coupon storage used by [`CpcSketch`](crate::sketch::CpcSketch).
//!
//! A coupon packs a row index and a column index into 32 bits:
//! - 0..5 bits     - store column, i.e. the number of leading zeros of the item hash (capped at 63)
//! - 6..31 bits    - store row, i.e. the lowest `lgK` bits of the item hash
//!
//! Coupons are kept in one of two representations:
//! - `Sparse` while the number of coupons is at most `3K/32`
//! - `Dense` bit-matrix with one `u64` word per row afterwards
use enum_dispatch::enum_dispatch;

use crate::dense::Dense;
use crate::sparse::Sparse;

/// Number of bits used to store the column inside a coupon
const COLUMN_BITS: u32 = 6;
/// Mask used for extracting the column from a coupon
const COLUMN_MASK: u32 = (1 << COLUMN_BITS) - 1;

/// Representation types supported by `CpcSketch`
#[derive(Debug, Clone)]
#[enum_dispatch]
pub(crate) enum Representation {
    Sparse(Sparse),
    Dense(Dense),
}

/// Representation trait which must be implemented by all representations.
#[enum_dispatch(Representation)]
pub(crate) trait RepresentationTrait {
    /// Insert coupon, returns true if it was not present before.
    fn insert_coupon(&mut self, coupon: u32) -> bool;
    fn num_coupons(&self) -> usize;
    /// Return coupons in ascending order
    fn coupons(&self) -> Vec<u32>;
    fn size_of(&self) -> usize;
    fn name(&self) -> &'static str;
}

impl Representation {
    /// Insert coupon, promoting `Sparse` to `Dense` once sparse capacity is exceeded.
    #[inline]
    pub(crate) fn insert(&mut self, lg_k: u8, coupon: u32) -> bool {
        let inserted = self.insert_coupon(coupon);
        let promoted = match self {
            Representation::Sparse(sparse) if sparse.num_coupons() > sparse_capacity(lg_k) => {
                Some(Dense::from_coupons(lg_k, sparse.coupons()))
            }
            _ => None,
        };
        if let Some(dense) = promoted {
            *self = dense.into();
        }
        inserted
    }

    /// Create representation holding given row words
    pub(crate) fn from_rows(lg_k: u8, rows: Vec<u64>) -> Self {
        let dense = Dense::from_rows(rows);
        if dense.num_coupons() > sparse_capacity(lg_k) {
            dense.into()
        } else {
            Sparse::from_coupons(dense.coupons()).into()
        }
    }

    /// Return one bit-matrix word per row
    pub(crate) fn rows(&self, lg_k: u8) -> Vec<u64> {
        match self {
            Representation::Dense(dense) => dense.rows().to_vec(),
            Representation::Sparse(sparse) => Dense::from_coupons(lg_k, sparse.coupons())
                .rows()
                .to_vec(),
        }
    }
}

impl Default for Representation {
    fn default() -> Self {
        Sparse::default().into()
    }
}

impl PartialEq for Representation {
    fn eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (Representation::Sparse(lhs), Representation::Sparse(rhs)) => lhs == rhs,
            (Representation::Dense(lhs), Representation::Dense(rhs)) => lhs == rhs,
            _ => self.coupons() == rhs.coupons(),
        }
    }
}

/// Maximum number of coupons stored in sparse representation
#[inline]
pub(crate) fn sparse_capacity(lg_k: u8) -> usize {
    3 * (1usize << lg_k) / 32
}

#[inline]
pub(crate) fn encode_coupon(row: u32, col: u32) -> u32 {
    (row << COLUMN_BITS) | (col & COLUMN_MASK)
}

/// Return row and column of a coupon
#[inline]
pub(crate) fn decode_coupon(coupon: u32) -> (u32, u32) {
    (coupon >> COLUMN_BITS, coupon & COLUMN_MASK)
}

/// Fold coupon row into the `[0, 2^lg_k)` range
#[inline]
pub(crate) fn fold_coupon(coupon: u32, lg_k: u8) -> u32 {
    let (row, col) = decode_coupon(coupon);
    encode_coupon(row & ((1 << lg_k) - 1), col)
}
