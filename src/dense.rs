//! ## Dense representation
//! Bit-matrix of `K` rows by 64 columns, stored as one `u64` word per row.
//! The number of set bits is tracked as coupons are inserted so that
//! estimation never needs to scan the matrix.
use std::mem::{size_of, size_of_val};

use crate::representation::{decode_coupon, encode_coupon, RepresentationTrait};

/// Dense representation container
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dense {
    rows: Vec<u64>,
    num_coupons: usize,
}

impl Dense {
    /// Create empty bit-matrix with `2^lg_k` rows
    pub(crate) fn new(lg_k: u8) -> Self {
        Self {
            rows: vec![0; 1 << lg_k],
            num_coupons: 0,
        }
    }

    pub(crate) fn from_coupons(lg_k: u8, coupons: impl IntoIterator<Item = u32>) -> Self {
        let mut dense = Self::new(lg_k);
        for coupon in coupons {
            dense.insert_coupon(coupon);
        }
        dense
    }

    pub(crate) fn from_rows(rows: Vec<u64>) -> Self {
        let num_coupons = rows.iter().map(|w| w.count_ones() as usize).sum();
        Self { rows, num_coupons }
    }

    #[inline]
    pub(crate) fn rows(&self) -> &[u64] {
        &self.rows
    }
}

impl RepresentationTrait for Dense {
    #[inline]
    fn insert_coupon(&mut self, coupon: u32) -> bool {
        let (row, col) = decode_coupon(coupon);
        let bit = 1u64 << col;
        let word = &mut self.rows[row as usize];
        if *word & bit != 0 {
            return false;
        }
        *word |= bit;
        self.num_coupons += 1;
        true
    }

    #[inline]
    fn num_coupons(&self) -> usize {
        self.num_coupons
    }

    fn coupons(&self) -> Vec<u32> {
        let mut coupons = Vec::with_capacity(self.num_coupons);
        for (row, &word) in self.rows.iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                coupons.push(encode_coupon(row as u32, bits.trailing_zeros()));
                bits &= bits - 1;
            }
        }
        coupons
    }

    fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.rows.as_slice())
    }

    fn name(&self) -> &'static str {
        "dense"
    }
}
