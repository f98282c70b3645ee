//! ## Sparse representation
//! Keeps coupons in an ordered set while their number is small relative to `K`.
use std::collections::BTreeSet;
use std::mem::size_of;

use crate::representation::RepresentationTrait;

/// Sparse representation container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Sparse {
    coupons: BTreeSet<u32>,
}

impl Sparse {
    pub(crate) fn from_coupons(coupons: impl IntoIterator<Item = u32>) -> Self {
        Self {
            coupons: coupons.into_iter().collect(),
        }
    }
}

impl RepresentationTrait for Sparse {
    #[inline]
    fn insert_coupon(&mut self, coupon: u32) -> bool {
        self.coupons.insert(coupon)
    }

    #[inline]
    fn num_coupons(&self) -> usize {
        self.coupons.len()
    }

    fn coupons(&self) -> Vec<u32> {
        self.coupons.iter().copied().collect()
    }

    fn size_of(&self) -> usize {
        size_of::<Self>() + self.coupons.len() * size_of::<u32>()
    }

    fn name(&self) -> &'static str {
        "sparse"
    }
}
