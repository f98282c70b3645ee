//! # Serde support for CpcSketch
//!
//! A [`CpcSketch`] is serialized as the tuple `(seed, bytes)` where `bytes` is its canonical
//! serialized form. The seed is needed to heapify the bytes again, since only its hash is part
//! of the canonical form.
//!
//! [`IntermediateRecord`](crate::record::IntermediateRecord) derives its serde implementation
//! and is written as a map of `lgK`, `seed` and `sketch`.
use serde::de::Error;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::sketch::CpcSketch;

impl Serialize for CpcSketch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.seed)?;
        tup.serialize_element(&self.serialize())?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for CpcSketch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (seed, bytes): (u64, Vec<u8>) = Deserialize::deserialize(deserializer)?;
        CpcSketch::deserialize(&bytes, seed).map_err(Error::custom)
    }
}
