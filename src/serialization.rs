//! Canonical byte form of [`CpcSketch`].
//!
//! All integers are little endian. The 12-byte header:
//! - byte 0        - serial version (`1`)
//! - byte 1        - sketch family id (`16`)
//! - byte 2        - `lgK`
//! - byte 3        - flags: bit 0 is set for an empty sketch, bit 1 for a dense payload
//! - bytes 4..8    - seed hash
//! - bytes 8..12   - number of coupons `C`
//!
//! Payload:
//! - sparse        - `C` coupons as `u32`, strictly ascending
//! - dense         - `K` bit-matrix row words as `u64`, used when `C >= 2K`
//!
//! The byte form depends only on `lgK`, the seed and the coupon set, so sketches holding the
//! same coupons serialize identically regardless of insertion order or in-memory representation.
use crate::error::SketchError;
use crate::representation::{decode_coupon, Representation, RepresentationTrait};
use crate::sketch::CpcSketch;

pub(crate) const SERIAL_VERSION: u8 = 1;
pub(crate) const FAMILY_ID: u8 = 16;
const FLAG_EMPTY: u8 = 1;
const FLAG_DENSE: u8 = 1 << 1;
pub(crate) const HEADER_LEN: usize = 12;

impl CpcSketch {
    /// Serialize sketch into its canonical byte form
    pub fn serialize(&self) -> Vec<u8> {
        let k = 1usize << self.lg_k;
        let num_coupons = self.num_coupons();
        let dense = num_coupons >= 2 * k;

        let mut flags = 0;
        if num_coupons == 0 {
            flags |= FLAG_EMPTY;
        }
        if dense {
            flags |= FLAG_DENSE;
        }

        let payload_len = if dense { k * 8 } else { num_coupons * 4 };
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload_len);
        bytes.push(SERIAL_VERSION);
        bytes.push(FAMILY_ID);
        bytes.push(self.lg_k);
        bytes.push(flags);
        bytes.extend_from_slice(&self.seed_hash.to_le_bytes());
        bytes.extend_from_slice(&(num_coupons as u32).to_le_bytes());

        if dense {
            for word in self.repr.rows(self.lg_k) {
                bytes.extend_from_slice(&word.to_le_bytes());
            }
        } else {
            for coupon in self.coupons() {
                bytes.extend_from_slice(&coupon.to_le_bytes());
            }
        }

        bytes
    }

    /// Reconstruct sketch from its serialized form, `seed` must match the one it was built with
    pub fn deserialize(bytes: &[u8], seed: u64) -> Result<Self, SketchError> {
        let mut cursor = SketchSlice::new(bytes);

        let serial_version = cursor.read_u8("serial_version")?;
        let family_id = cursor.read_u8("family_id")?;
        let lg_k = cursor.read_u8("lg_k")?;
        let flags = cursor.read_u8("flags")?;
        let seed_hash = cursor.read_u32_le("seed_hash")?;
        let num_coupons = cursor.read_u32_le("num_coupons")? as usize;

        if serial_version != SERIAL_VERSION {
            return Err(SketchError::UnsupportedSerialVersion {
                expected: SERIAL_VERSION,
                found: serial_version,
            });
        }
        if family_id != FAMILY_ID {
            return Err(SketchError::InvalidFamily {
                expected: FAMILY_ID,
                found: family_id,
            });
        }

        let mut sketch = CpcSketch::new(lg_k, seed)?;
        if seed_hash != sketch.seed_hash {
            return Err(SketchError::SeedHashMismatch {
                expected: sketch.seed_hash,
                found: seed_hash,
            });
        }

        let is_empty = flags & FLAG_EMPTY != 0;
        if is_empty != (num_coupons == 0) {
            return Err(SketchError::Corrupt(format!(
                "empty flag is {is_empty} but {num_coupons} coupons are declared"
            )));
        }

        if flags & !(FLAG_EMPTY | FLAG_DENSE) != 0 {
            return Err(SketchError::Corrupt(format!("unknown flags {flags:#04x}")));
        }
        let k = 1usize << lg_k;
        let dense = flags & FLAG_DENSE != 0;
        if dense != (num_coupons >= 2 * k) {
            return Err(SketchError::Corrupt(format!(
                "dense flag is {dense} for {num_coupons} coupons at lgK {lg_k}"
            )));
        }
        if dense {
            let mut rows = Vec::with_capacity(k.min(cursor.remaining() / 8));
            for _ in 0..k {
                rows.push(cursor.read_u64_le("row")?);
            }
            let repr = Representation::from_rows(lg_k, rows);
            if repr.num_coupons() != num_coupons {
                return Err(SketchError::Corrupt(format!(
                    "{num_coupons} coupons declared but bit-matrix holds {}",
                    repr.num_coupons()
                )));
            }
            sketch.repr = repr;
        } else {
            let mut previous: Option<u32> = None;
            for _ in 0..num_coupons {
                let coupon = cursor.read_u32_le("coupon")?;
                if previous.is_some_and(|p| p >= coupon) {
                    return Err(SketchError::Corrupt(
                        "coupons are not strictly ascending".to_string(),
                    ));
                }
                if decode_coupon(coupon).0 as usize >= k {
                    return Err(SketchError::Corrupt(format!(
                        "coupon row out of range for lgK {lg_k}"
                    )));
                }
                sketch.insert_coupon(coupon);
                previous = Some(coupon);
            }
        }

        if cursor.remaining() != 0 {
            return Err(SketchError::Corrupt(format!(
                "{} trailing bytes",
                cursor.remaining()
            )));
        }

        Ok(sketch)
    }
}

/// Little endian reader over serialized sketch bytes
struct SketchSlice<'a> {
    bytes: &'a [u8],
}

impl<'a> SketchSlice<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn read_array<const N: usize>(&mut self, tag: &'static str) -> Result<[u8; N], SketchError> {
        if self.bytes.len() < N {
            return Err(SketchError::InsufficientData(tag));
        }
        let (head, tail) = self.bytes.split_at(N);
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        self.bytes = tail;
        Ok(out)
    }

    fn read_u8(&mut self, tag: &'static str) -> Result<u8, SketchError> {
        self.read_array::<1>(tag).map(|b| b[0])
    }

    fn read_u32_le(&mut self, tag: &'static str) -> Result<u32, SketchError> {
        self.read_array(tag).map(u32::from_le_bytes)
    }

    fn read_u64_le(&mut self, tag: &'static str) -> Result<u64, SketchError> {
        self.read_array(tag).map(u64::from_le_bytes)
    }
}
