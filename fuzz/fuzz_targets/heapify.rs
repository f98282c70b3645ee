#![no_main]

use cpc_aggregate::{CpcSketch, CpcUnion, DEFAULT_SEED};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(sketch) = CpcSketch::deserialize(data, DEFAULT_SEED) {
        assert_eq!(sketch.serialize(), data);
        assert!(sketch.estimate() >= 0.0);

        let mut union = CpcUnion::new(sketch.lg_k(), DEFAULT_SEED).unwrap();
        union.update(&sketch).unwrap();
        assert_eq!(union.result(), sketch);
    }
});
