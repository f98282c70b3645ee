#![no_main]

use cpc_aggregate::CpcSketch;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut sketch) = serde_json::from_slice::<CpcSketch>(data) {
        sketch.update_i64(1);
        assert!(sketch.estimate() > 0.0);
    }
});
