#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: full AVI decoder entry point.
//
// Calls `decode` on arbitrary input bytes.
// Catches bugs in:
// - Chunk walking (sizes, alignment, nesting depth)
// - Header layouts (avih, dmlh, strh, strf, vprp)
// - Index decoding (indx, ix, idx1) and sample range arithmetic
// - Stream bookkeeping across the walk
fuzz_target!(|data: &[u8]| {
    let _ = riffscope_avi::decode(data, &riffscope_avi::Options::default());
});
