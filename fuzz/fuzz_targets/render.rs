#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: tree rendering of whatever decodes.
//
// Anything the decoder accepts must render without panicking.
// Catches bugs in:
// - Range label formatting for odd bit offsets
// - Deeply nested indentation
// - Scalar labels for lossy text and synthesized values
fuzz_target!(|data: &[u8]| {
    if let Ok(dissection) = riffscope_avi::decode(data, &riffscope_avi::Options::default()) {
        let _ = riffscope_tree::fmt::render(&dissection.root);
    }
});
