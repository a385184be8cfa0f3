//! Stream bookkeeping threaded through the walk.

use std::any::Any;

use crate::codec::CodecRef;
use crate::index::IndexSource;

/// Absolute bit range inside the input buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitRange {
    pub start: u64,
    pub len: u64,
}

/// Context hung on a `strl` list while its children decode. `strh`
/// fills in the declared kind and handler, `strf` turns the pair into a
/// registered stream and records its slot.
#[derive(Debug, Default)]
pub(crate) struct StrlScope {
    pub declared_kind: String,
    pub handler: String,
    pub stream: Option<usize>,
}

/// One declared stream, in `strf` order. Index material is collected
/// from three places and kept apart until the end of the walk.
pub(crate) struct StreamState {
    pub declared_kind: String,
    pub handler: String,
    pub codec: Option<CodecRef>,
    pub codec_arg: Option<Box<dyn Any>>,
    /// Entries of this stream's `indx` chunk, pointing at `ix` chunks.
    pub super_index: Vec<BitRange>,
    /// Sample ranges from `ix` chunks met inline in `movi`.
    pub inline_index: Vec<BitRange>,
}

impl StreamState {
    pub fn new(declared_kind: String, handler: String) -> Self {
        Self {
            declared_kind,
            handler,
            codec: None,
            codec_arg: None,
            super_index: Vec::new(),
            inline_index: Vec::new(),
        }
    }
}

/// One `idx1` entry, offsets already scaled to bits.
pub(crate) struct LegacyEntry {
    pub offset: u64,
    pub len: u64,
    pub stream_nr: usize,
}

/// Walk-wide state owned by the decoder.
#[derive(Default)]
pub(crate) struct FileScope {
    pub riff_type: Option<String>,
    /// Bit position right after the `movi` list type, the base that
    /// legacy index offsets count from.
    pub movi_pos: Option<u64>,
    pub streams: Vec<StreamState>,
    pub legacy: Vec<LegacyEntry>,
}

/// Post-walk digest of one stream.
#[derive(Clone, Debug)]
pub struct StreamSummary {
    pub declared_kind: String,
    pub handler: String,
    pub codec: Option<CodecRef>,
    /// Which index produced the samples, if any did.
    pub source: Option<IndexSource>,
    pub sample_count: usize,
    pub sample_bits: u64,
}
