/// Errors from the bit cursor.
///
/// Reads are bounds-checked against the innermost frame before any byte
/// is touched, so `OutOfRange` pinpoints the first read that could not be
/// served. Seeks are checked against the whole buffer instead, because a
/// seek deliberately escapes the current frame.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A read would cross the end of the current frame.
    #[error("read of {want} bits at bit {pos} exceeds frame end {end}")]
    OutOfRange { pos: u64, want: u64, end: u64 },

    /// An absolute seek named a range outside the buffer.
    #[error("seek to bits {start}+{len} outside buffer of {size} bits")]
    SeekOutOfRange { start: u64, len: u64, size: u64 },

    /// An external sample decoder failed inside its scoped range.
    #[error("{name} codec: {reason}")]
    Codec { name: &'static str, reason: String },
}
