use riffscope_bits::ScanError;

/// Errors surfaced by [`decode`](crate::decode).
///
/// Only one condition is fatal at this layer's own discretion: the outer
/// container not being an AVI form. Unknown chunks, out-of-range stream
/// numbers, and absent optional headers are tolerated and logged instead.
/// Cursor failures bubble up unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AviError {
    /// The outer RIFF form type was missing or not "AVI ".
    #[error("wrong container type: expected \"AVI \", found {found:?}")]
    NotAvi { found: String },

    /// Cursor-level failure, propagated unchanged.
    #[error(transparent)]
    Scan(#[from] ScanError),
}
