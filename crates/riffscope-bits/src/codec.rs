use std::any::Any;

use crate::error::ScanError;
use crate::scan::Scan;

/// An external payload decoder hooked into sample emission.
///
/// Implementors decode one media sample (an H.264 access unit, an MP3
/// frame, ...) from a cursor that has been framed to exactly the sample's
/// bytes. Fields they emit land under the sample's node, so the dissected
/// tree stays one tree across the container/codec boundary.
///
/// `arg` is an opaque per-stream argument captured when the stream was
/// declared; a codec that needs side data from the container downcasts
/// it. The container layer never interprets it.
pub trait SampleCodec {
    /// Short stable name, used in error reports.
    fn name(&self) -> &'static str;

    /// Decode one sample. The cursor's frame is the sample range; the
    /// codec may consume less than the frame but not more.
    fn decode(&self, scan: &mut Scan<'_>, arg: Option<&dyn Any>) -> Result<(), ScanError>;
}
