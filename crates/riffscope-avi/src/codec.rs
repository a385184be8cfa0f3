//! Codec identities and the registry sample decoding goes through.
//!
//! The container only ever names a codec; actual bitstream decoders are
//! registered by the caller as [`SampleCodec`] implementations. A named
//! codec with no registered decoder degrades to raw samples.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use riffscope_bits::{SampleCodec, UintSyms};

/// Payload codec the container can hand samples to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodecRef {
    AvcAu,
    HevcAu,
    Mp3Frame,
    FlacFrame,
}

impl fmt::Display for CodecRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodecRef::AvcAu => "avc_au",
            CodecRef::HevcAu => "hevc_au",
            CodecRef::Mp3Frame => "mp3_frame",
            CodecRef::FlacFrame => "flac_frame",
        })
    }
}

/// Decoders registered for one decode run.
#[derive(Default)]
pub struct CodecSet {
    decoders: HashMap<CodecRef, Arc<dyn SampleCodec>>,
}

impl CodecSet {
    pub fn register(&mut self, codec: CodecRef, decoder: Arc<dyn SampleCodec>) {
        self.decoders.insert(codec, decoder);
    }

    pub fn get(&self, codec: CodecRef) -> Option<&dyn SampleCodec> {
        self.decoders.get(&codec).map(Arc::as_ref)
    }
}

/// Fourccs that in practice mean H.264, beyond the canonical spelling.
static AVC_FOURCCS: [&str; 14] = [
    "H264", "h264", "X264", "x264", "avc1", "DAVC", "SMV2", "VSSH", "Q264", "V264", "GAVC",
    "UMSV", "tshd", "INMC",
];

static HEVC_FOURCCS: [&str; 2] = ["HEVC", "H265"];

pub(crate) fn video_codec(compression: &str) -> Option<CodecRef> {
    if AVC_FOURCCS.contains(&compression) {
        return Some(CodecRef::AvcAu);
    }
    if HEVC_FOURCCS.contains(&compression) {
        return Some(CodecRef::HevcAu);
    }
    None
}

pub(crate) fn audio_codec(format_tag: u64) -> Option<CodecRef> {
    match format_tag {
        0x0055 => Some(CodecRef::Mp3Frame),
        0xf1ac => Some(CodecRef::FlacFrame),
        _ => None,
    }
}

/// WAVE format tags seen in `strf` chunks of audio streams.
pub(crate) static WAV_TAG_SYMS: UintSyms = UintSyms(&[
    (0x0001, "pcm"),
    (0x0002, "adpcm"),
    (0x0003, "ieee_float"),
    (0x0006, "alaw"),
    (0x0007, "mulaw"),
    (0x0055, "mp3"),
    (0x00ff, "aac"),
    (0x2000, "ac3"),
    (0xf1ac, "flac"),
    (0xfffe, "extensible"),
]);

#[cfg(test)]
mod tests {
    use std::any::Any;

    use riffscope_bits::{Scan, ScanError};

    use super::*;

    #[test]
    fn every_avc_spelling_maps_to_the_same_codec() {
        for fourcc in AVC_FOURCCS {
            assert_eq!(video_codec(fourcc), Some(CodecRef::AvcAu), "{fourcc}");
        }
        assert_eq!(video_codec("HEVC"), Some(CodecRef::HevcAu));
        assert_eq!(video_codec("H265"), Some(CodecRef::HevcAu));
        assert_eq!(video_codec("mjpg"), None);
        assert_eq!(video_codec(""), None);
    }

    #[test]
    fn audio_tags_map_mp3_and_flac_only() {
        assert_eq!(audio_codec(0x0055), Some(CodecRef::Mp3Frame));
        assert_eq!(audio_codec(0xf1ac), Some(CodecRef::FlacFrame));
        assert_eq!(audio_codec(0x0001), None);
        assert_eq!(audio_codec(0x2000), None);
    }

    struct Nop;
    impl SampleCodec for Nop {
        fn name(&self) -> &'static str {
            "nop"
        }
        fn decode(&self, _: &mut Scan<'_>, _: Option<&dyn Any>) -> Result<(), ScanError> {
            Ok(())
        }
    }

    #[test]
    fn registry_lookup() {
        let mut set = CodecSet::default();
        assert!(set.get(CodecRef::AvcAu).is_none());
        set.register(CodecRef::AvcAu, Arc::new(Nop));
        assert_eq!(set.get(CodecRef::AvcAu).map(|c| c.name()), Some("nop"));
        assert!(set.get(CodecRef::Mp3Frame).is_none());
    }

    #[test]
    fn display_names_are_snake_case() {
        assert_eq!(CodecRef::AvcAu.to_string(), "avc_au");
        assert_eq!(CodecRef::FlacFrame.to_string(), "flac_frame");
    }
}
