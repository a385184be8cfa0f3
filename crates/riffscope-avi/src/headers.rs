//! Fixed-layout header chunks: `avih`, `dmlh`, `strh`, `strf`, `vprp`.

use riffscope_bits::{Scan, ScanError, StrDescs};

use crate::codec;
use crate::streams::{StreamState, StrlScope};

static STREAM_DECL_DESCS: StrDescs = StrDescs(&[
    ("auds", "Audio stream"),
    ("mids", "MIDI stream"),
    ("txts", "Text stream"),
    ("vids", "Video stream"),
]);

/// `avih`, the main header inside the `hdrl` list.
pub(crate) fn main_header(scan: &mut Scan<'_>) -> Result<(), ScanError> {
    scan.field_u32("micro_sec_per_frame")?;
    scan.field_u32("max_bytes_per_sec")?;
    scan.field_u32("padding_granularity")?;
    scan.field_struct("flags", |scan| {
        scan.field_raw("unused0", 2)?;
        scan.field_bool("must_use_index")?;
        scan.field_bool("has_index")?;
        scan.field_raw("unused1", 8)?;
        // key frames are found through the chunk kind when set
        scan.field_bool("trust_ck_type")?;
        scan.field_raw("unused2", 2)?;
        scan.field_bool("is_interleaved")?;
        scan.field_raw("unused3", 6)?;
        scan.field_bool("copyrighted")?;
        scan.field_bool("was_capture_file")?;
        scan.field_raw("unused4", 8)
    })?;
    scan.field_u32("total_frames")?;
    scan.field_u32("initial_frames")?;
    scan.field_u32("streams")?;
    scan.field_u32("suggested_buffer_size")?;
    scan.field_u32("width")?;
    scan.field_u32("height")?;
    scan.field_raw("reserved", 32 * 4)
}

/// `dmlh`, the OpenDML extension header.
pub(crate) fn extended_header(scan: &mut Scan<'_>) -> Result<(), ScanError> {
    scan.field_u32("total_frames")?;
    scan.field_raw("future", 32 * 61)
}

/// `strh`. The declared kind and handler land in the `strl` scope so
/// the following `strf` knows how to read its body.
pub(crate) fn stream_header(
    scan: &mut Scan<'_>,
    scope: Option<&mut StrlScope>,
) -> Result<(), ScanError> {
    let declared = scan.field_utf8_with("type", 4, &STREAM_DECL_DESCS)?;
    let handler = scan.field_utf8("handler", 4)?;
    scan.field_struct("flags", |scan| {
        scan.field_raw("unused0", 7)?;
        scan.field_bool("disabled")?;
        scan.field_raw("unused1", 15)?;
        scan.field_bool("pal_changes")?;
        scan.field_raw("unused2", 8)
    })?;
    scan.field_u16("priority")?;
    scan.field_u16("language")?;
    scan.field_u32("initial_frames")?;
    scan.field_u32("scale")?;
    scan.field_u32("rate")?;
    scan.field_u32("start")?;
    scan.field_u32("length")?;
    scan.field_u32("suggested_buffer_size")?;
    scan.field_u32("quality")?;
    scan.field_u32("sample_size")?;
    scan.field_struct("frame", |scan| {
        scan.field_u16("left")?;
        scan.field_u16("top")?;
        scan.field_u16("right")?;
        scan.field_u16("bottom")?;
        Ok(())
    })?;

    if let Some(scope) = scope {
        scope.declared_kind = declared;
        scope.handler = handler;
    }
    Ok(())
}

/// `strf`. The body layout depends on the kind the enclosing `strl`
/// declared; an unknown kind leaves the body to the frame. A stream is
/// registered either way, keeping stream numbers aligned with `strf`
/// order even in files missing their `strh`.
pub(crate) fn stream_format(
    scan: &mut Scan<'_>,
    scope: Option<&mut StrlScope>,
    streams: &mut Vec<StreamState>,
) -> Result<(), ScanError> {
    let (declared_kind, handler) = scope
        .as_ref()
        .map(|s| (s.declared_kind.clone(), s.handler.clone()))
        .unwrap_or_default();
    let mut state = StreamState::new(declared_kind, handler);

    match state.declared_kind.as_str() {
        "vids" => video_format(scan, &mut state)?,
        "auds" => wave_format(scan, &mut state)?,
        "iavs" => dv_format(scan)?,
        _ => {}
    }

    let slot = streams.len();
    streams.push(state);
    if let Some(scope) = scope {
        scope.stream = Some(slot);
    }
    Ok(())
}

/// BITMAPINFOHEADER.
fn video_format(scan: &mut Scan<'_>, state: &mut StreamState) -> Result<(), ScanError> {
    let body_bits = scan.bits_left();
    let bi_size = scan.field_u32("bi_size")?;
    scan.field_u32("width")?;
    scan.field_u32("height")?;
    scan.field_u16("planes")?;
    scan.field_u16("bit_count")?;
    let compression = scan.field_utf8("compression", 4)?;
    scan.field_u32("size_image")?;
    scan.field_u32("x_pels_per_meter")?;
    scan.field_u32("y_pels_per_meter")?;
    scan.field_u32("clr_used")?;
    scan.field_u32("clr_important")?;
    // bi_size counts the header without the chunk preamble
    let used = bi_size * 8 + 2 * 32;
    if body_bits > used {
        scan.field_raw("extra", body_bits - used)?;
    }

    if let Some(codec) = codec::video_codec(&compression) {
        state.codec = Some(codec);
    }
    Ok(())
}

/// WAVEFORMATEX.
fn wave_format(scan: &mut Scan<'_>, state: &mut StreamState) -> Result<(), ScanError> {
    let format_tag = scan.field_u16_with("format_tag", &codec::WAV_TAG_SYMS)?;
    scan.field_u16("channels")?;
    scan.field_u32("samples_per_sec")?;
    scan.field_u32("avg_bytes_per_sec")?;
    scan.field_u16("block_align")?;
    scan.field_u16("bits_per_sample")?;
    // plain WAVEFORMAT bodies stop before cb_size
    if scan.bits_left() >= 16 {
        let cb_size = scan.field_u16("cb_size")?;
        if cb_size > 18 {
            scan.field_raw("extra", (cb_size - 18) * 8)?;
        }
    }

    if let Some(codec) = codec::audio_codec(format_tag) {
        state.codec = Some(codec);
    }
    Ok(())
}

/// DVINFO.
fn dv_format(scan: &mut Scan<'_>) -> Result<(), ScanError> {
    scan.field_u32("dva_aux_src")?;
    scan.field_u32("dva_aux_ctl")?;
    scan.field_u32("dva_aux_src1")?;
    scan.field_u32("dva_aux_ctl1")?;
    scan.field_u32("dvv_aux_src")?;
    scan.field_u32("dvv_aux_ctl")?;
    scan.field_raw("dvv_reserved", 32 * 2)
}

/// `vprp`, OpenDML video properties.
pub(crate) fn video_properties(scan: &mut Scan<'_>) -> Result<(), ScanError> {
    scan.field_u32("video_format_token")?;
    scan.field_u32("video_standard")?;
    scan.field_u32("vertical_refresh_rate")?;
    scan.field_u32("h_total_in_t")?;
    scan.field_u32("v_total_in_lines")?;
    scan.field_struct("frame_aspect_ratio", |scan| {
        scan.field_u16("x")?;
        scan.field_u16("y")?;
        Ok(())
    })?;
    scan.field_u32("frame_width_in_pixels")?;
    scan.field_u32("frame_height_in_lines")?;
    let fields = scan.field_u32("nb_field_per_frame")?;
    scan.field_array("field_info", |scan| {
        for _ in 0..fields {
            scan.field_struct("field_info", |scan| {
                scan.field_u32("compressed_bm_height")?;
                scan.field_u32("compressed_bm_width")?;
                scan.field_u32("valid_bm_height")?;
                scan.field_u32("valid_bm_width")?;
                scan.field_u32("valid_bmx_offset")?;
                scan.field_u32("valid_bmy_offset")?;
                scan.field_u32("video_x_offset_in_t")?;
                scan.field_u32("video_y_valid_start_line")?;
                Ok(())
            })?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use crate::codec::CodecRef;

    use super::*;

    fn le16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }
    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    #[test]
    fn main_header_flag_bits() {
        let mut body = Vec::new();
        body.extend_from_slice(&le32(33_333)); // micro_sec_per_frame
        body.extend_from_slice(&le32(0));
        body.extend_from_slice(&le32(0));
        // AVIF_HASINDEX | AVIF_MUSTUSEINDEX | AVIF_TRUSTCKTYPE
        body.extend_from_slice(&le32(0x0000_0830));
        body.extend_from_slice(&le32(100)); // total_frames
        body.extend_from_slice(&le32(0));
        body.extend_from_slice(&le32(2)); // streams
        body.extend_from_slice(&le32(0));
        body.extend_from_slice(&le32(640));
        body.extend_from_slice(&le32(480));
        body.extend_from_slice(&[0u8; 16]); // reserved

        let mut scan = Scan::new(&body);
        main_header(&mut scan).unwrap();
        assert_eq!(scan.bits_left(), 0);
        let root = scan.finish("avih");

        let flags = root.child("flags").unwrap();
        assert_eq!(flags.child("must_use_index").unwrap().as_bool(), Some(true));
        assert_eq!(flags.child("has_index").unwrap().as_bool(), Some(true));
        assert_eq!(flags.child("trust_ck_type").unwrap().as_bool(), Some(true));
        assert_eq!(flags.child("is_interleaved").unwrap().as_bool(), Some(false));
        assert_eq!(root.child("total_frames").unwrap().as_uint(), Some(100));
        assert_eq!(root.child("width").unwrap().as_uint(), Some(640));
    }

    #[test]
    fn stream_header_fills_the_scope() {
        let mut body = Vec::new();
        body.extend_from_slice(b"vids");
        body.extend_from_slice(b"H264");
        body.extend_from_slice(&le32(0)); // flags
        body.extend_from_slice(&le16(0));
        body.extend_from_slice(&le16(0));
        for v in [0u32, 1, 30, 0, 100, 0, 0, 0] {
            body.extend_from_slice(&le32(v));
        }
        for v in [0u16, 0, 640, 480] {
            body.extend_from_slice(&le16(v));
        }

        let mut scope = StrlScope::default();
        let mut scan = Scan::new(&body);
        stream_header(&mut scan, Some(&mut scope)).unwrap();

        assert_eq!(scope.declared_kind, "vids");
        assert_eq!(scope.handler, "H264");
        assert_eq!(scan.bits_left(), 0);
        let root = scan.finish("strh");
        let kind = root.child("type").unwrap();
        assert_eq!(kind.as_str(), Some("vids"));
        assert_eq!(kind.scalar().unwrap().desc, Some("Video stream"));
        let frame = root.child("frame").unwrap();
        assert_eq!(frame.child("right").unwrap().as_uint(), Some(640));
    }

    fn bitmap_info(bi_size: u32, compression: &[u8; 4], tail: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&le32(bi_size));
        body.extend_from_slice(&le32(640));
        body.extend_from_slice(&le32(480));
        body.extend_from_slice(&le16(1));
        body.extend_from_slice(&le16(24));
        body.extend_from_slice(compression);
        for _ in 0..5 {
            body.extend_from_slice(&le32(0));
        }
        body.extend_from_slice(tail);
        body
    }

    #[test]
    fn video_format_maps_codec_and_measures_extra() {
        // 12 tail bytes: the extra field is the tail minus two words.
        let body = bitmap_info(40, b"H264", &[0xaa; 12]);
        let mut scope = StrlScope {
            declared_kind: "vids".into(),
            handler: "H264".into(),
            stream: None,
        };
        let mut streams = Vec::new();
        let mut scan = Scan::new(&body);
        stream_format(&mut scan, Some(&mut scope), &mut streams).unwrap();

        assert_eq!(scope.stream, Some(0));
        assert_eq!(streams[0].codec, Some(CodecRef::AvcAu));
        let root = scan.finish("strf");
        let extra = root.child("extra").unwrap();
        assert_eq!(extra.start, 40 * 8);
        assert_eq!(extra.len, 32);
    }

    #[test]
    fn video_format_without_extra_bytes() {
        let body = bitmap_info(40, b"rle ", &[]);
        let mut streams = Vec::new();
        let mut scope = StrlScope {
            declared_kind: "vids".into(),
            handler: "mjpg".into(),
            stream: None,
        };
        let mut scan = Scan::new(&body);
        stream_format(&mut scan, Some(&mut scope), &mut streams).unwrap();

        assert_eq!(streams[0].codec, None);
        assert!(scan.finish("strf").child("extra").is_none());
    }

    fn wave_format_ex(format_tag: u16, cb_size: Option<u16>, extra: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&le16(format_tag));
        body.extend_from_slice(&le16(2)); // channels
        body.extend_from_slice(&le32(44_100));
        body.extend_from_slice(&le32(176_400));
        body.extend_from_slice(&le16(4));
        body.extend_from_slice(&le16(16));
        if let Some(cb) = cb_size {
            body.extend_from_slice(&le16(cb));
        }
        body.extend_from_slice(extra);
        body
    }

    #[test]
    fn wave_format_reads_the_optional_tail() {
        let body = wave_format_ex(0x0055, Some(22), &[1, 2, 3, 4]);
        let mut scope = StrlScope {
            declared_kind: "auds".into(),
            handler: String::new(),
            stream: None,
        };
        let mut streams = Vec::new();
        let mut scan = Scan::new(&body);
        stream_format(&mut scan, Some(&mut scope), &mut streams).unwrap();

        assert_eq!(streams[0].codec, Some(CodecRef::Mp3Frame));
        let root = scan.finish("strf");
        assert_eq!(root.child("format_tag").unwrap().sym(), Some("mp3"));
        assert_eq!(root.child("cb_size").unwrap().as_uint(), Some(22));
        assert_eq!(root.child("extra").unwrap().len, 32);
    }

    #[test]
    fn plain_wave_format_has_no_cb_size() {
        let body = wave_format_ex(0x0001, None, &[]);
        let mut scope = StrlScope {
            declared_kind: "auds".into(),
            handler: String::new(),
            stream: None,
        };
        let mut streams = Vec::new();
        let mut scan = Scan::new(&body);
        stream_format(&mut scan, Some(&mut scope), &mut streams).unwrap();

        assert_eq!(streams[0].codec, None);
        assert!(scan.finish("strf").child("cb_size").is_none());
    }

    #[test]
    fn format_without_scope_still_registers_a_stream() {
        let body = [0u8; 8];
        let mut streams = Vec::new();
        let mut scan = Scan::new(&body);
        stream_format(&mut scan, None, &mut streams).unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].declared_kind, "");
        // Unknown kind: the body is left for the enclosing frame.
        assert_eq!(scan.pos(), 0);
    }

    #[test]
    fn dv_format_layout() {
        let body = [0u8; 32];
        let mut scope = StrlScope {
            declared_kind: "iavs".into(),
            handler: "dvsd".into(),
            stream: None,
        };
        let mut streams = Vec::new();
        let mut scan = Scan::new(&body);
        stream_format(&mut scan, Some(&mut scope), &mut streams).unwrap();

        assert_eq!(scan.bits_left(), 0);
        let root = scan.finish("strf");
        assert!(root.child("dva_aux_src").is_some());
        assert_eq!(root.child("dvv_reserved").unwrap().len, 64);
    }

    #[test]
    fn video_properties_field_info_count() {
        let mut body = Vec::new();
        for v in [0u32, 0, 60, 0, 0] {
            body.extend_from_slice(&le32(v));
        }
        body.extend_from_slice(&le16(4));
        body.extend_from_slice(&le16(3));
        body.extend_from_slice(&le32(704));
        body.extend_from_slice(&le32(480));
        body.extend_from_slice(&le32(2)); // nb_field_per_frame
        for _ in 0..2 {
            body.extend_from_slice(&[0u8; 32]);
        }

        let mut scan = Scan::new(&body);
        video_properties(&mut scan).unwrap();
        assert_eq!(scan.bits_left(), 0);
        let root = scan.finish("vprp");

        let ratio = root.child("frame_aspect_ratio").unwrap();
        assert_eq!(ratio.child("x").unwrap().as_uint(), Some(4));
        assert_eq!(ratio.child("y").unwrap().as_uint(), Some(3));
        assert_eq!(root.child("field_info").unwrap().children().len(), 2);
    }
}
