//! The decoder proper: drives the chunk walker, dispatches bodies to
//! their handlers, and assembles the per-stream sample arrays once the
//! whole file has been walked.

use riffscope_bits::Scan;
use riffscope_tree::Node;
use tracing::debug;

use crate::codec::CodecSet;
use crate::error::AviError;
use crate::headers;
use crate::index;
use crate::streams::{BitRange, FileScope, StreamState, StreamSummary, StrlScope};
use crate::tag::{self, StreamTag, Tag};
use crate::walk::{self, Disposition, PathStack};

const RIFF_TYPE_AVI: &str = "AVI ";

/// Decoder knobs.
pub struct Options {
    /// Hand payload chunks and indexed samples to registered codecs.
    /// Off, or on with no codec registered for a stream, leaves sample
    /// data raw.
    pub decode_samples: bool,
    pub codecs: CodecSet,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            decode_samples: true,
            codecs: CodecSet::default(),
        }
    }
}

/// A decoded file: the full field tree plus one digest per stream.
#[derive(Debug)]
pub struct Dissection {
    pub root: Node,
    pub streams: Vec<StreamSummary>,
}

/// Decode a complete AVI file held in memory.
///
/// # Errors
///
/// - [`AviError::NotAvi`] when the outer chunk is not a `RIFF` of type
///   `AVI `.
/// - [`AviError::Scan`] when a chunk lies about its size, an index
///   points a sample outside the file, or a registered codec rejects a
///   sample.
pub fn decode(data: &[u8], options: &Options) -> Result<Dissection, AviError> {
    let mut scan = Scan::new(data);
    let mut state = FileScope::default();
    let mut path = PathStack::new();

    let mut head = |scan: &mut Scan<'_>, _: &PathStack<StrlScope>| {
        let tag = Tag::peek(scan)?;
        scan.field_utf8_with("id", 4, &tag::CHUNK_ID_DESCS)?;
        tag::decorate_stream_id(scan, tag);
        let size = scan.field_u32("size")?;
        Ok::<_, AviError>((tag, size))
    };
    let mut body = |scan: &mut Scan<'_>, tag: Tag, path: &mut PathStack<StrlScope>| {
        dispatch(scan, tag, path, &mut state, options)
    };
    walk::chunk(&mut scan, &mut path, &mut head, &mut body)?;

    // A wrong type errors inside the walk; this catches files where no
    // RIFF chunk showed up at all.
    if state.riff_type.as_deref() != Some(RIFF_TYPE_AVI) {
        return Err(AviError::NotAvi {
            found: state.riff_type.unwrap_or_default(),
        });
    }

    let streams = emit_streams(&mut scan, &state, options)?;
    Ok(Dissection {
        root: scan.finish("avi"),
        streams,
    })
}

fn dispatch(
    scan: &mut Scan<'_>,
    tag: Tag,
    path: &mut PathStack<StrlScope>,
    state: &mut FileScope,
    options: &Options,
) -> Result<Disposition<StrlScope>, AviError> {
    match &tag.0 {
        b"RIFF" => {
            let typ = scan.field_utf8("type", 4)?;
            if typ != RIFF_TYPE_AVI {
                return Err(AviError::NotAvi { found: typ });
            }
            state.riff_type = Some(typ);
            Ok(Disposition::Container(None))
        }
        b"LIST" => {
            let typ = scan.field_utf8_with("type", 4, &tag::LIST_TYPE_DESCS)?;
            match typ.as_str() {
                "strl" => return Ok(Disposition::Container(Some(StrlScope::default()))),
                "movi" => state.movi_pos = Some(scan.pos()),
                _ => {}
            }
            Ok(Disposition::Container(None))
        }
        b"avih" => {
            headers::main_header(scan)?;
            Ok(Disposition::Leaf)
        }
        b"dmlh" => {
            headers::extended_header(scan)?;
            Ok(Disposition::Leaf)
        }
        b"strh" => {
            headers::stream_header(scan, path.top_context_mut())?;
            Ok(Disposition::Leaf)
        }
        b"strf" => {
            headers::stream_format(scan, path.top_context_mut(), &mut state.streams)?;
            Ok(Disposition::Leaf)
        }
        b"indx" => {
            let stream = path
                .top_context()
                .and_then(|scope| scope.stream)
                .and_then(|slot| state.streams.get_mut(slot));
            index::super_index(scan, stream)?;
            Ok(Disposition::Leaf)
        }
        b"vprp" => {
            headers::video_properties(scan)?;
            Ok(Disposition::Leaf)
        }
        b"idx1" => {
            index::legacy_index(scan, &mut state.legacy)?;
            Ok(Disposition::Leaf)
        }
        _ => {
            fallback(scan, tag, state, options)?;
            Ok(Disposition::Leaf)
        }
    }
}

/// Chunks without a named handler: INFO strings, inline `ix` indexes,
/// stream payloads, and anything else as raw data.
fn fallback(
    scan: &mut Scan<'_>,
    tag: Tag,
    state: &mut FileScope,
    options: &Options,
) -> Result<(), AviError> {
    if tag::is_text_chunk(tag) {
        let bytes = scan.bits_left() / 8;
        scan.field_utf8_null_fixed("value", bytes)?;
        return Ok(());
    }

    match StreamTag::classify(tag) {
        Some(st) if st.kind == *b"ix" => {
            let ranges = index::sub_index(scan)?;
            if let Some(stream) = state.streams.get_mut(st.nr) {
                stream.inline_index.extend(ranges);
            } else {
                debug!(stream = st.nr, "ix chunk for an undeclared stream");
            }
        }
        Some(st) if st.is_payload() && st.nr < state.streams.len() => {
            payload_data(scan, &state.streams[st.nr], options)?;
        }
        Some(st) if st.is_payload() => {
            debug!(stream = st.nr, "payload chunk for an undeclared stream");
            scan.field_raw("data", scan.bits_left())?;
        }
        _ => {
            scan.field_raw("data", scan.bits_left())?;
        }
    }
    Ok(())
}

fn payload_data(
    scan: &mut Scan<'_>,
    stream: &StreamState,
    options: &Options,
) -> Result<(), AviError> {
    if scan.bits_left() > 0
        && options.decode_samples
        && let Some(codec) = stream.codec
        && let Some(decoder) = options.codecs.get(codec)
    {
        scan.field_struct("data", |scan| {
            decoder.decode(scan, stream.codec_arg.as_deref())
        })?;
    } else {
        scan.field_raw("data", scan.bits_left())?;
    }
    Ok(())
}

/// Emit the `streams` array after the walk: resolve each super index,
/// pick a sample source, and decode or dump the samples it lists.
fn emit_streams(
    scan: &mut Scan<'_>,
    state: &FileScope,
    options: &Options,
) -> Result<Vec<StreamSummary>, AviError> {
    let movi_pos = state.movi_pos.unwrap_or(0);
    let mut summaries = Vec::with_capacity(state.streams.len());

    scan.field_array("streams", |scan| -> Result<(), AviError> {
        for (nr, stream) in state.streams.iter().enumerate() {
            scan.field_struct("stream", |scan| -> Result<(), AviError> {
                let resolved = if stream.super_index.is_empty() {
                    Vec::new()
                } else {
                    index::resolve_super_index(scan, &stream.super_index)?
                };

                let selected = index::select_samples(
                    resolved,
                    &stream.inline_index,
                    &state.legacy,
                    nr,
                    movi_pos,
                );

                let source = selected.as_ref().map(|(source, _)| *source);
                let mut sample_count = 0;
                let mut sample_bits = 0;
                if let Some((_, ranges)) = &selected {
                    scan.field_array("samples", |scan| -> Result<(), AviError> {
                        for range in ranges {
                            emit_sample(scan, *range, stream, options)?;
                        }
                        Ok(())
                    })?;
                    sample_count = ranges.len();
                    sample_bits = ranges.iter().map(|r| r.len).sum();
                }

                summaries.push(StreamSummary {
                    declared_kind: stream.declared_kind.clone(),
                    handler: stream.handler.clone(),
                    codec: stream.codec,
                    source,
                    sample_count,
                    sample_bits,
                });
                Ok(())
            })?;
        }
        Ok(())
    })?;

    Ok(summaries)
}

fn emit_sample(
    scan: &mut Scan<'_>,
    range: BitRange,
    stream: &StreamState,
    options: &Options,
) -> Result<(), AviError> {
    scan.ranged(range.start, range.len, |scan| -> Result<(), AviError> {
        if range.len > 0
            && options.decode_samples
            && let Some(codec) = stream.codec
            && let Some(decoder) = options.codecs.get(codec)
        {
            scan.field_struct("sample", |scan| {
                decoder.decode(scan, stream.codec_arg.as_deref())
            })?;
        } else {
            scan.field_raw("sample", scan.bits_left())?;
        }
        Ok(())
    })
}
