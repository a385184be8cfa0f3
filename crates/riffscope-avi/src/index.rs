//! The three index flavors and the policy that picks between them.
//!
//! An AVI file can locate samples through a super index (`indx`, whose
//! entries point at `ix` chunks elsewhere in the file), through `ix`
//! chunks met inline in the `movi` list, or through the legacy `idx1`
//! chunk at the end. Real files often carry more than one; samples are
//! taken from exactly one source, in that order of preference.

use std::collections::HashSet;
use std::fmt;

use riffscope_bits::{Scan, ScanError, UintSyms};
use tracing::warn;

use crate::streams::{BitRange, LegacyEntry, StreamState};
use crate::tag::{StreamTag, Tag, decorate_stream_id};

static INDEX_TYPE_SYMS: UintSyms = UintSyms(&[(0, "indexes"), (1, "chunks")]);
static INDEX_SUBTYPE_SYMS: UintSyms = UintSyms(&[(1, "2fields")]);

/// Where a stream's samples were found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexSource {
    SuperIndex,
    InlineIndex,
    LegacyIndex,
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexSource::SuperIndex => "indx",
            IndexSource::InlineIndex => "ix",
            IndexSource::LegacyIndex => "idx1",
        })
    }
}

/// Decode a chunk index body, shared by `ix` chunks and the targets a
/// super index points at. Returns the sample ranges it lists.
///
/// The size word doubles as a key frame marker in its top bit, so the
/// plain size and the flag are synthesized next to it.
pub(crate) fn sub_index(scan: &mut Scan<'_>) -> Result<Vec<BitRange>, ScanError> {
    let mut ranges = Vec::new();

    scan.field_u16("longs_per_entry")?;
    scan.field_u8_with("index_subtype", &INDEX_SUBTYPE_SYMS)?;
    scan.field_u8_with("index_type", &INDEX_TYPE_SYMS)?;
    let entries_in_use = scan.field_u32("entries_in_use")?;
    let chunk_id = Tag::peek(scan)?;
    scan.field_utf8("chunk_id", 4)?;
    decorate_stream_id(scan, chunk_id);
    let base_offset = scan.field_u64("base_offset")?;
    scan.field_u32("unused")?;
    scan.field_array("index", |scan| {
        for _ in 0..entries_in_use {
            scan.field_struct("index", |scan| {
                let offset = scan.field_u32("offset")?;
                let size_keyframe = scan.field_u32("size_keyframe")?;
                let size = size_keyframe & 0x7fff_ffff;
                scan.value_uint("size", size);
                scan.value_bool("key_frame", size_keyframe & 0x8000_0000 == 0);
                ranges.push(BitRange {
                    start: base_offset.saturating_add(offset).saturating_mul(8),
                    len: size * 8,
                });
                Ok(())
            })?;
        }
        Ok(())
    })?;

    Ok(ranges)
}

/// Decode an `indx` chunk. Entry ranges land in the stream's super
/// index when the enclosing `strl` already registered one; the fields
/// are emitted either way.
pub(crate) fn super_index(
    scan: &mut Scan<'_>,
    mut stream: Option<&mut StreamState>,
) -> Result<(), ScanError> {
    scan.field_u16("longs_per_entry")?;
    scan.field_u8("index_subtype")?;
    scan.field_u8("index_type")?;
    let entries_in_use = scan.field_u32("entries_in_use")?;
    let chunk_id = Tag::peek(scan)?;
    scan.field_utf8("chunk_id", 4)?;
    decorate_stream_id(scan, chunk_id);
    let base = scan.field_u64("base")?;
    scan.field_u32("unused")?;
    scan.field_array("index", |scan| {
        for _ in 0..entries_in_use {
            scan.field_struct("index", |scan| {
                let offset = scan.field_u64("offset")?;
                let size = scan.field_u32("size")?;
                scan.field_u32("duration")?;
                if let Some(stream) = stream.as_deref_mut() {
                    stream.super_index.push(BitRange {
                        start: base.saturating_add(offset).saturating_mul(8),
                        len: size * 8,
                    });
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

/// Decode the legacy `idx1` chunk into per-entry records.
///
/// Trailing bytes shorter than a full entry are left to the frame; some
/// muxers pad the chunk.
pub(crate) fn legacy_index(
    scan: &mut Scan<'_>,
    out: &mut Vec<LegacyEntry>,
) -> Result<(), ScanError> {
    scan.field_array("indexes", |scan| {
        while scan.bits_left() >= 4 * 32 {
            scan.field_struct("index", |scan| {
                let tag = Tag::peek(scan)?;
                scan.field_utf8("id", 4)?;
                let decorated = decorate_stream_id(scan, tag);
                scan.field_struct("flags", |scan| {
                    scan.field_raw("unused0", 3)?;
                    scan.field_bool("key_frame")?;
                    scan.field_raw("unused1", 3)?;
                    scan.field_bool("list")?;
                    scan.field_raw("unused2", 24)
                })?;
                let offset = scan.field_u32("offset")?;
                let length = scan.field_u32("length")?;

                // Any classifiable id keeps its stream number, so a
                // palette chunk is not attributed to stream zero.
                let stream_nr = decorated
                    .or_else(|| StreamTag::classify(tag))
                    .map_or(0, |st| st.nr);
                out.push(LegacyEntry {
                    offset: offset * 8,
                    len: length * 8,
                    stream_nr,
                });
                Ok(())
            })?;
        }
        Ok(())
    })
}

/// Follow a stream's super index and decode every `ix` chunk it points
/// at, collecting the sample ranges they list. Entries that repeat an
/// offset or point outside the file are skipped.
pub(crate) fn resolve_super_index(
    scan: &mut Scan<'_>,
    entries: &[BitRange],
) -> Result<Vec<BitRange>, ScanError> {
    let mut samples = Vec::new();
    let mut visited: HashSet<u64> = HashSet::new();

    scan.field_array("indexes", |scan| {
        for entry in entries {
            if !visited.insert(entry.start) {
                warn!(start = entry.start, "super index repeats an entry offset, skipping");
                continue;
            }
            let past_end = entry
                .start
                .checked_add(entry.len)
                .is_none_or(|end| end > scan.bit_len());
            if past_end {
                warn!(
                    start = entry.start,
                    len = entry.len,
                    "super index entry points outside the file, skipping"
                );
                continue;
            }
            scan.field_struct("index", |scan| {
                scan.ranged(entry.start, entry.len, |scan| {
                    scan.field_utf8("type", 4)?;
                    scan.field_u32("cb")?;
                    samples.extend(sub_index(scan)?);
                    Ok(())
                })
            })?;
        }
        Ok(())
    })?;

    Ok(samples)
}

/// Pick the sample source for one stream.
///
/// Resolved super index entries win, then inline `ix` ranges, then the
/// legacy index. The legacy branch filters by stream number but is
/// chosen on the unfiltered chunk, so a stream absent from `idx1`
/// still reports the legacy source with no samples.
pub(crate) fn select_samples(
    resolved: Vec<BitRange>,
    inline: &[BitRange],
    legacy: &[LegacyEntry],
    stream_nr: usize,
    movi_pos: u64,
) -> Option<(IndexSource, Vec<BitRange>)> {
    if !resolved.is_empty() {
        return Some((IndexSource::SuperIndex, resolved));
    }
    if !inline.is_empty() {
        return Some((IndexSource::InlineIndex, inline.to_vec()));
    }
    if !legacy.is_empty() {
        let ranges = legacy
            .iter()
            .filter(|e| e.stream_nr == stream_nr)
            .map(|e| BitRange {
                // Offsets count from the movi list type; the extra word
                // skips the size field of the chunk pointed at.
                start: movi_pos.saturating_add(e.offset).saturating_add(32),
                len: e.len,
            })
            .collect();
        return Some((IndexSource::LegacyIndex, ranges));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }
    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }
    fn le64(v: u64) -> [u8; 8] {
        v.to_le_bytes()
    }

    fn chunk_index_body(entries: &[(u32, u32)]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&le16(2)); // longs_per_entry
        b.push(1); // index_subtype
        b.push(1); // index_type
        b.extend_from_slice(&le32(u32::try_from(entries.len()).unwrap()));
        b.extend_from_slice(b"00dc");
        b.extend_from_slice(&le64(16)); // base_offset
        b.extend_from_slice(&le32(0)); // unused
        for (offset, size_keyframe) in entries {
            b.extend_from_slice(&le32(*offset));
            b.extend_from_slice(&le32(*size_keyframe));
        }
        b
    }

    #[test]
    fn chunk_index_ranges_add_the_base_offset() {
        let body = chunk_index_body(&[(0, 0x8000_0010), (32, 0x20)]);
        let mut scan = Scan::new(&body);
        let ranges = sub_index(&mut scan).unwrap();

        assert_eq!(
            ranges,
            vec![
                BitRange { start: 16 * 8, len: 0x10 * 8 },
                BitRange { start: (16 + 32) * 8, len: 0x20 * 8 },
            ]
        );

        let root = scan.finish("ix");
        assert_eq!(root.child("index_subtype").unwrap().sym(), Some("2fields"));
        assert_eq!(root.child("index_type").unwrap().sym(), Some("chunks"));
        assert_eq!(root.child("stream_type").unwrap().as_str(), Some("dc"));

        let first = root.child("index").unwrap().at(0).unwrap();
        assert_eq!(first.child("size").unwrap().as_uint(), Some(0x10));
        assert_eq!(first.child("key_frame").unwrap().as_bool(), Some(false));
        let second = root.child("index").unwrap().at(1).unwrap();
        assert_eq!(second.child("key_frame").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn super_index_fields_decode_without_a_stream() {
        let mut b = Vec::new();
        b.extend_from_slice(&le16(4));
        b.push(0);
        b.push(0);
        b.extend_from_slice(&le32(1));
        b.extend_from_slice(b"00dc");
        b.extend_from_slice(&le64(0)); // base
        b.extend_from_slice(&le32(0)); // unused
        b.extend_from_slice(&le64(1024)); // offset
        b.extend_from_slice(&le32(64)); // size
        b.extend_from_slice(&le32(1)); // duration

        let mut scan = Scan::new(&b);
        super_index(&mut scan, None).unwrap();
        let root = scan.finish("indx");

        assert_eq!(root.child("entries_in_use").unwrap().as_uint(), Some(1));
        assert_eq!(root.child("base").unwrap().as_uint(), Some(0));
        let entry = root.child("index").unwrap().at(0).unwrap();
        assert_eq!(entry.child("offset").unwrap().as_uint(), Some(1024));
    }

    #[test]
    fn super_index_entries_land_in_the_stream_with_base_applied() {
        let mut b = Vec::new();
        b.extend_from_slice(&le16(4));
        b.push(0);
        b.push(0);
        b.extend_from_slice(&le32(2));
        b.extend_from_slice(b"00dc");
        b.extend_from_slice(&le64(256)); // base
        b.extend_from_slice(&le32(0));
        for (offset, size) in [(0u64, 32u32), (64, 16)] {
            b.extend_from_slice(&le64(offset));
            b.extend_from_slice(&le32(size));
            b.extend_from_slice(&le32(0)); // duration
        }

        let mut state = StreamState::new("vids".into(), "h264".into());
        let mut scan = Scan::new(&b);
        super_index(&mut scan, Some(&mut state)).unwrap();

        assert_eq!(
            state.super_index,
            vec![
                BitRange { start: 256 * 8, len: 32 * 8 },
                BitRange { start: (256 + 64) * 8, len: 16 * 8 },
            ]
        );
    }

    fn idx1_entry(id: &[u8; 4], offset: u32, length: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(id);
        b.extend_from_slice(&le32(0)); // flags
        b.extend_from_slice(&le32(offset));
        b.extend_from_slice(&le32(length));
        b
    }

    #[test]
    fn legacy_entries_keep_their_classified_stream_number() {
        let mut body = idx1_entry(b"00dc", 4, 100);
        body.extend_from_slice(&idx1_entry(b"01pc", 112, 8));
        body.extend_from_slice(&idx1_entry(b"zzzz", 128, 8));
        body.extend_from_slice(&[0xab, 0xcd]); // trailing pad, not an entry

        let mut out = Vec::new();
        let mut scan = Scan::new(&body);
        legacy_index(&mut scan, &mut out).unwrap();

        let nrs: Vec<usize> = out.iter().map(|e| e.stream_nr).collect();
        assert_eq!(nrs, vec![0, 1, 0]);
        assert_eq!(out[0].offset, 4 * 8);
        assert_eq!(out[0].len, 100 * 8);

        let root = scan.finish("idx1");
        let indexes = root.child("indexes").unwrap();
        assert_eq!(indexes.children().len(), 3);
        // Only the payload entry is decorated.
        assert!(indexes.at(0).unwrap().child("stream_type").is_some());
        assert!(indexes.at(1).unwrap().child("stream_type").is_none());
    }

    #[test]
    fn samples_prefer_super_then_inline_then_legacy() {
        let resolved = vec![BitRange { start: 0, len: 8 }];
        let inline = vec![BitRange { start: 8, len: 8 }];
        let legacy = vec![LegacyEntry { offset: 0, len: 8, stream_nr: 0 }];

        let (source, _) =
            select_samples(resolved.clone(), &inline, &legacy, 0, 0).unwrap();
        assert_eq!(source, IndexSource::SuperIndex);

        let (source, ranges) = select_samples(Vec::new(), &inline, &legacy, 0, 0).unwrap();
        assert_eq!(source, IndexSource::InlineIndex);
        assert_eq!(ranges, inline);

        let (source, _) = select_samples(Vec::new(), &[], &legacy, 0, 0).unwrap();
        assert_eq!(source, IndexSource::LegacyIndex);

        assert!(select_samples(Vec::new(), &[], &[], 0, 0).is_none());
    }

    #[test]
    fn legacy_selection_rebases_on_movi_and_skips_the_chunk_header() {
        let legacy = vec![
            LegacyEntry { offset: 32, len: 800, stream_nr: 0 },
            LegacyEntry { offset: 1000, len: 160, stream_nr: 1 },
        ];

        let (source, ranges) = select_samples(Vec::new(), &[], &legacy, 0, 96).unwrap();
        assert_eq!(source, IndexSource::LegacyIndex);
        assert_eq!(ranges, vec![BitRange { start: 96 + 32 + 32, len: 800 }]);

        // A stream the index never mentions still selects the legacy
        // source, with nothing in it.
        let (source, ranges) = select_samples(Vec::new(), &[], &legacy, 7, 96).unwrap();
        assert_eq!(source, IndexSource::LegacyIndex);
        assert!(ranges.is_empty());
    }

    #[test]
    fn duplicate_and_out_of_file_super_entries_are_skipped() {
        // Buffer holds one real ix chunk body at byte 8.
        let mut data = vec![0u8; 8];
        data.extend_from_slice(b"ix00");
        data.extend_from_slice(&le32(24)); // cb
        data.extend_from_slice(&chunk_index_body(&[(0, 8)]));
        let target_len = (data.len() - 8) as u64 * 8;

        let entries = [
            BitRange { start: 64, len: target_len },
            BitRange { start: 64, len: target_len }, // duplicate
            BitRange { start: u64::MAX - 8, len: 64 }, // past the end
        ];
        let mut scan = Scan::new(&data);
        let samples = resolve_super_index(&mut scan, &entries).unwrap();
        assert_eq!(samples, vec![BitRange { start: 16 * 8, len: 8 * 8 }]);

        let root = scan.finish("stream");
        assert_eq!(root.child("indexes").unwrap().children().len(), 1);
    }
}
