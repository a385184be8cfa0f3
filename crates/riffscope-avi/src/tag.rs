use std::fmt;

use riffscope_bits::{Scan, ScanError, StrDescs};

/// Four-character chunk tag, kept as raw bytes so non-ASCII ids survive
/// untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// Read the next four bytes as a tag without moving the cursor; the
    /// caller still emits the `id` field afterwards.
    pub fn peek(scan: &mut Scan<'_>) -> Result<Tag, ScanError> {
        let raw = scan.peek_bits(32)? as u32;
        Ok(Tag(raw.to_be_bytes()))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// A tag that encodes a stream number next to a two-character kind.
///
/// Two spellings exist: digits first (`00dc`, payload chunks) and digits
/// last (`ix00`, per-stream index chunks). Digits-first wins when both
/// halves qualify, so `0123` reads as stream 1, kind `23`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamTag {
    pub kind: [u8; 2],
    pub nr: usize,
}

impl StreamTag {
    pub fn classify(tag: Tag) -> Option<StreamTag> {
        let [a, b, c, d] = tag.0;
        if is_digits(a, b) {
            return Some(StreamTag {
                kind: [c, d],
                nr: digits(a, b),
            });
        }
        if is_digits(c, d) {
            return Some(StreamTag {
                kind: [a, b],
                nr: digits(c, d),
            });
        }
        None
    }

    /// Kinds that carry stream samples. `pc` (palette change) and `ix`
    /// (index) classify fine but are not payload.
    pub fn is_payload(self) -> bool {
        matches!(&self.kind, b"db" | b"dc" | b"wb")
    }

    pub fn kind_lossy(self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

fn is_digits(a: u8, b: u8) -> bool {
    a.is_ascii_digit() && b.is_ascii_digit()
}

fn digits(a: u8, b: u8) -> usize {
    usize::from(a - b'0') * 10 + usize::from(b - b'0')
}

/// When a tag names a stream payload, synthesize `stream_type` and
/// `stream_nr` fields next to the id it was parsed from. Non-payload
/// tags get no decoration even when they classify.
pub(crate) fn decorate_stream_id(scan: &mut Scan<'_>, tag: Tag) -> Option<StreamTag> {
    let st = StreamTag::classify(tag)?;
    if !st.is_payload() {
        return None;
    }
    scan.value_str_with("stream_type", st.kind_lossy(), &STREAM_KIND_DESCS);
    scan.value_uint("stream_nr", st.nr as u64);
    Some(st)
}

pub(crate) static STREAM_KIND_DESCS: StrDescs = StrDescs(&[
    ("db", "Uncompressed video frame"),
    ("dc", "Compressed video frame"),
    ("pc", "Palette change"),
    ("wb", "Audio data"),
    ("ix", "Index"),
]);

pub(crate) static LIST_TYPE_DESCS: StrDescs = StrDescs(&[
    ("hdrl", "AVI main list"),
    ("strl", "Stream list"),
    ("movi", "Stream Data"),
    ("rec ", "Chunk group"),
]);

pub(crate) static CHUNK_ID_DESCS: StrDescs = StrDescs(&[
    ("RIFF", "Resource Interchange File Format"),
    ("LIST", "List container"),
    ("JUNK", "Padding"),
    ("avih", "AVI main header"),
    ("dmlh", "Extended AVI header"),
    ("strh", "Stream header"),
    ("strf", "Stream format"),
    ("strd", "Stream codec data"),
    ("strn", "Stream name"),
    ("indx", "Super index"),
    ("vprp", "Video properties"),
    ("idx1", "Legacy index"),
    ("IARL", "Archival location"),
    ("IART", "Artist"),
    ("ICMS", "Commissioned by"),
    ("ICMT", "Comment"),
    ("ICOP", "Copyright"),
    ("ICRD", "Creation date"),
    ("ICRP", "Cropping"),
    ("IDIM", "Dimensions"),
    ("IDPI", "Dots per inch"),
    ("IENG", "Engineer"),
    ("IGNR", "Genre"),
    ("IKEY", "Keywords"),
    ("ILGT", "Lightness"),
    ("IMED", "Medium"),
    ("INAM", "Title"),
    ("IPLT", "Palette"),
    ("IPRD", "Product"),
    ("ISBJ", "Subject"),
    ("ISFT", "Software"),
    ("ISHP", "Sharpness"),
    ("ISRC", "Source"),
    ("ISRF", "Source form"),
    ("ITCH", "Technician"),
]);

/// INFO text chunks plus the stream-name chunk: their body is a
/// NUL-padded string rather than binary data.
pub(crate) fn is_text_chunk(tag: Tag) -> bool {
    matches!(
        &tag.0,
        b"IARL"
            | b"IART"
            | b"ICMS"
            | b"ICMT"
            | b"ICOP"
            | b"ICRD"
            | b"ICRP"
            | b"IDIM"
            | b"IDPI"
            | b"IENG"
            | b"IGNR"
            | b"IKEY"
            | b"ILGT"
            | b"IMED"
            | b"INAM"
            | b"IPLT"
            | b"IPRD"
            | b"ISBJ"
            | b"ISFT"
            | b"ISHP"
            | b"ISRC"
            | b"ISRF"
            | b"ITCH"
            | b"strn"
    )
}
