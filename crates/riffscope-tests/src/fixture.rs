//! In-memory AVI assembly.
//!
//! Real capture files are megabytes of opaque payload, so the suite
//! builds byte-exact miniatures instead. [`FixtureWriter`] appends
//! chunks and patches container sizes when they close, which lets a
//! test read like the file layout it produces. The free functions below
//! fill the fixed-layout header bodies.

/// Appends RIFF structure to a growing buffer.
///
/// `begin`/`end` handle the size back-patching that containers need;
/// `chunk` writes a complete leaf including the pad byte after an odd
/// body. `pos` and `patch` are for tests that need to plant absolute
/// file offsets inside index chunks.
#[derive(Default)]
pub struct FixtureWriter {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl FixtureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte offset the next write lands at.
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    /// Append bytes verbatim, for hand-built (or deliberately broken)
    /// structure.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a complete chunk: id, little-endian size, body, and a pad
    /// byte when the body length is odd.
    pub fn chunk(&mut self, id: &[u8; 4], body: &[u8]) {
        self.buf.extend_from_slice(id);
        self.buf
            .extend_from_slice(&(body.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(body);
        if body.len() % 2 == 1 {
            self.buf.push(0);
        }
    }

    /// Open a `RIFF` or `LIST` container. The size field is patched by
    /// the matching [`end`](Self::end).
    pub fn begin(&mut self, id: &[u8; 4], typ: &[u8; 4]) {
        self.buf.extend_from_slice(id);
        self.open.push(self.buf.len());
        self.buf.extend_from_slice(&[0; 4]);
        self.buf.extend_from_slice(typ);
    }

    /// Close the innermost open container.
    pub fn end(&mut self) {
        let size_pos = self.open.pop().expect("end without begin");
        let size = (self.buf.len() - size_pos - 4) as u32;
        self.buf[size_pos..size_pos + 4].copy_from_slice(&size.to_le_bytes());
        if size % 2 == 1 {
            self.buf.push(0);
        }
    }

    /// Overwrite bytes at an absolute offset, for offsets that are only
    /// known after the target has been written.
    pub fn patch(&mut self, pos: usize, bytes: &[u8]) {
        self.buf[pos..pos + bytes.len()].copy_from_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        assert!(self.open.is_empty(), "unclosed container");
        self.buf
    }
}

// ── Header bodies ─────────────────────────────────────────────────────────────

/// An `avih` body (56 bytes).
pub fn avih_body(flags: u32, total_frames: u32, streams: u32) -> Vec<u8> {
    let mut b = Vec::with_capacity(56);
    for v in [33_333, 0, 0, flags, total_frames, 0, streams, 0, 640, 480] {
        b.extend_from_slice(&v.to_le_bytes());
    }
    b.extend_from_slice(&[0; 16]);
    b
}

/// A `strh` body (56 bytes) declaring the given kind and handler.
pub fn strh_body(kind: &[u8; 4], handler: &[u8; 4]) -> Vec<u8> {
    let mut b = Vec::with_capacity(56);
    b.extend_from_slice(kind);
    b.extend_from_slice(handler);
    b.extend_from_slice(&0u32.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    b.extend_from_slice(&0u16.to_le_bytes());
    for v in [0u32, 1, 30, 0, 100, 0, 0, 0] {
        b.extend_from_slice(&v.to_le_bytes());
    }
    for v in [0u16, 0, 640, 480] {
        b.extend_from_slice(&v.to_le_bytes());
    }
    b
}

/// A BITMAPINFOHEADER `strf` body (40 bytes, no palette or extra data).
pub fn bitmap_body(compression: &[u8; 4]) -> Vec<u8> {
    let mut b = Vec::with_capacity(40);
    b.extend_from_slice(&40u32.to_le_bytes());
    b.extend_from_slice(&640u32.to_le_bytes());
    b.extend_from_slice(&480u32.to_le_bytes());
    b.extend_from_slice(&1u16.to_le_bytes());
    b.extend_from_slice(&24u16.to_le_bytes());
    b.extend_from_slice(compression);
    for _ in 0..5 {
        b.extend_from_slice(&0u32.to_le_bytes());
    }
    b
}

/// A plain WAVEFORMAT `strf` body (16 bytes, stops before `cb_size`).
pub fn wave_body(format_tag: u16) -> Vec<u8> {
    let mut b = Vec::with_capacity(16);
    b.extend_from_slice(&format_tag.to_le_bytes());
    b.extend_from_slice(&2u16.to_le_bytes());
    b.extend_from_slice(&44_100u32.to_le_bytes());
    b.extend_from_slice(&176_400u32.to_le_bytes());
    b.extend_from_slice(&4u16.to_le_bytes());
    b.extend_from_slice(&16u16.to_le_bytes());
    b
}

/// One 16-byte `idx1` entry. Offsets count from the `movi` fourcc.
pub fn idx1_entry(id: &[u8; 4], flags: u32, offset: u32, length: u32) -> Vec<u8> {
    let mut b = Vec::with_capacity(16);
    b.extend_from_slice(id);
    b.extend_from_slice(&flags.to_le_bytes());
    b.extend_from_slice(&offset.to_le_bytes());
    b.extend_from_slice(&length.to_le_bytes());
    b
}

/// An `ix` chunk body: 24-byte header plus `(offset, size)` entries.
/// Entry offsets are relative to `base_offset`.
pub fn ix_body(chunk_id: &[u8; 4], base_offset: u64, entries: &[(u32, u32)]) -> Vec<u8> {
    let mut b = Vec::with_capacity(24 + entries.len() * 8);
    b.extend_from_slice(&2u16.to_le_bytes()); // longs_per_entry
    b.push(0); // index_subtype
    b.push(1); // index_type: chunks
    b.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    b.extend_from_slice(chunk_id);
    b.extend_from_slice(&base_offset.to_le_bytes());
    b.extend_from_slice(&0u32.to_le_bytes()); // unused
    for (offset, size) in entries {
        b.extend_from_slice(&offset.to_le_bytes());
        b.extend_from_slice(&size.to_le_bytes());
    }
    b
}

/// An `indx` chunk body: 24-byte header plus `(offset, size, duration)`
/// entries pointing at `ix` chunks elsewhere in the file.
pub fn indx_body(chunk_id: &[u8; 4], base: u64, entries: &[(u64, u32, u32)]) -> Vec<u8> {
    let mut b = Vec::with_capacity(24 + entries.len() * 16);
    b.extend_from_slice(&4u16.to_le_bytes()); // longs_per_entry
    b.push(0); // index_subtype
    b.push(0); // index_type: indexes
    b.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    b.extend_from_slice(chunk_id);
    b.extend_from_slice(&base.to_le_bytes());
    b.extend_from_slice(&0u32.to_le_bytes()); // unused
    for (offset, size, duration) in entries {
        b.extend_from_slice(&offset.to_le_bytes());
        b.extend_from_slice(&size.to_le_bytes());
        b.extend_from_slice(&duration.to_le_bytes());
    }
    b
}

// ── Whole files ───────────────────────────────────────────────────────────────

/// A complete single-stream video file: `hdrl`, a `movi` list holding
/// `frames` payload chunks of `payload_len` bytes each, and an `idx1`
/// covering all of them. The first frame is flagged as a key frame and
/// each payload starts with its frame number.
pub fn video_file(frames: usize, payload_len: usize) -> Vec<u8> {
    let mut w = FixtureWriter::new();
    w.begin(b"RIFF", b"AVI ");

    w.begin(b"LIST", b"hdrl");
    w.chunk(b"avih", &avih_body(0x10, frames as u32, 1));
    w.begin(b"LIST", b"strl");
    w.chunk(b"strh", &strh_body(b"vids", b"H264"));
    w.chunk(b"strf", &bitmap_body(b"H264"));
    w.end();
    w.end();

    w.begin(b"LIST", b"movi");
    let movi_fourcc = w.pos() - 4;
    let mut offsets = Vec::with_capacity(frames);
    for i in 0..frames {
        offsets.push((w.pos() - movi_fourcc) as u32);
        let mut payload = vec![0u8; payload_len];
        if let Some(first) = payload.first_mut() {
            *first = i as u8;
        }
        w.chunk(b"00dc", &payload);
    }
    w.end();

    let mut idx = Vec::new();
    for (i, offset) in offsets.iter().enumerate() {
        let flags = if i == 0 { 0x10 } else { 0 };
        idx.extend_from_slice(&idx1_entry(b"00dc", flags, *offset, payload_len as u32));
    }
    w.chunk(b"idx1", &idx);

    w.end();
    w.into_bytes()
}
