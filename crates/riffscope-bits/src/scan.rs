use std::borrow::Cow;

use riffscope_tree::{Node, NodeBody, Scalar, Value};

use crate::error::ScanError;
use crate::mapper::Mapper;

/// Bit cursor over a borrowed buffer that records every read as a node.
///
/// `Scan` is the one mechanism behind the whole dissection: a read
/// advances the cursor, bounds-checks against the innermost frame, and
/// lands a [`Node`] (with its absolute bit range) in the currently open
/// container. The tree therefore is a faithful log of where every value
/// came from.
///
/// ```text
///   ┌───────────────────────────────────────────────────────────┐
///   │ pos    absolute bit cursor                                │
///   │ end    end of the innermost frame (framed scopes shrink   │
///   │        it, ranged scopes move it, both restore it)        │
///   │ stack  open struct/array containers awaiting children     │
///   └───────────────────────────────────────────────────────────┘
/// ```
///
/// Two bit-order rules hold everywhere:
/// - sub-byte reads take bits MSB-first within each byte, so a flags
///   byte splits into fields top bit first;
/// - multi-byte integers assemble little-endian, first byte lowest.
pub struct Scan<'a> {
    data: &'a [u8],
    pos: u64,
    end: u64,
    stack: Vec<Level>,
    root: Vec<Node>,
}

struct Level {
    name: Cow<'static, str>,
    kind: LevelKind,
    /// Cursor when the container was opened; the range of a container
    /// that ends up empty.
    entry: u64,
    children: Vec<Node>,
}

enum LevelKind {
    Struct,
    Array,
}

impl<'a> Scan<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let bit_len = data.len() as u64 * 8;
        Self {
            data,
            pos: 0,
            end: bit_len,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    /// Absolute bit position of the cursor.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Bits remaining in the innermost frame.
    pub fn bits_left(&self) -> u64 {
        self.end - self.pos
    }

    /// Total buffer size in bits.
    pub fn bit_len(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// Consume the cursor and return the finished tree under a root
    /// struct spanning the whole buffer.
    pub fn finish(mut self, name: impl Into<Cow<'static, str>>) -> Node {
        while let Some(level) = self.stack.pop() {
            let node = close_level(level);
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => self.root.push(node),
            }
        }
        Node {
            name: name.into(),
            start: 0,
            len: self.bit_len(),
            body: NodeBody::Struct(self.root),
        }
    }

    // ── Raw cursor ────────────────────────────────────────────────────

    /// Read `n` bits MSB-first without emitting a field.
    ///
    /// # Panics
    ///
    /// `n` must be at most 64; wider reads are a caller bug.
    fn take_bits(&mut self, n: u64) -> Result<u64, ScanError> {
        assert!(n <= 64, "bit reads are capped at 64 bits");
        if n > self.bits_left() {
            return Err(ScanError::OutOfRange {
                pos: self.pos,
                want: n,
                end: self.end,
            });
        }
        let mut v = 0u64;
        if self.pos % 8 == 0 && n % 8 == 0 {
            let first = (self.pos / 8) as usize;
            for &byte in &self.data[first..first + (n / 8) as usize] {
                v = (v << 8) | u64::from(byte);
            }
        } else {
            for i in 0..n {
                let bit = self.pos + i;
                let byte = self.data[(bit / 8) as usize];
                v = (v << 1) | u64::from((byte >> (7 - (bit % 8))) & 1);
            }
        }
        self.pos += n;
        Ok(v)
    }

    /// Read `count` bytes as a little-endian unsigned integer.
    fn take_bytes_le(&mut self, count: u64) -> Result<u64, ScanError> {
        let want = count * 8;
        if want > self.bits_left() {
            return Err(ScanError::OutOfRange {
                pos: self.pos,
                want,
                end: self.end,
            });
        }
        let mut v = 0u64;
        for i in 0..count {
            v |= self.take_bits(8)? << (8 * i);
        }
        Ok(v)
    }

    /// Read `n` bits without advancing the cursor.
    ///
    /// # Errors
    ///
    /// [`ScanError::OutOfRange`] if fewer than `n` bits remain in the
    /// innermost frame.
    pub fn peek_bits(&mut self, n: u64) -> Result<u64, ScanError> {
        let saved = self.pos;
        let v = self.take_bits(n)?;
        self.pos = saved;
        Ok(v)
    }

    // ── Field reads ───────────────────────────────────────────────────
    //
    // Every field read errors with [`ScanError::OutOfRange`] when it
    // would cross the innermost frame, and only advances on success.

    pub fn field_u8(&mut self, name: impl Into<Cow<'static, str>>) -> Result<u64, ScanError> {
        self.field_uint(name, 1, None)
    }

    pub fn field_u16(&mut self, name: impl Into<Cow<'static, str>>) -> Result<u64, ScanError> {
        self.field_uint(name, 2, None)
    }

    pub fn field_u32(&mut self, name: impl Into<Cow<'static, str>>) -> Result<u64, ScanError> {
        self.field_uint(name, 4, None)
    }

    pub fn field_u64(&mut self, name: impl Into<Cow<'static, str>>) -> Result<u64, ScanError> {
        self.field_uint(name, 8, None)
    }

    pub fn field_u8_with(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        mapper: &dyn Mapper,
    ) -> Result<u64, ScanError> {
        self.field_uint(name, 1, Some(mapper))
    }

    pub fn field_u16_with(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        mapper: &dyn Mapper,
    ) -> Result<u64, ScanError> {
        self.field_uint(name, 2, Some(mapper))
    }

    fn field_uint(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        bytes: u64,
        mapper: Option<&dyn Mapper>,
    ) -> Result<u64, ScanError> {
        let start = self.pos;
        let v = self.take_bytes_le(bytes)?;
        let mut scalar = Scalar {
            value: Value::Uint(v),
            sym: None,
            desc: None,
        };
        if let Some(m) = mapper {
            m.apply(&mut scalar);
        }
        self.sink().push(Node {
            name: name.into(),
            start,
            len: bytes * 8,
            body: NodeBody::Scalar(scalar),
        });
        Ok(v)
    }

    /// Read one bit as a boolean flag.
    pub fn field_bool(&mut self, name: impl Into<Cow<'static, str>>) -> Result<bool, ScanError> {
        let start = self.pos;
        let v = self.take_bits(1)? == 1;
        self.sink().push(Node {
            name: name.into(),
            start,
            len: 1,
            body: NodeBody::Scalar(Scalar {
                value: Value::Bool(v),
                sym: None,
                desc: None,
            }),
        });
        Ok(v)
    }

    /// Fixed-width text, lossily decoded, trailing bytes kept.
    pub fn field_utf8(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        bytes: u64,
    ) -> Result<String, ScanError> {
        self.field_text(name, bytes, false, None)
    }

    pub fn field_utf8_with(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        bytes: u64,
        mapper: &dyn Mapper,
    ) -> Result<String, ScanError> {
        self.field_text(name, bytes, false, Some(mapper))
    }

    /// Fixed-width text whose value stops at the first NUL. The cursor
    /// still advances over the full width.
    pub fn field_utf8_null_fixed(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        bytes: u64,
    ) -> Result<String, ScanError> {
        self.field_text(name, bytes, true, None)
    }

    fn field_text(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        bytes: u64,
        stop_at_nul: bool,
        mapper: Option<&dyn Mapper>,
    ) -> Result<String, ScanError> {
        let start = self.pos;
        let want = bytes * 8;
        if want > self.bits_left() {
            return Err(ScanError::OutOfRange {
                pos: self.pos,
                want,
                end: self.end,
            });
        }
        let mut raw = Vec::with_capacity(bytes as usize);
        for _ in 0..bytes {
            raw.push(self.take_bits(8)? as u8);
        }
        let visible = if stop_at_nul {
            let cut = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            &raw[..cut]
        } else {
            &raw[..]
        };
        let text = String::from_utf8_lossy(visible).into_owned();
        let mut scalar = Scalar {
            value: Value::Str(text.clone()),
            sym: None,
            desc: None,
        };
        if let Some(m) = mapper {
            m.apply(&mut scalar);
        }
        self.sink().push(Node {
            name: name.into(),
            start,
            len: want,
            body: NodeBody::Scalar(scalar),
        });
        Ok(text)
    }

    /// Mark `len` bits as an opaque field and skip them. No bytes are
    /// copied; the node's range is the value.
    pub fn field_raw(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        len: u64,
    ) -> Result<(), ScanError> {
        if len > self.bits_left() {
            return Err(ScanError::OutOfRange {
                pos: self.pos,
                want: len,
                end: self.end,
            });
        }
        let start = self.pos;
        self.pos += len;
        self.sink().push(Node {
            name: name.into(),
            start,
            len,
            body: NodeBody::Scalar(Scalar {
                value: Value::Raw,
                sym: None,
                desc: None,
            }),
        });
        Ok(())
    }

    // ── Synthesized fields ────────────────────────────────────────────
    //
    // Zero-width nodes at the current position. These carry values the
    // format implies but never stores, like the stream number a payload
    // tag encodes in its first two characters.

    pub fn value_str(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) {
        let pos = self.pos;
        self.sink().push(Node {
            name: name.into(),
            start: pos,
            len: 0,
            body: NodeBody::Scalar(Scalar {
                value: Value::Str(value.into()),
                sym: None,
                desc: None,
            }),
        });
    }

    pub fn value_str_with(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
        mapper: &dyn Mapper,
    ) {
        let pos = self.pos;
        let mut scalar = Scalar {
            value: Value::Str(value.into()),
            sym: None,
            desc: None,
        };
        mapper.apply(&mut scalar);
        self.sink().push(Node {
            name: name.into(),
            start: pos,
            len: 0,
            body: NodeBody::Scalar(scalar),
        });
    }

    pub fn value_uint(&mut self, name: impl Into<Cow<'static, str>>, value: u64) {
        let pos = self.pos;
        self.sink().push(Node {
            name: name.into(),
            start: pos,
            len: 0,
            body: NodeBody::Scalar(Scalar {
                value: Value::Uint(value),
                sym: None,
                desc: None,
            }),
        });
    }

    pub fn value_bool(&mut self, name: impl Into<Cow<'static, str>>, value: bool) {
        let pos = self.pos;
        self.sink().push(Node {
            name: name.into(),
            start: pos,
            len: 0,
            body: NodeBody::Scalar(Scalar {
                value: Value::Bool(value),
                sym: None,
                desc: None,
            }),
        });
    }

    // ── Containers ────────────────────────────────────────────────────

    /// Open a struct, run `f` inside it, close it. The node's range is
    /// the union of its children's ranges.
    pub fn field_struct<E, F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        self.field_container(name, LevelKind::Struct, f)
    }

    /// Open an array, run `f` inside it, close it.
    pub fn field_array<E, F>(&mut self, name: impl Into<Cow<'static, str>>, f: F) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        self.field_container(name, LevelKind::Array, f)
    }

    fn field_container<E, F>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        kind: LevelKind,
        f: F,
    ) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        self.stack.push(Level {
            name: name.into(),
            kind,
            entry: self.pos,
            children: Vec::new(),
        });
        let result = f(self);
        if let Some(level) = self.stack.pop() {
            self.sink().push(close_level(level));
        }
        result
    }

    // ── Scopes ────────────────────────────────────────────────────────

    /// Shrink the frame to the next `len` bits for the duration of `f`.
    ///
    /// On success the cursor jumps to the frame end, whether or not `f`
    /// consumed everything; a scope may leave slack but never read past
    /// its frame.
    ///
    /// # Errors
    ///
    /// [`ScanError::OutOfRange`] if `len` exceeds the current frame,
    /// otherwise whatever `f` returns.
    pub fn framed<E, F>(&mut self, len: u64, f: F) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        if len > self.bits_left() {
            return Err(ScanError::OutOfRange {
                pos: self.pos,
                want: len,
                end: self.end,
            }
            .into());
        }
        let outer_end = self.end;
        let frame_end = self.pos + len;
        self.end = frame_end;
        let result = f(self);
        self.end = outer_end;
        if result.is_ok() {
            self.pos = frame_end;
        }
        result
    }

    /// Run `f` against an absolute bit range anywhere in the buffer,
    /// then restore the cursor and frame so sibling processing is
    /// unaffected. Fields emitted inside still land in the currently
    /// open container.
    ///
    /// # Errors
    ///
    /// [`ScanError::SeekOutOfRange`] if the range leaves the buffer,
    /// otherwise whatever `f` returns.
    pub fn ranged<E, F>(&mut self, start: u64, len: u64, f: F) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        let size = self.bit_len();
        if start > size || len > size - start {
            return Err(ScanError::SeekOutOfRange { start, len, size }.into());
        }
        let saved_pos = self.pos;
        let saved_end = self.end;
        self.pos = start;
        self.end = start + len;
        let result = f(self);
        self.pos = saved_pos;
        self.end = saved_end;
        result
    }

    // ── Emission plumbing ─────────────────────────────────────────────

    fn sink(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(level) => &mut level.children,
            None => &mut self.root,
        }
    }
}

fn close_level(level: Level) -> Node {
    let mut start = u64::MAX;
    let mut end = 0;
    for child in &level.children {
        start = start.min(child.start);
        end = end.max(child.end());
    }
    if level.children.is_empty() {
        start = level.entry;
        end = level.entry;
    }
    Node {
        name: level.name,
        start,
        len: end - start,
        body: match level.kind {
            LevelKind::Struct => NodeBody::Struct(level.children),
            LevelKind::Array => NodeBody::Array(level.children),
        },
    }
}
