//! Generic RIFF chunk walker.
//!
//! RIFF is a chunk soup: every chunk is `id`, `size`, then `size` bytes
//! of payload, padded to a word boundary. Containers (`RIFF`, `LIST`)
//! nest further chunks inside their payload. The walker owns that
//! recursion; format handlers plug in through two callbacks and never
//! deal with framing or padding themselves.

use riffscope_bits::{Scan, ScanError};

use crate::tag::Tag;

/// Bits taken by a chunk header, the four id bytes plus the u32 size.
pub const CHUNK_HEADER_BITS: u64 = 64;

/// One ancestor container on the way down to the current chunk.
#[derive(Debug)]
pub struct PathEntry<C> {
    pub tag: Tag,
    pub ctx: Option<C>,
}

/// Ancestor chunks of the chunk being decoded, root first. Handlers use
/// it to find state hung on an enclosing list, the way a stream-format
/// chunk finds the scope of its `strl` list.
#[derive(Debug)]
pub struct PathStack<C> {
    entries: Vec<PathEntry<C>>,
}

impl<C> PathStack<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Nearest enclosing context, searching innermost ancestors first.
    pub fn top_context(&self) -> Option<&C> {
        self.entries.iter().rev().find_map(|e| e.ctx.as_ref())
    }

    pub fn top_context_mut(&mut self) -> Option<&mut C> {
        self.entries.iter_mut().rev().find_map(|e| e.ctx.as_mut())
    }
}

impl<C> Default for PathStack<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// What the body handler decided about the chunk it was handed.
pub enum Disposition<C> {
    /// The handler consumed the payload itself, nothing nested inside.
    Leaf,
    /// Walk child chunks in the rest of the payload. A context attached
    /// here is visible to descendants through [`PathStack`].
    Container(Option<C>),
}

/// Decode one chunk at the cursor.
///
/// `head` emits the header fields and reports the tag and payload size.
/// `body` runs inside a frame of exactly that size, so a handler that
/// under-reads leaves slack the frame skips over. When `body` answers
/// [`Disposition::Container`], the remaining frame is walked as a
/// `chunks` array of `chunk` structs, stopping as soon as less than a
/// full header is left. An odd payload size is followed by one
/// alignment byte when the parent has room for it.
///
/// # Errors
///
/// Whatever `head` or `body` return, plus [`ScanError::OutOfRange`]
/// when a declared size exceeds the enclosing frame.
pub fn chunk<C, E, H, B>(
    scan: &mut Scan<'_>,
    path: &mut PathStack<C>,
    head: &mut H,
    body: &mut B,
) -> Result<(), E>
where
    E: From<ScanError>,
    H: FnMut(&mut Scan<'_>, &PathStack<C>) -> Result<(Tag, u64), E>,
    B: FnMut(&mut Scan<'_>, Tag, &mut PathStack<C>) -> Result<Disposition<C>, E>,
{
    let (tag, size) = head(scan, path)?;

    scan.framed::<E, _>(size * 8, |scan| match body(scan, tag, path)? {
        Disposition::Leaf => Ok(()),
        Disposition::Container(ctx) => {
            path.entries.push(PathEntry { tag, ctx });
            let walked = scan.field_array("chunks", |scan| {
                while scan.bits_left() >= CHUNK_HEADER_BITS {
                    scan.field_struct("chunk", |scan| chunk(scan, path, head, body))?;
                }
                Ok(())
            });
            path.entries.pop();
            walked
        }
    })?;

    // The pad byte after an odd payload is not counted by size.
    if size % 2 == 1 && scan.bits_left() >= 8 {
        scan.field_raw("align", 8)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use riffscope_tree::Node;

    use super::*;

    fn chunk_bytes(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&u32::try_from(body.len()).unwrap().to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    /// Minimal dialect: `LIST` is a container, everything else is a leaf
    /// whose whole payload becomes one raw field.
    fn decode_tree(data: &[u8]) -> Node {
        let mut scan = Scan::new(data);
        let mut path = PathStack::<u32>::new();
        let mut head = |scan: &mut Scan<'_>, _: &PathStack<u32>| {
            let tag = Tag::peek(scan)?;
            scan.field_utf8("id", 4)?;
            let size = scan.field_u32("size")?;
            Ok::<_, ScanError>((tag, size))
        };
        let mut body = |scan: &mut Scan<'_>, tag: Tag, _: &mut PathStack<u32>| {
            if &tag.0 == b"LIST" {
                Ok(Disposition::Container(None))
            } else {
                scan.field_raw("data", scan.bits_left())?;
                Ok(Disposition::Leaf)
            }
        };
        chunk(&mut scan, &mut path, &mut head, &mut body).unwrap();
        scan.finish("root")
    }

    #[test]
    fn walks_nested_chunks_and_aligns_odd_payloads() {
        let mut inner = chunk_bytes(b"aaaa", &[1, 2, 3]);
        inner.push(0); // pad byte for the odd payload
        inner.extend_from_slice(&chunk_bytes(b"bbbb", &[4, 5]));
        let data = chunk_bytes(b"LIST", &inner);

        let root = decode_tree(&data);
        let chunks = root.child("chunks").unwrap();
        assert_eq!(chunks.children().len(), 2);

        let first = chunks.at(0).unwrap();
        assert_eq!(first.child("id").unwrap().as_str(), Some("aaaa"));
        assert_eq!(first.child("size").unwrap().as_uint(), Some(3));
        assert!(first.child("align").is_some(), "pad byte belongs to the chunk");

        let second = chunks.at(1).unwrap();
        assert_eq!(second.child("id").unwrap().as_str(), Some("bbbb"));
        assert!(second.child("align").is_none());
    }

    #[test]
    fn slack_shorter_than_a_header_ends_the_walk() {
        let mut inner = chunk_bytes(b"aaaa", &[1, 2]);
        inner.extend_from_slice(&[0xff; 5]);
        let data = chunk_bytes(b"LIST", &inner);

        let root = decode_tree(&data);
        assert_eq!(root.child("chunks").unwrap().children().len(), 1);
    }

    #[test]
    fn odd_payload_at_end_of_buffer_has_no_align_byte() {
        let data = chunk_bytes(b"aaaa", &[1, 2, 3]);
        let root = decode_tree(&data);
        assert_eq!(root.child("size").unwrap().as_uint(), Some(3));
        assert!(root.child("align").is_none());
    }

    #[test]
    fn context_reaches_descendants_through_plain_ancestors() {
        // LIST(ctx) > [bump, LIST(no ctx) > [bump]]: both bumps must see
        // the outer context.
        let deepest = chunk_bytes(b"bump", &[]);
        let plain = chunk_bytes(b"LIST", &deepest);
        let mut inner = chunk_bytes(b"bump", &[]);
        inner.extend_from_slice(&plain);
        let data = chunk_bytes(b"CTXL", &inner);

        let mut seen = Vec::new();
        let mut scan = Scan::new(&data);
        let mut path = PathStack::<u32>::new();
        let mut head = |scan: &mut Scan<'_>, _: &PathStack<u32>| {
            let tag = Tag::peek(scan)?;
            scan.field_utf8("id", 4)?;
            let size = scan.field_u32("size")?;
            Ok::<_, ScanError>((tag, size))
        };
        let mut body = |_: &mut Scan<'_>, tag: Tag, path: &mut PathStack<u32>| match &tag.0 {
            b"CTXL" => Ok(Disposition::Container(Some(0))),
            b"LIST" => Ok(Disposition::Container(None)),
            _ => {
                let ctx = path.top_context_mut().unwrap();
                *ctx += 1;
                seen.push(*ctx);
                Ok(Disposition::Leaf)
            }
        };
        chunk(&mut scan, &mut path, &mut head, &mut body).unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(path.depth(), 0);
    }
}
