#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use riffscope_avi::{Options, decode};

#[derive(Debug, Arbitrary)]
enum FuzzStream {
    Video { handler: [u8; 4] },
    Audio { format_tag: u16 },
    Text,
}

#[derive(Debug, Arbitrary)]
struct FuzzFrame {
    stream: u8,
    keyed: bool,
    payload: Vec<u8>,
}

#[derive(Debug, Arbitrary)]
struct FuzzFile {
    streams: Vec<FuzzStream>,
    frames: Vec<FuzzFrame>,
    junk: Vec<u8>,
    with_index: bool,
}

fn chunk(id: [u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len() + 1);
    out.extend_from_slice(&id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(typ: [u8; 4], children: &[u8]) -> Vec<u8> {
    let mut body = typ.to_vec();
    body.extend_from_slice(children);
    chunk(*b"LIST", &body)
}

fn strl(kind: [u8; 4], handler: [u8; 4], strf: &[u8]) -> Vec<u8> {
    let mut strh = Vec::with_capacity(56);
    strh.extend_from_slice(&kind);
    strh.extend_from_slice(&handler);
    strh.extend_from_slice(&[0; 48]);
    let mut children = chunk(*b"strh", &strh);
    children.extend_from_slice(&chunk(*b"strf", strf));
    list(*b"strl", &children)
}

fn bitmap(compression: [u8; 4]) -> Vec<u8> {
    let mut body = Vec::with_capacity(40);
    body.extend_from_slice(&40u32.to_le_bytes());
    body.extend_from_slice(&[0; 12]);
    body.extend_from_slice(&compression);
    body.extend_from_slice(&[0; 20]);
    body
}

fn wave(format_tag: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    body.extend_from_slice(&format_tag.to_le_bytes());
    body.extend_from_slice(&[0; 14]);
    body
}

// Fuzz target: generated well-formed files must decode.
//
// Builds a structurally valid AVI from arbitrary stream declarations,
// payloads, and an optional legacy index, then asserts the decoder
// accepts it, registers every declared stream, and renders the tree.
fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(mut input) = FuzzFile::arbitrary(&mut u) else {
        return;
    };
    input.streams.truncate(10);
    input.frames.truncate(64);
    input.junk.truncate(256);

    let mut strls = Vec::new();
    for stream in &input.streams {
        strls.extend_from_slice(&match stream {
            FuzzStream::Video { handler } => strl(*b"vids", *handler, &bitmap(*handler)),
            FuzzStream::Audio { format_tag } => strl(*b"auds", [0; 4], &wave(*format_tag)),
            FuzzStream::Text => strl(*b"txts", [0; 4], &[]),
        });
    }
    let mut hdrl = chunk(*b"avih", &[0; 56]);
    hdrl.extend_from_slice(&strls);

    let mut movi_children = Vec::new();
    let mut entries = Vec::new();
    for frame in &input.frames {
        let nr = frame.stream % 10;
        let kind = match input.streams.get(nr as usize) {
            Some(FuzzStream::Audio { .. }) => *b"wb",
            Some(FuzzStream::Text) => *b"tx",
            _ => *b"dc",
        };
        let id = [b'0', b'0' + nr, kind[0], kind[1]];
        let payload = &frame.payload[..frame.payload.len().min(1024)];
        let offset = 4 + movi_children.len() as u32;
        entries.push((id, frame.keyed, offset, payload.len() as u32));
        movi_children.extend_from_slice(&chunk(id, payload));
    }

    let mut body = list(*b"hdrl", &hdrl);
    body.extend_from_slice(&chunk(*b"JUNK", &input.junk));
    body.extend_from_slice(&list(*b"movi", &movi_children));
    if input.with_index {
        let mut idx = Vec::new();
        for (id, keyed, offset, length) in entries {
            idx.extend_from_slice(&id);
            idx.extend_from_slice(&(u32::from(keyed) * 0x10).to_le_bytes());
            idx.extend_from_slice(&offset.to_le_bytes());
            idx.extend_from_slice(&length.to_le_bytes());
        }
        body.extend_from_slice(&chunk(*b"idx1", &idx));
    }

    let mut avi = b"AVI ".to_vec();
    avi.extend_from_slice(&body);
    let file = chunk(*b"RIFF", &avi);

    let dissection = decode(&file, &Options::default())
        .unwrap_or_else(|e| panic!("generated file failed to decode: {e}"));
    assert_eq!(dissection.streams.len(), input.streams.len());
    let _ = riffscope_tree::fmt::render(&dissection.root);
});
