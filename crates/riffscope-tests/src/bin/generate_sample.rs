//! Sample file generator for poking the CLI at.
//!
//! Writes small synthetic AVI files to a directory (default the current
//! one) so the commands have something real to chew on:
//!
//! ```bash
//! cargo run --bin generate_sample -p riffscope-tests -- /tmp
//! riffscope dump /tmp/sample.avi
//! riffscope validate /tmp/truncated.avi
//! ```
//!
//! # Generated files
//!
//! | File          | Contents                                        |
//! |---------------|-------------------------------------------------|
//! | sample.avi    | Video (H264) + audio (mp3) streams with an idx1 |
//! | truncated.avi | sample.avi with the last 24 bytes missing       |

#![allow(clippy::pedantic)]

use std::path::{Path, PathBuf};

use riffscope_tests::fixture::{
    FixtureWriter, avih_body, bitmap_body, idx1_entry, strh_body, wave_body,
};

fn main() {
    let dir = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let sample = two_stream_file();
    write_file(&dir.join("sample.avi"), &sample);
    write_file(&dir.join("truncated.avi"), &sample[..sample.len() - 24]);
}

fn write_file(path: &Path, data: &[u8]) {
    std::fs::write(path, data).expect("write_file");
    println!("  wrote {} ({} bytes)", path.display(), data.len());
}

/// Interleaved video and audio payloads covered by a legacy index.
fn two_stream_file() -> Vec<u8> {
    let mut w = FixtureWriter::new();
    w.begin(b"RIFF", b"AVI ");

    w.begin(b"LIST", b"hdrl");
    w.chunk(b"avih", &avih_body(0x10, 4, 2));
    w.begin(b"LIST", b"strl");
    w.chunk(b"strh", &strh_body(b"vids", b"H264"));
    w.chunk(b"strf", &bitmap_body(b"H264"));
    w.end();
    w.begin(b"LIST", b"strl");
    w.chunk(b"strh", &strh_body(b"auds", b"    "));
    w.chunk(b"strf", &wave_body(0x0055));
    w.end();
    w.end();

    w.begin(b"LIST", b"movi");
    let movi_fourcc = w.pos() - 4;
    let mut entries = Vec::new();
    for frame in 0..4u8 {
        entries.push((*b"00dc", w.pos() - movi_fourcc, 24, frame == 0));
        w.chunk(b"00dc", &[frame; 24]);
        entries.push((*b"01wb", w.pos() - movi_fourcc, 12, false));
        w.chunk(b"01wb", &[0x80 | frame; 12]);
    }
    w.end();

    let mut idx = Vec::new();
    for (id, offset, length, key) in entries {
        let flags = if key { 0x10 } else { 0 };
        idx.extend_from_slice(&idx1_entry(&id, flags, offset as u32, length));
    }
    w.chunk(b"idx1", &idx);

    w.end();
    w.into_bytes()
}
