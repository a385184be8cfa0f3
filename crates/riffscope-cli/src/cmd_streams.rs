/// Implementation of `riffscope streams`.
///
/// Decodes the file and prints one row per declared stream: the kind
/// and handler from its header, the codec the decoder mapped (if any),
/// which index form supplied its samples, and how much sample data the
/// index covers.
///
/// # Example output
///
/// ```text
/// File:    clip.avi  (1482 bytes)
/// Streams: 2
///
/// Nr  Kind  Handler  Codec      Index   Samples       Bytes
/// ─────────────────────────────────────────────────────────
/// 0   vids  H264     avc_au     indx         24       18432
/// 1   auds           mp3_frame  idx1         24        4608
/// ```
use std::fs;

use anyhow::{Context, Result};
use riffscope_avi::{Options, decode};

use crate::StreamsArgs;

/// Run the `riffscope streams` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a decodable
/// AVI container.
pub fn run(args: &StreamsArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let dissection = decode(&bytes, &Options::default())
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    println!("File:    {}  ({} bytes)", args.file.display(), bytes.len());
    println!("Streams: {}", dissection.streams.len());
    println!();

    println!(
        "{:<4}{:<6}{:<9}{:<11}{:<7}{:>8}{:>12}",
        "Nr", "Kind", "Handler", "Codec", "Index", "Samples", "Bytes"
    );
    println!("{}", "─".repeat(57));
    for (nr, stream) in dissection.streams.iter().enumerate() {
        let codec = stream.codec.map_or(String::new(), |c| c.to_string());
        let source = stream.source.map_or(String::new(), |s| s.to_string());
        println!(
            "{:<4}{:<6}{:<9}{:<11}{:<7}{:>8}{:>12}",
            nr,
            stream.declared_kind,
            stream.handler,
            codec,
            source,
            stream.sample_count,
            stream.sample_bits / 8
        );
    }
    Ok(())
}
