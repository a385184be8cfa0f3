/// Implementation of `riffscope dump`.
///
/// Decodes the file and prints the full field tree: chunk headers, flag
/// bits, index entries, and the per-stream sample arrays, each line
/// carrying the absolute position of the bits it came from.
///
/// # Example output
///
/// ```text
/// 0x0-0x26c     avi:
/// 0x0-0x4         id: "RIFF" (Resource Interchange File Format)
/// 0x4-0x8         size: 612
/// 0x8-0xc         type: "AVI "
/// 0xc-0x26c       chunks[3]:
/// ...
/// ```
///
/// # JSON mode
///
/// `--json` renders the same tree as JSON. Mapped scalars emit their
/// symbolic value (`"mp3"` rather than `85`), raw fields emit a
/// `{"start", "len"}` object in bit units, structs and arrays nest.
///
/// `--raw-samples` turns codec dispatch off, so payload chunks and
/// indexed samples stay raw byte ranges.
use std::fs;

use anyhow::{Context, Result};
use riffscope_avi::{Options, decode};
use riffscope_tree::{Node, NodeBody, Value, fmt};
use serde_json::json;

use crate::DumpArgs;

/// Run the `riffscope dump` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a decodable
/// AVI container.
pub fn run(args: &DumpArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let options = Options {
        decode_samples: !args.raw_samples,
        ..Options::default()
    };
    let dissection = decode(&bytes, &options)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&dissection.root))?);
    } else {
        print!("{}", fmt::render(&dissection.root));
    }
    Ok(())
}

// ── JSON rendering ────────────────────────────────────────────────────────────

fn to_json(node: &Node) -> serde_json::Value {
    match &node.body {
        NodeBody::Scalar(scalar) => {
            if let Some(sym) = scalar.sym {
                return json!(sym);
            }
            match &scalar.value {
                Value::Uint(v) => json!(v),
                Value::Str(v) => json!(v),
                Value::Bool(v) => json!(v),
                Value::Raw => json!({ "start": node.start, "len": node.len }),
            }
        }
        NodeBody::Struct(children) => {
            let mut map = serde_json::Map::new();
            for child in children {
                map.insert(child.name.to_string(), to_json(child));
            }
            serde_json::Value::Object(map)
        }
        NodeBody::Array(children) => {
            serde_json::Value::Array(children.iter().map(to_json).collect())
        }
    }
}
