use crate::node::{Node, NodeBody, Scalar, Value};

/// Render a decoded tree as indented text, one line per node.
///
/// Layout: a fixed-width range gutter, then the node indented two spaces
/// per level:
///
/// ```text
/// 0x0-0x2c      avi:
/// 0x0-0x4         id: "RIFF" (Resource Interchange File Format)
/// 0x4-0x8         size: 36
/// ```
///
/// Byte-aligned ranges print as hex byte offsets; anything narrower than
/// a byte falls back to a bit range.
pub fn render(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node, 0);
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    out.push_str(&format!("{:<14}", range_label(node.start, node.len)));
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&node.name);
    match &node.body {
        NodeBody::Scalar(s) => {
            out.push_str(": ");
            out.push_str(&scalar_label(s));
            out.push('\n');
        }
        NodeBody::Struct(children) => {
            out.push_str(":\n");
            for child in children {
                write_node(out, child, depth + 1);
            }
        }
        NodeBody::Array(children) => {
            out.push_str(&format!("[{}]:\n", children.len()));
            for child in children {
                write_node(out, child, depth + 1);
            }
        }
    }
}

fn scalar_label(s: &Scalar) -> String {
    let mut label = match &s.value {
        Value::Uint(v) => v.to_string(),
        Value::Str(v) => format!("{v:?}"),
        Value::Bool(v) => v.to_string(),
        Value::Raw => "raw".to_string(),
    };
    if let Some(sym) = s.sym {
        label.push_str(&format!(" ({sym})"));
    }
    if let Some(desc) = s.desc {
        label.push_str(&format!(" ({desc})"));
    }
    label
}

fn range_label(start: u64, len: u64) -> String {
    if start % 8 == 0 && len % 8 == 0 {
        format!("{:#x}-{:#x}", start / 8, (start + len) / 8)
    } else {
        format!("bit {}-{}", start, start + len)
    }
}
