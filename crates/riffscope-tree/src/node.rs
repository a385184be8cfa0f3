use std::borrow::Cow;

/// A decoded scalar value.
///
/// Everything this layer reads is unsigned, textual, or boolean; opaque
/// byte runs are kept as `Raw` with no copy (the owning node's bit range
/// says where the bytes live).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Unsigned integer, up to 64 bits.
    Uint(u64),
    /// Text, lossily converted from the underlying bytes.
    Str(String),
    /// A single decoded bit or a synthesized flag.
    Bool(bool),
    /// Opaque bit range. No bytes are copied out of the input.
    Raw,
}

/// A scalar field plus its optional annotations.
///
/// `sym` is a symbolic reading of the value (`0x55` reads as `"mp3"`),
/// `desc` a human description of it (`"avih"` is the main header).
/// Both come from static tables, so they borrow for free.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scalar {
    pub value: Value,
    pub sym: Option<&'static str>,
    pub desc: Option<&'static str>,
}

/// The payload of a [`Node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeBody {
    Scalar(Scalar),
    /// Named children in emission order; names are unique within one struct.
    Struct(Vec<Node>),
    /// Repeated children that share a single name.
    Array(Vec<Node>),
}

/// One node of the decoded tree.
///
/// Every node records exactly where in the input it came from:
///
/// ```text
///   ┌────────────────────────────────────────────────┐
///   │ name   what the field is called ("size", ...)  │
///   │ start  absolute bit offset into the buffer     │
///   │ len    width in bits                           │
///   │ body   scalar | struct | array                 │
///   └────────────────────────────────────────────────┘
/// ```
///
/// Offsets are in bits because flag fields subdivide bytes. Container
/// ranges are the union of their children's ranges, so a struct whose
/// fields were read through far-apart seeks reports the span it actually
/// covers, not the cursor position it was opened at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub name: Cow<'static, str>,
    pub start: u64,
    pub len: u64,
    pub body: NodeBody,
}

impl Node {
    /// Bit offset one past the end of this node's range.
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    /// Look up a struct child by name. `None` for scalars, arrays, and
    /// absent names.
    pub fn child(&self, name: &str) -> Option<&Node> {
        match &self.body {
            NodeBody::Struct(children) => children.iter().find(|c| c.name == name),
            _ => None,
        }
    }

    /// Look up an array element by position.
    pub fn at(&self, index: usize) -> Option<&Node> {
        match &self.body {
            NodeBody::Array(children) => children.get(index),
            _ => None,
        }
    }

    /// All children of a container node, empty for scalars.
    pub fn children(&self) -> &[Node] {
        match &self.body {
            NodeBody::Struct(children) | NodeBody::Array(children) => children,
            NodeBody::Scalar(_) => &[],
        }
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.body {
            NodeBody::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.scalar()?.value {
            Value::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.scalar()?.value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.scalar()?.value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Symbolic annotation of a scalar, if a mapper attached one.
    pub fn sym(&self) -> Option<&'static str> {
        self.scalar()?.sym
    }
}
