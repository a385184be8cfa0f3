use riffscope_tree::{Scalar, Value};

/// Annotates a freshly read scalar in place.
///
/// Mappers never change the decoded value, only attach a symbolic
/// reading (`sym`) or a human description (`desc`). They hang off the
/// `*_with` read methods so annotation stays declarative at the call
/// site:
///
/// ```text
///   scan.field_u16_with("format_tag", &WAV_TAG_SYMS)?
/// ```
pub trait Mapper {
    fn apply(&self, scalar: &mut Scalar);
}

/// Static `value -> symbol` table for unsigned fields.
///
/// Values without an entry stay unannotated; unknown is not an error at
/// this layer.
pub struct UintSyms(pub &'static [(u64, &'static str)]);

impl Mapper for UintSyms {
    fn apply(&self, scalar: &mut Scalar) {
        if let Value::Uint(v) = scalar.value
            && let Some((_, sym)) = self.0.iter().find(|(key, _)| *key == v)
        {
            scalar.sym = Some(sym);
        }
    }
}

/// Static `text -> description` table for string fields.
pub struct StrDescs(pub &'static [(&'static str, &'static str)]);

impl Mapper for StrDescs {
    fn apply(&self, scalar: &mut Scalar) {
        if let Value::Str(v) = &scalar.value
            && let Some((_, desc)) = self.0.iter().find(|(key, _)| key == v)
        {
            scalar.desc = Some(desc);
        }
    }
}
