use std::fmt;
use num_enum::TryFromPrimitive;

use crate::constants::tags;

/// Named single-byte tags, used for diagnostics only.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum Tag {
    Null                = tags::NULL,
    True                = tags::TRUE,
    False               = tags::FALSE,
    Int                 = tags::INT,
    Long                = tags::LONG,
    LongInt             = tags::LONG_INT,
    Double              = tags::DOUBLE,
    DoubleZero          = tags::DOUBLE_ZERO,
    DoubleOne           = tags::DOUBLE_ONE,
    DoubleByte          = tags::DOUBLE_BYTE,
    DoubleShort         = tags::DOUBLE_SHORT,
    DoubleMill          = tags::DOUBLE_MILL,
    Date                = tags::DATE,
    DateMinute          = tags::DATE_MINUTE,
    StringFinal         = tags::STRING_FINAL,
    StringChunk         = tags::STRING_CHUNK,
    BinaryFinal         = tags::BINARY_FINAL,
    BinaryChunk         = tags::BINARY_CHUNK,
    ClassDef            = tags::CLASS_DEF,
    Object              = tags::OBJECT,
    Ref                 = tags::REF,
    MapTyped            = tags::MAP_TYPED,
    MapUntyped          = tags::MAP_UNTYPED,
    ListVariable        = tags::LIST_VARIABLE,
    ListFixed           = tags::LIST_FIXED,
    ListVariableUntyped = tags::LIST_VARIABLE_UNTYPED,
    ListFixedUntyped    = tags::LIST_FIXED_UNTYPED,
    Envelope            = tags::ENVELOPE,
    End                 = tags::END,
}

/// Human-readable tag: the named tag if there is one, else the grammar range.
pub fn describe_tag(tag: u8) -> String {
    if let Ok(named) = Tag::try_from_primitive(tag) {
        return format!("{:?} (0x{:02x})", named, tag);
    }
    let range = match tag {
        0x00..=0x1f => "short string",
        0x20..=0x2f => "short binary",
        0x30..=0x33 => "medium string",
        0x34..=0x37 => "medium binary",
        0x38..=0x3f => "three-byte long",
        0x60..=0x6f => "compact object",
        0x70..=0x77 => "compact typed list",
        0x78..=0x7f => "compact list",
        0x80..=0xbf => "one-byte int",
        0xc0..=0xcf => "two-byte int",
        0xd0..=0xd7 => "three-byte int",
        0xd8..=0xef => "one-byte long",
        0xf0..=0xff => "two-byte long",
        _ => "reserved",
    };
    format!("{} (0x{:02x})", range, tag)
}

/// Hex preview of a byte slice, truncated to `max` bytes.
pub struct HexPreview<'a> {
    pub bytes: &'a [u8],
    pub max: usize,
}

impl fmt::Display for HexPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.bytes.len().min(self.max);
        write!(f, "{}", hex::encode(&self.bytes[..shown]))?;
        if shown < self.bytes.len() {
            write!(f, "..(+{} bytes)", self.bytes.len() - shown)?;
        }
        Ok(())
    }
}

/// Shorthand for `HexPreview { bytes, max: 32 }`.
pub fn hex_preview(bytes: &[u8]) -> HexPreview<'_> {
    HexPreview { bytes, max: 32 }
}
