//! constants.rs
//! Hessian 2.0 wire tags, compact-encoding ranges and crate defaults.
//!
//! Design notes:
//! - All multi-byte integers on the wire are big-endian.
//! - Range constants are inclusive and mirror the grammar one-to-one so the
//!   encoder and decoder cannot drift apart.

/// Single-byte tags of the Hessian 2.0 grammar.
pub mod tags {
    pub const NULL: u8 = b'N';
    pub const TRUE: u8 = b'T';
    pub const FALSE: u8 = b'F';

    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'L';
    pub const LONG_INT: u8 = 0x59;
    pub const DOUBLE: u8 = b'D';
    pub const DOUBLE_ZERO: u8 = 0x5b;
    pub const DOUBLE_ONE: u8 = 0x5c;
    pub const DOUBLE_BYTE: u8 = 0x5d;
    pub const DOUBLE_SHORT: u8 = 0x5e;
    pub const DOUBLE_MILL: u8 = 0x5f;

    pub const DATE: u8 = 0x4a;
    pub const DATE_MINUTE: u8 = 0x4b;

    pub const STRING_FINAL: u8 = b'S';
    pub const STRING_CHUNK: u8 = b'R';
    pub const BINARY_FINAL: u8 = b'B';
    pub const BINARY_CHUNK: u8 = b'A';

    pub const CLASS_DEF: u8 = b'C';
    pub const OBJECT: u8 = b'O';
    pub const REF: u8 = b'Q';

    pub const MAP_TYPED: u8 = b'M';
    pub const MAP_UNTYPED: u8 = b'H';

    pub const LIST_VARIABLE: u8 = 0x55;
    pub const LIST_FIXED: u8 = b'V';
    pub const LIST_VARIABLE_UNTYPED: u8 = 0x57;
    pub const LIST_FIXED_UNTYPED: u8 = 0x58;

    pub const ENVELOPE: u8 = b'E';
    pub const END: u8 = b'Z';
}

/// Compact int: one byte, `0x80..=0xbf`, value = tag - 0x90.
pub const INT_DIRECT_MIN: i32 = -0x10;
pub const INT_DIRECT_MAX: i32 = 0x2f;
pub const INT_ZERO: u8 = 0x90;

/// Compact int: two bytes, `0xc0..=0xcf`.
pub const INT_BYTE_MIN: i32 = -0x800;
pub const INT_BYTE_MAX: i32 = 0x7ff;
pub const INT_BYTE_ZERO: u8 = 0xc8;

/// Compact int: three bytes, `0xd0..=0xd7`.
pub const INT_SHORT_MIN: i32 = -0x40000;
pub const INT_SHORT_MAX: i32 = 0x3ffff;
pub const INT_SHORT_ZERO: u8 = 0xd4;

/// Compact long: one byte, `0xd8..=0xef`.
pub const LONG_DIRECT_MIN: i64 = -0x08;
pub const LONG_DIRECT_MAX: i64 = 0x0f;
pub const LONG_ZERO: u8 = 0xe0;

/// Compact long: two bytes, `0xf0..=0xff`.
pub const LONG_BYTE_MIN: i64 = -0x800;
pub const LONG_BYTE_MAX: i64 = 0x7ff;
pub const LONG_BYTE_ZERO: u8 = 0xf8;

/// Compact long: three bytes, `0x38..=0x3f`.
pub const LONG_SHORT_MIN: i64 = -0x40000;
pub const LONG_SHORT_MAX: i64 = 0x3ffff;
pub const LONG_SHORT_ZERO: u8 = 0x3c;

/// Short string: `0x00..=0x1f`, length in the tag.
pub const STRING_DIRECT_MAX: usize = 0x1f;
/// Medium string: `0x30..=0x33` + one length byte.
pub const STRING_SHORT_MAX: usize = 0x3ff;
pub const STRING_SHORT: u8 = 0x30;

/// Short binary: `0x20..=0x2f`, length in the tag.
pub const BINARY_DIRECT: u8 = 0x20;
pub const BINARY_DIRECT_MAX: usize = 0x0f;
/// Medium binary: `0x34..=0x37` + one length byte.
pub const BINARY_SHORT: u8 = 0x34;
pub const BINARY_SHORT_MAX: usize = 0x3ff;

/// Compact object instance: `0x60..=0x6f`, class index in the tag.
pub const OBJECT_DIRECT: u8 = 0x60;
pub const OBJECT_DIRECT_MAX: usize = 0x0f;

/// Compact typed fixed list: `0x70..=0x77`.
pub const LIST_DIRECT: u8 = 0x70;
/// Compact untyped fixed list: `0x78..=0x7f`.
pub const LIST_DIRECT_UNTYPED: u8 = 0x78;
pub const LIST_DIRECT_MAX: usize = 0x07;

/// Largest string chunk, counted in UTF-16 units.
pub const STRING_CHUNK_UNITS: usize = 0x8000;
/// Largest binary chunk in bytes.
pub const BINARY_CHUNK_BYTES: usize = 0x8000;

/// Default `BufWriter` / `BufReader` capacity for streams.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Default nesting limit for both streams, counted in `write_object` /
/// `read_object` calls. One class-instance level costs several frames, so
/// the default keeps instance chains well inside a 2 MiB thread stack.
/// Deeper graphs need a raised `max_depth` and a thread with a larger stack.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default number of class plans kept by the process-wide cache.
pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 1024;

/// Environment variable overriding the global plan cache capacity.
pub const PLAN_CACHE_CAPACITY_ENV: &str = "HESSIAN_PLAN_CACHE_CAPACITY";

/// Envelope identifier for Deflation, equal to the peer implementation name.
pub const DEFLATION_ENVELOPE: &str = "com.caucho.hessian.io.Deflation";
