//! codec/encode.rs
//!
//! Primitive encoders for the Hessian 2.0 grammar.
//!
//! Design notes:
//! - Every encoder emits the shortest form that represents the value exactly.
//! - Strings are measured in UTF-16 units; supplementary characters are sent
//!   as two 3-byte surrogate sequences, which is what peers expect.
//! - Chunked forms (`R`/`A`) carry at most 0x8000 units/bytes; a string chunk
//!   never ends between the halves of a surrogate pair.

use std::io::{self, Write};
use byteorder::{BigEndian, WriteBytesExt};

use crate::constants::*;
use crate::constants::tags;

#[inline]
pub fn encode_null<W: Write + ?Sized>(w: &mut W) -> io::Result<()> {
    w.write_u8(tags::NULL)
}

#[inline]
pub fn encode_bool<W: Write + ?Sized>(w: &mut W, v: bool) -> io::Result<()> {
    w.write_u8(if v { tags::TRUE } else { tags::FALSE })
}

/// Int in one, two, three or five bytes.
pub fn encode_int<W: Write + ?Sized>(w: &mut W, v: i32) -> io::Result<()> {
    if (INT_DIRECT_MIN..=INT_DIRECT_MAX).contains(&v) {
        w.write_u8((INT_ZERO as i32 + v) as u8)
    } else if (INT_BYTE_MIN..=INT_BYTE_MAX).contains(&v) {
        w.write_u8((INT_BYTE_ZERO as i32 + (v >> 8)) as u8)?;
        w.write_u8(v as u8)
    } else if (INT_SHORT_MIN..=INT_SHORT_MAX).contains(&v) {
        w.write_u8((INT_SHORT_ZERO as i32 + (v >> 16)) as u8)?;
        w.write_u16::<BigEndian>(v as u16)
    } else {
        w.write_u8(tags::INT)?;
        w.write_i32::<BigEndian>(v)
    }
}

/// Long in one, two, three, five or nine bytes.
pub fn encode_long<W: Write + ?Sized>(w: &mut W, v: i64) -> io::Result<()> {
    if (LONG_DIRECT_MIN..=LONG_DIRECT_MAX).contains(&v) {
        w.write_u8((LONG_ZERO as i64 + v) as u8)
    } else if (LONG_BYTE_MIN..=LONG_BYTE_MAX).contains(&v) {
        w.write_u8((LONG_BYTE_ZERO as i64 + (v >> 8)) as u8)?;
        w.write_u8(v as u8)
    } else if (LONG_SHORT_MIN..=LONG_SHORT_MAX).contains(&v) {
        w.write_u8((LONG_SHORT_ZERO as i64 + (v >> 16)) as u8)?;
        w.write_u16::<BigEndian>(v as u16)
    } else if let Ok(small) = i32::try_from(v) {
        w.write_u8(tags::LONG_INT)?;
        w.write_i32::<BigEndian>(small)
    } else {
        w.write_u8(tags::LONG)?;
        w.write_i64::<BigEndian>(v)
    }
}

/// Double, using the integral and milli-precision short forms when exact.
pub fn encode_double<W: Write + ?Sized>(w: &mut W, v: f64) -> io::Result<()> {
    // -0.0 compares equal to 0 but the short forms would lose the sign.
    let negative_zero = v == 0.0 && v.is_sign_negative();

    if !negative_zero {
        let int_value = v as i32;
        if int_value as f64 == v {
            match int_value {
                0 => return w.write_u8(tags::DOUBLE_ZERO),
                1 => return w.write_u8(tags::DOUBLE_ONE),
                -0x80..=0x7f => {
                    w.write_u8(tags::DOUBLE_BYTE)?;
                    return w.write_i8(int_value as i8);
                }
                -0x8000..=0x7fff => {
                    w.write_u8(tags::DOUBLE_SHORT)?;
                    return w.write_i16::<BigEndian>(int_value as i16);
                }
                _ => {}
            }
        }

        let mills = (v * 1000.0) as i32;
        if 0.001 * mills as f64 == v {
            w.write_u8(tags::DOUBLE_MILL)?;
            return w.write_i32::<BigEndian>(mills);
        }
    }

    w.write_u8(tags::DOUBLE)?;
    w.write_f64::<BigEndian>(v)
}

/// UTC date; whole minutes use the compact form.
pub fn encode_date<W: Write + ?Sized>(w: &mut W, millis: i64) -> io::Result<()> {
    if millis % 60_000 == 0 {
        if let Ok(minutes) = i32::try_from(millis / 60_000) {
            w.write_u8(tags::DATE_MINUTE)?;
            return w.write_i32::<BigEndian>(minutes);
        }
    }
    w.write_u8(tags::DATE)?;
    w.write_i64::<BigEndian>(millis)
}

/// Back-reference to a previously registered value.
pub fn encode_ref<W: Write + ?Sized>(w: &mut W, index: usize) -> io::Result<()> {
    w.write_u8(tags::REF)?;
    encode_int(w, index as i32)
}

/// Number of UTF-16 units in `s`.
#[inline]
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// String, chunked when longer than one chunk.
pub fn encode_string<W: Write + ?Sized>(w: &mut W, s: &str) -> io::Result<()> {
    let mut rest = s;
    let mut remaining = utf16_len(s);

    while remaining > STRING_CHUNK_UNITS {
        let (split, units) = chunk_boundary(rest, STRING_CHUNK_UNITS);
        w.write_u8(tags::STRING_CHUNK)?;
        w.write_u16::<BigEndian>(units as u16)?;
        write_units(w, &rest[..split])?;
        rest = &rest[split..];
        remaining -= units;
    }

    if remaining <= STRING_DIRECT_MAX {
        w.write_u8(remaining as u8)?;
    } else if remaining <= STRING_SHORT_MAX {
        w.write_u8(STRING_SHORT + (remaining >> 8) as u8)?;
        w.write_u8(remaining as u8)?;
    } else {
        w.write_u8(tags::STRING_FINAL)?;
        w.write_u16::<BigEndian>(remaining as u16)?;
    }
    write_units(w, rest)
}

/// Largest prefix of `s` holding at most `max_units`, never splitting a pair.
/// Returns `(byte offset, utf16 units)`.
fn chunk_boundary(s: &str, max_units: usize) -> (usize, usize) {
    let mut units = 0;
    for (offset, ch) in s.char_indices() {
        let n = ch.len_utf16();
        if units + n > max_units {
            return (offset, units);
        }
        units += n;
    }
    (s.len(), units)
}

/// Body bytes: BMP characters as UTF-8, supplementary characters as a
/// surrogate pair with each half encoded in three bytes.
fn write_units<W: Write + ?Sized>(w: &mut W, s: &str) -> io::Result<()> {
    if s.chars().all(|c| c.len_utf16() == 1) {
        return w.write_all(s.as_bytes());
    }
    let mut buf = [0u16; 2];
    for ch in s.chars() {
        if ch.len_utf16() == 1 {
            let mut utf8 = [0u8; 4];
            w.write_all(ch.encode_utf8(&mut utf8).as_bytes())?;
        } else {
            for unit in ch.encode_utf16(&mut buf).iter() {
                let u = *unit;
                w.write_all(&[
                    0xe0 | (u >> 12) as u8,
                    0x80 | ((u >> 6) & 0x3f) as u8,
                    0x80 | (u & 0x3f) as u8,
                ])?;
            }
        }
    }
    Ok(())
}

/// Binary, chunked when longer than one chunk.
pub fn encode_binary<W: Write + ?Sized>(w: &mut W, data: &[u8]) -> io::Result<()> {
    let mut rest = data;
    while rest.len() > BINARY_CHUNK_BYTES {
        let (chunk, tail) = rest.split_at(BINARY_CHUNK_BYTES);
        encode_binary_chunk(w, chunk, false)?;
        rest = tail;
    }

    let len = rest.len();
    if len <= BINARY_DIRECT_MAX {
        w.write_u8(BINARY_DIRECT + len as u8)?;
    } else if len <= BINARY_SHORT_MAX {
        w.write_u8(BINARY_SHORT + (len >> 8) as u8)?;
        w.write_u8(len as u8)?;
    } else {
        w.write_u8(tags::BINARY_FINAL)?;
        w.write_u16::<BigEndian>(len as u16)?;
    }
    w.write_all(rest)
}

/// One long-form binary chunk (`A` non-final, `B` final). Used by the
/// streaming body writer, which cannot know the total length up front.
pub fn encode_binary_chunk<W: Write + ?Sized>(w: &mut W, chunk: &[u8], last: bool) -> io::Result<()> {
    debug_assert!(chunk.len() <= BINARY_CHUNK_BYTES);
    w.write_u8(if last { tags::BINARY_FINAL } else { tags::BINARY_CHUNK })?;
    w.write_u16::<BigEndian>(chunk.len() as u16)?;
    w.write_all(chunk)
}
