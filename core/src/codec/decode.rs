//! codec/decode.rs
//!
//! Primitive decoders for the Hessian 2.0 grammar.
//!
//! Design notes:
//! - Callers read the leading tag themselves (so they can dispatch on it) and
//!   hand it to the matching decoder together with the remaining bytes.
//! - Every form the grammar allows is accepted, not only the ones the
//!   encoder emits.
//! - String bodies accept both three-byte surrogate halves and standard
//!   four-byte UTF-8; lone surrogates are rejected.

use std::io::Read;
use byteorder::{BigEndian, ReadBytesExt};

use crate::constants::*;
use crate::constants::tags;
use crate::types::{ProtocolError, Result};

#[inline]
pub fn is_int_tag(tag: u8) -> bool {
    matches!(tag, 0x80..=0xd7 | tags::INT)
}

#[inline]
pub fn is_long_tag(tag: u8) -> bool {
    matches!(tag, 0xd8..=0xff | 0x38..=0x3f | tags::LONG_INT | tags::LONG)
}

#[inline]
pub fn is_double_tag(tag: u8) -> bool {
    matches!(tag, tags::DOUBLE_ZERO..=tags::DOUBLE_MILL | tags::DOUBLE)
}

#[inline]
pub fn is_string_tag(tag: u8) -> bool {
    matches!(tag, 0x00..=0x1f | 0x30..=0x33 | tags::STRING_FINAL | tags::STRING_CHUNK)
}

#[inline]
pub fn is_binary_tag(tag: u8) -> bool {
    matches!(tag, 0x20..=0x2f | 0x34..=0x37 | tags::BINARY_FINAL | tags::BINARY_CHUNK)
}

pub fn decode_int<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<i32> {
    let v = match tag {
        0x80..=0xbf => tag as i32 - INT_ZERO as i32,
        0xc0..=0xcf => ((tag as i32 - INT_BYTE_ZERO as i32) << 8) | r.read_u8()? as i32,
        0xd0..=0xd7 => ((tag as i32 - INT_SHORT_ZERO as i32) << 16) | r.read_u16::<BigEndian>()? as i32,
        tags::INT => r.read_i32::<BigEndian>()?,
        _ => return Err(ProtocolError::UnexpectedTag { expected: "int", tag }.into()),
    };
    Ok(v)
}

pub fn decode_long<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<i64> {
    let v = match tag {
        0xd8..=0xef => tag as i64 - LONG_ZERO as i64,
        0xf0..=0xff => ((tag as i64 - LONG_BYTE_ZERO as i64) << 8) | r.read_u8()? as i64,
        0x38..=0x3f => ((tag as i64 - LONG_SHORT_ZERO as i64) << 16) | r.read_u16::<BigEndian>()? as i64,
        tags::LONG_INT => r.read_i32::<BigEndian>()? as i64,
        tags::LONG => r.read_i64::<BigEndian>()?,
        _ => return Err(ProtocolError::UnexpectedTag { expected: "long", tag }.into()),
    };
    Ok(v)
}

pub fn decode_double<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<f64> {
    let v = match tag {
        tags::DOUBLE_ZERO => 0.0,
        tags::DOUBLE_ONE => 1.0,
        tags::DOUBLE_BYTE => r.read_i8()? as f64,
        tags::DOUBLE_SHORT => r.read_i16::<BigEndian>()? as f64,
        tags::DOUBLE_MILL => 0.001 * r.read_i32::<BigEndian>()? as f64,
        tags::DOUBLE => r.read_f64::<BigEndian>()?,
        _ => return Err(ProtocolError::UnexpectedTag { expected: "double", tag }.into()),
    };
    Ok(v)
}

/// UTC millis from either date form.
pub fn decode_date<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<i64> {
    match tag {
        tags::DATE => Ok(r.read_i64::<BigEndian>()?),
        tags::DATE_MINUTE => Ok(r.read_i32::<BigEndian>()? as i64 * 60_000),
        _ => Err(ProtocolError::UnexpectedTag { expected: "date", tag }.into()),
    }
}

/// `(utf16 units, final)` for a string chunk tag.
fn string_chunk<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<(usize, bool)> {
    match tag {
        0x00..=0x1f => Ok((tag as usize, true)),
        0x30..=0x33 => Ok(((((tag - STRING_SHORT) as usize) << 8) | r.read_u8()? as usize, true)),
        tags::STRING_FINAL => Ok((r.read_u16::<BigEndian>()? as usize, true)),
        tags::STRING_CHUNK => Ok((r.read_u16::<BigEndian>()? as usize, false)),
        _ => Err(ProtocolError::UnexpectedTag { expected: "string", tag }.into()),
    }
}

/// Whole string, following `R` chunks until the final chunk.
pub fn decode_string<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<String> {
    let mut units: Vec<u16> = Vec::new();
    let (mut len, mut last) = string_chunk(tag, r)?;
    loop {
        units.reserve(len);
        read_units(r, len, &mut units)?;
        if last {
            break;
        }
        let next = r.read_u8()?;
        (len, last) = string_chunk(next, r)?;
    }
    String::from_utf16(&units).map_err(|e| ProtocolError::InvalidString(e.to_string()).into())
}

fn continuation<R: Read + ?Sized>(r: &mut R) -> Result<u32> {
    let b = r.read_u8()?;
    if b & 0xc0 != 0x80 {
        return Err(ProtocolError::InvalidString(format!("bad continuation byte 0x{:02x}", b)).into());
    }
    Ok((b & 0x3f) as u32)
}

/// Read `count` UTF-16 units worth of body bytes.
fn read_units<R: Read + ?Sized>(r: &mut R, count: usize, out: &mut Vec<u16>) -> Result<()> {
    let mut remaining = count;
    while remaining > 0 {
        let b = r.read_u8()? as u32;
        let cp = if b < 0x80 {
            b
        } else if b & 0xe0 == 0xc0 {
            ((b & 0x1f) << 6) | continuation(r)?
        } else if b & 0xf0 == 0xe0 {
            ((b & 0x0f) << 12) | (continuation(r)? << 6) | continuation(r)?
        } else if b & 0xf8 == 0xf0 {
            let cp = ((b & 0x07) << 18)
                | (continuation(r)? << 12)
                | (continuation(r)? << 6)
                | continuation(r)?;
            let ch = char::from_u32(cp)
                .ok_or_else(|| ProtocolError::InvalidString(format!("invalid code point 0x{:x}", cp)))?;
            if remaining < 2 {
                return Err(ProtocolError::InvalidString("surrogate pair overruns chunk length".into()).into());
            }
            let mut pair = [0u16; 2];
            out.extend_from_slice(ch.encode_utf16(&mut pair));
            remaining -= 2;
            continue;
        } else {
            return Err(ProtocolError::InvalidString(format!("invalid lead byte 0x{:02x}", b)).into());
        };
        out.push(cp as u16);
        remaining -= 1;
    }
    Ok(())
}

/// `(length, final)` for a binary chunk tag.
pub fn binary_chunk<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<(usize, bool)> {
    match tag {
        0x20..=0x2f => Ok(((tag - BINARY_DIRECT) as usize, true)),
        0x34..=0x37 => Ok(((((tag - BINARY_SHORT) as usize) << 8) | r.read_u8()? as usize, true)),
        tags::BINARY_FINAL => Ok((r.read_u16::<BigEndian>()? as usize, true)),
        tags::BINARY_CHUNK => Ok((r.read_u16::<BigEndian>()? as usize, false)),
        _ => Err(ProtocolError::UnexpectedTag { expected: "binary", tag }.into()),
    }
}

/// Whole binary value, following `A` chunks until the final chunk.
pub fn decode_binary<R: Read + ?Sized>(tag: u8, r: &mut R) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let (mut len, mut last) = binary_chunk(tag, r)?;
    loop {
        let start = out.len();
        out.resize(start + len, 0);
        r.read_exact(&mut out[start..])?;
        if last {
            break;
        }
        let next = r.read_u8()?;
        (len, last) = binary_chunk(next, r)?;
    }
    Ok(out)
}
