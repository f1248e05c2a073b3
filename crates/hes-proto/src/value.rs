//! The self-describing DLMS value codec.
//!
//! Every value on the record stream is preceded by a one-byte type tag.
//! [`decode`] reads that tag's payload from a byte cursor and returns a
//! [`TypedValue`]. Tags this core has no use for (reserved types, or types
//! the original push path never emits) decode successfully into
//! [`TypedValue::Unsupported`] rather than erroring — only a truncated
//! buffer is a real decode error.

use thiserror::Error;

/// A decoded DLMS value.
///
/// Several wire tags collapse onto the same arm here: `DELTA_*` tags carry
/// the same payload shape as their base type and this core has no reason to
/// track the delta-ness separately from the decoded integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// `ARRAY` (tag `0x01`). Carries no payload bytes of its own; the
    /// elements that follow are separate record triples.
    Array,
    /// `BOOLEAN` (tag `0x03`).
    Boolean(bool),
    /// `BIT_STRING` / `OCTET_STRING` / `STRING` / `STRING_UTF8`
    /// (tags `0x04`, `0x09`, `0x0A`, `0x0C`): a length-prefixed byte run.
    OctetLike(Vec<u8>),
    /// `INT32` (tag `0x05`).
    Int32(i32),
    /// `UINT32` / `DATE_TIME` (tags `0x06`, `0x19`).
    Uint32(u32),
    /// `INT8` / `DELTA_INT8` (tags `0x0F`, `0x1C`).
    Int8(i8),
    /// `INT16` / `DELTA_INT16` (tags `0x10`, `0x1D`).
    Int16(i16),
    /// `UINT8` / `DELTA_UINT8` (tags `0x11`, `0x1F`).
    Uint8(u8),
    /// `UINT16` / `DELTA_UINT16` (tags `0x12`, `0x20`).
    Uint16(u16),
    /// `INT64` (tag `0x14`).
    Int64(i64),
    /// `UINT64` (tag `0x15`).
    Uint64(u64),
    /// `ENUM` (tag `0x16`).
    Enum(u8),
    /// A recognized-but-unhandled or reserved type tag. The record this
    /// value belongs to is still well-formed on the wire; the core simply
    /// has no semantics for it.
    Unsupported(u8),
}

/// Errors from [`decode`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The buffer ended before the tag's payload could be read in full.
    #[error("value for type tag {tag:#04x} truncated: needed {needed} bytes, had {available}")]
    Truncated {
        /// The type tag being decoded.
        tag: u8,
        /// Bytes required to decode this tag's payload.
        needed: usize,
        /// Bytes actually available from the cursor to the end of buffer.
        available: usize,
    },
}

const TAG_ARRAY: u8 = 0x01;
const TAG_BOOLEAN: u8 = 0x03;
const TAG_BIT_STRING: u8 = 0x04;
const TAG_OCTET_STRING: u8 = 0x09;
const TAG_STRING: u8 = 0x0A;
const TAG_STRING_UTF8: u8 = 0x0C;
const TAG_INT32: u8 = 0x05;
const TAG_UINT32: u8 = 0x06;
const TAG_DATE_TIME: u8 = 0x19;
const TAG_INT8: u8 = 0x0F;
const TAG_DELTA_INT8: u8 = 0x1C;
const TAG_INT16: u8 = 0x10;
const TAG_DELTA_INT16: u8 = 0x1D;
const TAG_UINT8: u8 = 0x11;
const TAG_DELTA_UINT8: u8 = 0x1F;
const TAG_UINT16: u8 = 0x12;
const TAG_DELTA_UINT16: u8 = 0x20;
const TAG_INT64: u8 = 0x14;
const TAG_UINT64: u8 = 0x15;
const TAG_ENUM: u8 = 0x16;

/// Read `n` bytes from `buffer` starting at `*offset`, advancing `*offset`
/// only if the read succeeds.
fn take<'a>(buffer: &'a [u8], offset: &mut usize, tag: u8, n: usize) -> Result<&'a [u8], ValueError> {
    let available = buffer.len().saturating_sub(*offset);
    if available < n {
        return Err(ValueError::Truncated { tag, needed: n, available });
    }
    let slice = &buffer[*offset..*offset + n];
    *offset += n;
    Ok(slice)
}

/// Decode a single tagged value starting at `*offset`.
///
/// `offset` is advanced past the consumed bytes on success and left
/// untouched on error, so callers can treat a decode failure as "nothing
/// was consumed from this cursor".
#[allow(clippy::expect_used)]
pub fn decode(buffer: &[u8], offset: &mut usize, type_tag: u8) -> Result<TypedValue, ValueError> {
    let mut cursor = *offset;

    let value = match type_tag {
        TAG_ARRAY => TypedValue::Array,
        TAG_BOOLEAN => {
            let b = take(buffer, &mut cursor, type_tag, 1)?;
            TypedValue::Boolean(b[0] != 0)
        }
        TAG_BIT_STRING | TAG_OCTET_STRING | TAG_STRING | TAG_STRING_UTF8 => {
            let len = take(buffer, &mut cursor, type_tag, 1)?[0] as usize;
            let bytes = take(buffer, &mut cursor, type_tag, len)?;
            TypedValue::OctetLike(bytes.to_vec())
        }
        TAG_INT32 => {
            let b = take(buffer, &mut cursor, type_tag, 4)?;
            TypedValue::Int32(i32::from_be_bytes(b.try_into().expect("length checked above")))
        }
        TAG_UINT32 | TAG_DATE_TIME => {
            let b = take(buffer, &mut cursor, type_tag, 4)?;
            TypedValue::Uint32(u32::from_be_bytes(b.try_into().expect("length checked above")))
        }
        TAG_INT8 | TAG_DELTA_INT8 => {
            let b = take(buffer, &mut cursor, type_tag, 1)?;
            TypedValue::Int8(b[0] as i8)
        }
        TAG_INT16 | TAG_DELTA_INT16 => {
            let b = take(buffer, &mut cursor, type_tag, 2)?;
            TypedValue::Int16(i16::from_be_bytes(b.try_into().expect("length checked above")))
        }
        TAG_UINT8 | TAG_DELTA_UINT8 => {
            let b = take(buffer, &mut cursor, type_tag, 1)?;
            TypedValue::Uint8(b[0])
        }
        TAG_UINT16 | TAG_DELTA_UINT16 => {
            let b = take(buffer, &mut cursor, type_tag, 2)?;
            TypedValue::Uint16(u16::from_be_bytes(b.try_into().expect("length checked above")))
        }
        TAG_INT64 => {
            let b = take(buffer, &mut cursor, type_tag, 8)?;
            TypedValue::Int64(i64::from_be_bytes(b.try_into().expect("length checked above")))
        }
        TAG_UINT64 => {
            let b = take(buffer, &mut cursor, type_tag, 8)?;
            TypedValue::Uint64(u64::from_be_bytes(b.try_into().expect("length checked above")))
        }
        TAG_ENUM => {
            let b = take(buffer, &mut cursor, type_tag, 1)?;
            TypedValue::Enum(b[0])
        }
        other => TypedValue::Unsupported(other),
    };

    *offset = cursor;
    Ok(value)
}
