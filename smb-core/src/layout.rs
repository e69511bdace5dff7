//! Runtime helpers behind the `smb-derive` codecs. Positions are relative to
//! the start of the structure being read or written.

use crate::error::{ProtocolError, SMBError};
use crate::{SMBFromBytes, SMBResult};

/// Checks the leading StructureSize of an SMB2 body.
pub fn check_byte_tag(input: &[u8], expected: u16) -> SMBResult<()> {
    let actual = field_at::<u16>(input, 0)?;
    if actual != expected {
        return Err(ProtocolError::Malformed(format!(
            "structure size {} where {} was expected",
            actual, expected
        )).into());
    }
    Ok(())
}

pub fn field_at<T: SMBFromBytes>(input: &[u8], start: usize) -> SMBResult<T> {
    let tail = input
        .get(start..)
        .ok_or_else(|| SMBError::payload_too_small(start, input.len()))?;
    T::smb_from_bytes(tail)
        .map(|(_, value)| value)
        .map_err(|err| match err {
            SMBError::PayloadTooSmall { expected, .. } => SMBError::payload_too_small(start + expected, input.len()),
            other => other,
        })
}

/// Slices `length` bytes at `offset - subtract`, returning the slice and the
/// position right after it. Empty buffers ignore their offset.
pub fn buffer_at(input: &[u8], offset: usize, subtract: usize, length: usize) -> SMBResult<(&[u8], usize)> {
    if length == 0 {
        return Ok((&[], 0));
    }
    let start = offset
        .checked_sub(subtract)
        .ok_or_else(|| SMBError::parse_error(format!("Buffer offset {} points into the header", offset)))?;
    let end = start
        .checked_add(length)
        .ok_or_else(|| SMBError::parse_error(format!("Buffer length {} overflows", length)))?;
    if end > input.len() {
        return Err(SMBError::payload_too_small(end, input.len()));
    }
    Ok((&input[start..end], end))
}

/// Writes `bytes` at `start`, zero-filling any gap.
pub fn put_at(out: &mut Vec<u8>, start: usize, bytes: &[u8]) {
    let end = start + bytes.len();
    reserve(out, end);
    out[start..end].copy_from_slice(bytes);
}

/// Zero-extends `out` to at least `len` bytes.
pub fn reserve(out: &mut Vec<u8>, len: usize) {
    if out.len() < len {
        out.resize(len, 0);
    }
}

/// Contents of a variable-length buffer field.
pub trait SMBBuffer: Sized {
    fn from_buffer(bytes: &[u8]) -> SMBResult<Self>;
    fn to_buffer(&self) -> Vec<u8>;
    fn buffer_len(&self) -> usize;
}

impl SMBBuffer for Vec<u8> {
    fn from_buffer(bytes: &[u8]) -> SMBResult<Self> {
        Ok(bytes.to_vec())
    }

    fn to_buffer(&self) -> Vec<u8> {
        self.clone()
    }

    fn buffer_len(&self) -> usize {
        self.len()
    }
}

/// UTF-16LE without a terminator.
impl SMBBuffer for String {
    fn from_buffer(bytes: &[u8]) -> SMBResult<Self> {
        if bytes.len() % 2 != 0 {
            return Err(SMBError::parse_error("Odd length UTF-16 string"));
        }
        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();
        String::from_utf16(&units).map_err(SMBError::parse_error)
    }

    fn to_buffer(&self) -> Vec<u8> {
        self.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn buffer_len(&self) -> usize {
        self.encode_utf16().count() * 2
    }
}
