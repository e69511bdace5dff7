use std::marker::PhantomData;

use num_enum::TryFromPrimitive;
use pretty_assertions::assert_eq;

use smb_core::error::{ProtocolError, SMBError};
use smb_core::{SMBByteSize, SMBFromBytes, SMBToBytes};
use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, SMBByteSize, SMBFromBytes, SMBToBytes)]
enum Kind {
    Plain = 1,
    Framed = 2,
}

#[derive(Debug, PartialEq, Eq, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 9)]
struct Tagged {
    #[smb_direct(start(fixed = 2))]
    kind: Kind,
    #[smb_skip(start = 3, length = 1)]
    reserved: PhantomData<Vec<u8>>,
    #[smb_buffer(order = 0, offset(inner(start = 4, num_type = "u16", subtract = 64)), length(inner(start = 6, num_type = "u16")))]
    payload: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq, SMBByteSize, SMBFromBytes, SMBToBytes)]
struct Named {
    #[smb_direct(start(fixed = 0))]
    flags: u32,
    #[smb_string(order = 0, start(fixed = 8), length(inner(start = 4, num_type = "u32")), underlying = "u16")]
    name: String,
}

#[test]
fn buffer_lands_after_the_fixed_part() {
    let value = Tagged { kind: Kind::Framed, reserved: PhantomData, payload: vec![1, 2, 3] };
    let bytes = value.smb_to_bytes();
    assert_eq!(bytes, vec![9, 0, 2, 0, 72, 0, 3, 0, 1, 2, 3]);
    assert_eq!(value.smb_byte_size(), bytes.len());

    let (remaining, parsed) = Tagged::smb_from_bytes(&bytes).unwrap();
    assert!(remaining.is_empty());
    assert_eq!(parsed, value);
}

#[test]
fn empty_buffer_is_padded_to_the_tag() {
    let value = Tagged { kind: Kind::Plain, reserved: PhantomData, payload: Vec::new() };
    let bytes = value.smb_to_bytes();
    assert_eq!(bytes.len(), 9);
    assert_eq!(&bytes[6..8], &[0, 0]);
}

#[test]
fn mismatched_tag_and_unknown_discriminant_are_malformed() {
    let bytes = [11, 0, 1, 0, 0, 0, 0, 0, 0];
    assert!(matches!(
        Tagged::smb_from_bytes(&bytes),
        Err(SMBError::Protocol(ProtocolError::Malformed(_)))
    ));
    let bytes = [9, 0, 7, 0, 0, 0, 0, 0, 0];
    assert!(matches!(
        Tagged::smb_from_bytes(&bytes),
        Err(SMBError::Protocol(ProtocolError::Malformed(_)))
    ));
}

#[test]
fn truncated_fixed_part_is_too_small() {
    assert!(matches!(
        Named::smb_from_bytes(&[1, 0, 0]),
        Err(SMBError::PayloadTooSmall { .. })
    ));
}

#[test]
fn string_at_a_fixed_position() {
    let value = Named { flags: 0x20, name: "ab".into() };
    let bytes = value.smb_to_bytes();
    assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
    assert_eq!(&bytes[8..], &[b'a', 0, b'b', 0]);
    assert_eq!(Named::smb_from_bytes(&bytes).unwrap().1, value);
}
