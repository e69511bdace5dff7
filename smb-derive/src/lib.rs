//! Derives for the SMB2 wire traits of `smb_core`.
//!
//! A body struct names its StructureSize with `#[smb_byte_tag(value = N)]`
//! and places every field with one of the field attributes:
//!
//! * `#[smb_direct(start(fixed = N))]` reads the field's own codec at byte N.
//! * `#[smb_skip(start = N, length = L)]` reserves bytes that stay zero.
//! * `#[smb_buffer(...)]` and `#[smb_string(...)]` place a variable-length
//!   buffer through an offset and length stored in the fixed part, or at a
//!   fixed start. Offsets may be relative to the SMB2 header via `subtract`.
//! * `#[smb_vector(order = K, count(inner(...)))]` appends `count` items.
//!
//! Fieldless `#[repr(uN)]` enums are encoded as their discriminant and need
//! `num_enum::TryFromPrimitive`.

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

use crate::field_mapping::SMBFieldMapping;

mod attrs;
mod field;
mod field_mapping;

#[derive(Debug, Clone, Copy)]
enum Codec {
    ByteSize,
    FromBytes,
    ToBytes,
}

#[proc_macro_derive(SMBByteSize, attributes(smb_byte_tag, smb_direct, smb_skip, smb_buffer, smb_string, smb_vector))]
pub fn smb_byte_size(input: TokenStream) -> TokenStream {
    derive(input, Codec::ByteSize)
}

#[proc_macro_derive(SMBFromBytes, attributes(smb_byte_tag, smb_direct, smb_skip, smb_buffer, smb_string, smb_vector))]
pub fn smb_from_bytes(input: TokenStream) -> TokenStream {
    derive(input, Codec::FromBytes)
}

#[proc_macro_derive(SMBToBytes, attributes(smb_byte_tag, smb_direct, smb_skip, smb_buffer, smb_string, smb_vector))]
pub fn smb_to_bytes(input: TokenStream) -> TokenStream {
    derive(input, Codec::ToBytes)
}

fn derive(input: TokenStream, codec: Codec) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    SMBFieldMapping::from_input(&input)
        .and_then(|mapping| mapping.expand(&input, codec))
        .unwrap_or_else(|err| err.write_errors())
        .into()
}
