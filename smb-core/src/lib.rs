use uuid::Uuid;

use error::SMBError;

pub mod error;
pub mod layout;
pub mod logging;
pub mod nt_status;

pub type SMBResult<T> = Result<T, SMBError>;
pub type SMBParseResult<I, O> = Result<(I, O), SMBError>;

/// Encoded size in bytes of a wire structure.
pub trait SMBByteSize {
    fn smb_byte_size(&self) -> usize;
}

pub trait SMBFromBytes: SMBByteSize {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized;
}

pub trait SMBToBytes: SMBByteSize {
    fn smb_to_bytes(&self) -> Vec<u8>;
}

impl<T: SMBByteSize> SMBByteSize for Vec<T> {
    fn smb_byte_size(&self) -> usize {
        self.iter().fold(0, |prev, x| prev + x.smb_byte_size())
    }
}

impl<T: SMBToBytes> SMBToBytes for Vec<T> {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.iter().flat_map(|item| item.smb_to_bytes()).collect()
    }
}

pub trait SMBVecFromBytes {
    fn smb_from_bytes_vec(input: &[u8], count: usize) -> SMBParseResult<&[u8], Self> where Self: Sized;
}

impl<T: SMBFromBytes> SMBVecFromBytes for Vec<T> {
    fn smb_from_bytes_vec(input: &[u8], count: usize) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let mut remaining = input;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let (r, val) = T::smb_from_bytes(remaining)?;
            items.push(val);
            remaining = r;
        }
        Ok((remaining, items))
    }
}

/// Little-endian UTF-16 of `count` bytes.
impl SMBVecFromBytes for String {
    fn smb_from_bytes_vec(input: &[u8], count: usize) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, units) = <Vec<u16>>::smb_from_bytes_vec(input, count / 2)?;
        let string = String::from_utf16(&units)
            .map_err(SMBError::parse_error)?;
        Ok((remaining, string))
    }
}

impl SMBFromBytes for Uuid {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, raw) = <[u8; 16]>::smb_from_bytes(input)?;
        Ok((remaining, Uuid::from_bytes_le(raw)))
    }
}

impl SMBByteSize for Uuid {
    fn smb_byte_size(&self) -> usize {
        16
    }
}

impl SMBToBytes for Uuid {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.to_bytes_le().to_vec()
    }
}

impl SMBByteSize for bool {
    fn smb_byte_size(&self) -> usize {
        1
    }
}

/// Any non-zero byte reads as true.
impl SMBFromBytes for bool {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, raw) = u8::smb_from_bytes(input)?;
        Ok((remaining, raw != 0))
    }
}

impl SMBToBytes for bool {
    fn smb_to_bytes(&self) -> Vec<u8> {
        vec![u8::from(*self)]
    }
}

macro_rules! impl_parse_fixed_slice {
    ($size: expr, $input: expr) => {{
        if $input.len() < $size {
            return Err(SMBError::payload_too_small($size, $input.len()));
        }
        let res = <[u8; $size]>::try_from(&$input[0..$size])
            .map_err(SMBError::parse_error)?;
        Ok::<_, SMBError>((&$input[$size..], res))
    }}
}

macro_rules! impl_smb_for_slice {(
    $($N:literal)*
) => (
    $(
        impl SMBByteSize for [u8; $N] {
            fn smb_byte_size(&self) -> usize {
                $N
            }
        }

        impl SMBFromBytes for [u8; $N] {
            fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
                impl_parse_fixed_slice!($N, input)
            }
        }

        impl SMBToBytes for [u8; $N] {
            fn smb_to_bytes(&self) -> Vec<u8> {
                self.to_vec()
            }
        }
    )*
)}

macro_rules! impl_smb_for_unsigned_type {(
    $($t:ty)*
) => (
    $(
        impl SMBByteSize for $t {
            fn smb_byte_size(&self) -> usize {
                std::mem::size_of_val(self)
            }
        }

        impl SMBFromBytes for $t {
            fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> {
                const T_SIZE: usize = std::mem::size_of::<$t>();
                let (remaining, raw) = impl_parse_fixed_slice!(T_SIZE, input)?;
                Ok((remaining, <$t>::from_le_bytes(raw)))
            }
        }

        impl SMBToBytes for $t {
            fn smb_to_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
        }
    )*
)}

impl_smb_for_slice! {
    2 4 8 16 24
}

impl_smb_for_unsigned_type! {
    u8 u16 u32 u64
}
