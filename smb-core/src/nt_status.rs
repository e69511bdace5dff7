use num_enum::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

/// NT status codes this client reacts to. Anything else maps to
/// [`NTStatus::UnknownError`]; headers keep the raw value.
#[repr(u32)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromPrimitive, Copy)]
pub enum NTStatus {
    StatusSuccess = 0x0,
    StatusPending = 0x103,
    BufferOverflow = 0x80000005,
    NoMoreFiles = 0x80000006,
    InvalidHandle = 0xC0000008,
    InvalidParameter = 0xC000000D,
    NoSuchFile = 0xC000000F,
    EndOfFile = 0xC0000011,
    MoreProcessingRequired = 0xC0000016,
    AccessDenied = 0xC0000022,
    ObjectNameInvalid = 0xC0000033,
    ObjectNameNotFound = 0xC0000034,
    ObjectNameCollision = 0xC0000035,
    ObjectPathNotFound = 0xC000003A,
    SharingViolation = 0xC0000043,
    DeletePending = 0xC0000056,
    StatusLogonFailure = 0xC000006D,
    PasswordExpired = 0xC0000071,
    AccountDisabled = 0xC0000072,
    FileIsADirectory = 0xC00000BA,
    StatusNotSupported = 0xC00000BB,
    BadNetworkName = 0xC00000CC,
    DirectoryNotEmpty = 0xC0000101,
    NotADirectory = 0xC0000103,
    Cancelled = 0xC0000120,
    FileClosed = 0xC0000128,
    UserSessionDeleted = 0xC0000203,
    NetworkSessionExpired = 0xC000035C,
    #[num_enum(default)]
    UnknownError = 0xFFFFFFFF,
}

impl NTStatus {
    pub fn is_success(&self) -> bool {
        *self == Self::StatusSuccess
    }

    /// Statuses that end an authenticated session on the server side.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::UserSessionDeleted | Self::NetworkSessionExpired)
    }
}

impl SMBByteSize for NTStatus {
    fn smb_byte_size(&self) -> usize {
        std::mem::size_of_val(&(*self as u32))
    }
}

impl SMBFromBytes for NTStatus {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, underlying) = u32::smb_from_bytes(input)?;
        Ok((remaining, Self::from(underlying)))
    }
}

impl SMBToBytes for NTStatus {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u32).smb_to_bytes()
    }
}
