use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::{ProtocolError, SMBError};

#[repr(u16)]
#[derive(Debug, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize, Clone, Copy)]
pub enum SMBCommandCode {
    Negotiate = 0x0,
    SessionSetup,
    LogOff,
    TreeConnect,
    TreeDisconnect,
    Create,
    Close,
    Flush,
    Read,
    Write,
    Lock,
    IOCTL,
    Cancel,
    Echo,
    QueryDirectory,
    ChangeNotify,
    QueryInfo,
    SetInfo,
    OplockBreak,
}

impl SMBByteSize for SMBCommandCode {
    fn smb_byte_size(&self) -> usize {
        2
    }
}

impl SMBFromBytes for SMBCommandCode {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, raw) = u16::smb_from_bytes(input)?;
        let code = Self::try_from_primitive(raw)
            .map_err(|_| SMBError::from(ProtocolError::Unsupported(format!("command code {:#06x}", raw))))?;
        Ok((remaining, code))
    }
}

impl SMBToBytes for SMBCommandCode {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u16).smb_to_bytes()
    }
}
