use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::{AuthError, SMBError};

#[repr(u16)]
#[derive(Debug, Eq, PartialEq, Hash, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Ord, PartialOrd)]
#[allow(non_camel_case_types)]
pub enum SMBDialect {
    V2_0_2 = 0x202,
    V2_1_0 = 0x210,
    V3_0_0 = 0x300,
    V3_0_2 = 0x302,
    V3_1_1 = 0x311,
    /// Wildcard answer to a multi-protocol negotiate; never a final dialect.
    V2_X_X = 0x2FF,
}

impl SMBDialect {
    /// Dialects this client negotiates unless configured otherwise.
    pub const DEFAULT_OFFERED: [SMBDialect; 4] = [Self::V2_0_2, Self::V2_1_0, Self::V3_0_0, Self::V3_0_2];

    pub fn is_smb3(&self) -> bool {
        *self as u16 >= 0x300 && *self != Self::V2_X_X
    }

    /// 2.0.2 predates multi-credit requests and carries a zero charge.
    pub fn supports_credit_charge(&self) -> bool {
        *self != Self::V2_0_2
    }
}

impl SMBByteSize for SMBDialect {
    fn smb_byte_size(&self) -> usize {
        2
    }
}

impl SMBFromBytes for SMBDialect {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, raw) = u16::smb_from_bytes(input)?;
        let dialect = Self::try_from_primitive(raw)
            .map_err(|_| SMBError::from(AuthError::DialectMismatch))?;
        Ok((remaining, dialect))
    }
}

impl SMBToBytes for SMBDialect {
    fn smb_to_bytes(&self) -> Vec<u8> {
        (*self as u16).smb_to_bytes()
    }
}
