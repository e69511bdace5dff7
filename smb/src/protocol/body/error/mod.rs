use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult};

use crate::protocol::body::structure_size;

/// SMB2 ERROR Response (MS-SMB2 2.2.2). The status itself travels in the
/// header; the body only carries optional error data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct SMBErrorResponse {
    pub error_context_count: u8,
    pub error_data: Vec<u8>,
}

impl SMBByteSize for SMBErrorResponse {
    fn smb_byte_size(&self) -> usize {
        8 + self.error_data.len().max(1)
    }
}

impl SMBFromBytes for SMBErrorResponse {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let remaining = structure_size(input, 9)?;
        let (remaining, error_context_count) = u8::smb_from_bytes(remaining)?;
        let (remaining, _reserved) = u8::smb_from_bytes(remaining)?;
        let (remaining, byte_count) = u32::smb_from_bytes(remaining)?;
        let byte_count = (byte_count as usize).min(remaining.len());
        let error_data = remaining[..byte_count].to_vec();
        Ok((&remaining[byte_count..], Self { error_context_count, error_data }))
    }
}
