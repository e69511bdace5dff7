use std::marker::PhantomData;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::SMBAccessMask;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBShareType {
    Disk = 0x1,
    Pipe = 0x2,
    Print = 0x3,
}

/// SMB2 TREE_CONNECT Request (MS-SMB2 2.2.9)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 9)]
pub struct SMBTreeConnectRequest {
    #[smb_skip(start = 2, length = 2)]
    reserved: PhantomData<Vec<u8>>,
    /// Full UNC path, `\\server\share`.
    #[smb_string(order = 0, start(inner(start = 4, num_type = "u16", subtract = 64)), length(inner(start = 6, num_type = "u16")), underlying = "u16")]
    pub path: String,
}

impl SMBTreeConnectRequest {
    pub fn new(server: &str, share: &str) -> Self {
        Self {
            reserved: PhantomData,
            path: format!("\\\\{}\\{}", server, share),
        }
    }
}

/// SMB2 TREE_CONNECT Response (MS-SMB2 2.2.10)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 16)]
pub struct SMBTreeConnectResponse {
    #[smb_direct(start(fixed = 2))]
    pub share_type: SMBShareType,
    #[smb_skip(start = 3, length = 1)]
    reserved: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 4))]
    pub share_flags: u32,
    #[smb_direct(start(fixed = 8))]
    pub capabilities: u32,
    #[smb_direct(start(fixed = 12))]
    pub maximal_access: SMBAccessMask,
}

#[cfg(test)]
mod tests {
    use smb_core::{SMBByteSize, SMBFromBytes, SMBToBytes};

    use super::*;

    #[test]
    fn unc_path_at_offset_72() {
        let request = SMBTreeConnectRequest::new("SERVER", "shared");
        assert_eq!(request.path, "\\\\SERVER\\shared");
        let bytes = request.smb_to_bytes();
        assert_eq!(&bytes[4..6], &72u16.to_le_bytes());
        assert_eq!(&bytes[6..8], &30u16.to_le_bytes());
        assert_eq!(bytes.len(), request.smb_byte_size());
    }

    #[test]
    fn parses_disk_share() {
        let mut body = vec![16, 0, 1, 0];
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0x001F01FFu32.to_le_bytes());
        let (_, response) = SMBTreeConnectResponse::smb_from_bytes(&body).unwrap();
        assert_eq!(response.share_type, SMBShareType::Disk);
        assert!(response.maximal_access.contains(SMBAccessMask::DELETE));
    }

    #[test]
    fn unknown_share_type_is_rejected() {
        let mut body = vec![16, 0, 9, 0];
        body.extend_from_slice(&[0; 12]);
        assert!(SMBTreeConnectResponse::smb_from_bytes(&body).is_err());
    }
}
