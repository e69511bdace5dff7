use std::marker::PhantomData;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_core::SMBToBytes;
use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::SMBFileId;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBInfoType {
    File = 0x1,
    FileSystem = 0x2,
    Security = 0x3,
    Quota = 0x4,
}

/// File information classes this client sets (MS-FSCC 2.4).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBFileInfoClass {
    FileRenameInformation = 10,
    FileDispositionInformation = 13,
}

/// FILE_RENAME_INFORMATION_TYPE_2 as carried by SMB2 SET_INFO. RootDirectory
/// stays zero.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub struct SMBRenameInformation {
    #[smb_direct(start(fixed = 0))]
    pub replace_if_exists: bool,
    /// Share relative target path.
    #[smb_string(start(fixed = 20), length(inner(start = 16, num_type = "u32")), underlying = "u16")]
    pub file_name: String,
}

/// SMB2 SET_INFO Request (MS-SMB2 2.2.39)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 33)]
pub struct SMBSetInfoRequest {
    #[smb_direct(start(fixed = 2))]
    pub info_type: SMBInfoType,
    #[smb_direct(start(fixed = 3))]
    pub file_info_class: SMBFileInfoClass,
    #[smb_buffer(order = 0, offset(inner(start = 8, num_type = "u16", subtract = 64)), length(inner(start = 4, num_type = "u32")))]
    pub buffer: Vec<u8>,
    #[smb_skip(start = 10, length = 6)]
    additional_information: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 16))]
    pub file_id: SMBFileId,
}

impl SMBSetInfoRequest {
    pub fn rename(file_id: SMBFileId, information: &SMBRenameInformation) -> Self {
        Self {
            info_type: SMBInfoType::File,
            file_info_class: SMBFileInfoClass::FileRenameInformation,
            buffer: information.smb_to_bytes(),
            additional_information: PhantomData,
            file_id,
        }
    }
}

/// SMB2 SET_INFO Response (MS-SMB2 2.2.40)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy, Default, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 2)]
pub struct SMBSetInfoResponse;

#[cfg(test)]
mod tests {
    use smb_core::SMBFromBytes;

    use crate::byte_helper::utf16le;

    use super::*;

    #[test]
    fn rename_request_layout() {
        let info = SMBRenameInformation { replace_if_exists: false, file_name: "b.txt".into() };
        let request = SMBSetInfoRequest::rename(SMBFileId { persistent: 1, volatile: 1 }, &info);
        let bytes = request.smb_to_bytes();
        assert_eq!(&bytes[0..4], &[33, 0, 1, 10]);
        assert_eq!(&bytes[4..8], &30u32.to_le_bytes());
        assert_eq!(&bytes[8..10], &96u16.to_le_bytes());
        assert_eq!(&bytes[32 + 16..32 + 20], &10u32.to_le_bytes());
        assert_eq!(&bytes[32 + 20..], &utf16le("b.txt")[..]);
    }

    #[test]
    fn rename_information_reads_back() {
        let info = SMBRenameInformation { replace_if_exists: true, file_name: "dir\\c.txt".into() };
        let bytes = info.smb_to_bytes();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[8..16], &[0; 8]);
        let (remaining, parsed) = SMBRenameInformation::smb_from_bytes(&bytes).unwrap();
        assert!(remaining.is_empty());
        assert_eq!(parsed, info);
    }
}
