use std::marker::PhantomData;

use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::SMBFileId;
use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

mod directory_information;

pub use directory_information::SMBDirectoryInformation;

bitflags! {
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
    pub struct SMBQueryDirectoryFlags: u8 {
        const RESTART_SCANS = 0x1;
        const RETURN_SINGLE_ENTRY = 0x2;
        const INDEX_SPECIFIED = 0x4;
        const REOPEN = 0x10;
    }
}

impl_smb_byte_size_for_bitflag! { SMBQueryDirectoryFlags }
impl_smb_from_bytes_for_bitflag! { SMBQueryDirectoryFlags }
impl_smb_to_bytes_for_bitflag! { SMBQueryDirectoryFlags }

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBInformationClass {
    FileDirectoryInformation = 0x01,
    FileFullDirectoryInformation = 0x02,
    FileBothDirectoryInformation = 0x03,
    FileNamesInformation = 0x0C,
}

/// SMB2 QUERY_DIRECTORY Request (MS-SMB2 2.2.33)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 33)]
pub struct SMBQueryDirectoryRequest {
    #[smb_direct(start(fixed = 2))]
    pub information_class: SMBInformationClass,
    #[smb_direct(start(fixed = 3))]
    pub flags: SMBQueryDirectoryFlags,
    #[smb_skip(start = 4, length = 4)]
    file_index: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 8))]
    pub file_id: SMBFileId,
    #[smb_string(order = 0, start(inner(start = 24, num_type = "u16", subtract = 64)), length(inner(start = 26, num_type = "u16")), underlying = "u16")]
    pub pattern: String,
    #[smb_direct(start(fixed = 28))]
    pub output_buffer_length: u32,
}

impl SMBQueryDirectoryRequest {
    pub fn new(file_id: SMBFileId, pattern: impl Into<String>, restart: bool, output_buffer_length: u32) -> Self {
        let flags = if restart {
            SMBQueryDirectoryFlags::RESTART_SCANS
        } else {
            SMBQueryDirectoryFlags::empty()
        };
        Self {
            information_class: SMBInformationClass::FileDirectoryInformation,
            flags,
            file_index: PhantomData,
            file_id,
            pattern: pattern.into(),
            output_buffer_length,
        }
    }
}

/// SMB2 QUERY_DIRECTORY Response (MS-SMB2 2.2.34). The output buffer holds
/// the entries in the requested information class.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 9)]
pub struct SMBQueryDirectoryResponse {
    #[smb_buffer(order = 0, offset(inner(start = 2, num_type = "u16", subtract = 64)), length(inner(start = 4, num_type = "u32")))]
    pub output_buffer: Vec<u8>,
}

impl SMBQueryDirectoryResponse {
    pub fn entries(&self) -> smb_core::SMBResult<Vec<SMBDirectoryInformation>> {
        SMBDirectoryInformation::parse_list(&self.output_buffer)
    }
}
