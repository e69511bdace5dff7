use std::marker::PhantomData;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::{SMBFileAttributes, SMBFileId};
use crate::protocol::body::FileTime;
use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SMBCloseFlags: u16 {
        const POSTQUERY_ATTRIB = 0x0001;
    }
}

impl_smb_byte_size_for_bitflag! { SMBCloseFlags }
impl_smb_to_bytes_for_bitflag! { SMBCloseFlags }
impl_smb_from_bytes_for_bitflag! { SMBCloseFlags }

/// SMB2 CLOSE Request (MS-SMB2 2.2.15)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 24)]
pub struct SMBCloseRequest {
    #[smb_direct(start(fixed = 2))]
    pub flags: SMBCloseFlags,
    #[smb_skip(start = 4, length = 4)]
    reserved: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 8))]
    pub file_id: SMBFileId,
}

impl SMBCloseRequest {
    pub fn new(file_id: SMBFileId) -> Self {
        Self { flags: SMBCloseFlags::empty(), reserved: PhantomData, file_id }
    }
}

/// SMB2 CLOSE Response (MS-SMB2 2.2.16). Attributes are zero unless
/// POSTQUERY_ATTRIB was requested.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 60)]
pub struct SMBCloseResponse {
    #[smb_direct(start(fixed = 2))]
    pub flags: SMBCloseFlags,
    #[smb_skip(start = 4, length = 4)]
    reserved: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 8))]
    pub creation_time: FileTime,
    #[smb_direct(start(fixed = 16))]
    pub last_access_time: FileTime,
    #[smb_direct(start(fixed = 24))]
    pub last_write_time: FileTime,
    #[smb_direct(start(fixed = 32))]
    pub change_time: FileTime,
    #[smb_direct(start(fixed = 40))]
    pub allocation_size: u64,
    #[smb_direct(start(fixed = 48))]
    pub end_of_file: u64,
    #[smb_direct(start(fixed = 56))]
    pub file_attributes: SMBFileAttributes,
}
