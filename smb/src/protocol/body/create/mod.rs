use std::marker::PhantomData;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::FileTime;

mod access_mask;
mod file_attributes;
mod options;

pub use access_mask::SMBAccessMask;
pub use file_attributes::SMBFileAttributes;
pub use options::{SMBCreateDisposition, SMBCreateOptions, SMBShareAccess};

#[derive(Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Clone, Copy, Default, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub struct SMBFileId {
    #[smb_direct(start(fixed = 0))]
    pub persistent: u64,
    #[smb_direct(start(fixed = 8))]
    pub volatile: u64,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBOplockLevel {
    None = 0x0,
    II = 0x1,
    Exclusive = 0x8,
    Batch = 0x9,
    Lease = 0xFF,
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive, Serialize, Deserialize, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBImpersonationLevel {
    Anonymous = 0x0,
    Identification = 0x1,
    Impersonation = 0x2,
    Delegate = 0x3,
}

#[repr(u32)]
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, Copy, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBCreateAction {
    Superseded = 0x0,
    Opened = 0x1,
    Created = 0x2,
    Overwritten = 0x3,
}

/// SMB2 CREATE Request (MS-SMB2 2.2.13) without create contexts.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 57)]
pub struct SMBCreateRequest {
    #[smb_direct(start(fixed = 3))]
    pub oplock_level: SMBOplockLevel,
    #[smb_direct(start(fixed = 4))]
    pub impersonation_level: SMBImpersonationLevel,
    #[smb_skip(start = 8, length = 16)]
    reserved: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 24))]
    pub desired_access: SMBAccessMask,
    #[smb_direct(start(fixed = 28))]
    pub file_attributes: SMBFileAttributes,
    #[smb_direct(start(fixed = 32))]
    pub share_access: SMBShareAccess,
    #[smb_direct(start(fixed = 36))]
    pub disposition: SMBCreateDisposition,
    #[smb_direct(start(fixed = 40))]
    pub options: SMBCreateOptions,
    /// Share relative, backslash separated; empty for the share root.
    #[smb_string(order = 0, start(inner(start = 44, num_type = "u16", subtract = 64)), length(inner(start = 46, num_type = "u16")), underlying = "u16")]
    pub name: String,
}

impl SMBCreateRequest {
    pub fn new(name: impl Into<String>, desired_access: SMBAccessMask, disposition: SMBCreateDisposition, options: SMBCreateOptions) -> Self {
        Self {
            oplock_level: SMBOplockLevel::None,
            impersonation_level: SMBImpersonationLevel::Impersonation,
            reserved: PhantomData,
            desired_access,
            file_attributes: SMBFileAttributes::empty(),
            share_access: SMBShareAccess::READ | SMBShareAccess::WRITE | SMBShareAccess::DELETE,
            disposition,
            options,
            name: name.into(),
        }
    }

    pub fn with_attributes(mut self, attributes: SMBFileAttributes) -> Self {
        self.file_attributes = attributes;
        self
    }
}

/// SMB2 CREATE Response (MS-SMB2 2.2.14).
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 89)]
pub struct SMBCreateResponse {
    #[smb_direct(start(fixed = 2))]
    pub oplock_level: SMBOplockLevel,
    #[smb_direct(start(fixed = 3))]
    pub flags: u8,
    #[smb_direct(start(fixed = 4))]
    pub action: SMBCreateAction,
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
    #[smb_skip(start = 60, length = 4)]
    reserved: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 64))]
    pub file_id: SMBFileId,
    /// Raw create contexts; this client requests none.
    #[smb_buffer(order = 0, offset(inner(start = 80, num_type = "u32", subtract = 64)), length(inner(start = 84, num_type = "u32")))]
    pub create_contexts: Vec<u8>,
}
