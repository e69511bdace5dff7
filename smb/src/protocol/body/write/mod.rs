use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::SMBFileId;

/// SMB2 WRITE Request (MS-SMB2 2.2.21)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 49)]
pub struct SMBWriteRequest {
    #[smb_buffer(order = 0, offset(inner(start = 2, num_type = "u16", subtract = 64)), length(inner(start = 4, num_type = "u32")))]
    pub data: Vec<u8>,
    #[smb_direct(start(fixed = 8))]
    pub offset: u64,
    #[smb_direct(start(fixed = 16))]
    pub file_id: SMBFileId,
    #[smb_skip(start = 32, length = 16)]
    reserved: PhantomData<Vec<u8>>,
}

impl SMBWriteRequest {
    pub fn new(file_id: SMBFileId, offset: u64, data: Vec<u8>) -> Self {
        Self { data, offset, file_id, reserved: PhantomData }
    }
}

/// SMB2 WRITE Response (MS-SMB2 2.2.22)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 17)]
pub struct SMBWriteResponse {
    #[smb_direct(start(fixed = 4))]
    pub count: u32,
    #[smb_skip(start = 8, length = 8)]
    reserved: PhantomData<Vec<u8>>,
}
