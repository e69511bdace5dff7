use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::SMBFileId;
use crate::protocol::header::SMB2_HEADER_SIZE;

/// SMB2 READ Request (MS-SMB2 2.2.19)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 49)]
pub struct SMBReadRequest {
    /// Where the server should place the data, header relative.
    #[smb_direct(start(fixed = 2))]
    padding: u8,
    #[smb_direct(start(fixed = 4))]
    pub length: u32,
    #[smb_direct(start(fixed = 8))]
    pub offset: u64,
    #[smb_direct(start(fixed = 16))]
    pub file_id: SMBFileId,
    #[smb_direct(start(fixed = 32))]
    pub minimum_count: u32,
    #[smb_skip(start = 36, length = 12)]
    reserved: PhantomData<Vec<u8>>,
}

impl SMBReadRequest {
    pub fn new(file_id: SMBFileId, offset: u64, length: u32) -> Self {
        Self {
            padding: (SMB2_HEADER_SIZE + 16) as u8,
            length,
            offset,
            file_id,
            minimum_count: 0,
            reserved: PhantomData,
        }
    }
}

/// SMB2 READ Response (MS-SMB2 2.2.20)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 17)]
pub struct SMBReadResponse {
    #[smb_buffer(order = 0, offset(inner(start = 2, num_type = "u8", subtract = 64)), length(inner(start = 4, num_type = "u32")))]
    pub data: Vec<u8>,
    #[smb_direct(start(fixed = 8))]
    pub data_remaining: u32,
    #[smb_skip(start = 12, length = 4)]
    reserved: PhantomData<Vec<u8>>,
}
