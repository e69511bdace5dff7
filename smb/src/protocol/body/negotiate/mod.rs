use std::marker::PhantomData;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::{FileTime, SMBDialect};
use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
    pub struct SecurityMode: u16 {
        const SIGNING_ENABLED = 0x01;
        const SIGNING_REQUIRED = 0x02;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
    pub struct Capabilities: u32 {
        const DFS                = 0x01;
        const LEASING            = 0x02;
        const LARGE_MTU          = 0x04;
        const MULTI_CHANNEL      = 0x08;
        const PERSISTENT_HANDLES = 0x10;
        const DIRECTORY_LEASING  = 0x20;
        const ENCRYPTION         = 0x40;
    }
}

impl_smb_byte_size_for_bitflag! { SecurityMode Capabilities }
impl_smb_from_bytes_for_bitflag! { SecurityMode Capabilities }
impl_smb_to_bytes_for_bitflag! { SecurityMode Capabilities }

/// SMB2 NEGOTIATE Request (MS-SMB2 2.2.3) without negotiate contexts.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 36)]
pub struct SMBNegotiateRequest {
    #[smb_direct(start(fixed = 4))]
    pub security_mode: SecurityMode,
    #[smb_direct(start(fixed = 8))]
    pub capabilities: Capabilities,
    #[smb_direct(start(fixed = 12))]
    pub client_guid: Uuid,
    #[smb_skip(start = 28, length = 8)]
    client_start_time: PhantomData<Vec<u8>>,
    #[smb_vector(order = 0, count(inner(start = 2, num_type = "u16")))]
    pub dialects: Vec<SMBDialect>,
}

impl SMBNegotiateRequest {
    pub fn new(dialects: Vec<SMBDialect>, require_signing: bool, client_guid: Uuid) -> Self {
        let security_mode = if require_signing {
            SecurityMode::SIGNING_ENABLED | SecurityMode::SIGNING_REQUIRED
        } else {
            SecurityMode::SIGNING_ENABLED
        };
        Self {
            security_mode,
            capabilities: Capabilities::DFS | Capabilities::LARGE_MTU,
            client_guid,
            client_start_time: PhantomData,
            dialects,
        }
    }
}

/// SMB2 NEGOTIATE Response (MS-SMB2 2.2.4). The dialect is kept raw so an
/// answer outside the offered list can be reported as a mismatch.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 65)]
pub struct SMBNegotiateResponse {
    #[smb_direct(start(fixed = 2))]
    pub security_mode: SecurityMode,
    #[smb_direct(start(fixed = 4))]
    pub dialect: u16,
    #[smb_skip(start = 6, length = 2)]
    context_count: PhantomData<Vec<u8>>,
    #[smb_direct(start(fixed = 8))]
    pub server_guid: Uuid,
    #[smb_direct(start(fixed = 24))]
    pub capabilities: Capabilities,
    #[smb_direct(start(fixed = 28))]
    pub max_transact_size: u32,
    #[smb_direct(start(fixed = 32))]
    pub max_read_size: u32,
    #[smb_direct(start(fixed = 36))]
    pub max_write_size: u32,
    #[smb_direct(start(fixed = 40))]
    pub system_time: FileTime,
    #[smb_direct(start(fixed = 48))]
    pub server_start_time: FileTime,
    #[smb_buffer(order = 0, offset(inner(start = 56, num_type = "u16", subtract = 64)), length(inner(start = 58, num_type = "u16")))]
    pub security_buffer: Vec<u8>,
}
