use std::marker::PhantomData;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::negotiate::{Capabilities, SecurityMode};
use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
    pub struct SMBSessionFlags: u16 {
        const IS_GUEST = 0x01;
        const IS_NULL = 0x02;
        const ENCRYPT_DATA = 0x04;
    }
}

impl_smb_byte_size_for_bitflag! { SMBSessionFlags }
impl_smb_from_bytes_for_bitflag! { SMBSessionFlags }
impl_smb_to_bytes_for_bitflag! { SMBSessionFlags }

/// SMB2 SESSION_SETUP Request (MS-SMB2 2.2.5)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 25)]
pub struct SMBSessionSetupRequest {
    /// Binding flags; always zero for a fresh session.
    #[smb_direct(start(fixed = 2))]
    pub flags: u8,
    /// The low byte of [`SecurityMode`].
    #[smb_direct(start(fixed = 3))]
    pub security_mode: u8,
    #[smb_direct(start(fixed = 4))]
    pub capabilities: Capabilities,
    #[smb_skip(start = 8, length = 4)]
    channel: PhantomData<Vec<u8>>,
    #[smb_buffer(order = 0, offset(inner(start = 12, num_type = "u16", subtract = 64)), length(inner(start = 14, num_type = "u16")))]
    pub security_buffer: Vec<u8>,
    #[smb_direct(start(fixed = 16))]
    pub previous_session_id: u64,
}

impl SMBSessionSetupRequest {
    pub fn new(security_mode: SecurityMode, security_buffer: Vec<u8>) -> Self {
        Self {
            flags: 0,
            security_mode: security_mode.bits() as u8,
            capabilities: Capabilities::DFS,
            channel: PhantomData,
            security_buffer,
            previous_session_id: 0,
        }
    }
}

/// SMB2 SESSION_SETUP Response (MS-SMB2 2.2.6)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 9)]
pub struct SMBSessionSetupResponse {
    #[smb_direct(start(fixed = 2))]
    pub session_flags: SMBSessionFlags,
    #[smb_buffer(order = 0, offset(inner(start = 4, num_type = "u16", subtract = 64)), length(inner(start = 6, num_type = "u16")))]
    pub security_buffer: Vec<u8>,
}
