use bytes::BufMut;
use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, le_u32, le_u64};
use nom::sequence::tuple;
use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::byte_helper::nom_error;
use crate::protocol::header::{SMBCommandCode, SMBFlags};

pub const SMB2_HEADER_SIZE: usize = 64;
pub const SMB2_PROTOCOL_ID: [u8; 4] = [0xFE, b'S', b'M', b'B'];

/// SMB2 packet header. Covers both the sync and async layouts; `async_id` is
/// only meaningful when [`SMBFlags::ASYNC_COMMAND`] is set, `tree_id` only
/// when it is not.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBHeader {
    pub credit_charge: u16,
    /// NT status on responses, channel sequence on requests.
    pub status: u32,
    pub command: SMBCommandCode,
    /// Credits requested (client) or granted (server).
    pub credits: u16,
    pub flags: SMBFlags,
    pub next_command: u32,
    pub message_id: u64,
    pub tree_id: u32,
    pub async_id: u64,
    pub session_id: u64,
    pub signature: [u8; 16],
}

impl SMBHeader {
    pub fn request(command: SMBCommandCode, message_id: u64, session_id: u64, tree_id: u32) -> Self {
        Self {
            credit_charge: 0,
            status: 0,
            command,
            credits: 0,
            flags: SMBFlags::empty(),
            next_command: 0,
            message_id,
            tree_id,
            async_id: 0,
            session_id,
            signature: [0; 16],
        }
    }

    pub fn nt_status(&self) -> NTStatus {
        NTStatus::from(self.status)
    }

    pub fn is_async(&self) -> bool {
        self.flags.contains(SMBFlags::ASYNC_COMMAND)
    }

    pub fn is_response(&self) -> bool {
        self.flags.contains(SMBFlags::SERVER_TO_REDIR)
    }

    /// An interim response announcing that the final one will follow.
    pub fn is_interim(&self) -> bool {
        self.is_async() && self.nt_status() == NTStatus::StatusPending
    }
}

impl SMBByteSize for SMBHeader {
    fn smb_byte_size(&self) -> usize {
        SMB2_HEADER_SIZE
    }
}

impl SMBFromBytes for SMBHeader {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, (_, _, credit_charge, status)) = tuple((
            tag(&SMB2_PROTOCOL_ID[..]),
            tag(&[64u8, 0][..]),
            le_u16,
            le_u32,
        ))(input)
        .map_err(nom_error)?;
        let (remaining, command) = SMBCommandCode::smb_from_bytes(remaining)?;
        let (remaining, (credits, flags, next_command, message_id)) =
            tuple((le_u16, le_u32, le_u32, le_u64))(remaining).map_err(nom_error)?;
        let flags = SMBFlags::from_bits_truncate(flags);
        let (remaining, (async_id, tree_id)) = if flags.contains(SMBFlags::ASYNC_COMMAND) {
            let (remaining, async_id) = le_u64(remaining).map_err(nom_error)?;
            (remaining, (async_id, 0))
        } else {
            let (remaining, (_, tree_id)) = tuple((le_u32, le_u32))(remaining).map_err(nom_error)?;
            (remaining, (0, tree_id))
        };
        let (remaining, (session_id, signature)) =
            tuple((le_u64, take(16usize)))(remaining).map_err(nom_error)?;
        let signature = <[u8; 16]>::try_from(signature).map_err(SMBError::parse_error)?;
        Ok((remaining, Self {
            credit_charge,
            status,
            command,
            credits,
            flags,
            next_command,
            message_id,
            tree_id,
            async_id,
            session_id,
            signature,
        }))
    }
}

impl SMBToBytes for SMBHeader {
    fn smb_to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SMB2_HEADER_SIZE);
        bytes.put_slice(&SMB2_PROTOCOL_ID);
        bytes.put_u16_le(SMB2_HEADER_SIZE as u16);
        bytes.put_u16_le(self.credit_charge);
        bytes.put_u32_le(self.status);
        bytes.put_u16_le(self.command as u16);
        bytes.put_u16_le(self.credits);
        bytes.put_u32_le(self.flags.bits());
        bytes.put_u32_le(self.next_command);
        bytes.put_u64_le(self.message_id);
        if self.is_async() {
            bytes.put_u64_le(self.async_id);
        } else {
            bytes.put_u32_le(0);
            bytes.put_u32_le(self.tree_id);
        }
        bytes.put_u64_le(self.session_id);
        bytes.put_slice(&self.signature);
        bytes
    }
}
