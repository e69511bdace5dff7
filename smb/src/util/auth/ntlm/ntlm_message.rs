use bitflags::bitflags;
use bytes::BufMut;
use nom::bytes::complete::{tag, take};
use nom::error::ErrorKind;
use nom::number::complete::{le_u16, le_u32};
use nom::Err::Error;
use nom::IResult;
use serde::{Deserialize, Serialize};

use smb_core::error::{AuthError, SMBError};
use smb_core::SMBResult;

use crate::byte_helper::nom_error;
use crate::util::auth::ntlm::{NTLMAuthenticateMessageBody, NTLMChallengeMessageBody, NTLMNegotiateMessageBody};

pub(crate) const NTLMSSP_SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub enum NTLMMessage {
    Negotiate(NTLMNegotiateMessageBody),
    Challenge(NTLMChallengeMessageBody),
    Authenticate(NTLMAuthenticateMessageBody),
}

impl NTLMMessage {
    pub fn parse(bytes: &[u8]) -> SMBResult<Self> {
        Self::parse_inner(bytes).map(|(_, message)| message).map_err(nom_error)
    }

    fn parse_inner(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (_, msg_type) = tag(&NTLMSSP_SIGNATURE[..])(bytes)
            .and_then(|(remaining, _)| le_u32(remaining))?;
        match msg_type {
            0x01 => {
                let (remaining, body) = NTLMNegotiateMessageBody::parse(bytes)?;
                Ok((remaining, NTLMMessage::Negotiate(body)))
            }
            0x02 => {
                let (remaining, body) = NTLMChallengeMessageBody::parse(bytes)?;
                Ok((remaining, NTLMMessage::Challenge(body)))
            }
            0x03 => {
                let (remaining, body) = NTLMAuthenticateMessageBody::parse(bytes)?;
                Ok((remaining, NTLMMessage::Authenticate(body)))
            }
            _ => Err(Error(nom::error::Error::new(bytes, ErrorKind::Fail))),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            NTLMMessage::Negotiate(msg) => msg.as_bytes(),
            NTLMMessage::Challenge(msg) => msg.as_bytes(),
            NTLMMessage::Authenticate(msg) => msg.as_bytes(),
        }
    }

    pub fn is_ntlmssp(bytes: &[u8]) -> bool {
        bytes.starts_with(NTLMSSP_SIGNATURE)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct NTLMNegotiateFlags: u32 {
        const UNICODE_ENCODING = 0x01;
        const OEM_ENCODING = 0x02;
        const REQUEST_TARGET = 0x04;
        const SIGN = 0x10;
        const SEAL = 0x20;
        const DATAGRAM = 0x40;
        const LAN_MANAGER_SESSION_KEY = 0x80;
        const NTLM_SESSION_SECURITY = 0x200;
        const ANONYMOUS = 0x800;
        const DOMAIN_NAME_SUPPLIED = 0x1000;
        const WORKSTATION_NAME_SUPPLIED = 0x2000;
        const ALWAYS_SIGN = 0x8000;
        const TARGET_TYPE_DOMAIN = 0x10000;
        const TARGET_TYPE_SERVER = 0x20000;
        const EXTENDED_SESSION_SECURITY = 0x80000;
        const IDENTIFY = 0x100000;
        const REQUEST_NON_NT_SESSION_KEY = 0x400000;
        const TARGET_INFO = 0x800000;
        const VERSION = 0x2000000;
        const USE_128_BIT_ENCRYPTION = 0x20000000;
        const KEY_EXCHANGE = 0x40000000;
        const USE_56_BIT_ENCRYPTION = 0x80000000;
    }
}

impl NTLMNegotiateFlags {
    /// Flags a client offers in its NEGOTIATE message.
    pub fn client_default() -> Self {
        Self::UNICODE_ENCODING
            | Self::REQUEST_TARGET
            | Self::SIGN
            | Self::NTLM_SESSION_SECURITY
            | Self::ALWAYS_SIGN
            | Self::EXTENDED_SESSION_SECURITY
            | Self::TARGET_INFO
            | Self::USE_128_BIT_ENCRYPTION
            | Self::KEY_EXCHANGE
            | Self::USE_56_BIT_ENCRYPTION
    }
}

/// Length and offset of a variable NTLM payload field; max length is ignored.
pub(crate) fn parse_ntlm_buffer_fields(bytes: &[u8]) -> IResult<&[u8], (u16, u32)> {
    let (remaining, length) = le_u16(bytes)?;
    let (remaining, buffer_offset) = take(2_usize)(remaining).and_then(|(remaining, _)| le_u32(remaining))?;
    Ok((remaining, (length, buffer_offset)))
}

pub(crate) fn put_ntlm_buffer_fields(bytes: &mut Vec<u8>, length: usize, offset: usize) {
    bytes.put_u16_le(length as u16);
    bytes.put_u16_le(length as u16);
    bytes.put_u32_le(offset as u32);
}

/// Slices a payload field out of the whole message given its (length, offset) pair.
pub(crate) fn ntlm_buffer(message: &[u8], (length, offset): (u16, u32)) -> IResult<&[u8], Vec<u8>> {
    let (remaining, slice) = take(offset as usize)(message)
        .and_then(|(remaining, _)| take(length as usize)(remaining))?;
    Ok((remaining, slice.to_vec()))
}

pub(crate) fn ntlm_string(message: &[u8], fields: (u16, u32)) -> IResult<&[u8], String> {
    let (remaining, raw) = ntlm_buffer(message, fields)?;
    let units = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect::<Vec<u16>>();
    String::from_utf16(&units)
        .map(|s| (remaining, s))
        .map_err(|_| Error(nom::error::Error::new(message, ErrorKind::Verify)))
}

pub(crate) fn invalid_token(message: impl Into<String>) -> SMBError {
    AuthError::InvalidToken(message.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_message_type() {
        let bytes = [&NTLMSSP_SIGNATURE[..], &[9, 0, 0, 0]].concat();
        assert!(NTLMMessage::parse(&bytes).is_err());
        assert!(NTLMMessage::parse(b"NOTNTLM\0\x01\0\0\0").is_err());
    }

    #[test]
    fn buffer_fields_skip_max_length() {
        let mut bytes = Vec::new();
        put_ntlm_buffer_fields(&mut bytes, 6, 88);
        assert_eq!(bytes, [6, 0, 6, 0, 88, 0, 0, 0]);
        let (_, fields) = parse_ntlm_buffer_fields(&bytes).unwrap();
        assert_eq!(fields, (6, 88));
    }
}
