use std::ops::Range;

use bytes::BufMut;
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;
use serde::{Deserialize, Serialize};

use crate::byte_helper::utf16le;
use crate::util::auth::ntlm::ntlm_message::{NTLMNegotiateFlags, NTLMSSP_SIGNATURE, ntlm_buffer, ntlm_string, parse_ntlm_buffer_fields, put_ntlm_buffer_fields};

const AUTHENTICATE_PAYLOAD_OFFSET: usize = 88;
pub(crate) const MIC_RANGE: Range<usize> = 72..88;

/// AUTHENTICATE_MESSAGE (MS-NLMP 2.2.1.3), always carrying the Version and MIC fields.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct NTLMAuthenticateMessageBody {
    pub negotiate_flags: NTLMNegotiateFlags,
    pub domain_name: String,
    pub user_name: String,
    pub workstation: String,
    pub lm_challenge_response: Vec<u8>,
    pub nt_challenge_response: Vec<u8>,
    pub encrypted_session_key: Vec<u8>,
    pub mic: [u8; 16],
}

impl NTLMAuthenticateMessageBody {
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (_, (_, lm_info, nt_info, domain_info, user_info, workstation_info, key_info, negotiate_flags, _, raw_mic)) = tuple((
            take(12_usize),
            parse_ntlm_buffer_fields,
            parse_ntlm_buffer_fields,
            parse_ntlm_buffer_fields,
            parse_ntlm_buffer_fields,
            parse_ntlm_buffer_fields,
            parse_ntlm_buffer_fields,
            map(le_u32, NTLMNegotiateFlags::from_bits_truncate),
            take(8_usize),
            take(16_usize),
        ))(bytes)?;
        let (_, lm_challenge_response) = ntlm_buffer(bytes, lm_info)?;
        let (_, nt_challenge_response) = ntlm_buffer(bytes, nt_info)?;
        let (_, domain_name) = ntlm_string(bytes, domain_info)?;
        let (_, user_name) = ntlm_string(bytes, user_info)?;
        let (_, workstation) = ntlm_string(bytes, workstation_info)?;
        let (remaining, encrypted_session_key) = ntlm_buffer(bytes, key_info)?;
        let mut mic = [0; 16];
        mic.copy_from_slice(raw_mic);
        Ok((remaining, Self {
            negotiate_flags,
            domain_name,
            user_name,
            workstation,
            lm_challenge_response,
            nt_challenge_response,
            encrypted_session_key,
            mic,
        }))
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let domain = utf16le(&self.domain_name);
        let user = utf16le(&self.user_name);
        let workstation = utf16le(&self.workstation);
        let payload: [&[u8]; 6] = [
            &self.lm_challenge_response,
            &self.nt_challenge_response,
            &domain,
            &user,
            &workstation,
            &self.encrypted_session_key,
        ];

        let mut bytes = Vec::with_capacity(AUTHENTICATE_PAYLOAD_OFFSET + payload.iter().map(|p| p.len()).sum::<usize>());
        bytes.put_slice(NTLMSSP_SIGNATURE);
        bytes.put_u32_le(0x03);
        let mut offset = AUTHENTICATE_PAYLOAD_OFFSET;
        for field in payload {
            put_ntlm_buffer_fields(&mut bytes, field.len(), offset);
            offset += field.len();
        }
        bytes.put_u32_le(self.negotiate_flags.bits());
        bytes.put_u64_le(0);
        bytes.put_slice(&self.mic);
        for field in payload {
            bytes.put_slice(field);
        }
        bytes
    }

    pub fn is_anonymous(&self) -> bool {
        self.negotiate_flags.contains(NTLMNegotiateFlags::ANONYMOUS)
            || (self.user_name.is_empty() && self.nt_challenge_response.is_empty())
    }
}
