use bytes::BufMut;
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;
use serde::{Deserialize, Serialize};

use smb_core::SMBResult;

use crate::byte_helper::{nom_error, utf16le};
use crate::util::auth::ntlm::av_pair::AvPairList;
use crate::util::auth::ntlm::ntlm_message::{NTLMNegotiateFlags, NTLMSSP_SIGNATURE, ntlm_buffer, ntlm_string, parse_ntlm_buffer_fields, put_ntlm_buffer_fields};

const CHALLENGE_PAYLOAD_OFFSET: usize = 56;

/// CHALLENGE_MESSAGE (MS-NLMP 2.2.1.2)
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct NTLMChallengeMessageBody {
    pub target_name: String,
    pub negotiate_flags: NTLMNegotiateFlags,
    pub server_challenge: [u8; 8],
    /// Raw AV_PAIR list, hashed verbatim into the NTLMv2 client blob.
    pub target_info: Vec<u8>,
}

impl NTLMChallengeMessageBody {
    pub fn new(target_name: String, negotiate_flags: NTLMNegotiateFlags, server_challenge: [u8; 8], target_info: &AvPairList) -> Self {
        Self {
            target_name,
            negotiate_flags,
            server_challenge,
            target_info: target_info.as_bytes(),
        }
    }

    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (_, (_, target_name_info, negotiate_flags, server_challenge, _, target_info_info)) = tuple((
            take(12_usize),
            parse_ntlm_buffer_fields,
            map(le_u32, NTLMNegotiateFlags::from_bits_truncate),
            take(8_usize),
            take(8_usize),
            parse_ntlm_buffer_fields,
        ))(bytes)?;
        let (_, target_name) = ntlm_string(bytes, target_name_info)?;
        let (remaining, target_info) = ntlm_buffer(bytes, target_info_info)?;
        let mut challenge = [0; 8];
        challenge.copy_from_slice(server_challenge);
        Ok((remaining, Self {
            target_name,
            negotiate_flags,
            server_challenge: challenge,
            target_info,
        }))
    }

    pub fn av_pairs(&self) -> SMBResult<AvPairList> {
        AvPairList::parse(&self.target_info).map(|(_, list)| list).map_err(nom_error)
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let name = utf16le(&self.target_name);
        let mut bytes = Vec::with_capacity(CHALLENGE_PAYLOAD_OFFSET + name.len() + self.target_info.len());
        bytes.put_slice(NTLMSSP_SIGNATURE);
        bytes.put_u32_le(0x02);
        put_ntlm_buffer_fields(&mut bytes, name.len(), CHALLENGE_PAYLOAD_OFFSET);
        bytes.put_u32_le(self.negotiate_flags.bits());
        bytes.put_slice(&self.server_challenge);
        bytes.put_u64_le(0);
        put_ntlm_buffer_fields(&mut bytes, self.target_info.len(), CHALLENGE_PAYLOAD_OFFSET + name.len());
        bytes.put_slice(&[6, 1]); // Version 6.1
        bytes.put_u16_le(7600);
        bytes.put_slice(&[0, 0, 0, 15]);
        bytes.put_slice(&name);
        bytes.put_slice(&self.target_info);
        bytes
    }
}
