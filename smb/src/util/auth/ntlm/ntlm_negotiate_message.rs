use bytes::BufMut;
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::number::complete::le_u32;
use nom::sequence::tuple;
use nom::IResult;
use serde::{Deserialize, Serialize};

use crate::util::auth::ntlm::ntlm_message::{NTLMNegotiateFlags, NTLMSSP_SIGNATURE, put_ntlm_buffer_fields};

const NEGOTIATE_MESSAGE_SIZE: usize = 32;

/// NEGOTIATE_MESSAGE (MS-NLMP 2.2.1.1) without domain or workstation hints.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct NTLMNegotiateMessageBody {
    pub negotiate_flags: NTLMNegotiateFlags,
}

impl NTLMNegotiateMessageBody {
    pub fn new(negotiate_flags: NTLMNegotiateFlags) -> Self {
        Self { negotiate_flags }
    }

    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        map(
            tuple((take(12_usize), map(le_u32, NTLMNegotiateFlags::from_bits_truncate), take(16_usize))),
            |(_, negotiate_flags, _)| Self { negotiate_flags },
        )(bytes)
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NEGOTIATE_MESSAGE_SIZE);
        bytes.put_slice(NTLMSSP_SIGNATURE);
        bytes.put_u32_le(0x01);
        bytes.put_u32_le(self.negotiate_flags.bits());
        put_ntlm_buffer_fields(&mut bytes, 0, NEGOTIATE_MESSAGE_SIZE);
        put_ntlm_buffer_fields(&mut bytes, 0, NEGOTIATE_MESSAGE_SIZE);
        bytes
    }
}
