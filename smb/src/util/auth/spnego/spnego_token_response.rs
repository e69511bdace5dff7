use nom::error::ErrorKind;
use nom::number::complete::le_u8;
use nom::Err::Error;
use nom::IResult;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::util::auth::spnego::der_utils::{DER_ENCODING_BYTE_ARRAY_TAG, DER_ENCODING_ENUM_TAG, DER_ENCODING_OID_TAG, DER_ENCODING_SEQUENCE_TAG, der_wrap, MECH_LIST_MIC_TAG, NEG_STATE_TAG, NEG_TOKEN_RESP_TAG, parse_der_byte_array, parse_der_enum, parse_der_oid, parse_field_with_len, parse_tagged, RESPONSE_TOKEN_TAG, SUPPORTED_MECH_TAG};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, Deserialize, Serialize)]
pub enum NegotiateState {
    AcceptCompleted = 0x0,
    AcceptIncomplete,
    Reject,
    RequestMic,
}

/// NegTokenResp (RFC 4178 4.2.2)
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SPNEGOTokenResponseBody {
    pub state: Option<NegotiateState>,
    pub supported_mech: Option<Vec<u8>>,
    pub response_token: Option<Vec<u8>>,
    pub mech_list_mic: Option<Vec<u8>>,
}

impl SPNEGOTokenResponseBody {
    pub fn with_token(state: Option<NegotiateState>, response_token: Vec<u8>) -> Self {
        Self {
            state,
            response_token: Some(response_token),
            ..Default::default()
        }
    }

    /// Parses the body following the NegTokenResp context tag.
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, construction) = parse_field_with_len(bytes)?;
        let (_, mut sequence) = parse_tagged(construction, DER_ENCODING_SEQUENCE_TAG)?;
        let mut body = Self::default();
        while !sequence.is_empty() {
            let (rest, tag) = le_u8(sequence)?;
            let (rest, field) = parse_field_with_len(rest)?;
            sequence = rest;
            match tag {
                NEG_STATE_TAG => {
                    let (_, raw) = parse_der_enum(field)?;
                    body.state = Some(NegotiateState::try_from(raw)
                        .map_err(|_| Error(nom::error::Error::new(field, ErrorKind::Verify)))?);
                }
                SUPPORTED_MECH_TAG => body.supported_mech = Some(parse_der_oid(field)?.1),
                RESPONSE_TOKEN_TAG => body.response_token = Some(parse_der_byte_array(field)?.1),
                MECH_LIST_MIC_TAG => body.mech_list_mic = Some(parse_der_byte_array(field)?.1),
                _ => return Err(Error(nom::error::Error::new(field, ErrorKind::Fail))),
            }
        }
        Ok((remaining, body))
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        if let Some(state) = self.state {
            fields.extend(der_wrap(NEG_STATE_TAG, &der_wrap(DER_ENCODING_ENUM_TAG, &[state as u8])));
        }
        if let Some(mech) = &self.supported_mech {
            fields.extend(der_wrap(SUPPORTED_MECH_TAG, &der_wrap(DER_ENCODING_OID_TAG, mech)));
        }
        if let Some(token) = &self.response_token {
            fields.extend(der_wrap(RESPONSE_TOKEN_TAG, &der_wrap(DER_ENCODING_BYTE_ARRAY_TAG, token)));
        }
        if let Some(mic) = &self.mech_list_mic {
            fields.extend(der_wrap(MECH_LIST_MIC_TAG, &der_wrap(DER_ENCODING_BYTE_ARRAY_TAG, mic)));
        }
        der_wrap(NEG_TOKEN_RESP_TAG, &der_wrap(DER_ENCODING_SEQUENCE_TAG, &fields))
    }
}
