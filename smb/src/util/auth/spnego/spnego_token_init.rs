use nom::error::ErrorKind;
use nom::multi::many0;
use nom::number::complete::le_u8;
use nom::Err::Error;
use nom::IResult;
use serde::{Deserialize, Serialize};

use crate::util::auth::spnego::der_utils::{DER_ENCODING_BYTE_ARRAY_TAG, DER_ENCODING_OID_TAG, DER_ENCODING_SEQUENCE_TAG, der_wrap, MECH_LIST_MIC_TAG, MECH_TOKEN_TAG, MECH_TYPE_LIST_TAG, NEG_TOKEN_INIT_TAG, NTLMSSP_ID, parse_der_byte_array, parse_der_oid, parse_field_with_len, parse_tagged, REQUIRED_FLAGS_TAG};

/// NegTokenInit (RFC 4178 4.2.1)
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SPNEGOTokenInitBody {
    pub mech_type_list: Vec<Vec<u8>>,
    pub mech_token: Option<Vec<u8>>,
    pub mech_list_mic: Option<Vec<u8>>,
}

impl SPNEGOTokenInitBody {
    /// Offers NTLMSSP only, with the NTLM NEGOTIATE message as the optimistic token.
    pub fn ntlm(mech_token: Vec<u8>) -> Self {
        Self {
            mech_type_list: vec![NTLMSSP_ID.to_vec()],
            mech_token: Some(mech_token),
            mech_list_mic: None,
        }
    }

    /// Parses the body following the NegTokenInit context tag.
    pub fn parse(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, construction) = parse_field_with_len(bytes)?;
        let (_, mut sequence) = parse_tagged(construction, DER_ENCODING_SEQUENCE_TAG)?;
        let mut body = Self::default();
        while !sequence.is_empty() {
            let (rest, tag) = le_u8(sequence)?;
            let (rest, field) = parse_field_with_len(rest)?;
            sequence = rest;
            match tag {
                MECH_TYPE_LIST_TAG => body.mech_type_list = Self::parse_mech_type_list(field)?.1,
                REQUIRED_FLAGS_TAG => {}
                MECH_TOKEN_TAG => body.mech_token = Some(parse_der_byte_array(field)?.1),
                MECH_LIST_MIC_TAG => body.mech_list_mic = Some(parse_der_byte_array(field)?.1),
                _ => return Err(Error(nom::error::Error::new(field, ErrorKind::Fail))),
            }
        }
        Ok((remaining, body))
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        // mechTypes is mandatory
        let mech_types = self.mech_type_list
            .iter()
            .flat_map(|oid| der_wrap(DER_ENCODING_OID_TAG, oid))
            .collect::<Vec<u8>>();
        fields.extend(der_wrap(MECH_TYPE_LIST_TAG, &der_wrap(DER_ENCODING_SEQUENCE_TAG, &mech_types)));
        if let Some(mech_token) = &self.mech_token {
            fields.extend(der_wrap(MECH_TOKEN_TAG, &der_wrap(DER_ENCODING_BYTE_ARRAY_TAG, mech_token)));
        }
        if let Some(mech_list_mic) = &self.mech_list_mic {
            fields.extend(der_wrap(MECH_LIST_MIC_TAG, &der_wrap(DER_ENCODING_BYTE_ARRAY_TAG, mech_list_mic)));
        }
        der_wrap(NEG_TOKEN_INIT_TAG, &der_wrap(DER_ENCODING_SEQUENCE_TAG, &fields))
    }

    fn parse_mech_type_list(buffer: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
        let (remaining, sequence) = parse_tagged(buffer, DER_ENCODING_SEQUENCE_TAG)?;
        let (_, list) = many0(parse_der_oid)(sequence)?;
        Ok((remaining, list))
    }
}
