use nom::error::ErrorKind;
use nom::number::complete::le_u8;
use nom::Err::Error;
use nom::IResult;
use serde::{Deserialize, Serialize};

use smb_core::logging::trace;
use smb_core::SMBResult;

use crate::byte_helper::nom_error;
use crate::util::auth::spnego::{SPNEGOTokenInitBody, SPNEGOTokenResponseBody};
use crate::util::auth::spnego::der_utils::{APPLICATION_TAG, DER_ENCODING_OID_TAG, der_wrap, NEG_TOKEN_INIT_TAG, NEG_TOKEN_RESP_TAG, parse_field_with_len, parse_tagged, SPNEGO_ID};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum SPNEGOToken {
    Init(SPNEGOTokenInitBody),
    Response(SPNEGOTokenResponseBody),
}

impl SPNEGOToken {
    pub fn parse(bytes: &[u8]) -> SMBResult<Self> {
        Self::parse_inner(bytes).map(|(_, token)| token).map_err(nom_error)
    }

    fn parse_inner(bytes: &[u8]) -> IResult<&[u8], Self> {
        trace!(buf_len = bytes.len(), "parsing SPNEGO token");
        let (remaining, tag) = le_u8(bytes)?;
        match tag {
            APPLICATION_TAG => {
                let (remaining, inner) = parse_field_with_len(remaining)?;
                let (inner, oid) = parse_tagged(inner, DER_ENCODING_OID_TAG)?;
                if oid != SPNEGO_ID {
                    return Err(Error(nom::error::Error::new(oid, ErrorKind::Verify)));
                }
                let (_, token) = Self::parse_neg_token(inner)?;
                Ok((remaining, token))
            }
            _ => Self::parse_neg_token(bytes),
        }
    }

    fn parse_neg_token(bytes: &[u8]) -> IResult<&[u8], Self> {
        let (remaining, tag) = le_u8(bytes)?;
        trace!(tag, "SPNEGO inner tag");
        match tag {
            NEG_TOKEN_INIT_TAG => {
                let (remaining, body) = SPNEGOTokenInitBody::parse(remaining)?;
                Ok((remaining, SPNEGOToken::Init(body)))
            }
            NEG_TOKEN_RESP_TAG => {
                let (remaining, body) = SPNEGOTokenResponseBody::parse(remaining)?;
                Ok((remaining, SPNEGOToken::Response(body)))
            }
            _ => Err(Error(nom::error::Error::new(bytes, ErrorKind::Fail))),
        }
    }

    /// The wrapped mechanism token, if any.
    pub fn mech_token(&self) -> Option<&[u8]> {
        match self {
            SPNEGOToken::Init(init) => init.mech_token.as_deref(),
            SPNEGOToken::Response(response) => response.response_token.as_deref(),
        }
    }

    /// NegTokenInit travels inside the GSS-API application header, NegTokenResp bare.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            SPNEGOToken::Init(init) => {
                let oid = der_wrap(DER_ENCODING_OID_TAG, &SPNEGO_ID);
                der_wrap(APPLICATION_TAG, &[oid, init.as_bytes()].concat())
            }
            SPNEGOToken::Response(response) => response.as_bytes(),
        }
    }
}
