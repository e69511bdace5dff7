use nom::bytes::complete::take;
use nom::combinator::map;
use nom::error::ErrorKind;
use nom::multi::fold_many_m_n;
use nom::number::complete::le_u8;
use nom::Err::Error;
use nom::IResult;

pub const NEG_TOKEN_INIT_TAG: u8 = 0xA0;
pub const NEG_TOKEN_RESP_TAG: u8 = 0xA1;

pub const NEG_STATE_TAG: u8 = 0xA0;
pub const SUPPORTED_MECH_TAG: u8 = 0xA1;
pub const RESPONSE_TOKEN_TAG: u8 = 0xA2;

pub const MECH_TYPE_LIST_TAG: u8 = 0xA0;
pub const REQUIRED_FLAGS_TAG: u8 = 0xA1;
pub const MECH_TOKEN_TAG: u8 = 0xA2;
pub const MECH_LIST_MIC_TAG: u8 = 0xA3;

pub const APPLICATION_TAG: u8 = 0x60;

pub const DER_ENCODING_ENUM_TAG: u8 = 0x0A;
pub const DER_ENCODING_SEQUENCE_TAG: u8 = 0x30;
pub const DER_ENCODING_OID_TAG: u8 = 0x06;
pub const DER_ENCODING_BYTE_ARRAY_TAG: u8 = 0x04;

/// 1.3.6.1.5.5.2
pub const SPNEGO_ID: [u8; 6] = [0x2b, 0x06, 0x01, 0x05, 0x05, 0x02];
/// 1.3.6.1.4.1.311.2.2.10
pub const NTLMSSP_ID: [u8; 10] = [0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x02, 0x0a];

pub fn parse_length(buffer: &[u8]) -> IResult<&[u8], usize> {
    let (remaining, len) = le_u8(buffer)?;
    if len < 0x80 {
        return Ok((remaining, len as usize));
    }
    let field_size = (len & 0x7f) as usize;
    fold_many_m_n(field_size, field_size, le_u8, || 0_usize, |len, item| len * 256 + item as usize)(remaining)
}

pub fn parse_field_with_len(buffer: &[u8]) -> IResult<&[u8], &[u8]> {
    parse_length(buffer).and_then(|(remaining, len)| take(len)(remaining))
}

/// Reads a `tag length value` triple, failing if the tag differs.
pub fn parse_tagged(buffer: &[u8], tag: u8) -> IResult<&[u8], &[u8]> {
    let (remaining, b_tag) = le_u8(buffer)?;
    if tag != b_tag {
        return Err(Error(nom::error::Error::new(buffer, ErrorKind::Tag)));
    }
    parse_field_with_len(remaining)
}

pub fn parse_der_multibyte(buffer: &[u8], tag: u8) -> IResult<&[u8], Vec<u8>> {
    map(|buf| parse_tagged(buf, tag), |buf| buf.to_vec())(buffer)
}

pub fn parse_der_oid(buffer: &[u8]) -> IResult<&[u8], Vec<u8>> {
    parse_der_multibyte(buffer, DER_ENCODING_OID_TAG)
}

pub fn parse_der_byte_array(buffer: &[u8]) -> IResult<&[u8], Vec<u8>> {
    parse_der_multibyte(buffer, DER_ENCODING_BYTE_ARRAY_TAG)
}

pub fn parse_der_enum(buffer: &[u8]) -> IResult<&[u8], u8> {
    let (remaining, value) = parse_tagged(buffer, DER_ENCODING_ENUM_TAG)?;
    let (_, value) = le_u8(value)?;
    Ok((remaining, value))
}

pub fn get_length(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }
    let mut len = length;
    let mut len_bytes = Vec::new();
    while len > 0 {
        len_bytes.push((len % 256) as u8);
        len /= 256;
    }
    len_bytes.reverse();
    [&[(0x80 | len_bytes.len()) as u8][..], &len_bytes].concat()
}

/// Prefixes `contents` with its tag and DER length.
pub fn der_wrap(tag: u8, contents: &[u8]) -> Vec<u8> {
    let length = get_length(contents.len());
    let mut bytes = Vec::with_capacity(1 + length.len() + contents.len());
    bytes.push(tag);
    bytes.extend_from_slice(&length);
    bytes.extend_from_slice(contents);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_form_lengths() {
        assert_eq!(get_length(0x7F), vec![0x7F]);
        assert_eq!(get_length(0x80), vec![0x81, 0x80]);
        assert_eq!(get_length(0x1234), vec![0x82, 0x12, 0x34]);
        assert_eq!(parse_length(&[0x82, 0x12, 0x34]).unwrap().1, 0x1234);
    }

    #[test]
    fn wrap_then_parse_tagged() {
        let payload = vec![0xAB; 300];
        let wrapped = der_wrap(DER_ENCODING_BYTE_ARRAY_TAG, &payload);
        assert_eq!(&wrapped[..4], &[0x04, 0x82, 0x01, 0x2C]);
        let (rest, parsed) = parse_der_byte_array(&wrapped).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, payload);
        assert!(parse_der_oid(&wrapped).is_err());
    }
}
