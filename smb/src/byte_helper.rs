use smb_core::error::SMBError;

pub(crate) fn nom_error(err: nom::Err<nom::error::Error<&[u8]>>) -> SMBError {
    match err {
        nom::Err::Incomplete(needed) => SMBError::parse_error(format!("Incomplete input: {:?}", needed)),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            SMBError::parse_error(format!("{:?} with {} bytes left", e.code, e.input.len()))
        }
    }
}

pub(crate) fn utf16le(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
