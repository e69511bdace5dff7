use hmac::{Hmac, Mac};
use sha2::Sha256;

use smb_core::error::SMBError;
use smb_core::SMBResult;

use crate::protocol::body::SMBDialect;
use crate::util::crypto::sp800_108;

/// Signing key for a session (MS-SMB2 3.2.5.3.1). 2.x dialects sign with the
/// session key itself.
pub fn generate_signing_key(session_key: &[u8], dialect: SMBDialect) -> SMBResult<Vec<u8>> {
    if !dialect.is_smb3() {
        return Ok(session_key.to_vec());
    }
    if dialect == SMBDialect::V3_1_1 {
        return Err(SMBError::crypto_error("SMB 3.1.1 signing needs a preauth integrity hash"));
    }
    let hmac = <Hmac<Sha256> as Mac>::new_from_slice(session_key)
        .map_err(|_| SMBError::crypto_error("Invalid Key Length"))?;
    Ok(sp800_108::derive_key(hmac, b"SMB2AESCMAC\0", b"SmbSign\0", 128))
}
