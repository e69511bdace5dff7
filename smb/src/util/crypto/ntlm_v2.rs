use digest::Digest;
use hmac::{Hmac, Mac};
use md4::Md4;
use md5::Md5;
use rc4::{Key, KeyInit, Rc4, StreamCipher};
use rc4::consts::U16;

use smb_core::error::SMBError;
use smb_core::SMBResult;

use crate::byte_helper::utf16le;

/// Output of the NTLMv2 response computation (MS-NLMP 3.3.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NTLMv2Response {
    pub nt_proof_str: [u8; 16],
    /// NTProofStr followed by the client blob.
    pub nt_challenge_response: Vec<u8>,
    pub lm_challenge_response: Vec<u8>,
    pub session_base_key: [u8; 16],
}

/// MD4 of the UTF-16LE password.
pub fn nt_hash(password: &str) -> [u8; 16] {
    Md4::digest(utf16le(password)).into()
}

pub fn ntowf_v2(password: &str, user: &str, domain: &str) -> SMBResult<[u8; 16]> {
    ntowf_v2_from_hash(&nt_hash(password), user, domain)
}

pub fn ntowf_v2_from_hash(nt_hash: &[u8], user: &str, domain: &str) -> SMBResult<[u8; 16]> {
    let identity = utf16le(&(user.to_uppercase() + domain));
    hmac_md5(nt_hash, &[&identity])
}

/// The `temp` structure hashed into NTProofStr.
pub fn client_blob(timestamp: u64, client_challenge: &[u8; 8], target_info: &[u8]) -> Vec<u8> {
    [
        &[1_u8, 1][..],
        &[0; 6],
        &timestamp.to_le_bytes(),
        client_challenge,
        &[0; 4],
        target_info,
        &[0; 4],
    ].concat()
}

pub fn nt_proof_str(response_key_nt: &[u8], server_challenge: &[u8], blob: &[u8]) -> SMBResult<[u8; 16]> {
    hmac_md5(response_key_nt, &[server_challenge, blob])
}

pub fn session_base_key(response_key_nt: &[u8], nt_proof_str: &[u8]) -> SMBResult<[u8; 16]> {
    hmac_md5(response_key_nt, &[nt_proof_str])
}

pub fn compute_response(
    response_key_nt: &[u8],
    server_challenge: &[u8],
    client_challenge: &[u8; 8],
    timestamp: u64,
    target_info: &[u8],
) -> SMBResult<NTLMv2Response> {
    let blob = client_blob(timestamp, client_challenge, target_info);
    let nt_proof_str = nt_proof_str(response_key_nt, server_challenge, &blob)?;
    let lm_proof = hmac_md5(response_key_nt, &[server_challenge, client_challenge])?;
    Ok(NTLMv2Response {
        nt_proof_str,
        nt_challenge_response: [&nt_proof_str[..], &blob].concat(),
        lm_challenge_response: [&lm_proof[..], client_challenge].concat(),
        session_base_key: session_base_key(response_key_nt, &nt_proof_str)?,
    })
}

/// RC4 with a 16 byte key; encryption and decryption are the same operation.
pub fn rc4_transform(key: &[u8], data: &[u8]) -> SMBResult<Vec<u8>> {
    if key.len() != 16 {
        return Err(SMBError::crypto_error("RC4 key must be 16 bytes"));
    }
    let mut output = data.to_vec();
    let mut rc4 = Rc4::new(Key::<U16>::from_slice(key));
    rc4.apply_keystream(&mut output);
    Ok(output)
}

pub fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> SMBResult<[u8; 16]> {
    let mut hmac = new_hmac_from_slice(key)?;
    for part in parts {
        hmac.update(part);
    }
    Ok(hmac.finalize().into_bytes().into())
}

fn new_hmac_from_slice(slice: &[u8]) -> SMBResult<Hmac<Md5>> {
    <Hmac<Md5> as Mac>::new_from_slice(slice).map_err(|_| SMBError::crypto_error("Invalid length for key"))
}
