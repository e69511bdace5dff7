use aes::Aes128;
use cmac::Cmac;
use digest::Mac;
use hmac::Hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use smb_core::{SMBFromBytes, SMBResult, SMBToBytes};
use smb_core::error::{ProtocolError, SMBError};

use crate::protocol::body::{SMBDialect, SMBRequestBody, SMBResponseBody};
use crate::protocol::header::{SMB2_HEADER_SIZE, SMBFlags, SMBHeader};

const SIGNATURE_RANGE: std::ops::Range<usize> = 48..64;
const FLAGS_RANGE: std::ops::Range<usize> = 16..20;

pub type SMBRequest = SMBMessage<SMBRequestBody>;
pub type SMBResponse = SMBMessage<SMBResponseBody>;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct SMBMessage<B> {
    pub header: SMBHeader,
    pub body: B,
}

impl<B> SMBMessage<B> {
    pub fn new(header: SMBHeader, body: B) -> Self {
        SMBMessage { header, body }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    HmacSha256,
    AesCmac,
}

impl SigningAlgorithm {
    pub fn for_dialect(dialect: SMBDialect) -> Self {
        if dialect.is_smb3() {
            Self::AesCmac
        } else {
            Self::HmacSha256
        }
    }
}

impl SMBRequest {
    /// Serialized SMB2 message, without any transport prefix.
    pub fn as_bytes(&self) -> Vec<u8> {
        [self.header.smb_to_bytes(), self.body.smb_to_bytes()].concat()
    }
}

impl SMBResponse {
    /// Parses a single (non-chained) SMB2 response.
    pub fn parse(bytes: &[u8]) -> SMBResult<Self> {
        let (remaining, header) = SMBHeader::smb_from_bytes(bytes)?;
        let body = SMBResponseBody::parse(header.command, header.nt_status(), remaining)?;
        Ok(Self { header, body })
    }

    /// Splits a frame holding chained responses at each NextCommand offset.
    pub fn split_chain(frame: &[u8]) -> SMBResult<Vec<&[u8]>> {
        let mut parts = Vec::new();
        let mut rest = frame;
        loop {
            let (_, header) = SMBHeader::smb_from_bytes(rest)?;
            let next = header.next_command as usize;
            if next == 0 {
                parts.push(rest);
                return Ok(parts);
            }
            if next < SMB2_HEADER_SIZE || next > rest.len() {
                return Err(ProtocolError::Malformed(format!("NextCommand offset {} out of range", next)).into());
            }
            parts.push(&rest[..next]);
            rest = &rest[next..];
        }
    }
}

pub fn compute_signature(message: &[u8], key: &[u8], algorithm: SigningAlgorithm) -> SMBResult<[u8; 16]> {
    if message.len() < SMB2_HEADER_SIZE {
        return Err(SMBError::payload_too_small(SMB2_HEADER_SIZE, message.len()));
    }
    let mut zeroed = message.to_vec();
    zeroed[SIGNATURE_RANGE].fill(0);
    let digest = match algorithm {
        SigningAlgorithm::HmacSha256 => {
            let mut hmac = Hmac::<Sha256>::new_from_slice(key)
                .map_err(SMBError::crypto_error)?;
            hmac.update(&zeroed);
            hmac.finalize().into_bytes().to_vec()
        }
        SigningAlgorithm::AesCmac => {
            let mut cmac = Cmac::<Aes128>::new_from_slice(key)
                .map_err(SMBError::crypto_error)?;
            cmac.update(&zeroed);
            cmac.finalize().into_bytes().to_vec()
        }
    };
    let mut signature = [0u8; 16];
    signature.copy_from_slice(&digest[..16]);
    Ok(signature)
}

/// Sets the SIGNED flag and writes the signature into a serialized message.
pub fn sign_message(message: &mut [u8], key: &[u8], algorithm: SigningAlgorithm) -> SMBResult<()> {
    if message.len() < SMB2_HEADER_SIZE {
        return Err(SMBError::payload_too_small(SMB2_HEADER_SIZE, message.len()));
    }
    let flags = u32::from_le_bytes([message[16], message[17], message[18], message[19]]) | SMBFlags::SIGNED.bits();
    message[FLAGS_RANGE].copy_from_slice(&flags.to_le_bytes());
    let signature = compute_signature(message, key, algorithm)?;
    message[SIGNATURE_RANGE].copy_from_slice(&signature);
    Ok(())
}

pub fn verify_signature(message: &[u8], key: &[u8], algorithm: SigningAlgorithm) -> SMBResult<bool> {
    let expected = compute_signature(message, key, algorithm)?;
    Ok(message[SIGNATURE_RANGE] == expected)
}
