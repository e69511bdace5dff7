use rand::RngCore;
use rand::rngs::ThreadRng;

use smb_core::logging::trace;
use smb_core::SMBResult;

use crate::protocol::body::FileTime;
use crate::util::auth::ntlm::{NTLMAuthenticateMessageBody, NTLMMessage, NTLMNegotiateMessageBody};
use crate::util::auth::ntlm::av_pair::AV_FLAG_MIC_PRESENT;
use crate::util::auth::ntlm::ntlm_authenticate_message::MIC_RANGE;
use crate::util::auth::ntlm::ntlm_message::{invalid_token, NTLMNegotiateFlags};
use crate::util::auth::{AuthProvider, SMBCredentials};
use crate::util::auth::spnego::der_utils::NTLMSSP_ID;
use crate::util::crypto::ntlm_v2::{compute_response, hmac_md5, rc4_transform};

/// Client-chosen random inputs of one NTLM exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NTLMClientNonces {
    pub client_challenge: [u8; 8],
    pub exported_session_key: [u8; 16],
    /// Used when the server does not send MsvAvTimestamp; `None` means now.
    pub timestamp: Option<u64>,
}

impl NTLMClientNonces {
    pub fn random() -> Self {
        let mut rng = ThreadRng::default();
        let mut client_challenge = [0; 8];
        let mut exported_session_key = [0; 16];
        rng.fill_bytes(&mut client_challenge);
        rng.fill_bytes(&mut exported_session_key);
        Self { client_challenge, exported_session_key, timestamp: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NTLMAuthenticateOutput {
    pub message: Vec<u8>,
    /// Exported session key; `None` for anonymous logons.
    pub session_key: Option<[u8; 16]>,
}

/// Client side of the NTLMv2 handshake (MS-NLMP 3.1).
#[derive(Debug)]
pub struct NTLMClientContext {
    credentials: SMBCredentials,
    nonces: NTLMClientNonces,
    flags: NTLMNegotiateFlags,
    negotiate_message: Option<Vec<u8>>,
    session_key: Option<[u8; 16]>,
}

impl NTLMClientContext {
    pub fn new(credentials: SMBCredentials) -> Self {
        Self::with_nonces(credentials, NTLMClientNonces::random())
    }

    pub fn with_nonces(credentials: SMBCredentials, nonces: NTLMClientNonces) -> Self {
        let mut flags = NTLMNegotiateFlags::client_default();
        if credentials.is_anonymous() {
            flags |= NTLMNegotiateFlags::ANONYMOUS;
        }
        Self { credentials, nonces, flags, negotiate_message: None, session_key: None }
    }

    pub fn negotiate(&mut self) -> Vec<u8> {
        let message = NTLMNegotiateMessageBody::new(self.flags).as_bytes();
        self.negotiate_message = Some(message.clone());
        message
    }

    pub fn authenticate(&mut self, challenge_bytes: &[u8]) -> SMBResult<NTLMAuthenticateOutput> {
        let negotiate_message = self.negotiate_message
            .as_deref()
            .ok_or_else(|| invalid_token("CHALLENGE received before NEGOTIATE was sent"))?;
        let NTLMMessage::Challenge(challenge) = NTLMMessage::parse(challenge_bytes)? else {
            return Err(invalid_token("expected an NTLM CHALLENGE message"));
        };
        let flags = (challenge.negotiate_flags & self.flags) | NTLMNegotiateFlags::UNICODE_ENCODING;
        trace!(?flags, target = %challenge.target_name, "NTLM challenge received");

        let mut message = NTLMAuthenticateMessageBody {
            negotiate_flags: flags,
            domain_name: self.credentials.domain.clone(),
            user_name: self.credentials.username.clone(),
            workstation: self.credentials.workstation.clone(),
            lm_challenge_response: Vec::new(),
            nt_challenge_response: Vec::new(),
            encrypted_session_key: Vec::new(),
            mic: [0; 16],
        };

        if self.credentials.is_anonymous() {
            message.negotiate_flags |= NTLMNegotiateFlags::ANONYMOUS;
            message.lm_challenge_response = vec![0];
            return Ok(NTLMAuthenticateOutput { message: message.as_bytes(), session_key: None });
        }

        let mut av_pairs = challenge.av_pairs()?;
        let server_timestamp = av_pairs.timestamp();
        let (timestamp, target_info) = match server_timestamp {
            Some(timestamp) => {
                av_pairs.set_flags(AV_FLAG_MIC_PRESENT);
                (timestamp, av_pairs.as_bytes())
            }
            None => (
                self.nonces.timestamp.unwrap_or_else(|| FileTime::now().0),
                challenge.target_info.clone(),
            ),
        };

        let response_key_nt = self.credentials.response_key_nt()?;
        let response = compute_response(
            &response_key_nt,
            &challenge.server_challenge,
            &self.nonces.client_challenge,
            timestamp,
            &target_info,
        )?;

        message.nt_challenge_response = response.nt_challenge_response;
        message.lm_challenge_response = match server_timestamp {
            Some(_) => vec![0; 24],
            None => response.lm_challenge_response,
        };

        let exported_session_key = if flags.contains(NTLMNegotiateFlags::KEY_EXCHANGE) {
            message.encrypted_session_key = rc4_transform(&response.session_base_key, &self.nonces.exported_session_key)?;
            self.nonces.exported_session_key
        } else {
            response.session_base_key
        };

        let mut bytes = message.as_bytes();
        if server_timestamp.is_some() {
            let mic = hmac_md5(&exported_session_key, &[negotiate_message, challenge_bytes, &bytes])?;
            bytes[MIC_RANGE].copy_from_slice(&mic);
        }

        Ok(NTLMAuthenticateOutput { message: bytes, session_key: Some(exported_session_key) })
    }
}

impl AuthProvider for NTLMClientContext {
    fn oid(&self) -> Vec<u8> {
        NTLMSSP_ID.to_vec()
    }

    fn initial_token(&mut self) -> SMBResult<Vec<u8>> {
        Ok(self.negotiate())
    }

    fn respond(&mut self, server_token: &[u8]) -> SMBResult<Vec<u8>> {
        let output = self.authenticate(server_token)?;
        self.session_key = output.session_key;
        Ok(output.message)
    }

    fn session_key(&self) -> Option<[u8; 16]> {
        self.session_key
    }
}
