use smb_core::error::AuthError;
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::util::auth::AuthProvider;
use crate::util::auth::ntlm::NTLMMessage;
use crate::util::auth::spnego::{NegotiateState, SPNEGOToken, SPNEGOTokenInitBody, SPNEGOTokenResponseBody};

/// Wraps the tokens of an inner mechanism in SPNEGO.
///
/// Servers answering with a bare NTLMSSP token get bare tokens back.
#[derive(Debug)]
pub struct SPNEGOAuthProvider<A: AuthProvider> {
    inner: A,
}

impl<A: AuthProvider> SPNEGOAuthProvider<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: AuthProvider> AuthProvider for SPNEGOAuthProvider<A> {
    fn oid(&self) -> Vec<u8> {
        self.inner.oid()
    }

    fn initial_token(&mut self) -> SMBResult<Vec<u8>> {
        let mech_token = self.inner.initial_token()?;
        let init = SPNEGOTokenInitBody {
            mech_type_list: vec![self.inner.oid()],
            mech_token: Some(mech_token),
            mech_list_mic: None,
        };
        Ok(SPNEGOToken::Init(init).as_bytes())
    }

    fn respond(&mut self, server_token: &[u8]) -> SMBResult<Vec<u8>> {
        if NTLMMessage::is_ntlmssp(server_token) {
            return self.inner.respond(server_token);
        }
        let token = SPNEGOToken::parse(server_token)?;
        if let SPNEGOToken::Response(SPNEGOTokenResponseBody { state: Some(NegotiateState::Reject), .. }) = token {
            return Err(AuthError::Rejected(NTStatus::StatusLogonFailure as u32).into());
        }
        let mech_token = token
            .mech_token()
            .ok_or_else(|| AuthError::InvalidToken("SPNEGO token without a mechanism token".into()))?;
        let response = self.inner.respond(mech_token)?;
        Ok(SPNEGOToken::Response(SPNEGOTokenResponseBody::with_token(None, response)).as_bytes())
    }

    fn session_key(&self) -> Option<[u8; 16]> {
        self.inner.session_key()
    }
}

#[cfg(test)]
mod tests {
    use crate::util::auth::ntlm::{AvPairList, NTLMChallengeMessageBody, NTLMClientContext, NTLMClientNonces, NTLMNegotiateFlags};
    use crate::util::auth::SMBCredentials;

    use super::*;

    fn provider() -> SPNEGOAuthProvider<NTLMClientContext> {
        let nonces = NTLMClientNonces { client_challenge: [1; 8], exported_session_key: [2; 16], timestamp: Some(0) };
        let credentials = SMBCredentials::new("user".into(), "pass".into(), String::new());
        SPNEGOAuthProvider::new(NTLMClientContext::with_nonces(credentials, nonces))
    }

    fn challenge() -> Vec<u8> {
        NTLMChallengeMessageBody::new(String::new(), NTLMNegotiateFlags::client_default(), [3; 8], &AvPairList::default()).as_bytes()
    }

    #[test]
    fn wraps_both_legs() {
        let mut provider = provider();
        let init = SPNEGOToken::parse(&provider.initial_token().unwrap()).unwrap();
        assert!(matches!(init, SPNEGOToken::Init(_)));
        assert!(NTLMMessage::is_ntlmssp(init.mech_token().unwrap()));

        let server = SPNEGOToken::Response(SPNEGOTokenResponseBody::with_token(Some(NegotiateState::AcceptIncomplete), challenge()));
        let reply = provider.respond(&server.as_bytes()).unwrap();
        let SPNEGOToken::Response(body) = SPNEGOToken::parse(&reply).unwrap() else {
            panic!("expected NegTokenResp");
        };
        assert!(matches!(NTLMMessage::parse(&body.response_token.unwrap()).unwrap(), NTLMMessage::Authenticate(_)));
        assert_eq!(provider.session_key(), Some([2; 16]));
    }

    #[test]
    fn bare_ntlmssp_challenge_gets_bare_reply() {
        let mut provider = provider();
        provider.initial_token().unwrap();
        let reply = provider.respond(&challenge()).unwrap();
        assert!(NTLMMessage::is_ntlmssp(&reply));
    }

    #[test]
    fn reject_state_fails() {
        let mut provider = provider();
        provider.initial_token().unwrap();
        let server = SPNEGOToken::Response(SPNEGOTokenResponseBody { state: Some(NegotiateState::Reject), ..Default::default() });
        assert!(matches!(
            provider.respond(&server.as_bytes()),
            Err(smb_core::error::SMBError::Auth(AuthError::Rejected(_)))
        ));
    }
}
