use smb_core::SMBResult;

pub use user::*;

pub mod ntlm;
pub mod spnego;
mod user;

/// Client side of a GSS-style mechanism carried in SESSION_SETUP security buffers.
pub trait AuthProvider: Send {
    fn oid(&self) -> Vec<u8>;

    /// Token for the first SESSION_SETUP request.
    fn initial_token(&mut self) -> SMBResult<Vec<u8>>;

    /// Answers a server token, producing the next client token.
    fn respond(&mut self, server_token: &[u8]) -> SMBResult<Vec<u8>>;

    /// Session key once the exchange has produced one.
    fn session_key(&self) -> Option<[u8; 16]>;
}

impl<A: AuthProvider + ?Sized> AuthProvider for Box<A> {
    fn oid(&self) -> Vec<u8> {
        (**self).oid()
    }

    fn initial_token(&mut self) -> SMBResult<Vec<u8>> {
        (**self).initial_token()
    }

    fn respond(&mut self, server_token: &[u8]) -> SMBResult<Vec<u8>> {
        (**self).respond(server_token)
    }

    fn session_key(&self) -> Option<[u8; 16]> {
        (**self).session_key()
    }
}
