use tokio::io::{AsyncRead, AsyncWrite};

use smb_core::error::TransportError;
use smb_core::logging::debug;

use crate::socket::framer::SMBFramer;

pub const SESSION_MESSAGE: u8 = 0x00;
pub const SESSION_REQUEST: u8 = 0x81;
pub const POSITIVE_SESSION_RESPONSE: u8 = 0x82;
pub const NEGATIVE_SESSION_RESPONSE: u8 = 0x83;
pub const KEEP_ALIVE: u8 = 0x85;

/// Name type suffix of a file server.
pub const SERVER_SUFFIX: u8 = 0x20;
/// Name type suffix of a workstation.
pub const WORKSTATION_SUFFIX: u8 = 0x00;

/// First-level encoding of a NetBIOS name (RFC 1001 14.1): upper-cased, space
/// padded to 15 characters plus the suffix byte, each nibble mapped onto 'A'..'P',
/// length prefixed and terminated by the empty scope.
pub fn encode_name(name: &str, suffix: u8) -> Vec<u8> {
    let mut raw = [b' '; 16];
    for (slot, byte) in raw.iter_mut().zip(name.to_ascii_uppercase().bytes().take(15)) {
        *slot = byte;
    }
    raw[15] = suffix;

    let mut encoded = Vec::with_capacity(34);
    encoded.push(32);
    for byte in raw {
        encoded.push(b'A' + (byte >> 4));
        encoded.push(b'A' + (byte & 0x0F));
    }
    encoded.push(0);
    encoded
}

pub fn session_request(called_name: &str, calling_name: &str) -> Vec<u8> {
    [encode_name(called_name, SERVER_SUFFIX), encode_name(calling_name, WORKSTATION_SUFFIX)].concat()
}

/// Runs the session service handshake that must precede SMB traffic on port 139.
pub async fn establish_session<R, W>(
    framer: &mut SMBFramer<R, W>,
    called_name: &str,
    calling_name: &str,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    framer.writer
        .send_packet(SESSION_REQUEST, &session_request(called_name, calling_name))
        .await?;
    loop {
        let (packet_type, payload) = framer.reader.receive_packet().await?;
        match packet_type {
            POSITIVE_SESSION_RESPONSE => {
                debug!(called_name, "NetBIOS session established");
                return Ok(());
            }
            NEGATIVE_SESSION_RESPONSE => {
                let code = payload.first().copied().unwrap_or(0x8F);
                return Err(TransportError::NetBIOSRejected(code));
            }
            KEEP_ALIVE => continue,
            other => return Err(TransportError::UnexpectedPacket(other)),
        }
    }
}
