//! SMB2 wire format used by the client.
//!
//! - `header`: the 64 byte SMB2 packet header (sync and async layouts), command codes and flags.
//! - `body`: request and response bodies for the commands the client issues.
//! - `message`: header/body pairing, chained response splitting and message signing.

pub mod body;
pub mod header;
pub mod message;
