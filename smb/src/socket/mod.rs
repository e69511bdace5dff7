//! Byte-stream transports for SMB2 messages.
//!
//! `framer` turns a bidirectional stream into length-prefixed frames (direct TCP
//! or NetBIOS session service); `netbios` holds the session service handshake.

pub mod framer;
pub mod netbios;

pub type SMBFramer<R, W> = framer::SMBFramer<R, W>;
pub type SMBFrameReader<R> = framer::SMBFrameReader<R>;
pub type SMBFrameWriter<W> = framer::SMBFrameWriter<W>;
pub type SMBTransportMode = framer::SMBTransportMode;
