use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use smb_core::error::TransportError;
use smb_core::logging::trace;

use crate::socket::netbios::{KEEP_ALIVE, SESSION_MESSAGE};

const FRAME_HEADER_SIZE: usize = 4;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// How SMB2 messages are delimited on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SMBTransportMode {
    /// NetBIOS session service, port 139. Requires a session request first.
    #[default]
    #[serde(alias = "netbios", alias = "NETBIOS")]
    NetBIOS,
    /// Direct TCP, port 445.
    #[serde(alias = "direct", alias = "DIRECT")]
    Direct,
}

impl SMBTransportMode {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::NetBIOS => 139,
            Self::Direct => 445,
        }
    }

    pub fn max_frame_size(&self) -> usize {
        match self {
            Self::NetBIOS => 0x1FFFF,
            Self::Direct => 0xFFFFFF,
        }
    }

    /// Four byte header for a frame of `length` bytes of the given packet type.
    pub fn frame_header(&self, packet_type: u8, length: usize) -> Result<[u8; 4], TransportError> {
        if length > self.max_frame_size() {
            return Err(TransportError::FrameTooLarge(length));
        }
        let length = length as u32;
        Ok([packet_type, (length >> 16) as u8, (length >> 8) as u8, length as u8])
    }
}

/// Read half of a framed transport. Accumulates partial reads until a whole
/// frame is buffered.
pub struct SMBFrameReader<R> {
    reader: R,
    buffer: BytesMut,
    mode: SMBTransportMode,
    read_timeout: Option<Duration>,
}

impl<R: AsyncRead + Unpin + Send> SMBFrameReader<R> {
    pub fn new(reader: R, mode: SMBTransportMode) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            mode,
            read_timeout: None,
        }
    }

    /// Bound on how long a single read may wait for data. `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Next SMB payload, skipping NetBIOS keep-alives.
    pub async fn receive(&mut self) -> Result<Bytes, TransportError> {
        loop {
            let (packet_type, payload) = self.receive_packet().await?;
            match packet_type {
                SESSION_MESSAGE => return Ok(payload),
                KEEP_ALIVE if self.mode == SMBTransportMode::NetBIOS => {
                    trace!("skipping NetBIOS keep-alive");
                }
                other => return Err(TransportError::UnexpectedPacket(other)),
            }
        }
    }

    /// Next raw packet with its type byte.
    pub async fn receive_packet(&mut self) -> Result<(u8, Bytes), TransportError> {
        loop {
            if let Some(packet) = self.take_packet()? {
                return Ok(packet);
            }
            let read = match self.read_timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.reader.read_buf(&mut self.buffer))
                    .await
                    .map_err(|_| TransportError::Timeout)??,
                None => self.reader.read_buf(&mut self.buffer).await?,
            };
            trace!(read, buffered = self.buffer.len(), "transport read");
            if read == 0 {
                return Err(TransportError::ConnectionClosed);
            }
        }
    }

    fn take_packet(&mut self) -> Result<Option<(u8, Bytes)>, TransportError> {
        if self.buffer.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let packet_type = self.buffer[0];
        if self.mode == SMBTransportMode::Direct && packet_type != SESSION_MESSAGE {
            return Err(TransportError::UnexpectedPacket(packet_type));
        }
        let length = ((self.buffer[1] as usize) << 16) | ((self.buffer[2] as usize) << 8) | self.buffer[3] as usize;
        if length > self.mode.max_frame_size() {
            return Err(TransportError::FrameTooLarge(length));
        }
        if self.buffer.len() < FRAME_HEADER_SIZE + length {
            self.buffer.reserve(FRAME_HEADER_SIZE + length - self.buffer.len());
            return Ok(None);
        }
        self.buffer.advance(FRAME_HEADER_SIZE);
        Ok(Some((packet_type, self.buffer.split_to(length).freeze())))
    }
}

/// Write half of a framed transport.
pub struct SMBFrameWriter<W> {
    writer: W,
    mode: SMBTransportMode,
}

impl<W: AsyncWrite + Unpin + Send> SMBFrameWriter<W> {
    pub fn new(writer: W, mode: SMBTransportMode) -> Self {
        Self { writer, mode }
    }

    pub async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        self.send_packet(SESSION_MESSAGE, message).await
    }

    pub async fn send_packet(&mut self, packet_type: u8, payload: &[u8]) -> Result<(), TransportError> {
        let header = self.mode.frame_header(packet_type, payload.len())?;
        self.writer.write_all(&header).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// A framed transport over one stream, split into independent halves.
pub struct SMBFramer<R, W> {
    pub reader: SMBFrameReader<R>,
    pub writer: SMBFrameWriter<W>,
}

impl<S: AsyncRead + AsyncWrite + Send> SMBFramer<ReadHalf<S>, WriteHalf<S>> {
    pub fn new(stream: S, mode: SMBTransportMode) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: SMBFrameReader::new(read, mode),
            writer: SMBFrameWriter::new(write, mode),
        }
    }
}

impl<R: AsyncRead + Unpin + Send, W: AsyncWrite + Unpin + Send> SMBFramer<R, W> {
    pub async fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        self.writer.send(message).await
    }

    pub async fn receive(&mut self) -> Result<Bytes, TransportError> {
        self.reader.receive().await
    }

    pub fn into_split(self) -> (SMBFrameReader<R>, SMBFrameWriter<W>) {
        (self.reader, self.writer)
    }
}
