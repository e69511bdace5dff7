use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBResult, SMBToBytes};
use smb_core::nt_status::NTStatus;

use crate::protocol::body::close::{SMBCloseRequest, SMBCloseResponse};
use crate::protocol::body::create::{SMBCreateRequest, SMBCreateResponse};
use crate::protocol::body::empty::SMBEmpty;
use crate::protocol::body::error::SMBErrorResponse;
use crate::protocol::body::negotiate::{SMBNegotiateRequest, SMBNegotiateResponse};
use crate::protocol::body::query_directory::{SMBQueryDirectoryRequest, SMBQueryDirectoryResponse};
use crate::protocol::body::read::{SMBReadRequest, SMBReadResponse};
use crate::protocol::body::session_setup::{SMBSessionSetupRequest, SMBSessionSetupResponse};
use crate::protocol::body::set_info::{SMBSetInfoRequest, SMBSetInfoResponse};
use crate::protocol::body::tree_connect::{SMBTreeConnectRequest, SMBTreeConnectResponse};
use crate::protocol::body::write::{SMBWriteRequest, SMBWriteResponse};
use crate::protocol::header::SMBCommandCode;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBRequestBody {
    Negotiate(SMBNegotiateRequest),
    SessionSetup(SMBSessionSetupRequest),
    LogOff(SMBEmpty),
    TreeConnect(SMBTreeConnectRequest),
    TreeDisconnect(SMBEmpty),
    Create(SMBCreateRequest),
    Close(SMBCloseRequest),
    Read(SMBReadRequest),
    Write(SMBWriteRequest),
    Echo(SMBEmpty),
    QueryDirectory(SMBQueryDirectoryRequest),
    SetInfo(SMBSetInfoRequest),
}

impl SMBRequestBody {
    pub fn command(&self) -> SMBCommandCode {
        match self {
            Self::Negotiate(_) => SMBCommandCode::Negotiate,
            Self::SessionSetup(_) => SMBCommandCode::SessionSetup,
            Self::LogOff(_) => SMBCommandCode::LogOff,
            Self::TreeConnect(_) => SMBCommandCode::TreeConnect,
            Self::TreeDisconnect(_) => SMBCommandCode::TreeDisconnect,
            Self::Create(_) => SMBCommandCode::Create,
            Self::Close(_) => SMBCommandCode::Close,
            Self::Read(_) => SMBCommandCode::Read,
            Self::Write(_) => SMBCommandCode::Write,
            Self::Echo(_) => SMBCommandCode::Echo,
            Self::QueryDirectory(_) => SMBCommandCode::QueryDirectory,
            Self::SetInfo(_) => SMBCommandCode::SetInfo,
        }
    }

    /// Bytes moved by the request or expected back, used for credit charge.
    pub fn payload_size(&self) -> usize {
        match self {
            Self::Read(read) => read.length as usize,
            Self::Write(write) => write.data.len(),
            Self::QueryDirectory(query) => query.output_buffer_length as usize,
            _ => 0,
        }
    }
}

impl SMBByteSize for SMBRequestBody {
    fn smb_byte_size(&self) -> usize {
        match self {
            Self::Negotiate(body) => body.smb_byte_size(),
            Self::SessionSetup(body) => body.smb_byte_size(),
            Self::LogOff(body) | Self::TreeDisconnect(body) | Self::Echo(body) => body.smb_byte_size(),
            Self::TreeConnect(body) => body.smb_byte_size(),
            Self::Create(body) => body.smb_byte_size(),
            Self::Close(body) => body.smb_byte_size(),
            Self::Read(body) => body.smb_byte_size(),
            Self::Write(body) => body.smb_byte_size(),
            Self::QueryDirectory(body) => body.smb_byte_size(),
            Self::SetInfo(body) => body.smb_byte_size(),
        }
    }
}

impl SMBToBytes for SMBRequestBody {
    fn smb_to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Negotiate(body) => body.smb_to_bytes(),
            Self::SessionSetup(body) => body.smb_to_bytes(),
            Self::LogOff(body) | Self::TreeDisconnect(body) | Self::Echo(body) => body.smb_to_bytes(),
            Self::TreeConnect(body) => body.smb_to_bytes(),
            Self::Create(body) => body.smb_to_bytes(),
            Self::Close(body) => body.smb_to_bytes(),
            Self::Read(body) => body.smb_to_bytes(),
            Self::Write(body) => body.smb_to_bytes(),
            Self::QueryDirectory(body) => body.smb_to_bytes(),
            Self::SetInfo(body) => body.smb_to_bytes(),
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub enum SMBResponseBody {
    Negotiate(SMBNegotiateResponse),
    SessionSetup(SMBSessionSetupResponse),
    LogOff(SMBEmpty),
    TreeConnect(SMBTreeConnectResponse),
    TreeDisconnect(SMBEmpty),
    Create(SMBCreateResponse),
    Close(SMBCloseResponse),
    Read(SMBReadResponse),
    Write(SMBWriteResponse),
    Echo(SMBEmpty),
    QueryDirectory(SMBQueryDirectoryResponse),
    SetInfo(SMBSetInfoResponse),
    Error(SMBErrorResponse),
}

impl SMBResponseBody {
    /// Whether a response with this command and status carries the regular
    /// body rather than an error body.
    pub fn has_regular_body(command: SMBCommandCode, status: NTStatus) -> bool {
        match status {
            NTStatus::StatusSuccess => true,
            NTStatus::MoreProcessingRequired => command == SMBCommandCode::SessionSetup,
            NTStatus::BufferOverflow => matches!(command, SMBCommandCode::Read | SMBCommandCode::QueryDirectory),
            _ => false,
        }
    }

    pub fn parse(command: SMBCommandCode, status: NTStatus, bytes: &[u8]) -> SMBResult<Self> {
        if !Self::has_regular_body(command, status) {
            // Some servers answer errors with a bare header; keep the status.
            let body = SMBErrorResponse::smb_from_bytes(bytes)
                .map(|(_, body)| body)
                .unwrap_or_default();
            return Ok(Self::Error(body));
        }
        let body = match command {
            SMBCommandCode::Negotiate => Self::Negotiate(SMBNegotiateResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::SessionSetup => Self::SessionSetup(SMBSessionSetupResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::LogOff => Self::LogOff(SMBEmpty::smb_from_bytes(bytes)?.1),
            SMBCommandCode::TreeConnect => Self::TreeConnect(SMBTreeConnectResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::TreeDisconnect => Self::TreeDisconnect(SMBEmpty::smb_from_bytes(bytes)?.1),
            SMBCommandCode::Create => Self::Create(SMBCreateResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::Close => Self::Close(SMBCloseResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::Read => Self::Read(SMBReadResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::Write => Self::Write(SMBWriteResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::Echo => Self::Echo(SMBEmpty::smb_from_bytes(bytes)?.1),
            SMBCommandCode::QueryDirectory => Self::QueryDirectory(SMBQueryDirectoryResponse::smb_from_bytes(bytes)?.1),
            SMBCommandCode::SetInfo => Self::SetInfo(SMBSetInfoResponse::smb_from_bytes(bytes)?.1),
            other => {
                return Err(smb_core::error::ProtocolError::Unsupported(format!("{:?} response", other)).into());
            }
        };
        Ok(body)
    }
}
