use std::sync::OnceLock;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use uuid::Uuid;

use smb_core::error::{SMBError, TransportError};
use smb_core::logging::{debug, info};
use smb_core::SMBResult;

use crate::client::config::SMBClientConfig;
use crate::client::correlator::SMBCorrelator;
use crate::protocol::body::{FileTime, SMBDialect};
use crate::protocol::body::negotiate::{Capabilities, SecurityMode};
use crate::socket::{netbios, SMBFramer, SMBTransportMode};

/// What the server announced in its NEGOTIATE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMBServerInfo {
    pub dialect: SMBDialect,
    pub server_guid: Uuid,
    pub security_mode: SecurityMode,
    pub capabilities: Capabilities,
    pub max_transact_size: u32,
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub system_time: FileTime,
}

impl SMBServerInfo {
    pub fn signing_required(&self) -> bool {
        self.security_mode.contains(SecurityMode::SIGNING_REQUIRED)
    }
}

/// The transport of one session: framed stream, correlator and the
/// negotiated server parameters.
pub struct SMBConnection {
    pub(crate) correlator: SMBCorrelator,
    pub(crate) client_guid: Uuid,
    remote_name: String,
    mode: SMBTransportMode,
    server: OnceLock<SMBServerInfo>,
}

impl SMBConnection {
    /// Opens a TCP connection to the configured server.
    pub async fn open(config: &SMBClientConfig) -> SMBResult<Self> {
        let address = (config.remote_address.as_str(), config.port());
        debug!(host = %address.0, port = address.1, transport = ?config.transport, "connecting");
        let stream = tokio::time::timeout(config.timeout(), TcpStream::connect(address))
            .await
            .map_err(|_| SMBError::from(TransportError::Timeout))??;
        stream.set_nodelay(true)?;
        Self::from_stream(stream, config).await
    }

    /// Runs the client over an already connected stream.
    pub async fn from_stream<S>(stream: S, config: &SMBClientConfig) -> SMBResult<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut framer = SMBFramer::new(stream, config.transport);
        if config.transport == SMBTransportMode::NetBIOS {
            framer.reader.set_read_timeout(Some(config.timeout()));
            netbios::establish_session(&mut framer, &config.remote_name, &config.client_name).await?;
            // An idle session must not end the read loop; the correlator times out requests.
            framer.reader.set_read_timeout(None);
        }
        let (reader, writer) = framer.into_split();
        info!(remote = %config.remote_name, transport = ?config.transport, "transport established");
        Ok(Self {
            correlator: SMBCorrelator::start(reader, writer, Some(config.timeout())),
            client_guid: Uuid::new_v4(),
            remote_name: config.remote_name.clone(),
            mode: config.transport,
            server: OnceLock::new(),
        })
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn transport(&self) -> SMBTransportMode {
        self.mode
    }

    /// `None` until negotiation completed.
    pub fn server_info(&self) -> Option<&SMBServerInfo> {
        self.server.get()
    }

    pub(crate) fn set_server_info(&self, info: SMBServerInfo) {
        let _ = self.server.set(info);
    }

    pub fn is_closed(&self) -> bool {
        self.correlator.is_closed()
    }
}
