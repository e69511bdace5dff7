//! The SMB2 client: connection setup, session lifecycle and file operations.

use tokio::io::{AsyncRead, AsyncWrite};

use smb_core::SMBResult;

pub use config::{CONNECT_PARAMS_VAR, SMBClientConfig, SMBClientConfigBuilder};
pub use connection::{SMBConnection, SMBServerInfo};
pub use entry::SMBDirectoryEntry;
pub use open::SMBOpen;
pub use session::{SMBPrincipal, SMBSession};
pub use state::SMBSessionState;
pub use tree::{MAX_CHUNK_SIZE, SMBTree};

pub mod config;
pub mod connection;
pub mod correlator;
pub mod negotiate;
pub mod path;
mod entry;
mod open;
mod session;
mod state;
mod tree;

/// Entry point for opening sessions.
pub struct SMBClient;

impl SMBClient {
    /// Opens the transport to the configured server. The returned session
    /// still has to be negotiated and authenticated.
    pub async fn connect(config: SMBClientConfig) -> SMBResult<SMBSession> {
        config.validate()?;
        let connection = SMBConnection::open(&config).await?;
        Ok(SMBSession::new(connection, config))
    }

    /// Like [`SMBClient::connect`] over a stream the caller already holds.
    pub async fn connect_stream<S>(stream: S, config: SMBClientConfig) -> SMBResult<SMBSession>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        config.validate()?;
        let connection = SMBConnection::from_stream(stream, &config).await?;
        Ok(SMBSession::new(connection, config))
    }

    /// Connects, negotiates, authenticates and mounts the configured share.
    pub async fn connect_share(config: SMBClientConfig) -> SMBResult<(SMBSession, SMBTree)> {
        let session = Self::connect(config).await?;
        session.negotiate().await?;
        session.authenticate().await?;
        let tree = session.tree_connect().await?;
        Ok((session, tree))
    }
}
