//! # SMB Client
//!
//! An async client for the **Server Message Block (SMB) Protocol Versions 2 and 3**
//! as specified in [\[MS-SMB2\]](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-smb2/5606ad47-5ee0-437a-817e-70c366052962).
//!
//! This crate provides:
//! - **Client layer** ([`client`]): Sessions, trees and open handles, the request
//!   correlator, and the file operations built on them (list, retrieve, store,
//!   create/delete directories, delete files, rename, attributes).
//! - **Protocol layer** ([`protocol`]): Wire-format types for SMB2/3 headers, the
//!   request and response bodies the client uses, and message signing.
//! - **Socket layer** ([`socket`]): Length-prefixed framing over direct TCP or the
//!   NetBIOS session service.
//! - **Utilities** ([`util`]): Authentication (NTLMv2 wrapped in SPNEGO) and
//!   cryptographic primitives (SP800-108 KDF, HMAC-SHA256, AES-CMAC).
//!
//! ## Quick Start
//!
//! ```no_run
//! use smb_client::client::{SMBClient, SMBClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> smb_core::SMBResult<()> {
//!     let config = SMBClientConfig::builder()
//!         .username("user")
//!         .password("pass")
//!         .remote_address("127.0.0.1")
//!         .remote_name("FILESERVER")
//!         .share_name("shared")
//!         .build()
//!         .map_err(smb_core::error::SMBError::config_error)?;
//!     let (session, tree) = SMBClient::connect_share(config).await?;
//!     for entry in tree.list_path("docs").await? {
//!         println!("{} {}", entry.name, entry.size);
//!     }
//!     session.close().await
//! }
//! ```

/// Sessions, trees, handles and the operations on them.
pub mod client;
/// SMB2/3 wire-format protocol types: headers, bodies, and message framing.
pub mod protocol;
/// Socket abstractions for SMB message transport.
pub mod socket;
/// Utility modules: authentication, cryptography, and flag macros.
pub mod util;
mod byte_helper;
